use clap::{Arg, ArgAction, ArgMatches};
use error_stack::ResultExt;
use tabkit_compiler::{compile_group, AggregateCategory, GroupOptions};

use crate::{Error, InputOptions, OutputOptions};

/// Options for the group command.
///
/// The input must be clustered by the key: rows with equal keys are
/// adjacent.
#[derive(clap::Args, Debug)]
#[command(rename_all = "kebab-case")]
pub struct GroupCommand {
    #[command(flatten)]
    pub input: InputOptions,

    /// Statements computing the grouping key. Without a key all rows form a
    /// single group.
    #[arg(long, value_name = "EXPR")]
    pub key: Option<String>,

    #[command(flatten)]
    pub aggregates: AggregateStatements,

    /// Output every key. Keys other than plain field names must be assigned.
    #[arg(long)]
    pub output_all_keys: bool,

    /// Print the running aggregates after every row.
    #[arg(long)]
    pub expose_groups: bool,

    #[command(flatten)]
    pub output: OutputOptions,
}

const GROUP_ARG: &str = "grp";
const ACCUMULATOR_ARG: &str = "acc";

/// The `--grp` and `--acc` statements, in command line order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregateStatements(pub Vec<(AggregateCategory, String)>);

impl AggregateStatements {
    pub fn iter(&self) -> impl Iterator<Item = (AggregateCategory, &str)> + '_ {
        self.0
            .iter()
            .map(|(category, source)| (*category, source.as_str()))
    }
}

impl clap::FromArgMatches for AggregateStatements {
    fn from_arg_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let mut statements = Vec::new();
        for (id, category) in [
            (GROUP_ARG, AggregateCategory::Group),
            (ACCUMULATOR_ARG, AggregateCategory::Accumulator),
        ] {
            let (indices, values) =
                match (matches.indices_of(id), matches.get_many::<String>(id)) {
                    (Some(indices), Some(values)) => (indices, values),
                    _ => continue,
                };
            statements.extend(
                indices
                    .zip(values)
                    .map(|(index, source)| (index, category, source.clone())),
            );
        }
        statements.sort_by_key(|(index, _, _)| *index);
        Ok(Self(
            statements
                .into_iter()
                .map(|(_, category, source)| (category, source))
                .collect(),
        ))
    }

    fn update_from_arg_matches(&mut self, matches: &ArgMatches) -> Result<(), clap::Error> {
        *self = Self::from_arg_matches(matches)?;
        Ok(())
    }
}

impl clap::Args for AggregateStatements {
    fn augment_args(cmd: clap::Command) -> clap::Command {
        cmd.arg(
            Arg::new(GROUP_ARG)
                .long(GROUP_ARG)
                .value_name("EXPR")
                .value_parser(clap::value_parser!(String))
                .action(ArgAction::Append)
                .help("Statements over aggregates reset for every group"),
        )
        .arg(
            Arg::new(ACCUMULATOR_ARG)
                .long(ACCUMULATOR_ARG)
                .value_name("EXPR")
                .value_parser(clap::value_parser!(String))
                .action(ArgAction::Append)
                .help("Statements over aggregates accumulated over the whole input"),
        )
    }

    fn augment_args_for_update(cmd: clap::Command) -> clap::Command {
        Self::augment_args(cmd)
    }
}

impl GroupCommand {
    /// Compile the command, returning the text to print.
    pub fn execute(&self) -> error_stack::Result<String, Error> {
        let schema = self.input.schema()?;
        let aggregates: Vec<(AggregateCategory, &str)> = self.aggregates.iter().collect();
        let options = GroupOptions {
            output_all_keys: self.output_all_keys,
            expose_groups: self.expose_groups,
        };

        let compiled = compile_group(&schema, self.key.as_deref(), &aggregates, &options)
            .change_context(Error::Compilation)?;
        Ok(self.output.render(&compiled))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(clap::Parser, Debug)]
    struct Wrapper {
        #[command(flatten)]
        group: GroupCommand,
    }

    #[test]
    fn test_statements_keep_command_line_order() {
        let wrapper = Wrapper::try_parse_from([
            "group", "--header", "# k v", "--grp", "a=sum(v)", "--acc", "n=cnt()", "--grp",
            "b=a/n",
        ])
        .unwrap();
        assert_eq!(
            wrapper.group.aggregates,
            AggregateStatements(vec![
                (AggregateCategory::Group, "a=sum(v)".to_owned()),
                (AggregateCategory::Accumulator, "n=cnt()".to_owned()),
                (AggregateCategory::Group, "b=a/n".to_owned()),
            ])
        );
    }

    #[test]
    fn test_no_statements() {
        let wrapper = Wrapper::try_parse_from(["group", "--header", "# k v"]).unwrap();
        assert!(wrapper.group.aggregates.0.is_empty());
    }
}
