use error_stack::ResultExt;
use tabkit_compiler::compile_filter_map;

use crate::{Error, InputOptions, OutputOptions};

/// Options for the map command.
#[derive(clap::Args, Debug)]
#[command(rename_all = "kebab-case")]
pub struct MapCommand {
    #[command(flatten)]
    pub input: InputOptions,

    /// Condition on the rows to output. All given conditions must hold.
    #[arg(long = "filter", value_name = "EXPR")]
    pub filters: Vec<String>,

    /// Statements computing the output fields.
    ///
    /// Every name bound by a statement becomes an output field, unless it
    /// starts with `_`. Defaults to every input field.
    #[arg(long = "map", value_name = "EXPR")]
    pub maps: Vec<String>,

    #[command(flatten)]
    pub output: OutputOptions,
}

impl MapCommand {
    /// Compile the command, returning the text to print.
    pub fn execute(&self) -> error_stack::Result<String, Error> {
        let schema = self.input.schema()?;
        let filters: Vec<&str> = self.filters.iter().map(String::as_str).collect();
        let maps: Vec<&str> = self.maps.iter().map(String::as_str).collect();

        let compiled =
            compile_filter_map(&schema, &filters, &maps).change_context(Error::Compilation)?;
        Ok(self.output.render(&compiled))
    }
}
