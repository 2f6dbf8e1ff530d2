use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use error_stack::{IntoReport, ResultExt};
use tabkit_compiler::{Compiled, Layout};
use tabkit_schema::{parse_header, Schema};
use tracing::debug;

use crate::Error;

/// Where the schema of the input is read from.
#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
#[command(rename_all = "kebab-case")]
pub struct InputOptions {
    /// Header line describing the input, such as `# a:int b #ORDER: a`.
    #[arg(long)]
    pub header: Option<String>,

    /// File starting with the header line describing its rows.
    #[arg(long)]
    pub input: Option<PathBuf>,
}

impl InputOptions {
    pub fn schema(&self) -> error_stack::Result<Schema, Error> {
        let header = match (&self.header, &self.input) {
            (Some(header), _) => header.clone(),
            (None, Some(input)) => read_header(input)?,
            (None, None) => error_stack::bail!(Error::MissingInput),
        };
        let schema = parse_header(&header)
            .change_context(Error::InvalidHeader)
            .attach_printable_lazy(|| format!("header: '{header}'"))?;
        debug!(%schema, "input schema");
        Ok(schema)
    }
}

fn read_header(path: &Path) -> error_stack::Result<String, Error> {
    let file = File::open(path)
        .into_report()
        .change_context(Error::ReadingInput)
        .attach_printable_lazy(|| format!("path: '{}'", path.display()))?;
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .into_report()
        .change_context(Error::ReadingInput)
        .attach_printable_lazy(|| format!("path: '{}'", path.display()))?;
    Ok(line.trim_end_matches(|c| c == '\n' || c == '\r').to_owned())
}

/// How the compiled program is printed.
#[derive(clap::Args, Debug, Default)]
#[command(rename_all = "kebab-case")]
pub struct OutputOptions {
    /// Print the program over several lines, indenting blocks by this many
    /// spaces.
    #[arg(long, value_name = "INDENT")]
    pub pretty: Option<usize>,

    /// Print the header of the output before the program.
    #[arg(long)]
    pub print_header: bool,

    /// Print a shell command running the program instead of the program.
    #[arg(long, conflicts_with = "pretty")]
    pub command_line: bool,

    /// The awk executable used by the command line.
    #[arg(long, default_value = "awk")]
    pub awk: String,
}

impl OutputOptions {
    pub fn render(&self, compiled: &Compiled) -> String {
        let program = compiled.program();
        let text = if self.command_line {
            program.command_line(&self.awk, "")
        } else {
            let layout = self.pretty.map_or_else(Layout::compact, Layout::pretty);
            program.render(&layout)
        };

        let mut output = String::new();
        if self.print_header {
            output.push_str(&compiled.schema().to_string());
            output.push('\n');
        }
        output.push_str(text.trim_end_matches('\n'));
        output.push('\n');
        output
    }
}
