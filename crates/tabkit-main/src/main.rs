#![warn(
    rust_2018_idioms,
    nonstandard_style,
    future_incompatible,
    clippy::mod_module_files,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::undocumented_unsafe_blocks
)]

use clap::Parser;
use error_stack::ResultExt;
use tabkit_main::tracing_setup::{setup_tracing, TracingOptions};
use tabkit_main::{GroupCommand, MapCommand};
use tracing::error;

/// Compile expressions over tab-separated streams into awk programs.
#[derive(clap::Parser, Debug)]
#[command(name = "tabkit", rename_all = "kebab-case", version)]
pub struct TabkitOptions {
    #[command(flatten)]
    tracing_options: TracingOptions,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Filter rows and compute new fields from each row.
    Map(MapCommand),
    /// Aggregate groups of adjacent rows sharing a key.
    Group(GroupCommand),
}

fn main() {
    let options = TabkitOptions::parse();
    if let Err(err) = setup_tracing(&options.tracing_options) {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{err:?}");
        }
        std::process::exit(1);
    }

    let exit_code = if let Err(err) = main_body(options) {
        error!("{:?}", err);
        1
    } else {
        0
    };

    std::process::exit(exit_code);
}

#[derive(derive_more::Display, Debug)]
#[display(fmt = "error running command")]
pub struct Error;

impl error_stack::Context for Error {}

#[allow(clippy::print_stdout)]
fn main_body(options: TabkitOptions) -> error_stack::Result<(), Error> {
    let output = match options.command {
        Command::Map(map) => map.execute().change_context(Error)?,
        Command::Group(group) => group.execute().change_context(Error)?,
    };
    print!("{output}");

    Ok(())
}
