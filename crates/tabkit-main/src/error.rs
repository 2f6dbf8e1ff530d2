#[derive(derive_more::Display, Debug)]
pub enum Error {
    #[display(fmt = "missing input: specify a header or an input file")]
    MissingInput,
    #[display(fmt = "failed to read input")]
    ReadingInput,
    #[display(fmt = "invalid input header")]
    InvalidHeader,
    #[display(fmt = "failed to compile")]
    Compilation,
    #[display(fmt = "failed to set up tracing")]
    TracingSetup,
}

impl error_stack::Context for Error {}
