use crate::NearestMatches;

#[derive(derive_more::Display, Debug, Clone, PartialEq)]
pub enum Error {
    #[display(fmt = "invalid expression: {_0}")]
    Grammar(String),
    #[display(fmt = "unknown name '{name}': nearest matches are {nearest}")]
    NameResolution {
        name: String,
        nearest: NearestMatches<String>,
    },
    #[display(fmt = "wrong number of arguments to '{function}': {detail}")]
    Arity { function: String, detail: String },
    #[display(fmt = "invalid argument to '{function}': {detail}")]
    ArgumentKind { function: String, detail: String },
    #[display(fmt = "name '{_0}' is already bound")]
    DuplicateBinding(String),
    #[display(fmt = "no output fields specified")]
    EmptyProjection,
    #[display(fmt = "invalid output schema")]
    SchemaValidation,
    #[display(fmt = "name '{_0}' is reserved: field names may not start with '__'")]
    ReservedName(String),
}

impl error_stack::Context for Error {}

impl Error {
    pub(crate) fn arity(function: &str, detail: impl Into<String>) -> Self {
        Error::Arity {
            function: function.to_owned(),
            detail: detail.into(),
        }
    }

    pub(crate) fn argument_kind(function: &str, detail: impl Into<String>) -> Self {
        Error::ArgumentKind {
            function: function.to_owned(),
            detail: detail.into(),
        }
    }
}
