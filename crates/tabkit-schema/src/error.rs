#[derive(derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[display(fmt = "header must start with '#', but was '{_0}'")]
    MissingHeaderMarker(String),
    #[display(fmt = "invalid field '{_0}'")]
    InvalidField(String),
    #[display(fmt = "unknown field type '{_0}'")]
    UnknownFieldType(String),
    #[display(fmt = "invalid header zone '{_0}'")]
    InvalidZone(String),
    #[display(fmt = "invalid size '{_0}'")]
    InvalidSize(String),
    #[display(fmt = "invalid metadata '{_0}'")]
    InvalidMeta(String),
    #[display(fmt = "conflicting sort types '{first}' and '{second}'")]
    ConflictingSortTypes { first: String, second: String },
    #[display(fmt = "ambiguous order direction in '{_0}'")]
    AmbiguousOrderDirection(String),
    #[display(fmt = "unknown order modifier '{_0}'")]
    UnknownOrderModifier(String),
    #[display(fmt = "conflicting field names {_0}")]
    ConflictingFieldNames(String),
    #[display(fmt = "unknown ordering field name '{_0}'")]
    UnknownOrderField(String),
}

impl error_stack::Context for Error {}
