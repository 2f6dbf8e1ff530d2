use crate::Location;

#[derive(derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[display(fmt = "unrecognized token '{token}' at {location}")]
    UnrecognizedToken { token: String, location: Location },
    #[display(fmt = "unexpected '{found}' at {location}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        location: Location,
    },
    #[display(fmt = "unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },
    #[display(fmt = "{what} at {location}")]
    Unsupported {
        what: &'static str,
        location: Location,
    },
}

impl error_stack::Context for ParseError {}
