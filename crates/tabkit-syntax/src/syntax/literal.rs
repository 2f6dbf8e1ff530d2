/// A literal appearing in the source.
///
/// Numbers retain their source text; whether they are integers or floats is
/// decided when they are lowered.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    True,
    False,
    Number(String),
    String(String),
}

impl LiteralValue {
    /// Returns true if the literal is a number written with a fraction or
    /// exponent.
    pub fn is_float(&self) -> bool {
        matches!(self, LiteralValue::Number(n) if n.contains(['.', 'e', 'E']))
    }
}

impl std::fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiteralValue::True => write!(f, "True"),
            LiteralValue::False => write!(f, "False"),
            LiteralValue::Number(n) => write!(f, "{n}"),
            LiteralValue::String(s) => write!(f, "{s:?}"),
        }
    }
}
