/// The primitive type tag of a field or expression.
///
/// `Any` is used when nothing better is known; it is the default for fields
/// declared in a header without a type.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum FieldType {
    Int,
    Float,
    Str,
    Bool,
    #[default]
    Any,
}

impl FieldType {
    /// Returns true if this is one of the numeric types.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }
}

/// A named, typed column of a stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    name: String,
    field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

/// Renders the field as it appears in a header: `name:type`, or just `name`
/// for fields of type `any`.
impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.field_type {
            FieldType::Any => write!(f, "{}", self.name),
            field_type => write!(f, "{}:{}", self.name, field_type),
        }
    }
}
