use std::str::FromStr;

use error_stack::{bail, ensure};

use crate::Error;

/// How the values of an ordering field compare.
///
/// The names follow the `sort(1)` flavours: plain string comparison, `-n`,
/// `-g`, `-h` and `-M`.
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
pub enum SortKind {
    #[default]
    #[strum(serialize = "str")]
    String,
    #[strum(serialize = "num")]
    Numeric,
    #[strum(serialize = "general")]
    GeneralNumeric,
    #[strum(serialize = "human")]
    HumanNumeric,
    #[strum(serialize = "month")]
    Month,
}

/// One entry of the sort order of a stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldOrder {
    name: String,
    sort_kind: SortKind,
    descending: bool,
}

impl FieldOrder {
    pub fn new(name: impl Into<String>, sort_kind: SortKind, descending: bool) -> Self {
        Self {
            name: name.into(),
            sort_kind,
            descending,
        }
    }

    /// An ascending string ordering on `name`.
    pub fn ascending(name: impl Into<String>) -> Self {
        Self::new(name, SortKind::String, false)
    }

    /// Builds an order entry from the `:`-separated modifiers following the
    /// field name in a header, e.g. `["desc", "num"]` for `ctr:desc:num`.
    pub fn try_from_modifiers(name: &str, modifiers: &[&str]) -> error_stack::Result<Self, Error> {
        let mut sort_kind: Option<SortKind> = None;
        let mut descending: Option<bool> = None;
        for modifier in modifiers {
            if let Ok(kind) = SortKind::from_str(modifier) {
                if let Some(previous) = sort_kind {
                    bail!(Error::ConflictingSortTypes {
                        first: previous.to_string(),
                        second: kind.to_string(),
                    });
                }
                sort_kind = Some(kind);
            } else if *modifier == "asc" || *modifier == "desc" {
                ensure!(
                    descending.is_none(),
                    Error::AmbiguousOrderDirection(format!("{name}:{}", modifiers.join(":")))
                );
                descending = Some(*modifier == "desc");
            } else {
                bail!(Error::UnknownOrderModifier((*modifier).to_owned()));
            }
        }

        Ok(Self::new(
            name,
            sort_kind.unwrap_or_default(),
            descending.unwrap_or(false),
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sort_kind(&self) -> SortKind {
        self.sort_kind
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }
}

/// Renders the order entry as it appears in a header: `name[:desc][:kind]`.
/// The default string kind is not written.
impl std::fmt::Display for FieldOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if self.descending {
            write!(f, ":desc")?;
        }
        match self.sort_kind {
            SortKind::String => Ok(()),
            kind => write!(f, ":{kind}"),
        }
    }
}
