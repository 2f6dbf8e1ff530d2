use std::collections::BTreeSet;

/// An awk function injected at the head of a program that calls it.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum_macros::IntoStaticStr,
)]
pub enum Snippet {
    #[strum(serialize = "crc32")]
    Crc32,
    #[strum(serialize = "hash_id_set")]
    HashIdSet,
    #[strum(serialize = "hash_id_map")]
    HashIdMap,
    #[strum(serialize = "is_in_file")]
    IsInFile,
    #[strum(serialize = "map_from_file")]
    MapFromFile,
    #[strum(serialize = "uniq")]
    Uniq,
}

impl Snippet {
    /// The awk source defining the function.
    pub fn source(&self) -> &'static str {
        match self {
            Snippet::Crc32 => include_str!("snippets/crc32.awk"),
            Snippet::HashIdSet => include_str!("snippets/hash_id_set.awk"),
            Snippet::HashIdMap => include_str!("snippets/hash_id_map.awk"),
            Snippet::IsInFile => include_str!("snippets/is_in_file.awk"),
            Snippet::MapFromFile => include_str!("snippets/map_from_file.awk"),
            Snippet::Uniq => include_str!("snippets/uniq.awk"),
        }
    }

    /// Snippets whose functions this one calls.
    fn dependencies(&self) -> &'static [Snippet] {
        match self {
            Snippet::IsInFile => &[Snippet::HashIdSet],
            Snippet::MapFromFile => &[Snippet::HashIdMap],
            _ => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// The set of snippets required by a program, in a fixed order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snippets(BTreeSet<Snippet>);

impl Snippets {
    /// Require `snippet` and the snippets it depends on.
    pub fn require(&mut self, snippet: Snippet) {
        for dependency in snippet.dependencies() {
            self.require(*dependency);
        }
        if self.0.insert(snippet) {
            tracing::debug!(snippet = snippet.name(), "required snippet");
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Snippet> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_are_required() {
        let mut snippets = Snippets::default();
        assert!(snippets.is_empty());
        snippets.require(Snippet::MapFromFile);
        snippets.require(Snippet::Crc32);
        snippets.require(Snippet::MapFromFile);
        let names: Vec<_> = snippets.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["crc32", "hash_id_map", "map_from_file"]);
    }

    #[test]
    fn test_sources_define_their_function() {
        for snippet in [
            Snippet::Crc32,
            Snippet::HashIdSet,
            Snippet::HashIdMap,
            Snippet::IsInFile,
            Snippet::MapFromFile,
            Snippet::Uniq,
        ] {
            let header = format!("function {}(", snippet.name());
            assert!(
                snippet.source().starts_with(&header),
                "{} should start with {header}",
                snippet.name()
            );
        }
    }
}
