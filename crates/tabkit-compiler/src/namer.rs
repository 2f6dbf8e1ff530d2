use hashbrown::hash_map::Entry;
use hashbrown::HashMap;

/// Generates internal names, memoized by prefix and key.
///
/// The same `(prefix, key)` always receives the same name; otherwise names
/// under a prefix are numbered from zero in order of first request. Keys are
/// the rendered text of the expressions being named, so structurally equal
/// expressions share a name.
#[derive(Debug, Default)]
pub struct Namer {
    names: HashMap<(String, String), String>,
    counts: HashMap<String, usize>,
}

impl Namer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_for(&mut self, prefix: &str, key: &str) -> String {
        match self.names.entry((prefix.to_owned(), key.to_owned())) {
            Entry::Occupied(occupied) => occupied.get().clone(),
            Entry::Vacant(vacant) => {
                let count = self.counts.entry(prefix.to_owned()).or_default();
                let name = format!("{prefix}{count}");
                *count += 1;
                vacant.insert(name).clone()
            }
        }
    }

    /// Name for a key made of several parts.
    pub fn name_for_parts(&mut self, prefix: &str, parts: &[&str]) -> String {
        self.name_for(prefix, &parts.join("\u{0}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_memoized() {
        let mut namer = Namer::new();
        assert_eq!(namer.name_for("a", "a"), "a0");
        assert_eq!(namer.name_for("b", "a"), "b0");
        assert_eq!(namer.name_for("a", "b"), "a1");
        assert_eq!(namer.name_for("a", "a"), "a0");
        assert_eq!(namer.name_for("b", "b"), "b1");
    }

    #[test]
    fn test_name_for_parts() {
        let mut namer = Namer::new();
        let first = namer.name_for_parts("_split", &["$1", "\",\""]);
        assert_eq!(namer.name_for_parts("_split", &["$1", "\",\""]), first);
        assert_ne!(namer.name_for_parts("_split", &["$1\",\"", ""]), first);
    }
}
