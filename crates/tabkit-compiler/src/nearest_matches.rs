use edit_distance::edit_distance;
use itertools::Itertools;

/// The nearest matches to a given name.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NearestMatches<T>(Vec<T>);

impl<T> Default for NearestMatches<T> {
    fn default() -> Self {
        Self(vec![])
    }
}

impl NearestMatches<String> {
    /// Create a set of nearest matches for a given string.
    ///
    /// At most five candidates are kept, closest first. Ties keep the order
    /// of `items`.
    pub fn new_nearest_strings<'a>(query: &str, items: impl Iterator<Item = &'a str>) -> Self {
        let nearest_matches: Vec<_> = items
            .enumerate()
            .map(|(index, item)| (edit_distance(query, item), index, item))
            .k_smallest(5)
            .map(|(_, _, item)| item.to_owned())
            .collect();
        Self(nearest_matches)
    }
}

impl<T: std::fmt::Display> std::fmt::Display for NearestMatches<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            write!(f, "none")
        } else {
            self.0
                .iter()
                .format_with(", ", |e, f| f(&format_args!("'{e}'")))
                .fmt(f)
        }
    }
}

impl<T> From<Vec<T>> for NearestMatches<T> {
    fn from(matches: Vec<T>) -> Self {
        Self(matches)
    }
}

impl<T> NearestMatches<T> {
    pub fn inner(self) -> Vec<T> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
