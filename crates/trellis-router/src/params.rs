//! Parameter bindings captured during route lookup.

use smallvec::SmallVec;

/// Bindings kept inline before the storage spills to the heap. Patterns
/// deeper than four `:name`/`*name` positions are rare.
const INLINE_BINDINGS: usize = 4;

/// The parameter set bound along one matched pattern.
///
/// The lookup walk appends a binding each time it crosses a `:name` or
/// `*name` position and rolls the set back with [`truncate`](Self::truncate)
/// when a candidate branch fails, so a finished match carries only the
/// bindings of the winning pattern, in pattern order.
///
/// # Example
///
/// ```rust
/// use trellis_router::Params;
///
/// let mut params = Params::new();
/// params.push("orgId", "acme");
/// params.push("repo", "trellis");
///
/// assert_eq!(params.get("orgId"), Some("acme"));
/// assert_eq!(params.get("missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    bindings: SmallVec<[(String, String); INLINE_BINDINGS]>,
}

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a binding.
    ///
    /// Names are not deduplicated; [`get`](Self::get) returns the earliest
    /// binding for a name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.bindings.push((name.into(), value.into()));
    }

    /// Returns the value bound under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the bindings in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Drops every binding, keeping allocated capacity for reuse.
    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    /// Rolls the set back to its first `len` bindings.
    ///
    /// The lookup walk records `len()` before descending into a candidate
    /// branch and truncates back to that mark if the branch fails, so
    /// bindings from dead ends never reach the caller.
    pub fn truncate(&mut self, len: usize) {
        self.bindings.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_earliest_binding() {
        let mut params = Params::new();
        params.push("id", "outer");
        params.push("id", "inner");

        assert_eq!(params.get("id"), Some("outer"));
    }

    #[test]
    fn test_iter_preserves_pattern_order() {
        let mut params = Params::new();
        params.push("orgId", "acme");
        params.push("repo", "trellis");
        params.push("sha", "f00");

        let order: Vec<_> = params.iter().collect();
        assert_eq!(
            order,
            vec![("orgId", "acme"), ("repo", "trellis"), ("sha", "f00")]
        );
    }

    #[test]
    fn test_rollback_to_mark() {
        let mut params = Params::new();
        params.push("orgId", "acme");

        // A failing branch binds, then rolls back to the mark.
        let mark = params.len();
        params.push("id", "readme");
        params.push("section", "usage");
        params.truncate(mark);

        // The surviving walk binds something else.
        params.push("repo", "trellis");

        assert_eq!(params.get("id"), None);
        assert_eq!(params.get("section"), None);
        assert_eq!(params.get("repo"), Some("trellis"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_clear_empties_the_set() {
        let mut params = Params::new();
        params.push("id", "7");
        params.clear();

        assert!(params.is_empty());
        assert_eq!(params.get("id"), None);
    }

    #[test]
    fn test_spills_past_inline_capacity() {
        let mut params = Params::new();
        for depth in 0..INLINE_BINDINGS + 3 {
            params.push(format!("level{depth}"), depth.to_string());
        }

        assert_eq!(params.len(), INLINE_BINDINGS + 3);
        assert_eq!(params.get("level5"), Some("5"));
    }
}
