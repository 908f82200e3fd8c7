//! Ordered pattern sets for `wait_until`
//!
//! Matching is plain substring search over the accumulated match buffer.
//! Priority follows pattern order: the first pattern found anywhere in the
//! buffer wins, even if a later pattern occurs earlier in the buffer.

/// A pattern to match against
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// Pattern name (for logging)
    pub name: String,
    /// Pattern bytes
    pub bytes: Vec<u8>,
}

impl Pattern {
    /// Create a new pattern from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(bytes).into_owned(),
            bytes: bytes.to_vec(),
        }
    }

    /// Create a new pattern with a custom name
    pub fn new(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            bytes: pattern.as_bytes().to_vec(),
        }
    }

    /// An empty pattern matches anything, including an empty buffer
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn find_in(&self, haystack: &[u8], case_insensitive: bool) -> Option<usize> {
        find_subslice(haystack, &self.bytes, case_insensitive)
    }
}

/// Details of a pattern match
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternMatch {
    /// Index of the matched pattern in its set
    pub pattern_index: usize,
    /// Offset of the first matched byte in the match buffer
    pub start: usize,
    /// Offset one past the last matched byte
    pub end: usize,
    /// Name of the matched pattern
    pub pattern_name: String,
}

/// Ordered set of patterns; order is match priority
#[derive(Clone, Debug, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
    case_insensitive: bool,
}

impl PatternSet {
    pub fn new<I, P>(patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| Pattern::from_bytes(p.as_ref()))
                .collect(),
            case_insensitive: false,
        }
    }

    /// Build from entries where `None` terminates the list.
    ///
    /// Everything after the first `None` is ignored, so
    /// `[Some("a"), None, Some("b")]` only ever matches `"a"`.
    pub fn from_entries<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = Option<P>>,
        P: AsRef<[u8]>,
    {
        Self::new(entries.into_iter().map_while(|entry| entry))
    }

    pub fn from_patterns(patterns: Vec<Pattern>) -> Self {
        Self {
            patterns,
            case_insensitive: false,
        }
    }

    /// ASCII case-insensitive matching, on top of any framer-wide setting
    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    pub fn push(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    /// First pattern (by priority) occurring anywhere in `haystack`
    pub fn find(&self, haystack: &[u8]) -> Option<PatternMatch> {
        self.find_with(haystack, self.case_insensitive)
    }

    /// `find`, folding case if either this set or the caller asks for it
    pub(crate) fn find_with(&self, haystack: &[u8], case_insensitive: bool) -> Option<PatternMatch> {
        let case_insensitive = case_insensitive || self.case_insensitive;
        self.patterns.iter().enumerate().find_map(|(i, pattern)| {
            pattern
                .find_in(haystack, case_insensitive)
                .map(|start| PatternMatch {
                    pattern_index: i,
                    start,
                    end: start + pattern.bytes.len(),
                    pattern_name: pattern.name.clone(),
                })
        })
    }
}

impl<'a> FromIterator<&'a str> for PatternSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<&[&str]> for PatternSet {
    fn from(patterns: &[&str]) -> Self {
        Self::new(patterns.iter())
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8], case_insensitive: bool) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| {
        if case_insensitive {
            window.eq_ignore_ascii_case(needle)
        } else {
            window == needle
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_match() {
        let set = PatternSet::new(["test"]);
        let m = set.find(b"this is a test").unwrap();
        assert_eq!(m.pattern_index, 0);
        assert_eq!(m.start, 10);
        assert_eq!(m.end, 14);
        assert_eq!(m.pattern_name, "test");
    }

    #[test]
    fn test_no_match() {
        let set = PatternSet::new(["test"]);
        assert!(set.find(b"hello").is_none());
    }

    #[test]
    fn test_partial_match_restart() {
        let set = PatternSet::new(["test"]);
        let m = set.find(b"tesxtest").unwrap();
        assert_eq!(m.start, 4);
    }

    #[test]
    fn test_priority_is_pattern_order() {
        // "world" appears later in the text but is listed first
        let set = PatternSet::new(["world", "hello"]);
        let m = set.find(b"hello world").unwrap();
        assert_eq!(m.pattern_index, 0);
        assert_eq!(m.pattern_name, "world");
    }

    #[test]
    fn test_case_sensitive_by_default() {
        let set = PatternSet::new(["login:"]);
        assert!(set.find(b"LOGIN:").is_none());

        let set = set.case_insensitive(true);
        assert_eq!(set.find(b"LOGIN:").unwrap().pattern_index, 0);
    }

    #[test]
    fn test_caller_flag_adds_to_set_flag() {
        let strict = PatternSet::new(["login:"]);
        assert!(strict.find_with(b"LOGIN:", true).is_some());

        let folding = PatternSet::new(["login:"]).case_insensitive(true);
        assert!(folding.find_with(b"LOGIN:", false).is_some());
    }

    #[test]
    fn test_named_patterns() {
        let mut set = PatternSet::from_patterns(vec![Pattern::new("prompt", "$ ")]);
        set.push(Pattern::from_bytes(b"# "));

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(0).map(|p| p.name.as_str()), Some("prompt"));
        assert_eq!(set.get(1).map(|p| p.bytes.as_slice()), Some(&b"# "[..]));
        assert!(set.get(2).is_none());
        assert_eq!(set.iter().filter(|p| !p.is_empty()).count(), 2);

        // Events and logs carry the name, not the bytes
        let m = set.find(b"root@host:~# ").unwrap();
        assert_eq!((m.pattern_index, m.pattern_name.as_str()), (1, "# "));
        let m = set.find(b"user@host:~$ ").unwrap();
        assert_eq!(m.pattern_name, "prompt");
    }

    #[test]
    fn test_empty_pattern_matches_anything() {
        let set = PatternSet::new(["", "x"]);
        let m = set.find(b"").unwrap();
        assert_eq!(m.pattern_index, 0);
        assert_eq!((m.start, m.end), (0, 0));
    }

    #[test]
    fn test_empty_set_never_matches() {
        let set = PatternSet::default();
        assert!(set.is_empty());
        assert!(set.find(b"anything").is_none());
    }

    #[test]
    fn test_entries_stop_at_sentinel() {
        let set = PatternSet::from_entries([Some("a"), None, Some("b")]);
        assert_eq!(set.len(), 1);
        assert!(set.find(b"b").is_none());
        assert!(set.find(b"a").is_some());
    }

    #[test]
    fn test_from_iterator() {
        let set: PatternSet = "OK ERROR".split(' ').collect();
        assert_eq!(set.find(b"+CME ERROR: 10").unwrap().pattern_index, 1);
    }

    #[test]
    fn test_needle_longer_than_haystack() {
        let set = PatternSet::new(["longer"]);
        assert!(set.find(b"long").is_none());
    }
}
