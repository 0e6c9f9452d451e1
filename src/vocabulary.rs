//! Vocabulary as supplied by the caller.
//!
//! Two shapes are accepted: an ordered term → target mapping
//! ([`Vocabulary`]) and grouped synonym entries ([`VocabularyEntry`]). Both
//! are copied into compiled rules, so editing them afterwards has no effect
//! until the next recompilation.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Where a vocabulary entry came from. Carried through to each replacement
/// as its source label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Builtin,
    #[default]
    Remote,
    Custom,
}

impl SourceTag {
    pub fn label(self) -> &'static str {
        match self {
            SourceTag::Builtin => "builtin",
            SourceTag::Remote => "remote",
            SourceTag::Custom => "custom",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Replacement side of a single term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermTarget {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    #[serde(default)]
    pub source: SourceTag,
}

impl TermTarget {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            pronunciation: None,
            source: SourceTag::default(),
        }
    }

    pub fn with_pronunciation(mut self, pronunciation: impl Into<String>) -> Self {
        self.pronunciation = Some(pronunciation.into());
        self
    }

    pub fn with_source(mut self, source: SourceTag) -> Self {
        self.source = source;
        self
    }
}

/// A JSON value may be a bare target string or a full object.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Plain(String),
    Full(TermTarget),
}

/// One target with all of its surface forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyEntry {
    terms: Vec<String>,
    pub target: String,
    pub pronunciation: Option<String>,
    /// Lower values are declared first and win ties.
    pub priority: i32,
    pub source: SourceTag,
}

impl VocabularyEntry {
    /// Terms are trimmed, empty ones dropped, duplicates removed keeping the
    /// first occurrence.
    pub fn new<I, S>(terms: I, target: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for term in terms {
            let term = term.as_ref().trim();
            if !term.is_empty() && !unique.iter().any(|t| t == term) {
                unique.push(term.to_string());
            }
        }
        Self {
            terms: unique,
            target: target.into(),
            pronunciation: None,
            priority: 0,
            source: SourceTag::default(),
        }
    }

    pub fn with_pronunciation(mut self, pronunciation: impl Into<String>) -> Self {
        self.pronunciation = Some(pronunciation.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_source(mut self, source: SourceTag) -> Self {
        self.source = source;
        self
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Ordered term → target mapping. Order is declaration order and decides
/// priority between rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    entries: Vec<(String, TermTarget)>,
    positions: FxHashMap<String, usize>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Overwriting keeps the term's original position.
    pub fn insert(&mut self, term: impl Into<String>, target: TermTarget) {
        let term = term.into();
        match self.positions.get(&term) {
            Some(&pos) => self.entries[pos].1 = target,
            None => {
                self.positions.insert(term.clone(), self.entries.len());
                self.entries.push((term, target));
            }
        }
    }

    pub fn get(&self, term: &str) -> Option<&TermTarget> {
        self.positions.get(term).map(|&pos| &self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TermTarget)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v))
    }

    /// Parse `{ "term": "target" | { "target": .., "pronunciation": .., "source": .. } }`,
    /// keeping document order.
    pub fn from_json(json: &str) -> Result<Self> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut vocabulary = Vocabulary::new();
        for (term, value) in map {
            let target = match serde_json::from_value::<RawTarget>(value)? {
                RawTarget::Plain(target) => TermTarget::new(target),
                RawTarget::Full(target) => target,
            };
            vocabulary.insert(term, target);
        }
        Ok(vocabulary)
    }

    /// One single-term entry per mapping, all at the same priority so that
    /// declaration order decides.
    pub fn to_entries(&self) -> Vec<VocabularyEntry> {
        self.entries
            .iter()
            .filter(|(term, _)| !term.trim().is_empty())
            .map(|(term, target)| VocabularyEntry {
                terms: vec![term.trim().to_string()],
                target: target.target.clone(),
                pronunciation: target.pronunciation.clone(),
                priority: 0,
                source: target.source,
            })
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, TermTarget)> for Vocabulary {
    fn from_iter<T: IntoIterator<Item = (K, TermTarget)>>(iter: T) -> Self {
        let mut vocabulary = Vocabulary::new();
        for (term, target) in iter {
            vocabulary.insert(term, target);
        }
        vocabulary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_trims_and_dedups() {
        let entry = VocabularyEntry::new([" cat", "cat ", "", "kitty", "  "], "猫");
        assert_eq!(entry.terms(), &["cat".to_string(), "kitty".to_string()]);
        assert!(!entry.is_empty());

        let empty = VocabularyEntry::new(["  "], "x");
        assert!(empty.is_empty());
    }

    #[test]
    fn test_insert_keeps_position() {
        let mut vocab = Vocabulary::new();
        vocab.insert("a", TermTarget::new("1"));
        vocab.insert("b", TermTarget::new("2"));
        vocab.insert("a", TermTarget::new("3"));

        let order: Vec<_> = vocab.iter().map(|(t, v)| (t, v.target.as_str())).collect();
        assert_eq!(order, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_from_json_preserves_order_and_shapes() {
        let json = r#"{
            "zebra": "斑马",
            "apple": { "target": "苹果", "pronunciation": "píng guǒ", "source": "custom" }
        }"#;
        let vocab = Vocabulary::from_json(json).unwrap();

        let terms: Vec<_> = vocab.iter().map(|(t, _)| t).collect();
        assert_eq!(terms, vec!["zebra", "apple"]);

        let apple = vocab.get("apple").unwrap();
        assert_eq!(apple.target, "苹果");
        assert_eq!(apple.pronunciation.as_deref(), Some("píng guǒ"));
        assert_eq!(apple.source, SourceTag::Custom);
        assert_eq!(vocab.get("zebra").unwrap().source, SourceTag::Remote);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(Vocabulary::from_json("[1, 2]").is_err());
        assert!(Vocabulary::from_json(r#"{"a": 5}"#).is_err());
    }

    #[test]
    fn test_to_entries_skips_blank_terms() {
        let vocab: Vocabulary = [("  ", TermTarget::new("x")), (" dog ", TermTarget::new("狗"))]
            .into_iter()
            .collect();
        let entries = vocab.to_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].terms(), &["dog".to_string()]);
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(SourceTag::Builtin.to_string(), "builtin");
        assert_eq!(SourceTag::Custom.label(), "custom");
    }
}
