//! Grapheme segmentation and per-segment folding.
//!
//! Both vocabulary keys and searched text are cut into extended grapheme
//! clusters and folded one cluster at a time, so a match position in folded
//! space is always a cluster index in the original text.

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Text split into extended grapheme clusters, keeping byte offsets.
#[derive(Debug)]
pub struct Segmented<'a> {
    text: &'a str,
    /// Byte offset of each cluster, followed by `text.len()`.
    starts: Vec<usize>,
}

impl<'a> Segmented<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut starts: Vec<usize> = text.grapheme_indices(true).map(|(i, _)| i).collect();
        starts.push(text.len());
        Self { text, starts }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.starts.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The cluster at `index`, or `None` past either end.
    pub fn get(&self, index: usize) -> Option<&'a str> {
        if index >= self.len() {
            return None;
        }
        Some(&self.text[self.starts[index]..self.starts[index + 1]])
    }

    /// Byte offset where cluster `index` starts. `index == len()` gives the
    /// end of the text.
    pub fn byte_offset(&self, index: usize) -> usize {
        self.starts[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.starts.windows(2).map(move |w| &self.text[w[0]..w[1]])
    }
}

/// Fold one cluster: NFC composition, then lowercase unless case sensitive.
pub fn fold(cluster: &str, case_sensitive: bool) -> String {
    if cluster.is_ascii() {
        return if case_sensitive {
            cluster.to_string()
        } else {
            cluster.to_ascii_lowercase()
        };
    }
    let composed: String = cluster.nfc().collect();
    if case_sensitive {
        composed
    } else {
        composed.to_lowercase()
    }
}

/// Fold every cluster of `key`, in order.
pub fn fold_segments(key: &str, case_sensitive: bool) -> Vec<String> {
    key.graphemes(true).map(|g| fold(g, case_sensitive)).collect()
}

/// Folded form of a whole term, used for blacklist and duplicate checks.
pub fn normalize_term(term: &str, case_sensitive: bool) -> String {
    fold_segments(term.trim(), case_sensitive).concat()
}

/// Whether a grapheme cluster counts as part of a word for boundary checks.
///
/// Letters, digits, `_`, `'` and `-` are word-like. A cluster is judged by
/// its base character, so `é` written as `e` + U+0301 is still a letter.
pub fn is_word_like(cluster: &str) -> bool {
    match cluster.chars().next() {
        Some(c) => c.is_alphanumeric() || matches!(c, '_' | '\'' | '-'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_like_ascii() {
        assert!(is_word_like("a"));
        assert!(is_word_like("Z"));
        assert!(is_word_like("7"));
        assert!(is_word_like("_"));
        assert!(is_word_like("'"));
        assert!(is_word_like("-"));

        assert!(!is_word_like(" "));
        assert!(!is_word_like("."));
        assert!(!is_word_like(","));
        assert!(!is_word_like("\""));
        assert!(!is_word_like(""));
    }

    #[test]
    fn test_word_like_unicode() {
        assert!(is_word_like("é"));
        assert!(is_word_like("e\u{301}"));
        assert!(is_word_like("猫"));
        assert!(is_word_like("д"));
        assert!(is_word_like("٣"));

        assert!(!is_word_like("。"));
        assert!(!is_word_like("\u{2014}"));
        assert!(!is_word_like("👍"));
    }

    #[test]
    fn test_segments_keep_clusters_whole() {
        let text = "ae\u{301}👨\u{200d}👩\u{200d}👧!";
        let seg = Segmented::new(text);
        assert_eq!(seg.len(), 4);
        assert_eq!(seg.get(1), Some("e\u{301}"));
        assert_eq!(seg.get(2), Some("👨\u{200d}👩\u{200d}👧"));
        assert_eq!(seg.get(4), None);
        assert_eq!(seg.byte_offset(seg.len()), text.len());
        assert_eq!(seg.iter().collect::<String>(), text);
    }

    #[test]
    fn test_empty_text() {
        let seg = Segmented::new("");
        assert!(seg.is_empty());
        assert_eq!(seg.byte_offset(0), 0);
        assert_eq!(seg.iter().count(), 0);
    }

    #[test]
    fn test_fold_composes_and_lowercases() {
        assert_eq!(fold("E\u{301}", false), "é");
        assert_eq!(fold("E\u{301}", true), "É");
        assert_eq!(fold("Q", false), "q");
        assert_eq!(fold("Q", true), "Q");
    }

    #[test]
    fn test_normalize_term_trims() {
        assert_eq!(normalize_term("  Fox ", false), "fox");
        assert_eq!(normalize_term("  Fox ", true), "Fox");
    }
}
