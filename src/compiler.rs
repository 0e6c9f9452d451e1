//! Turns vocabulary into matchable rules.
//!
//! Every surviving term becomes exactly one rule: either a [`CompiledRule`]
//! inserted into the automaton, or an [`OverrideRule`] when the caller
//! supplied a regular expression for that term. Priorities come from one
//! counter shared by both kinds, in declaration order.

use std::sync::Arc;

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::automaton::Automaton;
use crate::segment::fold_segments;
use crate::vocabulary::VocabularyEntry;

/// Automaton payload for one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    pub original_key: String,
    pub replacement: String,
    pub source_label: String,
    pub pronunciation: Option<String>,
    pub priority: u32,
    /// In grapheme clusters.
    pub pattern_len: usize,
    pub requires_boundary: bool,
}

/// A term matched by its own expression instead of the automaton.
#[derive(Debug, Clone)]
pub struct OverrideRule {
    pub original_key: String,
    pub pattern: Regex,
    pub replacement: String,
    pub source_label: String,
    pub pronunciation: Option<String>,
    pub priority: u32,
}

/// Borrowed view of whichever rule produced a candidate.
#[derive(Debug, Clone, Copy)]
pub enum Rule<'a> {
    Automaton(&'a CompiledRule),
    Override(&'a OverrideRule),
}

impl<'a> Rule<'a> {
    pub fn replacement(&self) -> &'a str {
        match self {
            Rule::Automaton(rule) => &rule.replacement,
            Rule::Override(rule) => &rule.replacement,
        }
    }

    pub fn source_label(&self) -> &'a str {
        match self {
            Rule::Automaton(rule) => &rule.source_label,
            Rule::Override(rule) => &rule.source_label,
        }
    }

    pub fn pronunciation(&self) -> Option<&'a str> {
        match self {
            Rule::Automaton(rule) => rule.pronunciation.as_deref(),
            Rule::Override(rule) => rule.pronunciation.as_deref(),
        }
    }

    pub fn priority(&self) -> u32 {
        match self {
            Rule::Automaton(rule) => rule.priority,
            Rule::Override(rule) => rule.priority,
        }
    }
}

/// Everything a compilation depends on. Cheap to clone and `Send`, so it can
/// be handed to the rebuild worker.
#[derive(Debug, Clone, Default)]
pub struct CompileInput {
    pub entries: Arc<Vec<VocabularyEntry>>,
    /// Already folded with the same `case_sensitive` setting.
    pub blacklist: Arc<FxHashSet<String>>,
    /// Keyed by the term as the caller wrote it.
    pub overrides: Arc<FxHashMap<String, Regex>>,
    pub case_sensitive: bool,
    pub match_whole_word: bool,
}

/// The output of a compilation. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    automaton: Option<Automaton<CompiledRule>>,
    overrides: Vec<OverrideRule>,
    case_sensitive: bool,
}

impl RuleSet {
    pub fn automaton(&self) -> Option<&Automaton<CompiledRule>> {
        self.automaton.as_ref()
    }

    pub fn overrides(&self) -> &[OverrideRule] {
        &self.overrides
    }

    /// Folding the searched text must use this setting.
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn rule_count(&self) -> usize {
        self.automaton.as_ref().map_or(0, |a| a.pattern_count()) + self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.automaton.is_none() && self.overrides.is_empty()
    }
}

/// Build a rule set. Deterministic: identical input gives identical rules.
///
/// Entries are visited in ascending `priority`, ties in declaration order.
/// A term whose folded form is blacklisted, empty, or already compiled is
/// skipped.
pub fn compile(input: &CompileInput) -> RuleSet {
    let mut ordered: Vec<&VocabularyEntry> = input.entries.iter().collect();
    ordered.sort_by_key(|entry| entry.priority);

    let mut automaton = Automaton::new();
    let mut overrides = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut priority: u32 = 0;
    let mut blacklisted = 0usize;

    for entry in ordered {
        for term in entry.terms() {
            let term = term.trim();
            let segments = fold_segments(term, input.case_sensitive);
            let normalized = segments.concat();
            if normalized.is_empty() {
                continue;
            }
            if input.blacklist.contains(&normalized) {
                blacklisted += 1;
                continue;
            }
            if !seen.insert(normalized.clone()) {
                continue;
            }

            let rule_priority = priority;
            priority += 1;

            let pattern = input
                .overrides
                .get(term)
                .or_else(|| input.overrides.get(&normalized));
            if let Some(pattern) = pattern {
                overrides.push(OverrideRule {
                    original_key: term.to_string(),
                    pattern: pattern.clone(),
                    replacement: entry.target.clone(),
                    source_label: entry.source.label().to_string(),
                    pronunciation: entry.pronunciation.clone(),
                    priority: rule_priority,
                });
                continue;
            }

            automaton.add(
                segments.as_slice(),
                CompiledRule {
                    original_key: term.to_string(),
                    replacement: entry.target.clone(),
                    source_label: entry.source.label().to_string(),
                    pronunciation: entry.pronunciation.clone(),
                    priority: rule_priority,
                    pattern_len: segments.len(),
                    requires_boundary: input.match_whole_word,
                },
            );
        }
    }

    let automaton = if automaton.is_empty() {
        None
    } else {
        automaton.build();
        Some(automaton)
    };

    debug!(
        patterns = automaton.as_ref().map_or(0, |a| a.pattern_count()),
        states = automaton.as_ref().map_or(0, |a| a.state_count()),
        overrides = overrides.len(),
        blacklisted,
        "compiled vocabulary"
    );

    RuleSet {
        automaton,
        overrides,
        case_sensitive: input.case_sensitive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::normalize_term;
    use crate::vocabulary::SourceTag;

    fn input(entries: Vec<VocabularyEntry>) -> CompileInput {
        CompileInput {
            entries: Arc::new(entries),
            match_whole_word: true,
            ..CompileInput::default()
        }
    }

    fn keys(rules: &RuleSet) -> Vec<(String, u32)> {
        let automaton = rules.automaton().unwrap();
        (0..automaton.pattern_count())
            .map(|i| {
                let rule = automaton.payload(i);
                (rule.original_key.clone(), rule.priority)
            })
            .collect()
    }

    #[test]
    fn test_priorities_follow_declaration_order() {
        let rules = compile(&input(vec![
            VocabularyEntry::new(["cat", "kitty"], "猫"),
            VocabularyEntry::new(["dog"], "狗"),
        ]));
        assert_eq!(
            keys(&rules),
            vec![("cat".to_string(), 0), ("kitty".to_string(), 1), ("dog".to_string(), 2)]
        );
        assert_eq!(rules.rule_count(), 3);
    }

    #[test]
    fn test_entry_priority_reorders() {
        let rules = compile(&input(vec![
            VocabularyEntry::new(["late"], "b").with_priority(5),
            VocabularyEntry::new(["early"], "a").with_priority(-1),
        ]));
        assert_eq!(keys(&rules), vec![("early".to_string(), 0), ("late".to_string(), 1)]);
    }

    #[test]
    fn test_case_folded_duplicates_keep_first() {
        let rules = compile(&input(vec![
            VocabularyEntry::new(["Apple"], "苹果"),
            VocabularyEntry::new(["apple"], "苹果公司"),
        ]));
        let automaton = rules.automaton().unwrap();
        assert_eq!(automaton.pattern_count(), 1);
        assert_eq!(automaton.payload(0).replacement, "苹果");
    }

    #[test]
    fn test_case_sensitive_keeps_both() {
        let mut compile_input = input(vec![
            VocabularyEntry::new(["Apple"], "苹果公司"),
            VocabularyEntry::new(["apple"], "苹果"),
        ]);
        compile_input.case_sensitive = true;
        let rules = compile(&compile_input);
        assert_eq!(rules.rule_count(), 2);
        assert!(rules.case_sensitive());
    }

    #[test]
    fn test_blacklist_skips_terms() {
        let mut compile_input = input(vec![VocabularyEntry::new(["Fox", "cat"], "x")]);
        compile_input.blacklist = Arc::new([normalize_term("fox", false)].into_iter().collect());
        let rules = compile(&compile_input);
        assert_eq!(keys(&rules), vec![("cat".to_string(), 0)]);
    }

    #[test]
    fn test_all_blacklisted_yields_no_automaton() {
        let mut compile_input = input(vec![VocabularyEntry::new(["fox"], "狐狸")]);
        compile_input.blacklist = Arc::new(["fox".to_string()].into_iter().collect());
        let rules = compile(&compile_input);
        assert!(rules.is_empty());
        assert!(rules.automaton().is_none());
    }

    #[test]
    fn test_override_bypasses_automaton() {
        let mut compile_input = input(vec![
            VocabularyEntry::new(["C++"], "C加加").with_source(SourceTag::Custom),
            VocabularyEntry::new(["rust"], "铁锈"),
        ]);
        let mut overrides = FxHashMap::default();
        overrides.insert("C++".to_string(), Regex::new(r"C\+\+").unwrap());
        compile_input.overrides = Arc::new(overrides);

        let rules = compile(&compile_input);
        assert_eq!(rules.overrides().len(), 1);
        assert_eq!(rules.overrides()[0].priority, 0);
        assert_eq!(rules.overrides()[0].source_label, "custom");
        assert_eq!(keys(&rules), vec![("rust".to_string(), 1)]);
    }

    #[test]
    fn test_override_found_by_normalized_key() {
        let mut compile_input = input(vec![VocabularyEntry::new(["Go"], "围棋")]);
        let mut overrides = FxHashMap::default();
        overrides.insert("go".to_string(), Regex::new(r"\bgo\b").unwrap());
        compile_input.overrides = Arc::new(overrides);

        let rules = compile(&compile_input);
        assert_eq!(rules.overrides().len(), 1);
        assert!(rules.automaton().is_none());
    }

    #[test]
    fn test_recompile_is_idempotent() {
        let compile_input = input(vec![
            VocabularyEntry::new(["he", "she", "hers"], "x"),
            VocabularyEntry::new(["his"], "y"),
        ]);
        let a = compile(&compile_input);
        let b = compile(&compile_input);
        assert_eq!(keys(&a), keys(&b));
        assert_eq!(
            a.automaton().unwrap().state_count(),
            b.automaton().unwrap().state_count()
        );
    }

    #[test]
    fn test_rule_view() {
        let rules = compile(&input(vec![
            VocabularyEntry::new(["tea"], "茶").with_pronunciation("chá"),
        ]));
        let rule = Rule::Automaton(rules.automaton().unwrap().payload(0));
        assert_eq!(rule.replacement(), "茶");
        assert_eq!(rule.pronunciation(), Some("chá"));
        assert_eq!(rule.source_label(), "remote");
        assert_eq!(rule.priority(), 0);
    }
}
