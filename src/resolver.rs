//! Finds, filters, and orders the replacements for one piece of text.
//!
//! All candidates, from the automaton or from override expressions, are
//! placed in byte coordinates of the original text, sorted by
//! `(start asc, length desc, priority asc)`, and swept left to right with a
//! cursor. The first candidate at or after the cursor wins.

use serde::Serialize;

use crate::compiler::{Rule, RuleSet};
use crate::config::NumeralScript;
use crate::numerals;
use crate::segment::{Segmented, fold, is_word_like};

/// One applied replacement, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplacementDetail {
    pub original: String,
    pub replacement: String,
    pub source_label: String,
    pub pronunciation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplacementResult {
    pub value: String,
    pub changed: bool,
    pub matches: Vec<ReplacementDetail>,
}

impl ReplacementResult {
    pub fn unchanged(text: impl Into<String>) -> Self {
        Self {
            value: text.into(),
            changed: false,
            matches: Vec::new(),
        }
    }
}

/// A piece of resolved output: untouched text or one replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Replaced {
        /// What is shown; starts as the replacement and may gain converted numerals.
        rendered: String,
        detail: ReplacementDetail,
    },
}

impl Span {
    pub fn rendered(&self) -> &str {
        match self {
            Span::Text(text) => text,
            Span::Replaced { rendered, .. } => rendered,
        }
    }

    fn rendered_mut(&mut self) -> &mut String {
        match self {
            Span::Text(text) => text,
            Span::Replaced { rendered, .. } => rendered,
        }
    }
}

/// Output of a resolve pass, before it is flattened into a result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    spans: Vec<Span>,
    numerals_changed: bool,
}

impl Resolution {
    fn plain(text: &str) -> Self {
        let spans = if text.is_empty() {
            Vec::new()
        } else {
            vec![Span::Text(text.to_string())]
        };
        Self {
            spans,
            numerals_changed: false,
        }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn into_spans(self) -> Vec<Span> {
        self.spans
    }

    pub fn value(&self) -> String {
        self.spans.iter().map(Span::rendered).collect()
    }

    pub fn has_matches(&self) -> bool {
        self.spans.iter().any(|s| matches!(s, Span::Replaced { .. }))
    }

    pub fn details(&self) -> Vec<ReplacementDetail> {
        self.spans
            .iter()
            .filter_map(|span| match span {
                Span::Replaced { detail, .. } => Some(detail.clone()),
                Span::Text(_) => None,
            })
            .collect()
    }

    pub fn changed(&self) -> bool {
        self.numerals_changed || self.has_matches()
    }

    /// Convert digit runs found in the assembled output. Runs are located on
    /// the whole output so word boundaries across span edges count, then
    /// rewritten span by span.
    pub fn apply_numerals(&mut self, script: NumeralScript) -> bool {
        let joined = self.value();
        let runs = numerals::digit_runs(&joined);
        if runs.is_empty() {
            return false;
        }

        let mut offset = 0;
        for span in &mut self.spans {
            let len = span.rendered().len();
            let local: Vec<_> = runs
                .iter()
                .filter(|run| run.start < offset + len && run.end > offset)
                .map(|run| run.start.max(offset) - offset..run.end.min(offset + len) - offset)
                .collect();
            if !local.is_empty() {
                let converted = numerals::convert_runs(span.rendered(), &local, script);
                *span.rendered_mut() = converted;
            }
            offset += len;
        }

        self.numerals_changed = true;
        true
    }

    pub fn to_result(&self) -> ReplacementResult {
        ReplacementResult {
            value: self.value(),
            changed: self.changed(),
            matches: self.details(),
        }
    }
}

#[derive(Debug)]
struct Candidate<'r> {
    start: usize,
    end: usize,
    /// Length in chars of the matched original text.
    len: usize,
    rule: Rule<'r>,
}

/// Resolve `text` against `rules`. With no rules the text passes through.
pub fn resolve(rules: Option<&RuleSet>, text: &str) -> Resolution {
    let Some(rules) = rules.filter(|r| !r.is_empty()) else {
        return Resolution::plain(text);
    };
    if text.is_empty() {
        return Resolution::plain(text);
    }

    let mut candidates = collect_candidates(rules, text);
    candidates.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(b.len.cmp(&a.len))
            .then(a.rule.priority().cmp(&b.rule.priority()))
    });

    let mut spans = Vec::new();
    let mut cursor = 0;
    for candidate in candidates {
        if candidate.start < cursor {
            continue;
        }
        if candidate.start > cursor {
            spans.push(Span::Text(text[cursor..candidate.start].to_string()));
        }
        let replacement = candidate.rule.replacement().to_string();
        spans.push(Span::Replaced {
            rendered: replacement.clone(),
            detail: ReplacementDetail {
                original: text[candidate.start..candidate.end].to_string(),
                replacement,
                source_label: candidate.rule.source_label().to_string(),
                pronunciation: candidate.rule.pronunciation().map(str::to_string),
            },
        });
        cursor = candidate.end;
    }
    if cursor < text.len() {
        spans.push(Span::Text(text[cursor..].to_string()));
    }

    Resolution {
        spans,
        numerals_changed: false,
    }
}

fn collect_candidates<'r>(rules: &'r RuleSet, text: &str) -> Vec<Candidate<'r>> {
    let mut candidates = Vec::new();

    if let Some(automaton) = rules.automaton() {
        let segmented = Segmented::new(text);
        let folded: Vec<String> = segmented
            .iter()
            .map(|cluster| fold(cluster, rules.case_sensitive()))
            .collect();

        for hit in automaton.search(&folded) {
            let rule = automaton.payload(hit.payload);
            if rule.requires_boundary && !is_isolated(&segmented, hit.start, hit.end) {
                continue;
            }
            let start = segmented.byte_offset(hit.start);
            let end = segmented.byte_offset(hit.end);
            candidates.push(Candidate {
                start,
                end,
                len: text[start..end].chars().count(),
                rule: Rule::Automaton(rule),
            });
        }
    }

    for rule in rules.overrides() {
        for found in rule.pattern.find_iter(text) {
            if found.is_empty() {
                continue;
            }
            candidates.push(Candidate {
                start: found.start(),
                end: found.end(),
                len: found.as_str().chars().count(),
                rule: Rule::Override(rule),
            });
        }
    }

    candidates
}

/// True when neither neighbouring cluster of `start..end` is word-like.
fn is_isolated(segmented: &Segmented<'_>, start: usize, end: usize) -> bool {
    let before = start.checked_sub(1).and_then(|i| segmented.get(i));
    let after = segmented.get(end);
    !before.is_some_and(is_word_like) && !after.is_some_and(is_word_like)
}
