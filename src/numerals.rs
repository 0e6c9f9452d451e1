//! Decimal digit runs rewritten in a target script.

use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::NumeralScript;

lazy_static! {
    // A maximal run of ASCII digits with no word character on either side.
    static ref DIGIT_RUN: Regex = Regex::new(r"\b[0-9]+\b").unwrap();
}

/// Byte ranges of every convertible digit run in `text`.
pub fn digit_runs(text: &str) -> Vec<Range<usize>> {
    DIGIT_RUN.find_iter(text).map(|m| m.range()).collect()
}

/// Rewrite the ASCII digits inside `runs`. Ranges must lie on ASCII digits,
/// as produced by [`digit_runs`].
pub fn convert_runs(text: &str, runs: &[Range<usize>], script: NumeralScript) -> String {
    let digits = script.digits();
    let mut out = String::with_capacity(text.len() * 2);
    let mut last = 0;
    for run in runs {
        out.push_str(&text[last..run.start]);
        for b in text[run.clone()].bytes() {
            out.push(digits[(b - b'0') as usize]);
        }
        last = run.end;
    }
    out.push_str(&text[last..]);
    out
}
