//! Aho-Corasick automaton over grapheme segments.
//!
//! Patterns and text are sequences of string segments (grapheme clusters in
//! practice). Segments are interned to dense symbols when patterns are
//! added, so a text segment that no pattern contains sends the search back
//! to the root without touching the trie.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
struct State {
    next: FxHashMap<u32, usize>,
    fail: usize,
    /// Payloads ending exactly at this state.
    own: Vec<usize>,
    /// `own` plus everything reachable along the failure chain. Filled by `build`.
    outputs: Vec<usize>,
}

/// One hit reported by [`Automaton::search`], in segment indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMatch {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    pub payload: usize,
}

/// Multi-pattern matcher: trie + failure links + output sets.
#[derive(Debug, Clone)]
pub struct Automaton<P> {
    symbols: FxHashMap<String, u32>,
    states: Vec<State>,
    payloads: Vec<P>,
    /// Pattern length in segments, indexed like `payloads`.
    lengths: Vec<usize>,
    built: bool,
}

impl<P> Default for Automaton<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Automaton<P> {
    pub fn new() -> Self {
        Self {
            symbols: FxHashMap::default(),
            states: vec![State::default()],
            payloads: Vec::new(),
            lengths: Vec::new(),
            built: false,
        }
    }

    /// Insert `pattern` and attach `payload` to its terminal state.
    ///
    /// Returns the payload id, or `None` for an empty pattern (which is
    /// ignored). Identical patterns are not merged; callers de-duplicate.
    pub fn add<S: AsRef<str>>(&mut self, pattern: &[S], payload: P) -> Option<usize> {
        if pattern.is_empty() {
            return None;
        }
        let mut state = ROOT;
        for segment in pattern {
            let symbol = self.intern(segment.as_ref());
            state = match self.states[state].next.get(&symbol) {
                Some(&next) => next,
                None => {
                    let next = self.states.len();
                    self.states.push(State::default());
                    self.states[state].next.insert(symbol, next);
                    next
                }
            };
        }
        let id = self.payloads.len();
        self.payloads.push(payload);
        self.lengths.push(pattern.len());
        self.states[state].own.push(id);
        self.built = false;
        Some(id)
    }

    fn intern(&mut self, segment: &str) -> u32 {
        if let Some(&symbol) = self.symbols.get(segment) {
            return symbol;
        }
        let symbol = self.symbols.len() as u32;
        self.symbols.insert(segment.to_string(), symbol);
        symbol
    }

    /// Compute failure links and propagate outputs, breadth first from the
    /// depth-1 states. Safe to call again after more `add`s.
    pub fn build(&mut self) {
        for state in &mut self.states {
            state.outputs = state.own.clone();
            state.fail = ROOT;
        }

        let mut queue: VecDeque<usize> = self.states[ROOT].next.values().copied().collect();
        while let Some(parent) = queue.pop_front() {
            let edges: Vec<(u32, usize)> = self.states[parent]
                .next
                .iter()
                .map(|(&symbol, &child)| (symbol, child))
                .collect();

            for (symbol, child) in edges {
                queue.push_back(child);

                let mut candidate = self.states[parent].fail;
                let fail = loop {
                    if let Some(&next) = self.states[candidate].next.get(&symbol) {
                        break next;
                    }
                    if candidate == ROOT {
                        break ROOT;
                    }
                    candidate = self.states[candidate].fail;
                };

                self.states[child].fail = fail;
                let inherited = self.states[fail].outputs.clone();
                self.states[child].outputs.extend(inherited);
            }
        }

        self.built = true;
    }

    /// Report every pattern occurrence in `segments`, ordered by end position.
    ///
    /// An automaton that has not been built reports nothing.
    pub fn search<I, S>(&self, segments: I) -> Vec<RawMatch>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matches = Vec::new();
        if !self.built || self.payloads.is_empty() {
            return matches;
        }

        let mut state = ROOT;
        for (pos, segment) in segments.into_iter().enumerate() {
            let Some(&symbol) = self.symbols.get(segment.as_ref()) else {
                state = ROOT;
                continue;
            };
            loop {
                if let Some(&next) = self.states[state].next.get(&symbol) {
                    state = next;
                    break;
                }
                if state == ROOT {
                    break;
                }
                state = self.states[state].fail;
            }
            for &payload in &self.states[state].outputs {
                let len = self.lengths[payload];
                matches.push(RawMatch {
                    start: pos + 1 - len,
                    end: pos + 1,
                    payload,
                });
            }
        }
        matches
    }

    pub fn payload(&self, id: usize) -> &P {
        &self.payloads[id]
    }

    pub fn pattern_len(&self, id: usize) -> usize {
        self.lengths[id]
    }

    pub fn pattern_count(&self) -> usize {
        self.payloads.len()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}
