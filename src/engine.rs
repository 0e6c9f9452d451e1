//! The public entry points.
//!
//! An [`Engine`] owns the active configuration, a private copy of the
//! vocabulary, the compiled rules, and the bookkeeping for units it has
//! changed. It is confined to one thread; only rule compilation may run on
//! the rebuild worker.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::compiler::{CompileInput, RuleSet};
use crate::config::{ConfigUpdate, EngineConfig, PatternOverride};
use crate::resolver::{Resolution, ReplacementResult, resolve};
use crate::schedule::{CompileMode, RebuildScheduler};
use crate::segment::normalize_term;
use crate::tracker::{NodeHost, NodeTracker};
use crate::tree::NodeId;
use crate::vocabulary::{Vocabulary, VocabularyEntry};

pub struct Engine<K = NodeId> {
    config: EngineConfig,
    entries: Arc<Vec<VocabularyEntry>>,
    blacklist: Vec<String>,
    normalized_blacklist: Arc<FxHashSet<String>>,
    overrides: Arc<FxHashMap<String, Regex>>,
    scheduler: RebuildScheduler,
    rules: RefCell<Option<Arc<RuleSet>>>,
    installed: Cell<u64>,
    tracker: NodeTracker<K>,
}

impl Engine<NodeId> {
    /// An engine with default configuration and deferred recompilation.
    pub fn new() -> Self {
        Self::with_mode(CompileMode::default())
    }

    /// An engine that compiles synchronously on every update. Suited to
    /// batch tooling and tests.
    pub fn immediate() -> Self {
        Self::with_mode(CompileMode::Immediate)
    }
}

impl Default for Engine<NodeId> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + Hash + Debug> Engine<K> {
    pub fn with_mode(mode: CompileMode) -> Self {
        Self {
            config: EngineConfig::default(),
            entries: Arc::new(Vec::new()),
            blacklist: Vec::new(),
            normalized_blacklist: Arc::new(FxHashSet::default()),
            overrides: Arc::new(FxHashMap::default()),
            scheduler: RebuildScheduler::new(mode),
            rules: RefCell::new(None),
            installed: Cell::new(0),
            tracker: NodeTracker::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the active vocabulary with a term → target mapping.
    pub fn set_vocabulary<I, S>(&mut self, vocabulary: &Vocabulary, blacklist: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_from_entries(vocabulary.to_entries(), blacklist);
    }

    /// Replace the active vocabulary with grouped entries.
    pub fn set_from_entries<I, S>(&mut self, entries: Vec<VocabularyEntry>, blacklist: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries = Arc::new(entries.into_iter().filter(|e| !e.is_empty()).collect());
        self.blacklist = blacklist.into_iter().map(Into::into).collect();
        self.normalize_blacklist();
        debug!(
            entries = self.entries.len(),
            blacklist = self.blacklist.len(),
            "vocabulary replaced"
        );
        self.schedule_rebuild();
    }

    /// Merge a partial configuration. The blacklist is renormalized right
    /// away; a rebuild is scheduled if compiled rules depend on what changed.
    pub fn update_config(&mut self, update: ConfigUpdate) {
        let changes = self.config.merge(update);
        if changes.case_sensitivity {
            self.normalize_blacklist();
        }
        if changes.overrides {
            self.overrides = Arc::new(compile_overrides(&self.config.pattern_overrides));
        }
        if changes.rules {
            self.schedule_rebuild();
        }
    }

    fn normalize_blacklist(&mut self) {
        let case_sensitive = self.config.case_sensitive;
        self.normalized_blacklist = Arc::new(
            self.blacklist
                .iter()
                .map(|term| normalize_term(term, case_sensitive))
                .filter(|term| !term.is_empty())
                .collect(),
        );
    }

    fn schedule_rebuild(&mut self) {
        let input = CompileInput {
            entries: Arc::clone(&self.entries),
            blacklist: Arc::clone(&self.normalized_blacklist),
            overrides: Arc::clone(&self.overrides),
            case_sensitive: self.config.case_sensitive,
            match_whole_word: self.config.match_whole_word,
        };
        self.scheduler.schedule(input);
    }

    /// Install the newest finished compilation, if any.
    fn sync_rules(&self) -> Option<Arc<RuleSet>> {
        if let Some(compiled) = self.scheduler.take_ready() {
            if compiled.generation > self.installed.get() {
                debug!(
                    generation = compiled.generation,
                    rules = compiled.rules.rule_count(),
                    "installed rules"
                );
                self.installed.set(compiled.generation);
                *self.rules.borrow_mut() = Some(compiled.rules);
            }
        }
        self.rules.borrow().clone()
    }

    /// Block until every scheduled rebuild has finished and is installed.
    pub fn flush(&self) {
        self.scheduler.flush();
        self.sync_rules();
    }

    /// Whether a scheduled rebuild has not been installed yet.
    pub fn is_rebuild_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Number of rules in the installed rule set.
    pub fn rule_count(&self) -> usize {
        self.sync_rules().map_or(0, |rules| rules.rule_count())
    }

    fn resolve_text(&self, text: &str) -> Resolution {
        let rules = self.sync_rules();
        let mut resolution = resolve(rules.as_deref(), text);
        if self.config.numbers_replacement {
            resolution.apply_numerals(self.config.numeral_script);
        }
        resolution
    }

    /// Replace terms in `text`. Never fails and leaves no trace in the engine.
    pub fn replace(&self, text: &str) -> ReplacementResult {
        self.resolve_text(text).to_result()
    }

    /// Replace terms in one caller-owned unit and remember how to undo it.
    ///
    /// A unit that is already tracked is first restored, so repeated calls
    /// always start from the original text.
    pub fn replace_node<H>(&mut self, host: &mut H, unit: K) -> ReplacementResult
    where
        H: NodeHost<Handle = K>,
    {
        self.tracker.revert(host, unit);
        self.tracker.maybe_prune(host);

        let Some(original) = host.text(unit) else {
            return ReplacementResult::default();
        };
        let resolution = self.resolve_text(&original);
        let result = resolution.to_result();
        if result.changed {
            self.tracker.apply(host, unit, original, resolution);
        }
        result
    }

    /// Restore one unit. Returns true if it was tracked and restored.
    pub fn revert_node<H>(&mut self, host: &mut H, unit: K) -> bool
    where
        H: NodeHost<Handle = K>,
    {
        self.tracker.revert(host, unit)
    }

    /// Restore every tracked unit and clear all bookkeeping.
    pub fn revert_all<H>(&mut self, host: &mut H)
    where
        H: NodeHost<Handle = K>,
    {
        self.tracker.revert_all(host);
    }

    /// Drop bookkeeping for units the host has reclaimed.
    pub fn prune<H>(&mut self, host: &mut H) -> usize
    where
        H: NodeHost<Handle = K>,
    {
        self.tracker.prune(host)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_tracked(&self, unit: K) -> bool {
        self.tracker.is_tracked(unit)
    }
}

/// Compile every override, dropping the ones that fail.
fn compile_overrides(overrides: &BTreeMap<String, PatternOverride>) -> FxHashMap<String, Regex> {
    let mut compiled = FxHashMap::default();
    for (term, pattern) in overrides {
        match pattern.compile(term) {
            Ok(regex) => {
                compiled.insert(term.trim().to_string(), regex);
            }
            Err(err) => warn!(%err, "dropping pattern override"),
        }
    }
    compiled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::TermTarget;

    #[test]
    fn test_invalid_override_dropped() {
        let mut overrides = BTreeMap::new();
        overrides.insert("ok".to_string(), PatternOverride::new("o+k"));
        overrides.insert("bad".to_string(), PatternOverride::new("(unclosed"));
        overrides.insert("flag".to_string(), PatternOverride::new("f").with_flags("z"));

        let compiled = compile_overrides(&overrides);
        assert_eq!(compiled.len(), 1);
        assert!(compiled["ok"].is_match("ooook"));
    }

    #[test]
    fn test_update_renormalizes_blacklist() {
        let mut engine = Engine::immediate();
        let vocab: Vocabulary = [("Fox", TermTarget::new("狐狸"))].into_iter().collect();
        engine.set_vocabulary(&vocab, ["FOX"]);
        assert!(engine.normalized_blacklist.contains("fox"));
        assert_eq!(engine.rule_count(), 0);

        engine.update_config(ConfigUpdate::new().case_sensitive(true));
        assert!(engine.normalized_blacklist.contains("FOX"));
        assert_eq!(engine.rule_count(), 1);
    }

    #[test]
    fn test_numeral_only_update_does_not_rebuild() {
        let mut engine = Engine::immediate();
        engine.set_vocabulary(&Vocabulary::new(), Vec::<String>::new());
        let installed = {
            engine.flush();
            engine.installed.get()
        };
        engine.update_config(ConfigUpdate::new().numbers_replacement(true));
        engine.flush();
        assert_eq!(engine.installed.get(), installed);
    }
}
