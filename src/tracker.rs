//! Applying resolutions to caller-owned text units, and undoing them.
//!
//! The caller's document is reached only through [`NodeHost`]. The tracker
//! keeps the original text of every unit it changed, keyed by the host's
//! copyable handle. It never owns units: a unit the host has reclaimed
//! simply stops resolving, and its record is dropped on the next prune.

use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::resolver::{Resolution, Span};

/// Smallest record count at which `replace_node` starts pruning.
const PRUNE_FLOOR: usize = 64;

/// The caller's text tree, as far as the tracker needs to see it.
pub trait NodeHost {
    type Handle: Copy + Eq + Hash + Debug;

    /// Text of `unit`, or `None` if the unit no longer exists.
    fn text(&self, unit: Self::Handle) -> Option<String>;

    /// Whether the handle still refers to a live unit.
    fn is_alive(&self, unit: Self::Handle) -> bool;

    fn set_text(&mut self, unit: Self::Handle, text: &str);

    /// Put `artifact` where `unit` sits and take `unit` out of the tree
    /// without destroying it. Returns the artifact's container, or `None`
    /// when `unit` has no position to take over.
    fn substitute(
        &mut self,
        unit: Self::Handle,
        artifact: &ReplacementArtifact,
    ) -> Option<Self::Handle>;

    /// Put `unit` back where `container` sits and discard `container`.
    /// Returns false when `container` is no longer in the tree; the
    /// container is discarded either way.
    fn restore(&mut self, container: Self::Handle, unit: Self::Handle) -> bool;

    /// The tracker has given up on a detached `unit`; the host may reclaim it.
    fn release(&mut self, unit: Self::Handle);
}

/// Plain spans interleaved with tagged replacement spans, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementArtifact {
    spans: Vec<Span>,
}

impl ReplacementArtifact {
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// The text the artifact displays.
    pub fn text(&self) -> String {
        self.spans.iter().map(Span::rendered).collect()
    }
}

impl From<Resolution> for ReplacementArtifact {
    fn from(resolution: Resolution) -> Self {
        Self {
            spans: resolution.into_spans(),
        }
    }
}

#[derive(Debug, Clone)]
struct TrackedNode<K> {
    original_text: String,
    container: Option<K>,
    /// Application order; `revert_all` undoes newest first.
    seq: u64,
}

/// Bookkeeping for every unit the engine has changed.
#[derive(Debug, Clone)]
pub struct NodeTracker<K> {
    records: FxHashMap<K, TrackedNode<K>>,
    next_seq: u64,
    prune_at: usize,
}

impl<K> Default for NodeTracker<K> {
    fn default() -> Self {
        Self {
            records: FxHashMap::default(),
            next_seq: 0,
            prune_at: PRUNE_FLOOR,
        }
    }
}

impl<K: Copy + Eq + Hash + Debug> NodeTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_tracked(&self, unit: K) -> bool {
        self.records.contains_key(&unit)
    }

    /// Apply a changed resolution to `unit`, whose current text is `original`.
    ///
    /// With replacements the unit is swapped for an artifact; numerals alone
    /// are written into the unit in place. A unit with no position in the
    /// tree also gets the new text in place.
    pub fn apply<H>(&mut self, host: &mut H, unit: K, original: String, resolution: Resolution)
    where
        H: NodeHost<Handle = K>,
    {
        let container = if resolution.has_matches() {
            let artifact = ReplacementArtifact::from(resolution);
            let container = host.substitute(unit, &artifact);
            if container.is_none() {
                trace!(?unit, "unit has no position; writing text in place");
                host.set_text(unit, &artifact.text());
            }
            container
        } else {
            host.set_text(unit, &resolution.value());
            None
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.insert(
            unit,
            TrackedNode {
                original_text: original,
                container,
                seq,
            },
        );
    }

    /// Restore `unit` if it is tracked. Returns true when a live unit got its
    /// text back. A unit whose artifact has left the tree cannot be put back
    /// in place and is released to the host afterwards. An untracked unit is
    /// a no-op.
    pub fn revert<H>(&mut self, host: &mut H, unit: K) -> bool
    where
        H: NodeHost<Handle = K>,
    {
        let Some(record) = self.records.remove(&unit) else {
            return false;
        };
        Self::restore_record(host, unit, record)
    }

    fn restore_record<H>(host: &mut H, unit: K, record: TrackedNode<K>) -> bool
    where
        H: NodeHost<Handle = K>,
    {
        if !host.is_alive(unit) {
            trace!(?unit, "unit was reclaimed before revert");
            return false;
        }

        host.set_text(unit, &record.original_text);
        if let Some(container) = record.container {
            if !host.restore(container, unit) {
                // Nowhere to put the unit back, so it is as abandoned as in `prune`.
                debug!(?unit, "artifact left the tree; releasing unit");
                host.release(unit);
            }
        }
        true
    }

    /// Restore every tracked unit, newest first, and forget them all.
    pub fn revert_all<H>(&mut self, host: &mut H)
    where
        H: NodeHost<Handle = K>,
    {
        let mut records: Vec<(K, TrackedNode<K>)> = self.records.drain().collect();
        records.sort_by(|a, b| b.1.seq.cmp(&a.1.seq));

        let total = records.len();
        let mut restored = 0usize;
        for (unit, record) in records {
            if Self::restore_record(host, unit, record) {
                restored += 1;
            }
        }

        self.prune_at = PRUNE_FLOOR;
        debug!(total, restored, "reverted all tracked units");
    }

    /// Drop records whose unit is gone, and give up units whose artifact was
    /// discarded by the caller. Returns the number of records dropped.
    pub fn prune<H>(&mut self, host: &mut H) -> usize
    where
        H: NodeHost<Handle = K>,
    {
        let before = self.records.len();
        let mut abandoned = Vec::new();
        self.records.retain(|&unit, record| {
            if !host.is_alive(unit) {
                return false;
            }
            match record.container {
                Some(container) if !host.is_alive(container) => {
                    abandoned.push(unit);
                    false
                }
                _ => true,
            }
        });
        for unit in abandoned {
            host.release(unit);
        }

        let dropped = before - self.records.len();
        if dropped > 0 {
            debug!(dropped, remaining = self.records.len(), "pruned tracked units");
        }
        dropped
    }

    /// Prune once the record count has doubled since the last prune.
    pub fn maybe_prune<H>(&mut self, host: &mut H)
    where
        H: NodeHost<Handle = K>,
    {
        if self.records.len() < self.prune_at {
            return;
        }
        self.prune(host);
        self.prune_at = (self.records.len() * 2).max(PRUNE_FLOOR);
    }
}
