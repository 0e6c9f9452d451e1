//! Reversible vocabulary replacement.
//!
//! Terms from a vocabulary are found in text with an Aho–Corasick automaton
//! built over grapheme clusters, resolved into non-overlapping replacements,
//! and optionally followed by numeral substitution. Replacements applied to
//! a caller's text tree are tracked so they can be undone exactly.
//!
//! ```
//! use vocab_swap::{Engine, TermTarget, Vocabulary};
//!
//! let mut engine = Engine::immediate();
//! let vocabulary: Vocabulary = [("cat", TermTarget::new("猫"))].into_iter().collect();
//! engine.set_vocabulary(&vocabulary, Vec::<String>::new());
//!
//! let result = engine.replace("the cat sat");
//! assert_eq!(result.value, "the 猫 sat");
//! assert!(result.changed);
//! ```

pub mod automaton;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod numerals;
pub mod resolver;
pub mod schedule;
pub mod segment;
pub mod tracker;
pub mod tree;
pub mod vocabulary;

#[cfg(feature = "python")]
mod python;

pub use config::{ConfigUpdate, EngineConfig, NumeralScript, PatternOverride};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use resolver::{ReplacementDetail, ReplacementResult};
pub use schedule::CompileMode;
pub use tracker::{NodeHost, ReplacementArtifact};
pub use tree::{NodeId, TextTree};
pub use vocabulary::{SourceTag, TermTarget, Vocabulary, VocabularyEntry};
