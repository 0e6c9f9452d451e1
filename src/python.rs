use std::fs;
use std::path::Path;

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

use crate::config::ConfigUpdate;
use crate::engine::Engine;
use crate::resolver::ReplacementResult;
use crate::tree::TextTree;
use crate::vocabulary::{TermTarget, Vocabulary};

/// One applied replacement as seen from Python
#[pyclass(name = "Match")]
#[derive(Clone)]
struct PyMatch {
    #[pyo3(get)]
    original: String,
    #[pyo3(get)]
    replacement: String,
    #[pyo3(get)]
    source: String,
    #[pyo3(get)]
    pronunciation: Option<String>,
}

/// Result of one replacement call
#[pyclass(name = "Replacement")]
#[derive(Clone)]
struct PyReplacement {
    #[pyo3(get)]
    value: String,
    #[pyo3(get)]
    changed: bool,
    #[pyo3(get)]
    matches: Vec<PyMatch>,
}

impl From<ReplacementResult> for PyReplacement {
    fn from(result: ReplacementResult) -> Self {
        Self {
            value: result.value,
            changed: result.changed,
            matches: result
                .matches
                .into_iter()
                .map(|m| PyMatch {
                    original: m.original,
                    replacement: m.replacement,
                    source: m.source_label,
                    pronunciation: m.pronunciation,
                })
                .collect(),
        }
    }
}

/// Vocabulary engine. Rebuilds compile inline so every call sees the latest rules.
#[pyclass(name = "Engine", unsendable)]
struct PyEngine {
    inner: Engine,
}

#[pymethods]
impl PyEngine {
    #[new]
    #[pyo3(signature = (case_sensitive=false, match_whole_word=true, numbers_replacement=false))]
    fn new(case_sensitive: bool, match_whole_word: bool, numbers_replacement: bool) -> Self {
        let mut inner = Engine::immediate();
        inner.update_config(
            ConfigUpdate::new()
                .case_sensitive(case_sensitive)
                .match_whole_word(match_whole_word)
                .numbers_replacement(numbers_replacement),
        );
        Self { inner }
    }

    /// Entries are (term, target, pronunciation) tuples
    #[pyo3(signature = (entries, blacklist=Vec::new()))]
    fn set_vocabulary(&mut self, entries: Vec<(String, String, Option<String>)>, blacklist: Vec<String>) {
        let vocabulary: Vocabulary = entries
            .into_iter()
            .map(|(term, target, pronunciation)| {
                let mut target = TermTarget::new(target);
                if let Some(pronunciation) = pronunciation {
                    target = target.with_pronunciation(pronunciation);
                }
                (term, target)
            })
            .collect();
        self.inner.set_vocabulary(&vocabulary, blacklist);
    }

    /// Load a vocabulary from a JSON object of term -> target
    #[pyo3(signature = (json, blacklist=Vec::new()))]
    fn set_vocabulary_json(&mut self, json: &str, blacklist: Vec<String>) -> PyResult<()> {
        let vocabulary = Vocabulary::from_json(json).map_err(|e| PyValueError::new_err(e.to_string()))?;
        self.inner.set_vocabulary(&vocabulary, blacklist);
        Ok(())
    }

    /// Merge a partial JSON configuration
    fn update_config(&mut self, json: &str) -> PyResult<()> {
        let update = ConfigUpdate::from_json(json).map_err(|e| PyValueError::new_err(e.to_string()))?;
        self.inner.update_config(update);
        Ok(())
    }

    fn replace(&self, text: &str) -> PyReplacement {
        self.inner.replace(text).into()
    }

    /// Replace terms in a file, reading and writing entirely in Rust
    /// Returns: (was_modified, match_count, bytes_read)
    fn replace_file(&self, input_path: String, output_path: String) -> PyResult<(bool, u64, u64)> {
        let content = fs::read_to_string(&input_path)
            .map_err(|e| PyIOError::new_err(format!("Failed to read {}: {}", input_path, e)))?;
        let bytes_read = content.len() as u64;

        let result = self.inner.replace(&content);

        let out_path = Path::new(&output_path);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PyIOError::new_err(format!("Failed to create directory: {}", e)))?;
        }
        fs::write(out_path, &result.value)
            .map_err(|e| PyIOError::new_err(format!("Failed to write {}: {}", output_path, e)))?;

        Ok((result.changed, result.matches.len() as u64, bytes_read))
    }

    fn tracked_count(&self) -> usize {
        self.inner.tracked_count()
    }
}

/// A small text tree whose paragraphs the engine can rewrite and restore
#[pyclass(name = "Document", unsendable)]
struct PyDocument {
    tree: TextTree,
}

#[pymethods]
impl PyDocument {
    #[new]
    fn new() -> Self {
        Self {
            tree: TextTree::new(),
        }
    }

    fn add_paragraph(&mut self, text: &str) {
        let paragraph = self.tree.create_element("p");
        let node = self.tree.create_text(text);
        self.tree.append_child(paragraph, node);
        let root = self.tree.root();
        self.tree.append_child(root, paragraph);
    }

    /// Restore previous replacements, then rewrite every text node.
    /// Returns the number of nodes changed.
    fn replace_all_text(&mut self, mut engine: PyRefMut<'_, PyEngine>) -> usize {
        engine.inner.revert_all(&mut self.tree);
        let nodes = self.tree.text_nodes(self.tree.root());
        nodes
            .into_iter()
            .filter(|&node| engine.inner.replace_node(&mut self.tree, node).changed)
            .count()
    }

    fn revert_all(&mut self, mut engine: PyRefMut<'_, PyEngine>) {
        engine.inner.revert_all(&mut self.tree);
    }

    fn markup(&self) -> String {
        self.tree.to_markup(self.tree.root())
    }

    fn text_content(&self) -> String {
        self.tree.text_content(self.tree.root())
    }
}

#[pymodule]
fn vocab_swap(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyEngine>()?;
    m.add_class::<PyDocument>()?;
    m.add_class::<PyReplacement>()?;
    m.add_class::<PyMatch>()?;
    Ok(())
}
