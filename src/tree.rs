//! A small arena-backed text tree.
//!
//! Nodes live in a generational arena and are addressed by [`NodeId`].
//! Removing a node frees its slot and bumps the slot's generation, so every
//! outstanding handle to it goes dead instead of dangling. This is what lets
//! the tracker hold handles without keeping units alive.

use std::fmt::Write as _;

use crate::resolver::Span;
use crate::tracker::{NodeHost, ReplacementArtifact};

/// Marker attribute set on artifact elements.
pub const MARKER_ATTR: &str = "data-vocab-swap";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Clone)]
pub struct TextTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for TextTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TextTree {
    /// An empty tree with a `body` root element.
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        tree.root = tree.create_element("body");
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// New detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
        })
    }

    /// New detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(Node {
            kind: NodeKind::Element { attrs, .. },
            ..
        }) = self.node_mut(id)
        {
            match attrs.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    /// Text of a text node. `None` for elements and dead handles.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    /// Concatenated text of `id` and all its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element { .. }) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            None => {}
        }
    }

    /// Descendant text nodes of `id`, in document order.
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.kind(current) {
                Some(NodeKind::Text(_)) => out.push(current),
                Some(NodeKind::Element { .. }) => {
                    stack.extend(self.children(current).iter().rev().copied());
                }
                None => {}
            }
        }
        out
    }

    /// Append `child` to `parent`, detaching it from wherever it was.
    /// Does nothing if either handle is dead or `parent` is a text node.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !matches!(self.kind(parent), Some(NodeKind::Element { .. })) || !self.contains(child) {
            return false;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        true
    }

    /// Take `id` out of its parent. The node stays alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|&c| c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    /// Put `new` in `old`'s place; `old` ends up detached but alive.
    pub fn replace_child(&mut self, old: NodeId, new: NodeId) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        if !self.contains(new) || old == new {
            return false;
        }
        self.detach(new);
        if let Some(node) = self.node_mut(parent) {
            if let Some(pos) = node.children.iter().position(|&c| c == old) {
                node.children[pos] = new;
            }
        }
        if let Some(node) = self.node_mut(new) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(old) {
            node.parent = None;
        }
        true
    }

    /// Detach `id` and free it with its whole subtree. Handles to any freed
    /// node go dead. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root || !self.contains(id) {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let slot = &mut self.slots[current.index as usize];
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
            }
        }
    }

    /// Number of live nodes, the root included.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    /// Render `id` as markup. Text is escaped; attributes keep insertion order.
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => escape_into(text, out, false),
            Some(NodeKind::Element { tag, attrs }) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    let _ = write!(out, " {name}=\"");
                    escape_into(value, out, true);
                    out.push('"');
                }
                out.push('>');
                for &child in self.children(id) {
                    self.write_markup(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
            None => {}
        }
    }
}

fn escape_into(text: &str, out: &mut String, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

impl NodeHost for TextTree {
    type Handle = NodeId;

    fn text(&self, unit: NodeId) -> Option<String> {
        TextTree::text(self, unit).map(str::to_string)
    }

    fn is_alive(&self, unit: NodeId) -> bool {
        self.contains(unit)
    }

    fn set_text(&mut self, unit: NodeId, text: &str) {
        if let Some(Node {
            kind: NodeKind::Text(current),
            ..
        }) = self.node_mut(unit)
        {
            current.clear();
            current.push_str(text);
        }
    }

    fn substitute(&mut self, unit: NodeId, artifact: &ReplacementArtifact) -> Option<NodeId> {
        self.parent(unit)?;

        let container = self.create_element("span");
        self.set_attr(container, MARKER_ATTR, "container");
        for span in artifact.spans() {
            let child = match span {
                Span::Text(text) => self.create_text(text),
                Span::Replaced { rendered, detail } => {
                    let term = self.create_element("span");
                    self.set_attr(term, MARKER_ATTR, "term");
                    self.set_attr(term, "data-original", &detail.original);
                    self.set_attr(term, "data-source", &detail.source_label);
                    if let Some(pronunciation) = &detail.pronunciation {
                        self.set_attr(term, "data-pronunciation", pronunciation);
                    }
                    let text = self.create_text(rendered);
                    self.append_child(term, text);
                    term
                }
            };
            self.append_child(container, child);
        }

        self.replace_child(unit, container);
        Some(container)
    }

    fn restore(&mut self, container: NodeId, unit: NodeId) -> bool {
        if !self.contains(container) {
            return false;
        }
        let reinserted = self.replace_child(container, unit);
        self.remove(container);
        reinserted
    }

    fn release(&mut self, unit: NodeId) {
        if self.parent(unit).is_none() {
            self.remove(unit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(tree: &mut TextTree, text: &str) -> (NodeId, NodeId) {
        let p = tree.create_element("p");
        let t = tree.create_text(text);
        tree.append_child(p, t);
        let root = tree.root();
        tree.append_child(root, p);
        (p, t)
    }

    #[test]
    fn test_build_and_render() {
        let mut tree = TextTree::new();
        let (p, _) = paragraph(&mut tree, "a < b & c");
        tree.set_attr(p, "title", "say \"hi\"");
        assert_eq!(
            tree.to_markup(tree.root()),
            "<body><p title=\"say &quot;hi&quot;\">a &lt; b &amp; c</p></body>"
        );
        assert_eq!(tree.text_content(tree.root()), "a < b & c");
    }

    #[test]
    fn test_remove_kills_handles() {
        let mut tree = TextTree::new();
        let (p, t) = paragraph(&mut tree, "hello");
        assert_eq!(tree.live_count(), 3);

        tree.remove(p);
        assert!(!tree.contains(p));
        assert!(!tree.contains(t));
        assert_eq!(tree.live_count(), 1);

        // Reused slot gets a fresh generation.
        let again = tree.create_text("new");
        assert!(tree.contains(again));
        assert!(!tree.contains(t));
        assert_ne!(again, t);
    }

    #[test]
    fn test_replace_child_keeps_position() {
        let mut tree = TextTree::new();
        let (_, a) = paragraph(&mut tree, "a");
        let (p2, b) = paragraph(&mut tree, "b");
        let c = tree.create_text("c");

        assert!(tree.replace_child(b, c));
        assert_eq!(tree.parent(c), Some(p2));
        assert_eq!(tree.parent(b), None);
        assert!(tree.contains(b));
        assert!(!tree.is_attached(b));
        assert_eq!(tree.text_content(tree.root()), "ac");
        assert_eq!(tree.text_nodes(tree.root()), vec![a, c]);
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut tree = TextTree::new();
        tree.remove(tree.root());
        assert!(tree.contains(tree.root()));
    }

    #[test]
    fn test_text_node_cannot_have_children() {
        let mut tree = TextTree::new();
        let t = tree.create_text("x");
        let u = tree.create_text("y");
        assert!(!tree.append_child(t, u));
    }

    #[test]
    fn test_release_only_reclaims_detached() {
        let mut tree = TextTree::new();
        let (_, t) = paragraph(&mut tree, "kept");
        tree.release(t);
        assert!(tree.contains(t));

        let loose = tree.create_text("loose");
        tree.release(loose);
        assert!(!tree.contains(loose));
    }
}
