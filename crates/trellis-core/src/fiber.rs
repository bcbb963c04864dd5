//! The node arena
//!
//! Nodes of both tree generations live in one [`FiberTree`] arena and refer to
//! each other by [`NodeKey`]. Structure uses three links (parent, first child,
//! next sibling) plus `alternate`, the node at the same logical position in the
//! other generation. All walks over the arena are iterative.

use crate::element::{Component, Element, ElementKind, OffscreenMode};
use crate::hooks::{HookSlot, PendingEffect};
use crate::{EffectTag, Props, Value};
use serde::Serialize;
use slotmap::SlotMap;
use std::fmt;
use std::ops::{Index, IndexMut};

slotmap::new_key_type! {
    /// Key of a node in the arena
    pub struct NodeKey;
}

/// A message queued in an actor's inbox
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Sender id
    pub from: String,
    /// Payload
    pub message: Value,
}

/// Closed set of node kinds, fixed at construction
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    Host(String),
    Component(Component),
    Offscreen(OffscreenMode),
    Suspense { fallback: Vec<Element> },
    Portal(String),
    Island,
}

impl NodeKind {
    /// Host tag, if this is a host node
    pub fn host_tag(&self) -> Option<&str> {
        match self {
            NodeKind::Host(tag) => Some(tag),
            _ => None,
        }
    }

    /// Check if this is a host node
    pub fn is_host(&self) -> bool {
        matches!(self, NodeKind::Host(_))
    }

    /// Check if this is a suspense boundary
    pub fn is_boundary(&self) -> bool {
        matches!(self, NodeKind::Suspense { .. })
    }

    /// Whether a node of this kind can be reused for `kind`
    pub fn same_type(&self, kind: &ElementKind) -> bool {
        match (self, kind) {
            (NodeKind::Host(a), ElementKind::Host(b)) => a == b,
            (NodeKind::Component(a), ElementKind::Component(b)) => a == b,
            (NodeKind::Offscreen(_), ElementKind::Offscreen(_)) => true,
            (NodeKind::Suspense { .. }, ElementKind::Suspense { .. }) => true,
            (NodeKind::Portal(a), ElementKind::Portal(b)) => a == b,
            (NodeKind::Island, ElementKind::Island) => true,
            _ => false,
        }
    }

    /// Short label for logs and error details
    pub fn label(&self) -> String {
        match self {
            NodeKind::Root => "root".to_string(),
            NodeKind::Host(tag) => tag.clone(),
            NodeKind::Component(c) => format!("<{}>", c.name()),
            NodeKind::Offscreen(_) => "offscreen".to_string(),
            NodeKind::Suspense { .. } => "suspense".to_string(),
            NodeKind::Portal(container) => format!("portal:{}", container),
            NodeKind::Island => "island".to_string(),
        }
    }
}

impl From<&ElementKind> for NodeKind {
    fn from(kind: &ElementKind) -> Self {
        match kind {
            ElementKind::Host(tag) => NodeKind::Host(tag.clone()),
            ElementKind::Component(c) => NodeKind::Component(*c),
            ElementKind::Offscreen(mode) => NodeKind::Offscreen(*mode),
            ElementKind::Suspense { fallback } => NodeKind::Suspense {
                fallback: fallback.clone(),
            },
            ElementKind::Portal(container) => NodeKind::Portal(container.clone()),
            ElementKind::Island => NodeKind::Island,
        }
    }
}

/// One instance of a component or host element
pub struct Node {
    pub kind: NodeKind,
    pub key: Option<String>,
    /// Props for this generation
    pub props: Props,
    /// Child descriptions to reconcile under this node
    pub pending_children: Vec<Element>,
    pub parent: Option<NodeKey>,
    pub child: Option<NodeKey>,
    pub sibling: Option<NodeKey>,
    /// Position among its siblings
    pub index: usize,
    pub alternate: Option<NodeKey>,
    pub effect: EffectTag,
    pub hooks: Vec<HookSlot>,
    pub is_hidden: bool,
    pub is_in_island: bool,
    /// Suspense boundaries only: currently rendering the fallback
    pub showing_fallback: bool,
    /// Effects to run after commit
    pub update_queue: Vec<PendingEffect>,
    /// Actor inbox; present only on registered nodes
    pub message_queue: Option<Vec<Envelope>>,
}

impl Node {
    /// Create a node for an element description
    pub fn from_element(element: &Element) -> Self {
        let mut node = Self::new(NodeKind::from(&element.kind));
        node.key = element.key.clone();
        node.props = element.props.clone();
        node.pending_children = element.children.clone();
        node
    }

    /// Create a root node
    pub fn root(children: Vec<Element>) -> Self {
        let mut node = Self::new(NodeKind::Root);
        node.pending_children = children;
        node
    }

    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            key: None,
            props: Props::new(),
            pending_children: Vec::new(),
            parent: None,
            child: None,
            sibling: None,
            index: 0,
            alternate: None,
            effect: EffectTag::empty(),
            hooks: Vec::new(),
            is_hidden: false,
            is_in_island: false,
            showing_fallback: false,
            update_queue: Vec::new(),
            message_queue: None,
        }
    }

    /// Whether this node is an offscreen container in hidden mode
    pub fn hides_children(&self) -> bool {
        matches!(self.kind, NodeKind::Offscreen(OffscreenMode::Hidden))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind.label())
            .field("key", &self.key)
            .field("effect", &self.effect)
            .field("hidden", &self.is_hidden)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Arena holding both tree generations
#[derive(Debug, Default)]
pub struct FiberTree {
    nodes: SlotMap<NodeKey, Node>,
    current: Option<NodeKey>,
}

impl FiberTree {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node
    pub fn insert(&mut self, node: Node) -> NodeKey {
        self.nodes.insert(node)
    }

    /// Remove a single node
    pub fn remove(&mut self, key: NodeKey) -> Option<Node> {
        self.nodes.remove(key)
    }

    /// Get a node
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Get a node mutably
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Check if a node is in the arena
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of nodes across both generations
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root of the committed tree
    pub fn current(&self) -> Option<NodeKey> {
        self.current
    }

    /// Make `root` the committed tree
    pub fn set_current(&mut self, root: Option<NodeKey>) {
        self.current = root;
    }

    /// Children of `key` in sibling order
    pub fn children(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut next = self.get(key).and_then(|n| n.child);
        while let Some(child) = next {
            out.push(child);
            next = self.get(child).and_then(|n| n.sibling);
        }
        out
    }

    /// Attach `children` under `parent`, replacing its child chain
    pub fn link_children(&mut self, parent: NodeKey, children: &[NodeKey]) {
        for (i, &child) in children.iter().enumerate() {
            let sibling = children.get(i + 1).copied();
            if let Some(node) = self.get_mut(child) {
                node.parent = Some(parent);
                node.sibling = sibling;
                node.index = i;
            }
        }
        if let Some(node) = self.get_mut(parent) {
            node.child = children.first().copied();
        }
    }

    /// Replace `old` with `new` in the child chain of `old`'s parent
    pub fn replace_child(&mut self, old: NodeKey, new: NodeKey) {
        let Some(parent) = self.get(old).and_then(|n| n.parent) else {
            return;
        };
        let siblings: Vec<NodeKey> = self
            .children(parent)
            .into_iter()
            .map(|k| if k == old { new } else { k })
            .collect();
        self.link_children(parent, &siblings);
    }

    /// Every node under `root` (inclusive) in depth-first document order
    pub fn preorder(&self, root: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            if !self.contains(key) {
                continue;
            }
            out.push(key);
            let children = self.children(key);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Whether `key` lies under `ancestor` (inclusive)
    pub fn is_descendant(&self, key: NodeKey, ancestor: NodeKey) -> bool {
        let mut next = Some(key);
        while let Some(k) = next {
            if k == ancestor {
                return true;
            }
            next = self.get(k).and_then(|n| n.parent);
        }
        false
    }

    /// Nearest ancestor of `key` (exclusive) satisfying `pred`
    pub fn find_ancestor(&self, key: NodeKey, pred: impl Fn(&Node) -> bool) -> Option<NodeKey> {
        let mut next = self.get(key).and_then(|n| n.parent);
        while let Some(k) = next {
            let node = self.get(k)?;
            if pred(node) {
                return Some(k);
            }
            next = node.parent;
        }
        None
    }

    /// Sibling indices from `ancestor` down to `key`
    pub fn index_path(&self, key: NodeKey, ancestor: NodeKey) -> Vec<usize> {
        let mut path = Vec::new();
        let mut next = Some(key);
        while let Some(k) = next {
            if k == ancestor {
                break;
            }
            let Some(node) = self.get(k) else { break };
            path.push(node.index);
            next = node.parent;
        }
        path.reverse();
        path
    }

    /// Remove the subtree under `root` together with the alternates of its nodes
    ///
    /// Returns the removed nodes in document order so callers can run cleanups.
    pub fn remove_subtree(&mut self, root: NodeKey) -> Vec<Node> {
        let keys = self.preorder(root);
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(node) = self.remove(key) {
                if let Some(alt) = node.alternate {
                    if let Some(alt_node) = self.get(alt) {
                        // Keep an alternate that is still part of a live chain
                        if alt_node.alternate == Some(key) {
                            self.remove(alt);
                        }
                    }
                }
                removed.push(node);
            }
        }
        removed
    }

    /// Iterate every node in the arena
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.nodes.iter()
    }

    /// Keep only nodes for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(NodeKey, &mut Node) -> bool) {
        self.nodes.retain(|k, n| keep(k, n));
    }
}

impl Index<NodeKey> for FiberTree {
    type Output = Node;

    fn index(&self, key: NodeKey) -> &Node {
        &self.nodes[key]
    }
}

impl IndexMut<NodeKey> for FiberTree {
    fn index_mut(&mut self, key: NodeKey) -> &mut Node {
        &mut self.nodes[key]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (FiberTree, NodeKey, Vec<NodeKey>) {
        let mut tree = FiberTree::new();
        let root = tree.insert(Node::root(Vec::new()));
        let a = tree.insert(Node::from_element(&Element::host("a")));
        let b = tree.insert(Node::from_element(&Element::host("b")));
        let c = tree.insert(Node::from_element(&Element::host("c")));
        tree.link_children(root, &[a, b]);
        tree.link_children(a, &[c]);
        (tree, root, vec![a, b, c])
    }

    #[test]
    fn test_link_and_children() {
        let (tree, root, keys) = sample();
        assert_eq!(tree.children(root), vec![keys[0], keys[1]]);
        assert_eq!(tree[keys[1]].index, 1);
        assert_eq!(tree[keys[2]].parent, Some(keys[0]));
    }

    #[test]
    fn test_preorder_is_document_order() {
        let (tree, root, keys) = sample();
        assert_eq!(tree.preorder(root), vec![root, keys[0], keys[2], keys[1]]);
    }

    #[test]
    fn test_index_path_and_ancestry() {
        let (tree, root, keys) = sample();
        assert_eq!(tree.index_path(keys[2], root), vec![0, 0]);
        assert!(tree.is_descendant(keys[2], keys[0]));
        assert!(!tree.is_descendant(keys[2], keys[1]));
        let found = tree.find_ancestor(keys[2], |n| matches!(n.kind, NodeKind::Root));
        assert_eq!(found, Some(root));
    }

    #[test]
    fn test_replace_child_keeps_position() {
        let (mut tree, root, keys) = sample();
        let d = tree.insert(Node::from_element(&Element::host("d")));
        tree.replace_child(keys[0], d);
        assert_eq!(tree.children(root), vec![d, keys[1]]);
        assert_eq!(tree[d].index, 0);
    }

    #[test]
    fn test_remove_subtree_takes_alternates() {
        let (mut tree, _, keys) = sample();
        let old = tree.insert(Node::from_element(&Element::host("c")));
        tree[old].alternate = Some(keys[2]);
        tree[keys[2]].alternate = Some(old);

        let removed = tree.remove_subtree(keys[0]);
        assert_eq!(removed.len(), 2);
        assert!(!tree.contains(old));
        assert!(tree.contains(keys[1]));
    }

    #[test]
    fn test_deep_tree_walks_without_recursion() {
        let mut tree = FiberTree::new();
        let root = tree.insert(Node::root(Vec::new()));
        let mut parent = root;
        for _ in 0..50_000 {
            let child = tree.insert(Node::from_element(&Element::host("div")));
            tree.link_children(parent, &[child]);
            parent = child;
        }
        assert_eq!(tree.preorder(root).len(), 50_001);
        assert_eq!(tree.index_path(parent, root).len(), 50_000);
    }
}
