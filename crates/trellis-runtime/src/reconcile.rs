//! Reconciler
//!
//! A pass builds a work-in-progress tree next to the committed one, one unit
//! of work at a time. Each unit renders one node and reconciles its new child
//! descriptions against the children of the node's alternate:
//!
//! - the old child at the same index is reused when the type and key match
//! - an unmatched old child is recorded for deletion
//! - a new node is tagged for placement (or hydration)
//! - a reused host node with different props is tagged for update
//!
//! Visibility and island membership flow down from the parent.

use crate::actor::ActorRegistry;
use crate::commit::Deletion;
use crate::error::{Error, Result};
use crate::hydration::PassMode;
use crate::listeners::{rewrite_handlers, ListenerMap};
use crate::suspense::SuspendedEntry;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};
use trellis_core::{
    Component, EffectTag, Element, ErrorCode, FiberTree, Node, NodeKey, NodeKind, RenderCache,
    RenderCx, RenderOutcome, RenderSignal, Strategy,
};

/// An in-flight render pass
#[derive(Debug)]
pub(crate) struct Pass {
    /// Root of the work: the root node, or a boundary for a partial pass
    pub root: NodeKey,
    /// Committed node the work replaces in a partial pass
    pub replaces: Option<NodeKey>,
    /// Next unit of work
    pub next: Option<NodeKey>,
    pub mode: PassMode,
    pub transition_id: Option<String>,
    /// Deletion-list length when each boundary began
    pub boundary_marks: HashMap<NodeKey, usize>,
}

/// All state of one runtime instance apart from its port and request queue
#[derive(Debug)]
pub struct RenderContext {
    pub(crate) tree: FiberTree,
    pub(crate) pass: Option<Pass>,
    /// Nodes allocated by the in-flight pass
    pub(crate) created: Vec<NodeKey>,
    pub(crate) deletions: Vec<Deletion>,
    pub(crate) suspended: HashMap<NodeKey, SuspendedEntry>,
    pub(crate) listeners: ListenerMap,
    pub(crate) actors: ActorRegistry,
    /// Actor ids claimed by nodes of the in-flight pass, bound at commit
    pub(crate) registrations: Vec<(String, NodeKey)>,
    pub(crate) cache: RenderCache,
    pub(crate) strategy: Strategy,
    pub(crate) signal: Rc<RenderSignal>,
    /// Node whose render or handler is running
    pub(crate) rendering: Option<NodeKey>,
    pub(crate) initial_html: Option<String>,
}

impl RenderContext {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            tree: FiberTree::new(),
            pass: None,
            created: Vec::new(),
            deletions: Vec::new(),
            suspended: HashMap::new(),
            listeners: ListenerMap::new(),
            actors: ActorRegistry::new(),
            registrations: Vec::new(),
            cache: RenderCache::new(),
            strategy,
            signal: Rc::new(RenderSignal::new()),
            rendering: None,
            initial_html: None,
        }
    }

    /// The node arena
    pub fn tree(&self) -> &FiberTree {
        &self.tree
    }

    /// Whether a pass is in flight
    pub fn is_working(&self) -> bool {
        self.pass.is_some()
    }

    fn mode(&self) -> PassMode {
        self.pass
            .as_ref()
            .map(|p| p.mode)
            .unwrap_or_else(|| PassMode::new(self.strategy, false))
    }

    /// Start a top-level pass rendering `element` under the root
    pub(crate) fn begin_full_pass(
        &mut self,
        element: Element,
        transition_id: Option<String>,
        hydrating: bool,
    ) {
        let mode = PassMode::new(self.strategy, hydrating);
        debug!(strategy = %mode.strategy, hydrating, "starting render pass");
        self.cache.clear();
        self.deletions.clear();
        self.created.clear();
        self.registrations.clear();

        let root = match self.tree.current() {
            Some(current) => self.create_work_in_progress(current),
            None => {
                let key = self.tree.insert(Node::root(Vec::new()));
                self.created.push(key);
                key
            }
        };
        let node = &mut self.tree[root];
        node.kind = NodeKind::Root;
        node.pending_children = vec![element];
        node.parent = None;
        node.index = 0;

        self.pass = Some(Pass {
            root,
            replaces: None,
            next: Some(root),
            mode,
            transition_id,
            boundary_marks: HashMap::new(),
        });
    }

    /// Start a partial pass re-rendering the committed `boundary`
    pub(crate) fn begin_partial_pass(&mut self, boundary: NodeKey, transition_id: Option<String>) {
        let mode = PassMode::new(self.strategy, false);
        debug!(strategy = %mode.strategy, "starting partial pass at suspense boundary");
        self.deletions.clear();
        self.created.clear();
        self.registrations.clear();

        let wip = self.create_work_in_progress(boundary);
        let (kind, key, props, children, parent, index, hidden, island) = {
            let current = &self.tree[boundary];
            (
                current.kind.clone(),
                current.key.clone(),
                current.props.clone(),
                current.pending_children.clone(),
                current.parent,
                current.index,
                current.is_hidden,
                current.is_in_island,
            )
        };
        let node = &mut self.tree[wip];
        node.kind = kind;
        node.key = key;
        node.props = props;
        node.pending_children = children;
        node.parent = parent;
        node.index = index;
        node.is_hidden = hidden;
        node.is_in_island = island;

        self.pass = Some(Pass {
            root: wip,
            replaces: Some(boundary),
            next: Some(wip),
            mode,
            transition_id,
            boundary_marks: HashMap::new(),
        });
    }

    /// Drop the in-flight pass; the committed tree is untouched
    pub(crate) fn abandon_pass(&mut self) {
        if self.pass.take().is_none() {
            return;
        }
        debug!(discarded = self.created.len(), "abandoning work in progress");
        for key in std::mem::take(&mut self.created) {
            if !self.suspended.contains_key(&key) {
                self.tree.remove(key);
            }
        }
        self.deletions.clear();
        self.registrations.clear();
        self.rendering = None;

        let tree = &mut self.tree;
        self.suspended.retain(|&node, _| tree.contains(node));
        let live: std::collections::HashSet<NodeKey> = match tree.current() {
            Some(root) => tree.preorder(root).into_iter().collect(),
            None => Default::default(),
        };
        for &node in self.suspended.keys() {
            if !live.contains(&node) {
                let n = &mut tree[node];
                n.parent = None;
                n.sibling = None;
            }
        }
    }

    /// Perform one unit of work; returns whether work remains
    pub(crate) fn work_unit(&mut self) -> Result<bool> {
        let Some(node) = self.pass.as_ref().and_then(|p| p.next) else {
            return Ok(false);
        };
        trace!(node = %self.tree[node].kind.label(), "unit of work");

        let origin = self.begin_work(node)?;
        let next = match self.tree[origin].child {
            Some(child) => Some(child),
            None => self.complete_from(origin),
        };
        if let Some(pass) = self.pass.as_mut() {
            pass.next = next;
        }
        Ok(next.is_some())
    }

    /// Next unvisited node after the subtree at `node`
    fn complete_from(&self, node: NodeKey) -> Option<NodeKey> {
        let root = self.pass.as_ref()?.root;
        let mut cursor = node;
        loop {
            if cursor == root {
                return None;
            }
            let current = self.tree.get(cursor)?;
            if let Some(sibling) = current.sibling {
                return Some(sibling);
            }
            cursor = current.parent?;
        }
    }

    /// Render one node; returns the node whose children are visited next
    fn begin_work(&mut self, node: NodeKey) -> Result<NodeKey> {
        let kind = self.tree[node].kind.clone();
        match kind {
            NodeKind::Component(component) => self.render_component(node, component),
            NodeKind::Suspense { .. } => self.begin_boundary(node),
            _ => {
                let children = self.tree[node].pending_children.clone();
                self.reconcile_children(node, children, false);
                Ok(node)
            }
        }
    }

    fn begin_boundary(&mut self, node: NodeKey) -> Result<NodeKey> {
        let mark = self.deletions.len();
        if let Some(pass) = self.pass.as_mut() {
            pass.boundary_marks.insert(node, mark);
        }
        let was_fallback = self.tree[node]
            .alternate
            .map(|alt| self.tree[alt].showing_fallback)
            .unwrap_or(false);
        self.tree[node].showing_fallback = false;
        let children = self.tree[node].pending_children.clone();
        self.reconcile_children(node, children, was_fallback);
        Ok(node)
    }

    fn render_component(&mut self, node: NodeKey, component: Component) -> Result<NodeKey> {
        let props = self.tree[node].props.clone();
        let children = self.tree[node].pending_children.clone();
        let prev = match self.tree[node].alternate {
            Some(alt) => self.tree[alt].hooks.clone(),
            None => std::mem::take(&mut self.tree[node].hooks),
        };
        let source = self.tree[node].alternate.unwrap_or(node);
        let queued = self.tree[source].message_queue.clone();
        let registered = queued.is_some();
        let mut inbox = queued.unwrap_or_default();

        self.rendering = Some(node);
        let (result, out) = {
            let mut cx = RenderCx::new(node, &prev, &mut self.cache, &self.signal, &mut inbox);
            let result = (component.render_fn())(&mut cx, &props, &children);
            (result, cx.finish())
        };
        self.rendering = None;

        self.registrations
            .extend(out.registrations.iter().map(|id| (id.clone(), node)));
        let wip = &mut self.tree[node];
        wip.hooks = out.slots;
        wip.update_queue = out.effects;
        wip.effect |= out.tags;
        if registered || !out.registrations.is_empty() {
            wip.message_queue = Some(inbox);
        }

        match RenderOutcome::from(result) {
            RenderOutcome::Value(children) => {
                if self.suspended.remove(&node).is_some() {
                    debug!(component = component.name(), "suspended component resumed");
                }
                self.reconcile_children(node, children, false);
                Ok(node)
            }
            RenderOutcome::Suspended(handle) => self.suspend(node, handle),
            RenderOutcome::Failed(err) => Err(Error::catalogued(
                ErrorCode::ComponentFailed,
                format!("in <{}>: {}", component.name(), err),
            )),
        }
    }

    /// Reconcile `elements` against the children of `parent`'s alternate
    ///
    /// With `fresh`, no old child is reused.
    pub(crate) fn reconcile_children(&mut self, parent: NodeKey, elements: Vec<Element>, fresh: bool) {
        let mode = self.mode();
        let old_children = match self.tree[parent].alternate {
            Some(alt) => self.tree.children(alt),
            None => Vec::new(),
        };

        let mut keys = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let old = old_children.get(index).copied();
            let matched = old.filter(|&o| {
                !fresh
                    && self.tree[o].kind.same_type(&element.kind)
                    && self.tree[o].key == element.key
            });
            let key = match matched {
                Some(current) => self.update_node(current, element, parent, index, mode),
                None => {
                    if let Some(old) = old {
                        self.delete_child(old, mode);
                    }
                    self.place_node(element, parent, index, mode)
                }
            };
            keys.push(key);
        }
        for &old in old_children.iter().skip(elements.len()) {
            self.delete_child(old, mode);
        }
        self.tree.link_children(parent, &keys);
    }

    fn delete_child(&mut self, old: NodeKey, mode: PassMode) {
        let emit = mode.emits_deletion(self.tree[old].is_in_island);
        self.deletions.push(Deletion {
            node: old,
            unmount: true,
            emit,
        });
    }

    /// Reuse `current` for `element`
    fn update_node(
        &mut self,
        current: NodeKey,
        element: &Element,
        parent: NodeKey,
        index: usize,
        mode: PassMode,
    ) -> NodeKey {
        let wip = self.create_work_in_progress(current);
        self.fill_node(wip, element, parent, index, mode);

        let (was_hidden, old_props) = {
            let old = &self.tree[current];
            (old.is_hidden, &old.props)
        };
        let node = &self.tree[wip];
        let mut tag = EffectTag::empty();
        if node.kind.is_host() {
            if was_hidden && !node.is_hidden {
                tag |= EffectTag::PLACEMENT;
            } else if node.props != *old_props {
                tag |= EffectTag::UPDATE;
            }
        }
        let parent_hidden = self.tree[parent].is_hidden;
        if !was_hidden && node.is_hidden && !parent_hidden {
            let emit = mode.emits_deletion(node.is_in_island);
            self.deletions.push(Deletion {
                node: current,
                unmount: false,
                emit,
            });
        }
        let in_island = node.is_in_island;
        self.tree[wip].effect = mode.gate(tag, in_island);
        wip
    }

    /// Create a node for `element`, or reattach a suspended one
    fn place_node(&mut self, element: &Element, parent: NodeKey, index: usize, mode: PassMode) -> NodeKey {
        let key = match self.take_resumed(element, parent, index) {
            Some(resumed) => resumed,
            None => {
                let key = self.tree.insert(Node::from_element(element));
                self.created.push(key);
                key
            }
        };
        self.fill_node(key, element, parent, index, mode);
        let in_island = self.tree[key].is_in_island;
        self.tree[key].effect = mode.gate(mode.placement(), in_island);
        key
    }

    /// Copy the description into `key` and derive its flags from `parent`
    fn fill_node(&mut self, key: NodeKey, element: &Element, parent: NodeKey, index: usize, mode: PassMode) {
        let (parent_hidden, parent_island) = {
            let p = &self.tree[parent];
            (p.is_hidden, p.is_in_island)
        };
        let node = &mut self.tree[key];
        node.kind = NodeKind::from(&element.kind);
        node.key = element.key.clone();
        node.props = element.props.clone();
        node.pending_children = element.children.clone();
        node.parent = Some(parent);
        node.index = index;
        node.is_hidden = parent_hidden || node.hides_children();
        node.is_in_island = parent_island || matches!(node.kind, NodeKind::Island);

        if mode.rewrites_listeners() && node.kind.is_host() {
            let path = self.element_path(key);
            let props = std::mem::take(&mut self.tree[key].props);
            self.tree[key].props = rewrite_handlers(&props, key, &path, &mut self.listeners);
        }
    }

    /// Sibling indices from the root down to `key`
    pub(crate) fn element_path(&self, key: NodeKey) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cursor = key;
        while let Some(node) = self.tree.get(cursor) {
            let Some(parent) = node.parent else { break };
            path.push(node.index);
            cursor = parent;
        }
        path.reverse();
        path
    }

    /// Work-in-progress twin of a committed node
    ///
    /// Recycles the node's alternate when it still points back, so each
    /// logical node owns at most two arena slots.
    pub(crate) fn create_work_in_progress(&mut self, current: NodeKey) -> NodeKey {
        let recycled = self.tree[current]
            .alternate
            .filter(|&alt| self.tree.get(alt).is_some_and(|n| n.alternate == Some(current)));

        let wip = match recycled {
            Some(alt) => {
                let node = &mut self.tree[alt];
                node.child = None;
                node.sibling = None;
                node.effect = EffectTag::empty();
                node.hooks.clear();
                node.update_queue.clear();
                node.message_queue = None;
                alt
            }
            None => {
                let (kind, key) = {
                    let c = &self.tree[current];
                    (c.kind.clone(), c.key.clone())
                };
                let mut node = Node::root(Vec::new());
                node.kind = kind;
                node.key = key;
                let key = self.tree.insert(node);
                self.created.push(key);
                key
            }
        };
        let showing_fallback = self.tree[current].showing_fallback;
        self.tree[wip].showing_fallback = showing_fallback;
        self.tree[wip].alternate = Some(current);
        self.tree[current].alternate = Some(wip);
        wip
    }
}
