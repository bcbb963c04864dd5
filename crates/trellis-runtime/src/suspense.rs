//! Suspension and resumption
//!
//! A component that returns `Interrupt::Suspend` keeps its node. The node is
//! detached from the work-in-progress tree, parked in the suspended map, and
//! its nearest boundary re-renders its fallback instead. When the handle
//! settles, the boundary is re-rendered by a partial pass and the parked node
//! is reattached at its old slot with its hook state intact.

use crate::error::{Error, Result};
use crate::reconcile::RenderContext;
use std::collections::HashSet;
use tracing::{debug, warn};
use trellis_core::{Deferred, Element, ErrorCode, NodeKey, NodeKind};

/// A node waiting on a pending handle
#[derive(Debug, Clone)]
pub struct SuspendedEntry {
    pub node: NodeKey,
    pub handle: Deferred,
    /// Boundary showing fallback for this node
    pub boundary: NodeKey,
    /// Index path from the boundary to the node's slot
    pub slot: Vec<usize>,
    pub transition_id: Option<String>,
}

impl RenderContext {
    /// Park `node` on `handle` and switch its boundary to fallback
    ///
    /// Returns the boundary, whose children are visited next.
    pub(crate) fn suspend(&mut self, node: NodeKey, handle: Deferred) -> Result<NodeKey> {
        let Some(pass) = self.pass.as_ref() else {
            return Err(Error::catalogued(ErrorCode::OutsideRender, "suspended outside a pass"));
        };
        let (mode, root, transition_id) = (pass.mode, pass.root, pass.transition_id.clone());
        let label = self.tree[node].kind.label();

        if !mode.allows_suspense() {
            return Err(Error::catalogued(
                ErrorCode::SuspenseNotAllowed,
                format!("in {} under the {} strategy", label, mode.strategy),
            ));
        }
        let boundary = self.find_boundary(node, root).ok_or_else(|| {
            Error::catalogued(ErrorCode::SuspendedWithoutBoundary, format!("in {}", label))
        })?;
        debug!(component = %label, handle = %handle.id(), "component suspended");

        let mark = self
            .pass
            .as_ref()
            .and_then(|p| p.boundary_marks.get(&boundary).copied())
            .unwrap_or(self.deletions.len());
        self.deletions.truncate(mark);
        let slot = self.tree.index_path(node, boundary);
        self.discard_attempt(boundary, node);

        if let Some(alt) = self.tree[node].alternate.take() {
            if let Some(old) = self.tree.get_mut(alt) {
                if old.alternate == Some(node) {
                    old.alternate = None;
                }
            }
        }
        let parked = &mut self.tree[node];
        parked.parent = None;
        parked.sibling = None;
        parked.child = None;
        self.created.retain(|&k| k != node);

        let signal = self.signal.clone();
        handle.on_settle(move || signal.wake(node));
        self.suspended.insert(
            node,
            SuspendedEntry {
                node,
                handle,
                boundary,
                slot,
                transition_id,
            },
        );

        let fallback = match &self.tree[boundary].kind {
            NodeKind::Suspense { fallback } => fallback.clone(),
            _ => Vec::new(),
        };
        let current_showed_content = self.tree[boundary]
            .alternate
            .is_some_and(|alt| !self.tree[alt].showing_fallback);
        self.tree[boundary].showing_fallback = true;
        self.reconcile_children(boundary, fallback, current_showed_content);
        Ok(boundary)
    }

    /// Nearest boundary above `node` that is not already showing fallback
    fn find_boundary(&self, node: NodeKey, root: NodeKey) -> Option<NodeKey> {
        let mut cursor = node;
        while cursor != root {
            cursor = self.tree.get(cursor)?.parent?;
            let candidate = self.tree.get(cursor)?;
            if candidate.kind.is_boundary() && !candidate.showing_fallback {
                return Some(cursor);
            }
        }
        None
    }

    /// Drop what the boundary built before `keep` suspended
    fn discard_attempt(&mut self, boundary: NodeKey, keep: NodeKey) {
        let attempt: Vec<NodeKey> = self.tree.preorder(boundary).into_iter().skip(1).collect();
        let mut dropped = HashSet::new();
        for key in attempt {
            if key == keep {
                continue;
            }
            if self.suspended.contains_key(&key) {
                let parked = &mut self.tree[key];
                parked.parent = None;
                parked.sibling = None;
            } else if self.tree[key].alternate.is_none() {
                self.tree.remove(key);
                dropped.insert(key);
            }
        }
        self.created.retain(|k| !dropped.contains(k));
    }

    /// Parked node waiting for the slot `index` under `parent`, if any
    pub(crate) fn take_resumed(
        &mut self,
        element: &Element,
        parent: NodeKey,
        index: usize,
    ) -> Option<NodeKey> {
        let mut boundary = parent;
        loop {
            let node = self.tree.get(boundary)?;
            if node.kind.is_boundary() {
                break;
            }
            boundary = node.parent?;
        }
        let wip = &self.tree[boundary];
        if wip.showing_fallback {
            return None;
        }
        let committed = wip.alternate;
        let mut slot = self.tree.index_path(parent, boundary);
        slot.push(index);

        self.suspended
            .values()
            .find(|entry| {
                (entry.boundary == boundary || Some(entry.boundary) == committed)
                    && entry.slot == slot
                    && self.tree.get(entry.node).is_some_and(|n| {
                        n.parent.is_none() && n.kind.same_type(&element.kind) && n.key == element.key
                    })
            })
            .map(|entry| entry.node)
    }

    /// Committed boundary to re-render for a woken node
    ///
    /// Returns `None` for stale wakeups: the entry is gone, its handle is
    /// pending again, or its boundary left the tree.
    pub(crate) fn resume_target(&mut self, node: NodeKey) -> Option<(NodeKey, Option<String>)> {
        let Some(entry) = self.suspended.get(&node) else {
            debug!("ignoring wakeup for a node that is no longer suspended");
            return None;
        };
        if entry.handle.is_pending() {
            return None;
        }
        let live = self
            .tree
            .current()
            .is_some_and(|root| self.tree.is_descendant(entry.boundary, root));
        if !live {
            warn!("suspense boundary left the tree before its content resolved");
            self.suspended.remove(&node);
            return None;
        }
        Some((entry.boundary, entry.transition_id.clone()))
    }

    /// Keep entries whose boundary is still live, following alternates
    pub(crate) fn prune_suspended(&mut self, live: &HashSet<NodeKey>) {
        let tree = &mut self.tree;
        self.suspended.retain(|_, entry| {
            if !tree.contains(entry.node) {
                return false;
            }
            if live.contains(&entry.boundary) {
                return true;
            }
            match tree.get(entry.boundary).and_then(|n| n.alternate) {
                Some(alt) if live.contains(&alt) => {
                    entry.boundary = alt;
                    true
                }
                _ => false,
            }
        });
        for entry in self.suspended.values() {
            if !live.contains(&entry.node) {
                let parked = &mut tree[entry.node];
                parked.parent = None;
                parked.sibling = None;
            }
        }
    }
}
