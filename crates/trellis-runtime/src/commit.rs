//! Commit and mutation emitter
//!
//! Turns a finished work-in-progress tree into one ordered mutation batch:
//! deletions first, in reverse document order of their last-known paths, then
//! inserts, updates and hydration records in document order. Paths count only
//! visible host nodes; every other node kind is transparent.

use crate::protocol::{Mutation, Outbound, Path};
use crate::reconcile::RenderContext;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use trellis_core::{EffectTag, FiberTree, NodeKey, PendingEffect};

/// A committed node scheduled for removal from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deletion {
    pub node: NodeKey,
    /// Drop the node itself; false when it only turned hidden
    pub unmount: bool,
    /// Send `DELETE` records for it
    pub emit: bool,
}

/// Summary of one commit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub partial: bool,
    pub dry_run: bool,
    pub transition_id: Option<String>,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub hydrated: usize,
    pub effects_run: usize,
    pub refs_attached: usize,
}

/// What a commit hands back to the runtime
pub(crate) struct CommitOutput {
    pub message: Option<Outbound>,
    pub report: CommitReport,
    pub effects: Vec<PendingEffect>,
}

/// Paths of every visible host node under `root`
pub fn host_paths(tree: &FiberTree, root: NodeKey) -> HashMap<NodeKey, Path> {
    let mut paths: HashMap<NodeKey, Path> = HashMap::new();
    let mut counters: HashMap<Option<NodeKey>, usize> = HashMap::new();
    let mut stack: Vec<(NodeKey, Option<NodeKey>)> = vec![(root, None)];

    while let Some((key, host_parent)) = stack.pop() {
        let Some(node) = tree.get(key) else { continue };
        if node.is_hidden {
            continue;
        }
        let child_parent = if node.kind.is_host() {
            let counter = counters.entry(host_parent).or_insert(0);
            let mut path = host_parent
                .and_then(|p| paths.get(&p).cloned())
                .unwrap_or_default();
            path.push(*counter);
            *counter += 1;
            paths.insert(key, path);
            Some(key)
        } else {
            host_parent
        };
        for child in tree.children(key).into_iter().rev() {
            stack.push((child, child_parent));
        }
    }
    paths
}

/// `DELETE` records for the outermost visible host nodes under `root`
fn host_removals(tree: &FiberTree, root: NodeKey, paths: &HashMap<NodeKey, Path>) -> Vec<Mutation> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(key) = stack.pop() {
        if let Some(path) = paths.get(&key) {
            out.push(Mutation::Delete {
                parent_path: parent_of(path),
                child_path: path.clone(),
            });
            continue;
        }
        stack.extend(tree.children(key).into_iter().rev());
    }
    out
}

fn parent_of(path: &Path) -> Path {
    path[..path.len().saturating_sub(1)].to_vec()
}

impl RenderContext {
    /// Commit the finished pass
    pub(crate) fn commit(&mut self) -> Option<CommitOutput> {
        let pass = self.pass.take()?;
        let dry_run = pass.mode.is_dry_run();
        let mut report = CommitReport {
            partial: pass.replaces.is_some(),
            dry_run,
            transition_id: pass.transition_id.clone(),
            ..CommitReport::default()
        };

        let old_paths = match self.tree.current() {
            Some(root) => host_paths(&self.tree, root),
            None => HashMap::new(),
        };
        let deletions = std::mem::take(&mut self.deletions);
        let mut removals = Vec::new();
        for deletion in &deletions {
            if deletion.emit && self.tree.contains(deletion.node) {
                removals.extend(host_removals(&self.tree, deletion.node, &old_paths));
            }
        }
        removals.sort_by(|a, b| b.path().cmp(a.path()));
        removals.dedup();
        report.deleted = removals.len();

        for deletion in deletions.iter().filter(|d| d.unmount) {
            if !self.tree.contains(deletion.node) {
                continue;
            }
            for key in self.tree.preorder(deletion.node) {
                for slot in &self.tree[key].hooks {
                    slot.run_cleanup();
                }
            }
            self.tree.remove_subtree(deletion.node);
        }

        match pass.replaces {
            None => self.tree.set_current(Some(pass.root)),
            Some(old) => self.tree.replace_child(old, pass.root),
        }
        let new_paths = match self.tree.current() {
            Some(root) => host_paths(&self.tree, root),
            None => HashMap::new(),
        };

        let mut mutations = removals;
        let mut effects = Vec::new();
        let pass_nodes = self.tree.preorder(pass.root);
        for &key in &pass_nodes {
            let node = &mut self.tree[key];
            let tag = std::mem::take(&mut node.effect);
            for slot in &mut node.hooks {
                slot.settle();
            }
            if tag.contains(EffectTag::REF) {
                report.refs_attached += 1;
            }
            effects.append(&mut node.update_queue);

            let (Some(path), Some(host_tag)) = (new_paths.get(&key), node.kind.host_tag()) else {
                continue;
            };
            if tag.is_hydrating_update() {
                report.hydrated += 1;
                mutations.push(Mutation::HydrateNode {
                    child_path: path.clone(),
                    props: node.props.clone(),
                });
            } else if tag.contains(EffectTag::PLACEMENT) {
                report.inserted += 1;
                mutations.push(Mutation::Insert {
                    parent_path: parent_of(path),
                    child_path: path.clone(),
                    tag: host_tag.to_string(),
                    props: node.props.clone(),
                });
            } else if tag.contains(EffectTag::UPDATE) {
                let props = node.props.clone();
                let old_props = node
                    .alternate
                    .and_then(|alt| self.tree.get(alt))
                    .map(|old| old.props.clone())
                    .unwrap_or_default();
                report.updated += 1;
                mutations.push(Mutation::Update {
                    child_path: path.clone(),
                    old_props,
                    props,
                });
            }
        }

        self.bind_actors(&pass_nodes);
        self.collect_garbage();
        debug!(
            mutations = mutations.len(),
            partial = report.partial,
            dry_run,
            "committed render pass"
        );

        let message = if dry_run {
            None
        } else if report.partial {
            Some(Outbound::CommitPartial {
                mutations,
                completed_transition_id: pass.transition_id,
            })
        } else {
            Some(Outbound::Commit {
                mutations,
                completed_transition_id: pass.transition_id,
            })
        };
        Some(CommitOutput {
            message,
            report,
            effects,
        })
    }

    /// Point actor ids registered during the pass at their committed nodes
    fn bind_actors(&mut self, committed: &[NodeKey]) {
        let committed: HashSet<NodeKey> = committed.iter().copied().collect();
        for (id, node) in std::mem::take(&mut self.registrations) {
            if committed.contains(&node) {
                self.actors.register(id, node);
            }
        }
    }

    /// Drop registrations and nodes that no longer belong to either generation
    fn collect_garbage(&mut self) {
        self.created.clear();
        let live: HashSet<NodeKey> = match self.tree.current() {
            Some(root) => self.tree.preorder(root).into_iter().collect(),
            None => HashSet::new(),
        };
        self.actors.retain_live(&self.tree, &live);
        self.listeners.retain_live(&self.tree, &live);
        self.prune_suspended(&live);

        let suspended = &self.suspended;
        let alternates: HashSet<NodeKey> = live
            .iter()
            .filter_map(|&k| self.tree.get(k).and_then(|n| n.alternate))
            .collect();
        self.tree.retain(|key, _| {
            live.contains(&key) || alternates.contains(&key) || suspended.contains_key(&key)
        });
    }
}
