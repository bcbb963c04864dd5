//! Actor bus: string ids mapped to live nodes, each with an inbox

use std::collections::{HashMap, HashSet};
use tracing::warn;
use trellis_core::{Envelope, ErrorCode, FiberTree, NodeKey, Value};

/// Registry of actor ids
#[derive(Debug, Default)]
pub struct ActorRegistry {
    actors: HashMap<String, NodeKey>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `id` at `node`, returning the previous registration
    pub fn register(&mut self, id: impl Into<String>, node: NodeKey) -> Option<NodeKey> {
        self.actors.insert(id.into(), node)
    }

    /// Remove a registration
    pub fn unregister(&mut self, id: &str) -> Option<NodeKey> {
        self.actors.remove(id)
    }

    /// Node registered under `id`
    pub fn get(&self, id: &str) -> Option<NodeKey> {
        self.actors.get(id).copied()
    }

    /// First id registered for `node`
    pub fn id_of(&self, node: NodeKey) -> Option<&str> {
        self.actors
            .iter()
            .find(|(_, &n)| n == node)
            .map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Append a message to the target's inbox
    ///
    /// Only the latest message survives the next drain, so a non-empty inbox
    /// means earlier messages are about to be dropped.
    pub fn deliver(
        &self,
        tree: &mut FiberTree,
        from: &str,
        target: &str,
        message: Value,
    ) -> trellis_core::Result<NodeKey> {
        let node = self
            .get(target)
            .filter(|&n| tree.contains(n))
            .ok_or_else(|| trellis_core::Error::new(ErrorCode::ActorNotRegistered, target))?;
        let inbox = tree[node].message_queue.get_or_insert_with(Vec::new);
        if !inbox.is_empty() {
            warn!(
                actor = target,
                pending = inbox.len(),
                "actor inbox not drained yet; earlier messages will be dropped"
            );
        }
        inbox.push(Envelope {
            from: from.to_string(),
            message,
        });
        Ok(node)
    }

    /// Keep registrations on live nodes, following alternates into the live tree
    pub fn retain_live(&mut self, tree: &FiberTree, live: &HashSet<NodeKey>) {
        self.actors.retain(|_, node| {
            if live.contains(node) {
                return true;
            }
            match tree.get(*node).and_then(|n| n.alternate) {
                Some(alt) if live.contains(&alt) => {
                    *node = alt;
                    true
                }
                _ => false,
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{Element, Node};

    #[test]
    fn test_deliver_appends_to_inbox() {
        let mut tree = FiberTree::new();
        let node = tree.insert(Node::from_element(&Element::host("div")));
        let mut actors = ActorRegistry::new();
        actors.register("panel", node);

        actors.deliver(&mut tree, "a", "panel", 1i64.into()).unwrap();
        actors.deliver(&mut tree, "b", "panel", 2i64.into()).unwrap();
        let inbox = tree[node].message_queue.as_ref().unwrap();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[1].from, "b");
        assert_eq!(actors.id_of(node), Some("panel"));
    }

    #[test]
    fn test_deliver_to_unknown_actor() {
        let mut tree = FiberTree::new();
        let actors = ActorRegistry::new();
        let err = actors
            .deliver(&mut tree, "a", "ghost", Value::Null)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ActorNotRegistered);
    }

    #[test]
    fn test_retain_follows_alternate() {
        let mut tree = FiberTree::new();
        let old = tree.insert(Node::from_element(&Element::host("div")));
        let new = tree.insert(Node::from_element(&Element::host("div")));
        let gone = tree.insert(Node::from_element(&Element::host("p")));
        tree[old].alternate = Some(new);
        tree[new].alternate = Some(old);

        let mut actors = ActorRegistry::new();
        actors.register("kept", old);
        actors.register("dropped", gone);
        let live: HashSet<NodeKey> = [new].into_iter().collect();
        actors.retain_live(&tree, &live);

        assert_eq!(actors.get("kept"), Some(new));
        assert_eq!(actors.get("dropped"), None);
        assert!(actors.unregister("kept").is_some());
        assert!(actors.is_empty());
    }
}
