//! Resumable listener map
//!
//! Under the resumable strategy every handler prop on a host node is replaced
//! by a plain attribute holding a listener id, and the handler itself is kept
//! here until the host asks for it to run.
//!
//! Listener ids are `"<element index path>:<prop>"`, e.g. `"0.2:onClick"`,
//! which makes them stable across identical renders.

use indexmap::IndexMap;
use std::collections::HashSet;
use trellis_core::{is_event_prop, FiberTree, Handler, NodeKey, Props, Value};

/// A handler waiting to be resumed
#[derive(Debug, Clone)]
pub struct ListenerEntry {
    pub id: String,
    /// Node that owns the handler
    pub node: NodeKey,
    pub handler: Handler,
}

/// Listener ids mapped to their handlers
#[derive(Debug, Default)]
pub struct ListenerMap {
    entries: IndexMap<String, ListenerEntry>,
}

impl ListenerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: ListenerEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn get(&self, id: &str) -> Option<&ListenerEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Keep entries owned by live nodes, following alternates into the live tree
    pub fn retain_live(&mut self, tree: &FiberTree, live: &HashSet<NodeKey>) {
        self.entries.retain(|_, entry| {
            if live.contains(&entry.node) {
                return true;
            }
            match tree.get(entry.node).and_then(|n| n.alternate) {
                Some(alt) if live.contains(&alt) => {
                    entry.node = alt;
                    true
                }
                _ => false,
            }
        });
    }
}

/// Id for the handler `prop` on the element at `path`
pub fn listener_id(path: &[usize], prop: &str) -> String {
    let path: Vec<String> = path.iter().map(|i| i.to_string()).collect();
    format!("{}:{}", path.join("."), prop)
}

/// Attribute that carries the listener id, e.g. `data-onclick`
pub fn listener_attribute(prop: &str) -> String {
    format!("data-{}", prop.to_ascii_lowercase())
}

/// Replace every handler prop with its listener-id attribute
///
/// Attribute order follows the original prop order.
pub fn rewrite_handlers(
    props: &Props,
    node: NodeKey,
    path: &[usize],
    listeners: &mut ListenerMap,
) -> Props {
    let mut out = Props::with_capacity(props.len());
    for (key, value) in props {
        match value {
            Value::Handler(handler) if is_event_prop(key, value) => {
                let id = listener_id(path, key);
                out.insert(listener_attribute(key), Value::String(id.clone()));
                listeners.insert(ListenerEntry {
                    id,
                    node,
                    handler: handler.clone(),
                });
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{Cmd, Element, Node};

    #[test]
    fn test_listener_id_format() {
        assert_eq!(listener_id(&[0, 2], "onClick"), "0.2:onClick");
        assert_eq!(listener_id(&[], "onInput"), ":onInput");
        assert_eq!(listener_attribute("onClick"), "data-onclick");
    }

    #[test]
    fn test_rewrite_handlers() {
        let mut tree = FiberTree::new();
        let node = tree.insert(Node::from_element(&Element::host("button")));
        let mut props = Props::new();
        props.insert("label".into(), "Go".into());
        props.insert("onClick".into(), Handler::new(|_| Cmd::none()).into());
        props.insert("online".into(), true.into());

        let mut listeners = ListenerMap::new();
        let rewritten = rewrite_handlers(&props, node, &[0, 1], &mut listeners);

        assert_eq!(rewritten.get("data-onclick"), Some(&Value::from("0.1:onClick")));
        assert!(rewritten.get("onClick").is_none());
        assert_eq!(rewritten.get("online"), Some(&Value::Bool(true)));
        let keys: Vec<&str> = rewritten.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["label", "data-onclick", "online"]);

        let entry = listeners.get("0.1:onClick").unwrap();
        assert_eq!(entry.node, node);
        assert_eq!(listeners.ids().collect::<Vec<_>>(), vec!["0.1:onClick"]);
    }

    #[test]
    fn test_retain_drops_dead_owners() {
        let mut tree = FiberTree::new();
        let node = tree.insert(Node::from_element(&Element::host("button")));
        let mut listeners = ListenerMap::new();
        listeners.insert(ListenerEntry {
            id: "0:onClick".into(),
            node,
            handler: Handler::new(|_| Cmd::none()),
        });
        listeners.retain_live(&tree, &HashSet::new());
        assert!(listeners.is_empty());
    }
}
