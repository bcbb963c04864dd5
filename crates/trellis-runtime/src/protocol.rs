//! Message protocol between the runtime and its host
//!
//! Inbound messages are handed to [`Runtime::dispatch`](crate::Runtime::dispatch)
//! in-process; they carry live element descriptions and are not serialized.
//! Outbound messages are plain data and serialize to JSON with a `type` tag.

use serde::Serialize;
use trellis_core::{Element, Props, Strategy, Value};

/// Ordered list of sibling indices from the root to a host node
///
/// Only host nodes that are visible take part in indexing.
pub type Path = Vec<usize>;

/// Message from the host to the runtime
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Record host-rendered markup for hydration bookkeeping
    InitHydration { initial_html: String },
    /// Start a hydrating render pass under `strategy`
    Hydrate {
        element: Element,
        transition_id: Option<String>,
        strategy: Strategy,
    },
    /// Render a new root
    Render {
        element: Element,
        transition_id: Option<String>,
        high_priority: bool,
    },
    /// Re-render; `None` re-renders the last active root
    Update {
        element: Option<Element>,
        transition_id: Option<String>,
        high_priority: bool,
    },
    /// Invoke the handler recorded under a resumable listener id
    ExecuteResumableListener { listener_id: String, payload: Value },
    /// Register the currently rendering node as an actor
    RegisterActor { id: String },
    /// Remove an actor registration
    UnregisterActor { id: String },
    /// Deliver a message to an actor's inbox
    SendMessage {
        source_id: String,
        target_id: String,
        message: Value,
    },
}

impl Inbound {
    /// Protocol name of the message
    pub fn name(&self) -> &'static str {
        match self {
            Inbound::InitHydration { .. } => "INIT_HYDRATION",
            Inbound::Hydrate { .. } => "HYDRATE",
            Inbound::Render { .. } => "RENDER",
            Inbound::Update { .. } => "UPDATE",
            Inbound::ExecuteResumableListener { .. } => "EXECUTE_RESUMABLE_LISTENER",
            Inbound::RegisterActor { .. } => "REGISTER_ACTOR",
            Inbound::UnregisterActor { .. } => "UNREGISTER_ACTOR",
            Inbound::SendMessage { .. } => "SEND_MESSAGE",
        }
    }
}

/// One host-tree operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "op",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Mutation {
    /// Materialize a new host node at `child_path`
    Insert {
        parent_path: Path,
        child_path: Path,
        tag: String,
        props: Props,
    },
    /// Props changed on an existing host node
    Update {
        child_path: Path,
        old_props: Props,
        props: Props,
    },
    /// Remove the host node at `child_path`
    Delete { parent_path: Path, child_path: Path },
    /// Attach to existing markup at `child_path`
    HydrateNode { child_path: Path, props: Props },
}

impl Mutation {
    /// Protocol name of the operation
    pub fn op(&self) -> &'static str {
        match self {
            Mutation::Insert { .. } => "INSERT",
            Mutation::Update { .. } => "UPDATE",
            Mutation::Delete { .. } => "DELETE",
            Mutation::HydrateNode { .. } => "HYDRATE_NODE",
        }
    }

    /// Path of the node the operation targets
    pub fn path(&self) -> &Path {
        match self {
            Mutation::Insert { child_path, .. }
            | Mutation::Update { child_path, .. }
            | Mutation::Delete { child_path, .. }
            | Mutation::HydrateNode { child_path, .. } => child_path,
        }
    }
}

/// Message from the runtime to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Outbound {
    /// Mutation batch of a full pass
    Commit {
        mutations: Vec<Mutation>,
        completed_transition_id: Option<String>,
    },
    /// Mutation batch scoped to a resumed suspended subtree
    CommitPartial {
        mutations: Vec<Mutation>,
        completed_transition_id: Option<String>,
    },
}

impl Outbound {
    /// The mutation batch
    pub fn mutations(&self) -> &[Mutation] {
        match self {
            Outbound::Commit { mutations, .. } | Outbound::CommitPartial { mutations, .. } => {
                mutations
            }
        }
    }

    /// Transition completed by this commit
    pub fn transition_id(&self) -> Option<&str> {
        match self {
            Outbound::Commit {
                completed_transition_id,
                ..
            }
            | Outbound::CommitPartial {
                completed_transition_id,
                ..
            } => completed_transition_id.as_deref(),
        }
    }

    /// Whether this batch came from a partial pass
    pub fn is_partial(&self) -> bool {
        matches!(self, Outbound::CommitPartial { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mutation_wire_format() {
        let mut props = Props::new();
        props.insert("class".into(), "card".into());
        let insert = Mutation::Insert {
            parent_path: vec![],
            child_path: vec![0],
            tag: "div".into(),
            props,
        };
        assert_eq!(
            serde_json::to_value(&insert).unwrap(),
            json!({"op": "INSERT", "parentPath": [], "childPath": [0], "tag": "div", "props": {"class": "card"}})
        );

        let delete = Mutation::Delete {
            parent_path: vec![0],
            child_path: vec![0, 2],
        };
        assert_eq!(
            serde_json::to_value(&delete).unwrap(),
            json!({"op": "DELETE", "parentPath": [0], "childPath": [0, 2]})
        );
        assert_eq!(delete.op(), "DELETE");
        assert_eq!(delete.path(), &vec![0, 2]);
    }

    #[test]
    fn test_outbound_wire_format() {
        let msg = Outbound::CommitPartial {
            mutations: vec![Mutation::HydrateNode {
                child_path: vec![1],
                props: Props::new(),
            }],
            completed_transition_id: Some("t-1".into()),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "COMMIT_PARTIAL",
                "mutations": [{"op": "HYDRATE_NODE", "childPath": [1], "props": {}}],
                "completedTransitionId": "t-1"
            })
        );
        assert!(msg.is_partial());
        assert_eq!(msg.transition_id(), Some("t-1"));
    }
}
