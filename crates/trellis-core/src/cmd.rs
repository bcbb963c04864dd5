//! Commands produced by event handlers
//!
//! A handler never touches the runtime directly. It returns a `Cmd`, and the
//! runtime applies it with the handler's owning node as the active render
//! context.

use crate::Value;

/// A command to be applied by the runtime after a handler returns
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// No operation
    None,

    /// Batch multiple commands
    Batch(Vec<Cmd>),

    /// Register the owning node under an actor id
    RegisterActor(String),

    /// Remove an actor id from the registry
    UnregisterActor(String),

    /// Deliver a message to a registered actor
    Send {
        /// Target actor id
        target: String,
        /// Message payload
        message: Value,
    },

    /// Ask for a re-render of the last active root
    RequestRender {
        /// Take the preemption path instead of queueing
        high_priority: bool,
    },

    /// Log a message for debugging
    Log {
        level: LogLevel,
        message: String,
    },
}

/// Log level for debug commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Cmd {
    /// Create an empty command
    pub fn none() -> Self {
        Cmd::None
    }

    /// Create a batch of commands
    pub fn batch(cmds: Vec<Cmd>) -> Self {
        // Flatten nested batches and filter out None
        let mut flattened: Vec<Cmd> = cmds
            .into_iter()
            .flat_map(|cmd| match cmd {
                Cmd::None => vec![],
                Cmd::Batch(inner) => inner,
                other => vec![other],
            })
            .collect();

        match flattened.len() {
            0 => Cmd::None,
            1 => flattened.remove(0),
            _ => Cmd::Batch(flattened),
        }
    }

    /// Create a send command
    pub fn send(target: impl Into<String>, message: impl Into<Value>) -> Self {
        Cmd::Send {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a register command
    pub fn register(id: impl Into<String>) -> Self {
        Cmd::RegisterActor(id.into())
    }

    /// Create a log command
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Cmd::Log {
            level,
            message: message.into(),
        }
    }

    /// Create a debug log command
    pub fn debug(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Debug, message)
    }

    /// Check if this is a None command
    pub fn is_none(&self) -> bool {
        matches!(self, Cmd::None)
    }

    /// Iterate over the leaf commands in order
    pub fn into_leaves(self) -> Vec<Cmd> {
        match self {
            Cmd::None => Vec::new(),
            Cmd::Batch(inner) => inner.into_iter().flat_map(Cmd::into_leaves).collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_batch() {
        let cmd = Cmd::batch(vec![Cmd::None, Cmd::debug("hello"), Cmd::None]);

        // Should flatten to single command
        assert!(matches!(cmd, Cmd::Log { .. }));
    }

    #[test]
    fn test_cmd_batch_nested() {
        let cmd = Cmd::batch(vec![
            Cmd::batch(vec![Cmd::register("a"), Cmd::send("b", 1i64)]),
            Cmd::debug("c"),
        ]);

        if let Cmd::Batch(cmds) = cmd {
            assert_eq!(cmds.len(), 3);
        } else {
            panic!("Expected Batch");
        }
    }

    #[test]
    fn test_into_leaves() {
        let cmd = Cmd::Batch(vec![
            Cmd::None,
            Cmd::Batch(vec![Cmd::register("x")]),
            Cmd::RequestRender { high_priority: true },
        ]);
        let leaves = cmd.into_leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0], Cmd::RegisterActor("x".into()));
    }
}
