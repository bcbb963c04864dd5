//! Hydration / resumability strategies

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a render pass treats existing host markup and event handlers
///
/// A pass runs under exactly one strategy for its whole duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Ordinary reconciliation
    #[default]
    Full,
    /// Full, plus suspension is allowed
    Progressive,
    /// Only island subtrees produce commit work
    Selective,
    /// Handlers become listener ids and commits are dry runs
    Resumable,
}

impl Strategy {
    /// Whether a component may suspend under this strategy
    pub fn allows_suspense(self) -> bool {
        matches!(self, Strategy::Progressive | Strategy::Resumable)
    }

    /// Whether commits send mutation batches to the host
    pub fn emits_mutations(self) -> bool {
        !matches!(self, Strategy::Resumable)
    }

    /// Whether handler props are rewritten to listener ids
    pub fn rewrites_listeners(self) -> bool {
        matches!(self, Strategy::Resumable)
    }

    /// Whether effect tags are limited to island subtrees
    pub fn gates_islands(self) -> bool {
        matches!(self, Strategy::Selective)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Full => "full",
            Strategy::Progressive => "progressive",
            Strategy::Selective => "selective",
            Strategy::Resumable => "resumable",
        };
        write!(f, "{}", name)
    }
}
