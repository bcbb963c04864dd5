//! Runtime configuration
//!
//! Loaded from RON. Every field has a default, so an empty document `()` is a
//! valid configuration.
//!
//! ```ron
//! (
//!     time_slice_ms: 5,
//!     default_strategy: progressive,
//!     priorities: (user_blocking: 250, normal: 5000),
//! )
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use trellis_core::{ErrorCode, Strategy};

/// Declared priority levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Immediate,
    UserBlocking,
    Normal,
    Low,
}

/// Declared timeout per priority level, in milliseconds
///
/// The work loop only distinguishes high priority from everything else and
/// does not read these values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityTimeouts {
    pub immediate: u64,
    pub user_blocking: u64,
    pub normal: u64,
    pub low: u64,
}

impl Default for PriorityTimeouts {
    fn default() -> Self {
        Self {
            immediate: 0,
            user_blocking: 250,
            normal: 5000,
            low: 10000,
        }
    }
}

/// Configuration for a runtime instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Wall-clock budget of one work-loop slice
    pub time_slice_ms: u64,
    /// Strategy used until a `HYDRATE` message selects another
    pub default_strategy: Strategy,
    /// Declared per-priority timeouts
    pub priorities: PriorityTimeouts,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            time_slice_ms: 5,
            default_strategy: Strategy::Full,
            priorities: PriorityTimeouts::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from a RON string
    pub fn from_ron(source: &str) -> Result<Self> {
        let config: RuntimeConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.time_slice_ms == 0 {
            return Err(Error::catalogued(
                ErrorCode::InvalidConfig,
                "time_slice_ms must be at least 1",
            ));
        }
        Ok(())
    }

    /// Budget of one work-loop slice
    pub fn time_slice(&self) -> Duration {
        Duration::from_millis(self.time_slice_ms)
    }

    /// Declared timeout for a priority level
    pub fn timeout(&self, priority: Priority) -> Duration {
        let ms = match priority {
            Priority::Immediate => self.priorities.immediate,
            Priority::UserBlocking => self.priorities.user_blocking,
            Priority::Normal => self.priorities.normal,
            Priority::Low => self.priorities.low,
        };
        Duration::from_millis(ms)
    }
}
