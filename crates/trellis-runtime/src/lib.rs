//! Trellis Runtime - time-sliced reconciler and commit emitter
//!
//! This crate drives the data model from `trellis-core`:
//!
//! ```text
//! host ──Inbound──▶ Runtime::dispatch ──▶ request queues
//!                        │
//!                 Runtime::run_slice (5 ms turns)
//!                        │
//!                  RenderContext ── reconcile ── suspense
//!                        │
//!                      commit ──Outbound──▶ HostPort ──▶ host
//! ```
//!
//! ## Key Components
//!
//! - [`Runtime`]: one independent runtime instance; owns the render context,
//!   the request queues and the host port
//! - [`RenderContext`]: both tree generations, the deletion list, the
//!   suspended-node map, the listener map and the actor registry
//! - [`HostPort`]: outbound seam; [`RecordingPort`] and [`JsonLinesPort`] ship
//!   with the crate
//! - [`RuntimeConfig`]: time slice, default strategy and declared priority
//!   timeouts, loadable from RON
//!
//! The runtime is single-threaded. All state lives in the `Runtime` value, so
//! several runtimes can coexist in one process.

pub mod actor;
pub mod commit;
pub mod config;
mod error;
pub mod hydration;
pub mod listeners;
pub mod port;
pub mod protocol;
mod reconcile;
mod scheduler;
mod suspense;

pub use actor::ActorRegistry;
pub use commit::{host_paths, CommitReport, Deletion};
pub use config::{Priority, PriorityTimeouts, RuntimeConfig};
pub use error::{Error, Result};
pub use hydration::PassMode;
pub use listeners::{ListenerEntry, ListenerMap};
pub use port::{HostPort, JsonLinesPort, RecordingPort};
pub use protocol::{Inbound, Mutation, Outbound, Path};
pub use reconcile::RenderContext;
pub use scheduler::{LoopState, Runtime};
pub use suspense::SuspendedEntry;
