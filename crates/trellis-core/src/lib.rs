//! Trellis Core - data model of an incremental UI rendering runtime
//!
//! This crate provides the types the runtime reconciles and commits:
//! - Dynamic property values (`Value`, `Props`, `Handler`)
//! - Element descriptions (`Element`, `ElementKind`, `Component`)
//! - The node arena shared by both tree generations (`FiberTree`, `Node`)
//! - Effect tags recorded during reconciliation (`EffectTag`)
//! - Hook slots and the render context (`RenderCx`)
//! - The single-pass render cache and pending handles (`RenderCache`, `Deferred`)
//! - Render outcomes (`RenderOutcome`, `Interrupt`)
//! - Hydration strategies and handler commands (`Strategy`, `Cmd`)
//! - The error catalogue (`ErrorCode`, `Error`)
//!
//! Nothing here schedules work; see `trellis-runtime` for the work loop.

pub mod cache;
mod cmd;
pub mod effect;
mod element;
mod error;
pub mod fiber;
pub mod hooks;
mod outcome;
mod strategy;
mod value;

pub use cache::{CacheKey, CacheRecord, Deferred, DeferredId, RenderCache, Settlement};
pub use cmd::{Cmd, LogLevel};
pub use effect::EffectTag;
pub use element::{Component, Element, ElementKind, OffscreenMode, RenderFn};
pub use error::{Error, ErrorCode, Result, ERROR_DOCS};
pub use fiber::{Envelope, FiberTree, Node, NodeKey, NodeKind};
pub use hooks::{Cleanup, Dispatch, HookOutput, HookSlot, PendingEffect, RenderCx, RenderSignal, Setter};
pub use outcome::{Interrupt, RenderError, RenderOutcome, RenderResult};
pub use strategy::Strategy;
pub use value::{is_event_prop, Handler, Props, Value};
