//! Pending handles and the render-scoped cache
//!
//! A [`Deferred`] is the handle a component suspends on. Whoever owns the
//! asynchronous work settles it with [`Deferred::resolve`] or
//! [`Deferred::reject`]; settling wakes every waiter registered with
//! [`Deferred::on_settle`].
//!
//! [`RenderCache`] memoizes computations by name plus serialized arguments for
//! the length of one top-level render pass.

use crate::outcome::{Interrupt, RenderError};
use crate::Value;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DEFERRED_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a pending handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeferredId(pub u64);

impl fmt::Display for DeferredId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deferred:{}", self.0)
    }
}

/// State of a pending handle
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Pending,
    Resolved(Value),
    Rejected(RenderError),
}

struct DeferredInner {
    state: Settlement,
    waiters: Vec<Box<dyn FnOnce()>>,
}

/// Handle to an asynchronous result
#[derive(Clone)]
pub struct Deferred {
    id: DeferredId,
    inner: Rc<RefCell<DeferredInner>>,
}

impl Deferred {
    fn with_state(state: Settlement) -> Self {
        Self {
            id: DeferredId(NEXT_DEFERRED_ID.fetch_add(1, Ordering::Relaxed)),
            inner: Rc::new(RefCell::new(DeferredInner {
                state,
                waiters: Vec::new(),
            })),
        }
    }

    /// A handle that has not settled yet
    pub fn pending() -> Self {
        Self::with_state(Settlement::Pending)
    }

    /// A handle that is already resolved
    pub fn resolved(value: impl Into<Value>) -> Self {
        Self::with_state(Settlement::Resolved(value.into()))
    }

    /// A handle that is already rejected
    pub fn rejected(err: RenderError) -> Self {
        Self::with_state(Settlement::Rejected(err))
    }

    /// Get the handle id
    pub fn id(&self) -> DeferredId {
        self.id
    }

    /// Current state
    pub fn state(&self) -> Settlement {
        self.inner.borrow().state.clone()
    }

    /// Check whether the handle is still pending
    pub fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, Settlement::Pending)
    }

    /// Resolve the handle; ignored if it already settled
    pub fn resolve(&self, value: impl Into<Value>) {
        self.settle(Settlement::Resolved(value.into()));
    }

    /// Reject the handle; ignored if it already settled
    pub fn reject(&self, err: RenderError) {
        self.settle(Settlement::Rejected(err));
    }

    /// Run `waiter` once the handle settles (immediately if it already has)
    pub fn on_settle(&self, waiter: impl FnOnce() + 'static) {
        let mut inner = self.inner.borrow_mut();
        if matches!(inner.state, Settlement::Pending) {
            inner.waiters.push(Box::new(waiter));
        } else {
            drop(inner);
            waiter();
        }
    }

    fn settle(&self, state: Settlement) {
        let waiters = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, Settlement::Pending) {
                return;
            }
            inner.state = state;
            std::mem::take(&mut inner.waiters)
        };
        for waiter in waiters {
            waiter();
        }
    }
}

impl PartialEq for Deferred {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("id", &self.id)
            .field("state", &self.inner.borrow().state)
            .finish()
    }
}

/// Cache key: computation identity plus serialized arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub computation: &'static str,
    pub args: String,
}

/// A cached computation
#[derive(Debug, Clone)]
pub enum CacheRecord {
    /// In flight; readers suspend on the handle
    Pending(Deferred),
    /// Completed with a value
    Resolved(Value),
    /// Completed with a failure; readers fail with it
    Rejected(RenderError),
}

/// Single-pass memo of asynchronous computations
#[derive(Debug, Default)]
pub struct RenderCache {
    records: HashMap<CacheKey, CacheRecord>,
}

impl RenderCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Read a computation, starting it on a miss
    ///
    /// `compute` runs only when no record exists for `(computation, args)`.
    /// A pending record suspends the caller on the same handle every time.
    pub fn read<A: Serialize + ?Sized>(
        &mut self,
        computation: &'static str,
        args: &A,
        compute: impl FnOnce() -> Deferred,
    ) -> Result<Value, Interrupt> {
        let args = serde_json::to_string(args).map_err(|e| {
            Interrupt::Fail(RenderError::new(format!(
                "cannot serialize arguments of {}: {}",
                computation, e
            )))
        })?;
        let record = self
            .records
            .entry(CacheKey { computation, args })
            .or_insert_with(|| CacheRecord::Pending(compute()));

        let settled = match record {
            CacheRecord::Pending(handle) => handle.state(),
            _ => Settlement::Pending,
        };
        match settled {
            Settlement::Resolved(value) => *record = CacheRecord::Resolved(value),
            Settlement::Rejected(err) => *record = CacheRecord::Rejected(err),
            Settlement::Pending => {}
        }

        match record {
            CacheRecord::Pending(handle) => Err(Interrupt::Suspend(handle.clone())),
            CacheRecord::Resolved(value) => Ok(value.clone()),
            CacheRecord::Rejected(err) => Err(Interrupt::Fail(err.clone())),
        }
    }
}
