//! Hook slots and the render context
//!
//! Each component node owns an ordered list of [`HookSlot`]s. While the
//! component renders, every hook call takes the next position and is matched
//! against the slot at the same position on the node's alternate. Calling
//! hooks conditionally or in a different order is outside the contract; a slot
//! of the wrong shape is simply re-initialised.

use crate::cache::{Deferred, RenderCache};
use crate::fiber::{Envelope, NodeKey};
use crate::outcome::Interrupt;
use crate::{EffectTag, Value};
use serde::Serialize;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// Cleanup returned by an effect
pub type Cleanup = Box<dyn FnOnce()>;

type UpdateFn = Rc<dyn Fn(Rc<dyn Any>) -> Rc<dyn Any>>;
type UpdateQueue = Rc<RefCell<Vec<UpdateFn>>>;
type CleanupCell = Rc<RefCell<Option<Cleanup>>>;

/// One persistent hook slot
#[derive(Clone)]
pub enum HookSlot {
    /// `use_state` / `use_reducer`; the queue is shared across generations
    ///
    /// `value` already reflects the first `consumed` queued updates. They
    /// leave the queue only when the slot is committed.
    State {
        value: Rc<dyn Any>,
        queue: UpdateQueue,
        consumed: usize,
    },
    /// `use_memo`
    Memo { value: Rc<dyn Any>, deps: Vec<Value> },
    /// `use_ref`; holds an `Rc<RefCell<T>>`
    Ref(Rc<dyn Any>),
    /// `use_effect`; the cleanup cell is shared across generations
    Effect {
        deps: Option<Vec<Value>>,
        cleanup: CleanupCell,
    },
    /// `use_actor`
    Actor(String),
}

impl HookSlot {
    /// Drop the queued updates this slot's value already includes
    ///
    /// Called once the slot belongs to the committed tree.
    pub fn settle(&mut self) {
        if let HookSlot::State {
            queue, consumed, ..
        } = self
        {
            let mut pending = queue.borrow_mut();
            let applied = (*consumed).min(pending.len());
            pending.drain(..applied);
            *consumed = 0;
        }
    }

    /// Run the stored cleanup of an effect slot, if any
    pub fn run_cleanup(&self) {
        if let HookSlot::Effect { cleanup, .. } = self {
            let pending = cleanup.borrow_mut().take();
            if let Some(cleanup) = pending {
                cleanup();
            }
        }
    }
}

impl fmt::Debug for HookSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookSlot::State {
                queue, consumed, ..
            } => write!(
                f,
                "State(pending: {}, applied: {})",
                queue.borrow().len(),
                consumed
            ),
            HookSlot::Memo { deps, .. } => write!(f, "Memo({:?})", deps),
            HookSlot::Ref(_) => write!(f, "Ref"),
            HookSlot::Effect { deps, .. } => write!(f, "Effect({:?})", deps),
            HookSlot::Actor(id) => write!(f, "Actor({})", id),
        }
    }
}

/// A lifecycle effect queued for after commit
pub struct PendingEffect {
    run: Box<dyn FnOnce() -> Option<Cleanup>>,
    cleanup: CleanupCell,
}

impl PendingEffect {
    /// Run the previous cleanup, then the effect, storing its new cleanup
    pub fn run(self) {
        let previous = self.cleanup.borrow_mut().take();
        if let Some(previous) = previous {
            previous();
        }
        let next = (self.run)();
        *self.cleanup.borrow_mut() = next;
    }
}

impl fmt::Debug for PendingEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PendingEffect")
    }
}

/// Render requests raised outside the work loop
///
/// Shared between the runtime and every state setter and pending-handle
/// waiter. The runtime drains it at the start of each scheduling turn.
#[derive(Debug, Default)]
pub struct RenderSignal {
    normal: Cell<bool>,
    high: Cell<bool>,
    resumed: RefCell<Vec<NodeKey>>,
}

impl RenderSignal {
    /// Create a quiet signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a re-render of the last active root
    pub fn request(&self, high_priority: bool) {
        if high_priority {
            self.high.set(true);
        } else {
            self.normal.set(true);
        }
    }

    /// Take pending root requests as `(normal, high)`
    pub fn take_requests(&self) -> (bool, bool) {
        (self.normal.replace(false), self.high.replace(false))
    }

    /// Record that the node suspended on a now-settled handle
    pub fn wake(&self, node: NodeKey) {
        self.resumed.borrow_mut().push(node);
    }

    /// Take woken suspended nodes in wake order
    pub fn take_woken(&self) -> Vec<NodeKey> {
        std::mem::take(&mut *self.resumed.borrow_mut())
    }

    /// Check if nothing is pending
    pub fn is_quiet(&self) -> bool {
        !self.normal.get() && !self.high.get() && self.resumed.borrow().is_empty()
    }
}

/// Setter returned by `use_state`
pub struct Setter<T> {
    queue: UpdateQueue,
    signal: Rc<RenderSignal>,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            signal: self.signal.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> Setter<T> {
    /// Replace the state on the next render
    pub fn set(&self, value: T) {
        let value: Rc<dyn Any> = Rc::new(value);
        self.queue
            .borrow_mut()
            .push(Rc::new(move |_: Rc<dyn Any>| value.clone()));
        self.signal.request(false);
    }

    /// Derive the next state from the previous one on the next render
    ///
    /// `f` may run more than once when a render pass is abandoned and redone.
    pub fn update(&self, f: impl Fn(&T) -> T + 'static) {
        self.queue.borrow_mut().push(Rc::new(move |prev: Rc<dyn Any>| {
            match prev.downcast_ref::<T>().map(&f) {
                Some(next) => Rc::new(next) as Rc<dyn Any>,
                None => prev,
            }
        }));
        self.signal.request(false);
    }
}

/// Dispatcher returned by `use_reducer`
pub struct Dispatch<S, A> {
    setter: Setter<S>,
    reducer: fn(&S, A) -> S,
}

impl<S, A> Clone for Dispatch<S, A> {
    fn clone(&self) -> Self {
        Self {
            setter: self.setter.clone(),
            reducer: self.reducer,
        }
    }
}

impl<S: 'static, A: Clone + 'static> Dispatch<S, A> {
    /// Queue an action for the reducer
    pub fn dispatch(&self, action: A) {
        let reducer = self.reducer;
        self.setter.update(move |state| reducer(state, action.clone()));
    }
}

/// Everything a component render produced besides its children
#[derive(Debug, Default)]
pub struct HookOutput {
    pub slots: Vec<HookSlot>,
    pub effects: Vec<PendingEffect>,
    pub registrations: Vec<String>,
    pub tags: EffectTag,
}

/// Context handed to a component while it renders
pub struct RenderCx<'a> {
    node: NodeKey,
    prev: &'a [HookSlot],
    cursor: usize,
    cache: &'a mut RenderCache,
    signal: &'a Rc<RenderSignal>,
    inbox: &'a mut Vec<Envelope>,
    out: HookOutput,
}

impl<'a> RenderCx<'a> {
    /// Open a render context for `node`
    ///
    /// `prev` is the slot list of the node's alternate (or of the node itself
    /// when it resumes after suspending).
    pub fn new(
        node: NodeKey,
        prev: &'a [HookSlot],
        cache: &'a mut RenderCache,
        signal: &'a Rc<RenderSignal>,
        inbox: &'a mut Vec<Envelope>,
    ) -> Self {
        Self {
            node,
            prev,
            cursor: 0,
            cache,
            signal,
            inbox,
            out: HookOutput::default(),
        }
    }

    /// The node being rendered
    pub fn node(&self) -> NodeKey {
        self.node
    }

    fn next_prev(&mut self) -> Option<&'a HookSlot> {
        let slot = self.prev.get(self.cursor);
        self.cursor += 1;
        slot
    }

    /// Persistent state
    pub fn use_state<T: Clone + 'static>(&mut self, init: impl FnOnce() -> T) -> (T, Setter<T>) {
        let resumed = match self.next_prev() {
            Some(HookSlot::State {
                value,
                queue,
                consumed,
            }) => {
                let mut value = value.clone();
                let updates: Vec<UpdateFn> =
                    queue.borrow().iter().skip(*consumed).cloned().collect();
                for update in &updates {
                    value = update(value);
                }
                let consumed = consumed + updates.len();
                value
                    .downcast::<T>()
                    .ok()
                    .map(|v| (v, queue.clone(), consumed))
            }
            _ => None,
        };
        let (value, queue, consumed) = match resumed {
            Some(found) => found,
            None => (Rc::new(init()), UpdateQueue::default(), 0),
        };

        self.out.slots.push(HookSlot::State {
            value: value.clone() as Rc<dyn Any>,
            queue: queue.clone(),
            consumed,
        });
        let setter = Setter {
            queue,
            signal: self.signal.clone(),
            _marker: PhantomData,
        };
        ((*value).clone(), setter)
    }

    /// State driven by a reducer
    pub fn use_reducer<S: Clone + 'static, A: Clone + 'static>(
        &mut self,
        reducer: fn(&S, A) -> S,
        init: impl FnOnce() -> S,
    ) -> (S, Dispatch<S, A>) {
        let (state, setter) = self.use_state(init);
        (state, Dispatch { setter, reducer })
    }

    /// A mutable cell that survives re-renders without triggering them
    pub fn use_ref<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
        if let Some(HookSlot::Ref(cell)) = self.next_prev() {
            if let Ok(typed) = cell.clone().downcast::<RefCell<T>>() {
                self.out.slots.push(HookSlot::Ref(cell.clone()));
                return typed;
            }
        }
        let typed = Rc::new(RefCell::new(init()));
        self.out.slots.push(HookSlot::Ref(typed.clone() as Rc<dyn Any>));
        self.out.tags |= EffectTag::REF;
        typed
    }

    /// Recompute only when `deps` change
    pub fn use_memo<T: Clone + 'static>(&mut self, deps: Vec<Value>, compute: impl FnOnce() -> T) -> T {
        let reused = match self.next_prev() {
            Some(HookSlot::Memo { value, deps: prev }) if *prev == deps => {
                value.clone().downcast::<T>().ok()
            }
            _ => None,
        };
        let value = reused.unwrap_or_else(|| Rc::new(compute()));
        self.out.slots.push(HookSlot::Memo {
            value: value.clone() as Rc<dyn Any>,
            deps,
        });
        (*value).clone()
    }

    /// Run `effect` after commit when `deps` change (`None` = every render)
    pub fn use_effect(
        &mut self,
        deps: Option<Vec<Value>>,
        effect: impl FnOnce() -> Option<Cleanup> + 'static,
    ) {
        let (changed, cleanup) = match self.next_prev() {
            Some(HookSlot::Effect {
                deps: prev,
                cleanup,
            }) => (deps.is_none() || *prev != deps, cleanup.clone()),
            _ => (true, CleanupCell::default()),
        };
        if changed {
            self.out.effects.push(PendingEffect {
                run: Box::new(effect),
                cleanup: cleanup.clone(),
            });
            self.out.tags |= EffectTag::LIFECYCLE;
        }
        self.out.slots.push(HookSlot::Effect { deps, cleanup });
    }

    /// Register this node on the actor bus and take its latest message
    ///
    /// Draining the inbox clears it; only the most recently queued message is
    /// returned.
    pub fn use_actor(&mut self, id: impl Into<String>) -> Option<Envelope> {
        let id = id.into();
        self.next_prev();
        self.out.slots.push(HookSlot::Actor(id.clone()));
        self.out.registrations.push(id);
        let latest = self.inbox.pop();
        self.inbox.clear();
        latest
    }

    /// Read a memoized asynchronous computation
    ///
    /// Suspends (via `?`) while the computation is pending.
    pub fn cached<A: Serialize + ?Sized>(
        &mut self,
        computation: &'static str,
        args: &A,
        compute: impl FnOnce() -> Deferred,
    ) -> Result<Value, Interrupt> {
        self.cache.read(computation, args, compute)
    }

    /// Close the context and hand back what the render produced
    pub fn finish(self) -> HookOutput {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    struct Harness {
        node: NodeKey,
        cache: RenderCache,
        signal: Rc<RenderSignal>,
        inbox: Vec<Envelope>,
        slots: Vec<HookSlot>,
    }

    impl Harness {
        fn new() -> Self {
            let mut keys: SlotMap<NodeKey, ()> = SlotMap::with_key();
            Self {
                node: keys.insert(()),
                cache: RenderCache::new(),
                signal: Rc::new(RenderSignal::new()),
                inbox: Vec::new(),
                slots: Vec::new(),
            }
        }

        fn render<R>(&mut self, body: impl FnOnce(&mut RenderCx<'_>) -> R) -> (R, HookOutput) {
            let prev = std::mem::take(&mut self.slots);
            let mut cx = RenderCx::new(self.node, &prev, &mut self.cache, &self.signal, &mut self.inbox);
            let result = body(&mut cx);
            let out = cx.finish();
            self.slots = out.slots.clone();
            for slot in &mut self.slots {
                slot.settle();
            }
            (result, out)
        }

        /// Render against the current slots without committing the result
        fn render_discarded<R>(&mut self, body: impl FnOnce(&mut RenderCx<'_>) -> R) -> R {
            let mut cx = RenderCx::new(self.node, &self.slots, &mut self.cache, &self.signal, &mut self.inbox);
            body(&mut cx)
        }
    }

    #[test]
    fn test_state_persists_and_updates() {
        let mut h = Harness::new();
        let ((count, set), _) = h.render(|cx| cx.use_state(|| 1i64));
        assert_eq!(count, 1);
        assert!(h.signal.is_quiet());

        set.set(5);
        assert_eq!(h.signal.take_requests(), (true, false));
        let ((count, _), _) = h.render(|cx| cx.use_state(|| 1i64));
        assert_eq!(count, 5);

        set.update(|n| n * 2);
        let ((count, _), _) = h.render(|cx| cx.use_state(|| 1i64));
        assert_eq!(count, 10);
    }

    #[test]
    fn test_discarded_render_keeps_queued_updates() {
        let mut h = Harness::new();
        let ((_, set), _) = h.render(|cx| cx.use_state(|| 0i64));
        set.update(|n| n + 1);
        set.update(|n| n + 1);

        let (seen, _) = h.render_discarded(|cx| cx.use_state(|| 0i64));
        assert_eq!(seen, 2);
        let (seen, _) = h.render_discarded(|cx| cx.use_state(|| 0i64));
        assert_eq!(seen, 2);

        let ((count, _), out) = h.render(|cx| cx.use_state(|| 0i64));
        assert_eq!(count, 2);
        assert!(matches!(&out.slots[0], HookSlot::State { consumed: 2, .. }));
        assert!(matches!(&h.slots[0], HookSlot::State { consumed: 0, .. }));

        set.set(7);
        let ((count, _), _) = h.render(|cx| cx.use_state(|| 0i64));
        assert_eq!(count, 7);
    }

    #[test]
    fn test_partly_applied_slot_resumes_where_it_stopped() {
        let mut h = Harness::new();
        let ((_, set), _) = h.render(|cx| cx.use_state(|| 10i64));
        set.update(|n| n * 2);
        // a parked render keeps its unsettled slots
        h.slots = {
            let mut cx = RenderCx::new(h.node, &h.slots, &mut h.cache, &h.signal, &mut h.inbox);
            cx.use_state(|| 10i64);
            cx.finish().slots
        };
        set.update(|n| n + 1);

        let ((count, _), _) = h.render(|cx| cx.use_state(|| 10i64));
        assert_eq!(count, 21);
    }

    #[test]
    fn test_reducer() {
        fn reduce(state: &i64, action: i64) -> i64 {
            state + action
        }
        let mut h = Harness::new();
        let ((_, dispatch), _) = h.render(|cx| cx.use_reducer(reduce, || 0));
        dispatch.dispatch(3);
        dispatch.dispatch(4);
        let ((state, _), _) = h.render(|cx| cx.use_reducer(reduce, || 0));
        assert_eq!(state, 7);
    }

    #[test]
    fn test_memo_recomputes_on_dep_change() {
        let mut h = Harness::new();
        let calls = Rc::new(Cell::new(0));
        for (dep, expected_calls) in [(1i64, 1), (1, 1), (2, 2)] {
            let c = calls.clone();
            h.render(|cx| {
                cx.use_memo(vec![dep.into()], move || {
                    c.set(c.get() + 1);
                    dep * 10
                })
            });
            assert_eq!(calls.get(), expected_calls);
        }
    }

    #[test]
    fn test_ref_survives_and_tags_on_mount() {
        let mut h = Harness::new();
        let (cell, out) = h.render(|cx| cx.use_ref(|| 0u32));
        assert!(out.tags.contains(EffectTag::REF));
        *cell.borrow_mut() = 9;

        let (cell, out) = h.render(|cx| cx.use_ref(|| 0u32));
        assert!(!out.tags.contains(EffectTag::REF));
        assert_eq!(*cell.borrow(), 9);
    }

    #[test]
    fn test_effect_runs_on_dep_change_with_cleanup() {
        let mut h = Harness::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for dep in [1i64, 1, 2] {
            let l = log.clone();
            let (_, out) = h.render(|cx| {
                cx.use_effect(Some(vec![dep.into()]), move || {
                    l.borrow_mut().push(format!("run {}", dep));
                    let l = l.clone();
                    Some(Box::new(move || l.borrow_mut().push(format!("clean {}", dep))) as Cleanup)
                })
            });
            for effect in out.effects {
                effect.run();
            }
        }
        assert_eq!(*log.borrow(), vec!["run 1", "clean 1", "run 2"]);

        for slot in &h.slots {
            slot.run_cleanup();
        }
        assert_eq!(log.borrow().last().map(String::as_str), Some("clean 2"));
    }

    #[test]
    fn test_actor_inbox_keeps_latest() {
        let mut h = Harness::new();
        h.inbox.push(Envelope {
            from: "a".into(),
            message: 1i64.into(),
        });
        h.inbox.push(Envelope {
            from: "b".into(),
            message: 2i64.into(),
        });
        let (latest, out) = h.render(|cx| cx.use_actor("panel"));
        assert_eq!(latest.map(|e| e.from), Some("b".to_string()));
        assert_eq!(out.registrations, vec!["panel".to_string()]);
        assert!(h.inbox.is_empty());

        let (latest, _) = h.render(|cx| cx.use_actor("panel"));
        assert!(latest.is_none());
    }

    #[test]
    fn test_mismatched_slot_reinitialises() {
        let mut h = Harness::new();
        h.render(|cx| cx.use_ref(|| "text"));
        let ((value, _), _) = h.render(|cx| cx.use_state(|| 3i64));
        assert_eq!(value, 3);
    }
}
