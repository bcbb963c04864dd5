//! Runtime and work loop
//!
//! The loop has two states. While `Running`, each call to
//! [`Runtime::run_slice`] is one cooperative turn:
//!
//! 1. a pending high-priority request starts a fresh pass, abandoning any
//!    uncommitted work in progress
//! 2. units of work run until the tree is exhausted or the time slice is spent
//! 3. an exhausted tree is committed
//! 4. the loop stays `Running` while anything is left to do, else goes `Idle`
//!
//! The host calls `run_slice` again from its task queue while the loop is
//! `Running`; `run_until_idle` does exactly that.

use crate::commit::{CommitOutput, CommitReport};
use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use crate::port::HostPort;
use crate::protocol::Inbound;
use crate::reconcile::RenderContext;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use trellis_core::{Cmd, Element, ErrorCode, LogLevel, NodeKey, Strategy, Value};

/// Work loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

#[derive(Debug, Clone)]
enum Request {
    /// Render `element`, or the last active root when `None`
    Root {
        element: Option<Element>,
        transition_id: Option<String>,
        hydrating: bool,
    },
    /// Re-render the boundary of a node whose handle settled
    Resume { node: NodeKey },
}

impl Request {
    fn rerender() -> Self {
        Request::Root {
            element: None,
            transition_id: None,
            hydrating: false,
        }
    }
}

/// One independent runtime instance
pub struct Runtime<P: HostPort> {
    config: RuntimeConfig,
    ctx: RenderContext,
    port: P,
    state: LoopState,
    high: Option<Request>,
    queue: VecDeque<Request>,
    last_root: Option<Element>,
    last_commit: Option<CommitReport>,
}

impl<P: HostPort> Runtime<P> {
    /// Construct a runtime context posting to `port`
    pub fn init(config: RuntimeConfig, port: P) -> Result<Self> {
        config.validate()?;
        let ctx = RenderContext::new(config.default_strategy);
        Ok(Self {
            config,
            ctx,
            port,
            state: LoopState::Idle,
            high: None,
            queue: VecDeque::new(),
            last_root: None,
            last_commit: None,
        })
    }

    /// Drop the context, abandoning any pass in flight, and return the port
    pub fn teardown(mut self) -> P {
        self.ctx.abandon_pass();
        debug!(queued = self.queue.len(), "runtime torn down");
        self.port
    }

    /// Handle one inbound message
    pub fn dispatch(&mut self, message: Inbound) -> Result<()> {
        debug!(message = message.name(), "inbound message");
        match message {
            Inbound::InitHydration { initial_html } => {
                self.ctx.initial_html = Some(initial_html);
            }
            Inbound::Hydrate {
                element,
                transition_id,
                strategy,
            } => {
                self.ctx.strategy = strategy;
                self.request(
                    Request::Root {
                        element: Some(element),
                        transition_id,
                        hydrating: true,
                    },
                    false,
                );
            }
            Inbound::Render {
                element,
                transition_id,
                high_priority,
            } => self.request(
                Request::Root {
                    element: Some(element),
                    transition_id,
                    hydrating: false,
                },
                high_priority,
            ),
            Inbound::Update {
                element,
                transition_id,
                high_priority,
            } => {
                if element.is_none() && self.last_root.is_none() {
                    return Err(Error::catalogued(ErrorCode::NoRoot, "UPDATE without an element"));
                }
                self.request(
                    Request::Root {
                        element,
                        transition_id,
                        hydrating: false,
                    },
                    high_priority,
                );
            }
            Inbound::ExecuteResumableListener {
                listener_id,
                payload,
            } => self.execute_listener(&listener_id, &payload)?,
            Inbound::RegisterActor { id } => {
                let node = self.ctx.rendering.ok_or_else(|| {
                    Error::catalogued(ErrorCode::OutsideRender, format!("REGISTER_ACTOR {}", id))
                })?;
                self.register_actor(id, node);
            }
            Inbound::UnregisterActor { id } => {
                if self.ctx.actors.unregister(&id).is_none() {
                    warn!(actor = %id, "unregistering an unknown actor");
                }
            }
            Inbound::SendMessage {
                source_id,
                target_id,
                message,
            } => self.send(&source_id, &target_id, message)?,
        }
        Ok(())
    }

    /// One cooperative turn of the work loop
    pub fn run_slice(&mut self) -> Result<LoopState> {
        self.collect_signals();

        if let Some(request) = self.high.take() {
            if self.ctx.is_working() {
                debug!("high-priority request preempts the pass in flight");
                self.ctx.abandon_pass();
            }
            self.start(request)?;
        }
        while !self.ctx.is_working() {
            let Some(request) = self.queue.pop_front() else {
                break;
            };
            self.start(request)?;
        }

        if self.ctx.is_working() {
            let deadline = Instant::now() + self.config.time_slice();
            loop {
                match self.ctx.work_unit() {
                    Ok(true) => {
                        if Instant::now() >= deadline {
                            break;
                        }
                    }
                    Ok(false) => {
                        self.finish_pass()?;
                        break;
                    }
                    Err(err) => {
                        error!(%err, "render pass aborted");
                        self.ctx.abandon_pass();
                        self.state = LoopState::Idle;
                        return Err(err);
                    }
                }
            }
        }

        let more = self.ctx.is_working()
            || self.high.is_some()
            || !self.queue.is_empty()
            || !self.ctx.signal.is_quiet();
        self.state = if more {
            LoopState::Running
        } else {
            LoopState::Idle
        };
        Ok(self.state)
    }

    /// Run slices until the loop goes idle
    pub fn run_until_idle(&mut self) -> Result<()> {
        while self.run_slice()? == LoopState::Running {}
        Ok(())
    }

    /// Current work loop state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Configuration the runtime was started with
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Strategy for passes started from now on
    pub fn strategy(&self) -> Strategy {
        self.ctx.strategy
    }

    /// Change the strategy for passes started from now on
    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.ctx.strategy = strategy;
    }

    /// Summary of the most recent commit
    pub fn last_commit(&self) -> Option<&CommitReport> {
        self.last_commit.as_ref()
    }

    /// The host port
    pub fn port(&self) -> &P {
        &self.port
    }

    /// The host port, mutably
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Render context, for inspection
    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// Markup recorded by `INIT_HYDRATION`
    pub fn initial_html(&self) -> Option<&str> {
        self.ctx.initial_html.as_deref()
    }

    /// Registered resumable listener ids
    pub fn listener_ids(&self) -> Vec<String> {
        self.ctx.listeners.ids().map(str::to_string).collect()
    }

    /// Node registered under an actor id
    pub fn actor(&self, id: &str) -> Option<NodeKey> {
        self.ctx.actors.get(id)
    }

    /// Number of parked suspended nodes
    pub fn suspended_count(&self) -> usize {
        self.ctx.suspended.len()
    }

    fn request(&mut self, request: Request, high_priority: bool) {
        if high_priority {
            if self.high.replace(request).is_some() {
                debug!("pending high-priority request replaced");
            }
        } else {
            self.queue.push_back(request);
        }
        self.state = LoopState::Running;
    }

    /// Move requests raised by setters and settled handles onto the queues
    fn collect_signals(&mut self) {
        let (normal, high) = self.ctx.signal.take_requests();
        if high && self.high.is_none() {
            self.high = Some(Request::rerender());
        }
        if normal {
            let queued = self.queue.iter().any(|r| {
                matches!(
                    r,
                    Request::Root {
                        element: None,
                        ..
                    }
                )
            });
            if !queued {
                self.queue.push_back(Request::rerender());
            }
        }
        for node in self.ctx.signal.take_woken().into_iter().rev() {
            self.queue.push_front(Request::Resume { node });
        }
    }

    fn start(&mut self, request: Request) -> Result<()> {
        match request {
            Request::Root {
                element,
                transition_id,
                hydrating,
            } => {
                let element = element.or_else(|| self.last_root.clone()).ok_or_else(|| {
                    Error::catalogued(ErrorCode::NoRoot, "re-render requested with no root")
                })?;
                self.last_root = Some(element.clone());
                self.ctx.begin_full_pass(element, transition_id, hydrating);
            }
            Request::Resume { node } => {
                if let Some((boundary, transition_id)) = self.ctx.resume_target(node) {
                    self.ctx.begin_partial_pass(boundary, transition_id);
                }
            }
        }
        Ok(())
    }

    fn finish_pass(&mut self) -> Result<()> {
        let Some(CommitOutput {
            message,
            mut report,
            effects,
        }) = self.ctx.commit()
        else {
            return Ok(());
        };
        if let Some(message) = message {
            self.port
                .post(message)
                .map_err(|err| Error::catalogued(ErrorCode::HostPort, err.to_string()))?;
        }
        if !report.dry_run {
            for effect in effects {
                effect.run();
                report.effects_run += 1;
            }
        }
        self.last_commit = Some(report);
        Ok(())
    }

    fn execute_listener(&mut self, listener_id: &str, payload: &Value) -> Result<()> {
        let Some(entry) = self.ctx.listeners.get(listener_id).cloned() else {
            warn!(listener = listener_id, "no resumable listener under this id");
            return Err(Error::catalogued(ErrorCode::UnknownListener, listener_id));
        };
        self.ctx.rendering = Some(entry.node);
        let cmd = entry.handler.call(payload);
        let applied = self.apply_cmd(cmd, entry.node);
        self.ctx.rendering = None;
        applied
    }

    /// Apply a handler's command with `owner` as the active node
    fn apply_cmd(&mut self, cmd: Cmd, owner: NodeKey) -> Result<()> {
        for leaf in cmd.into_leaves() {
            match leaf {
                Cmd::RegisterActor(id) => self.register_actor(id, owner),
                Cmd::UnregisterActor(id) => {
                    self.ctx.actors.unregister(&id);
                }
                Cmd::Send { target, message } => {
                    let from = match self.ctx.actors.id_of(owner) {
                        Some(id) => id.to_string(),
                        None => self
                            .ctx
                            .tree
                            .get(owner)
                            .map(|n| n.kind.label())
                            .unwrap_or_default(),
                    };
                    self.send(&from, &target, message)?;
                }
                Cmd::RequestRender { high_priority } => {
                    self.request(Request::rerender(), high_priority)
                }
                Cmd::Log { level, message } => match level {
                    LogLevel::Debug => debug!("{}", message),
                    LogLevel::Info => info!("{}", message),
                    LogLevel::Warn => warn!("{}", message),
                    LogLevel::Error => error!("{}", message),
                },
                Cmd::None | Cmd::Batch(_) => {}
            }
        }
        Ok(())
    }

    fn register_actor(&mut self, id: String, node: NodeKey) {
        if let Some(target) = self.ctx.tree.get_mut(node) {
            target.message_queue.get_or_insert_with(Vec::new);
        }
        self.ctx.actors.register(id, node);
    }

    /// Deliver to an actor's inbox and re-render from the root
    fn send(&mut self, from: &str, target: &str, message: Value) -> Result<()> {
        let ctx = &mut self.ctx;
        ctx.actors.deliver(&mut ctx.tree, from, target, message)?;
        self.request(Request::rerender(), true);
        Ok(())
    }
}

impl<P: HostPort + std::fmt::Debug> std::fmt::Debug for Runtime<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("state", &self.state)
            .field("strategy", &self.ctx.strategy)
            .field("queued", &self.queue.len())
            .field("port", &self.port)
            .finish()
    }
}
