//! Commands: the units of behaviour stacked on a controller.

use serde::Serialize;

use crate::agent::Agent;
use crate::class::{CommandClass, CommandId};
use crate::controller::HostCore;
use crate::diagnostics::{category, Severity};
use crate::frame::{
    self, CodeCursor, GotoStateOutcome, Label, LatentId, StateError, StateFrame, StateName,
    BEGIN_LABEL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Status {
    #[default]
    InProgress,
    Success,
    Failure,
    Aborted,
}

/// How a push is reconciled with an active command of the same class.
///
/// `replace_same_class` wins over `allow_same_class`; with neither set the
/// push is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushPolicy {
    pub replace_same_class: bool,
    pub allow_same_class: bool,
}

impl PushPolicy {
    pub const fn replace() -> Self {
        Self {
            replace_same_class: true,
            allow_same_class: false,
        }
    }

    pub const fn allow() -> Self {
        Self {
            replace_same_class: false,
            allow_same_class: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortTarget {
    Instance(CommandId),
    Class(CommandClass),
}

impl AbortTarget {
    pub(crate) fn matches(&self, runtime: &CommandRuntime) -> bool {
        match self {
            AbortTarget::Instance(id) => runtime.id == *id,
            AbortTarget::Class(class) => runtime.class == *class,
        }
    }
}

/// Structural changes requested from inside hooks and state code. The
/// controller applies them once the hook or instruction returns.
pub(crate) enum Request<A: Agent> {
    Push {
        command: Box<dyn Command<A>>,
        description: String,
    },
    Pop(CommandId),
    Abort(AbortTarget),
}

/// Framework-owned lifecycle of a pushed command.
#[derive(Debug)]
pub(crate) struct CommandRuntime {
    pub(crate) id: CommandId,
    pub(crate) class: CommandClass,
    pub(crate) states: &'static [StateName],
    pub(crate) frame: StateFrame,
    pub(crate) status: Status,
    pub(crate) aborted: bool,
    pub(crate) pending_pop: bool,
    pub(crate) ignore_notifications: bool,
    pub(crate) child_status: Option<Status>,
}

pub(crate) struct CommandNode<A: Agent> {
    pub(crate) command: Box<dyn Command<A>>,
    pub(crate) runtime: CommandRuntime,
}

impl<A: Agent> CommandNode<A> {
    pub(crate) fn new(command: Box<dyn Command<A>>, id: CommandId, class: CommandClass) -> Self {
        let states = command.states();
        Self {
            command,
            runtime: CommandRuntime {
                id,
                class,
                states,
                frame: StateFrame::new(),
                status: Status::InProgress,
                aborted: false,
                pending_pop: false,
                ignore_notifications: false,
                child_status: None,
            },
        }
    }
}

/// A unit of behaviour on a controller's command stack.
///
/// Every hook has an empty default. Hooks are invoked by the controller;
/// structural requests made through the context (push, pop, abort) are
/// applied right after the hook returns.
pub trait Command<A: Agent>: 'static {
    fn class(&self) -> CommandClass {
        CommandClass::of::<Self>()
    }

    fn push_policy(&self) -> PushPolicy {
        PushPolicy::default()
    }

    /// States the command's code knows. Empty accepts any state name.
    fn states(&self) -> &'static [StateName] {
        &[]
    }

    /// State entered when the command is pushed.
    fn auto_state(&self) -> Option<StateName> {
        None
    }

    fn pre_push(&mut self, _ctx: &mut CommandContext<'_, A>) {}

    fn pushed(&mut self, _ctx: &mut CommandContext<'_, A>) {}

    fn paused(&mut self, _child: CommandClass, _ctx: &mut CommandContext<'_, A>) {}

    fn internal_tick(&mut self, _delta_seconds: f32, _ctx: &mut CommandContext<'_, A>) {}

    fn resumed(
        &mut self,
        _child: CommandClass,
        _child_status: Status,
        _ctx: &mut CommandContext<'_, A>,
    ) {
    }

    fn popped(&mut self, _ctx: &mut CommandContext<'_, A>) {}

    /// Runs the instruction under the frame's cursor.
    fn execute(&mut self, _ctx: &mut CommandContext<'_, A>) -> frame::Flow {
        frame::Flow::Stop
    }

    /// Polls a custom latent action started with `begin_latent`. Sleeps are
    /// polled by the controller.
    fn poll_latent(
        &mut self,
        _latent: LatentId,
        _delta_seconds: f32,
        _ctx: &mut CommandContext<'_, A>,
    ) {
    }

    fn dump_string(&self) -> String {
        self.class().short_name()
    }
}

pub struct CommandContext<'a, A: Agent> {
    runtime: &'a mut CommandRuntime,
    host: &'a mut HostCore<A>,
}

impl<'a, A: Agent> CommandContext<'a, A> {
    pub(crate) fn new(runtime: &'a mut CommandRuntime, host: &'a mut HostCore<A>) -> Self {
        Self { runtime, host }
    }

    pub fn id(&self) -> CommandId {
        self.runtime.id
    }

    pub fn class(&self) -> CommandClass {
        self.runtime.class
    }

    pub fn status(&self) -> Status {
        self.runtime.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.runtime.status = status;
    }

    pub fn is_aborted(&self) -> bool {
        self.runtime.aborted
    }

    /// Final status of the most recently popped child.
    pub fn child_status(&self) -> Option<Status> {
        self.runtime.child_status
    }

    pub fn set_ignore_notifications(&mut self, ignore: bool) {
        self.runtime.ignore_notifications = ignore;
    }

    pub fn frame(&self) -> &StateFrame {
        &self.runtime.frame
    }

    pub fn state(&self) -> Option<StateName> {
        self.runtime.frame.state()
    }

    pub fn cursor(&self) -> Option<CodeCursor> {
        self.runtime.frame.code()
    }

    pub fn agent(&self) -> Option<&A> {
        self.host.pawn.as_ref()
    }

    pub fn agent_mut(&mut self) -> Option<&mut A> {
        self.host.pawn.as_mut()
    }

    pub fn world_time(&self) -> f64 {
        self.host.world_time()
    }

    pub fn sleep(&mut self, seconds: f32) {
        self.runtime.frame.sleep(seconds);
    }

    /// Blocks this command on `latent` until it is finished. The sleep id
    /// is refused; use `sleep` for timed waits.
    pub fn begin_latent(&mut self, latent: LatentId) -> bool {
        let started = self.runtime.frame.begin_latent(latent);
        if !started {
            let message = format!(
                "{} {}: latent id {latent} is reserved for sleep",
                self.runtime.class, self.runtime.id
            );
            self.host.log(category::STATE, Severity::Warning, &message);
        }
        started
    }

    pub fn finish_latent(&mut self) {
        self.runtime.frame.clear_latent();
    }

    pub fn goto_state(&mut self, state: StateName) -> GotoStateOutcome {
        self.goto_state_at(state, BEGIN_LABEL)
    }

    /// Transitions this command's frame. The controller's pending latent
    /// action is cleared first so nothing stale survives the change.
    pub fn goto_state_at(&mut self, state: StateName, label: Label) -> GotoStateOutcome {
        self.host.frame.clear_latent();
        let outcome = frame::transition(&mut self.runtime.frame, self.runtime.states, state, label);
        if outcome == GotoStateOutcome::NotFound {
            let message = format!(
                "{} {}: state {state} not found",
                self.runtime.class, self.runtime.id
            );
            self.host.log(category::STATE, Severity::Warning, &message);
        }
        outcome
    }

    pub fn goto_label(&mut self, label: Label) -> bool {
        self.host.frame.clear_latent();
        self.runtime.frame.goto_label(label)
    }

    pub fn push_state(&mut self, state: StateName, label: Label) -> Result<(), StateError> {
        let result =
            frame::push_known_state(&mut self.runtime.frame, self.runtime.states, state, label);
        if let Err(err) = &result {
            let message = format!("{} {}: {err}", self.runtime.class, self.runtime.id);
            self.host.log(category::STATE, Severity::Warning, &message);
        }
        result
    }

    pub fn pop_state(&mut self, pop_all: bool) -> Result<(), StateError> {
        let result = self.runtime.frame.pop_state(pop_all);
        if let Err(err) = &result {
            let message = format!("{} {}: {err}", self.runtime.class, self.runtime.id);
            self.host.log(category::STATE, Severity::Warning, &message);
        }
        result
    }

    /// Pushes a command on top of the active one.
    pub fn push_child(&mut self, command: Box<dyn Command<A>>) {
        self.push_child_with(command, String::new());
    }

    pub fn push_child_with(
        &mut self,
        command: Box<dyn Command<A>>,
        description: impl Into<String>,
    ) {
        self.host.requests.push_back(Request::Push {
            command,
            description: description.into(),
        });
    }

    pub fn pop_self(&mut self) {
        self.host.requests.push_back(Request::Pop(self.runtime.id));
    }

    /// Sets the final status and pops this command.
    pub fn finish(&mut self, status: Status) {
        self.set_status(status);
        self.pop_self();
    }

    pub fn abort(&mut self, target: AbortTarget) {
        self.host.requests.push_back(Request::Abort(target));
    }

    pub fn abort_class(&mut self, class: CommandClass) {
        self.abort(AbortTarget::Class(class));
    }

    pub fn log(&self, severity: Severity, message: &str) {
        let message = format!("{} {}: {message}", self.runtime.class, self.runtime.id);
        self.host.log(category::COMMAND, severity, &message);
    }
}

/// Read-only view of a command on the stack.
pub struct CommandView<'a, A: Agent> {
    node: &'a CommandNode<A>,
}

impl<A: Agent> Clone for CommandView<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: Agent> Copy for CommandView<'_, A> {}

impl<'a, A: Agent> CommandView<'a, A> {
    pub(crate) fn new(node: &'a CommandNode<A>) -> Self {
        Self { node }
    }

    pub fn id(&self) -> CommandId {
        self.node.runtime.id
    }

    pub fn class(&self) -> CommandClass {
        self.node.runtime.class
    }

    pub fn status(&self) -> Status {
        self.node.runtime.status
    }

    pub fn is_aborted(&self) -> bool {
        self.node.runtime.aborted
    }

    pub fn is_pending_pop(&self) -> bool {
        self.node.runtime.pending_pop
    }

    pub fn child_status(&self) -> Option<Status> {
        self.node.runtime.child_status
    }

    pub fn ignores_notifications(&self) -> bool {
        self.node.runtime.ignore_notifications
    }

    pub fn frame(&self) -> &'a StateFrame {
        &self.node.runtime.frame
    }

    pub fn command(&self) -> &'a dyn Command<A> {
        self.node.command.as_ref()
    }

    pub fn dump_string(&self) -> String {
        self.node.command.dump_string()
    }
}
