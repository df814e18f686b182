//! The controller's own default behaviour, run while no command is stacked.

use crate::agent::Agent;
use crate::command::{Command, Request};
use crate::controller::HostCore;
use crate::diagnostics::{category, Severity};
use crate::frame::{
    self, CodeCursor, Flow, GotoStateOutcome, Label, LatentId, StateError, StateFrame, StateName,
    BEGIN_LABEL,
};

/// Latent state code driven by the controller's own frame.
pub trait HostBehavior<A: Agent> {
    /// States the behaviour knows. Empty accepts any state name.
    fn states(&self) -> &'static [StateName] {
        &[]
    }

    /// State entered when the behaviour is installed.
    fn auto_state(&self) -> Option<StateName> {
        None
    }

    /// Runs the instruction under the controller frame's cursor.
    fn execute(&mut self, ctx: &mut HostContext<'_, A>) -> Flow;

    fn poll_latent(
        &mut self,
        _latent: LatentId,
        _delta_seconds: f32,
        _ctx: &mut HostContext<'_, A>,
    ) {
    }
}

/// Behaviour with no state code at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBehavior;

impl<A: Agent> HostBehavior<A> for NullBehavior {
    fn execute(&mut self, _ctx: &mut HostContext<'_, A>) -> Flow {
        Flow::Stop
    }
}

pub struct HostContext<'a, A: Agent> {
    host: &'a mut HostCore<A>,
    states: &'static [StateName],
}

impl<'a, A: Agent> HostContext<'a, A> {
    pub(crate) fn new(host: &'a mut HostCore<A>, states: &'static [StateName]) -> Self {
        Self { host, states }
    }

    pub fn frame(&self) -> &StateFrame {
        &self.host.frame
    }

    pub fn state(&self) -> Option<StateName> {
        self.host.frame.state()
    }

    pub fn cursor(&self) -> Option<CodeCursor> {
        self.host.frame.code()
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
        self.host.frame.sleep(seconds);
    }

    pub fn begin_latent(&mut self, latent: LatentId) -> bool {
        let started = self.host.frame.begin_latent(latent);
        if !started {
            let message = format!("controller: latent id {latent} is reserved for sleep");
            self.host.log(category::STATE, Severity::Warning, &message);
        }
        started
    }

    pub fn finish_latent(&mut self) {
        self.host.frame.clear_latent();
    }

    pub fn goto_state(&mut self, state: StateName) -> GotoStateOutcome {
        self.goto_state_at(state, BEGIN_LABEL)
    }

    pub fn goto_state_at(&mut self, state: StateName, label: Label) -> GotoStateOutcome {
        let outcome = frame::transition(&mut self.host.frame, self.states, state, label);
        if outcome == GotoStateOutcome::NotFound {
            let message = format!("controller state {state} not found");
            self.host.log(category::STATE, Severity::Warning, &message);
        }
        outcome
    }

    pub fn goto_label(&mut self, label: Label) -> bool {
        self.host.frame.goto_label(label)
    }

    pub fn push_state(&mut self, state: StateName, label: Label) -> Result<(), StateError> {
        let result = frame::push_known_state(&mut self.host.frame, self.states, state, label);
        if let Err(err) = &result {
            let message = format!("controller: {err}");
            self.host.log(category::STATE, Severity::Warning, &message);
        }
        result
    }

    pub fn pop_state(&mut self, pop_all: bool) -> Result<(), StateError> {
        let result = self.host.frame.pop_state(pop_all);
        if let Err(err) = &result {
            let message = format!("controller: {err}");
            self.host.log(category::STATE, Severity::Warning, &message);
        }
        result
    }

    /// Pushes a command; the current step ends once it lands.
    pub fn push_command(&mut self, command: Box<dyn Command<A>>) {
        self.push_command_with(command, String::new());
    }

    pub fn push_command_with(
        &mut self,
        command: Box<dyn Command<A>>,
        description: impl Into<String>,
    ) {
        self.host.requests.push_back(Request::Push {
            command,
            description: description.into(),
        });
    }

    pub fn log(&self, severity: Severity, message: &str) {
        self.host.log(category::STATE, severity, message);
    }
}
