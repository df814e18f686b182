//! The controller host: owns the command chain and its own state frame.

mod stack;
mod tick;

use std::collections::VecDeque;
use std::rc::Rc;

use crate::agent::Agent;
use crate::behavior::{HostBehavior, NullBehavior};
use crate::class::{CommandClass, CommandId};
use crate::command::{AbortTarget, CommandNode, CommandView, Request};
use crate::config::ControllerConfig;
use crate::diagnostics::{category, LogFacade, LogSink, Severity};
use crate::frame::{self, GotoStateOutcome, Label, StateFrame, StateName, BEGIN_LABEL};
use crate::history::CommandHistory;

/// Result of a push request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed(CommandId),
    /// The active command of the same class was aborted to make room.
    Replaced {
        id: CommandId,
        replaced: CommandId,
    },
    /// Same-class policy refused the push; no hook ran.
    Ignored,
}

impl PushOutcome {
    pub fn id(&self) -> Option<CommandId> {
        match self {
            PushOutcome::Pushed(id) | PushOutcome::Replaced { id, .. } => Some(*id),
            PushOutcome::Ignored => None,
        }
    }
}

/// Controller state that commands and the default behaviour may touch
/// while the chain itself is borrowed.
pub(crate) struct HostCore<A: Agent> {
    pub(crate) pawn: Option<A>,
    pub(crate) frame: StateFrame,
    pub(crate) requests: VecDeque<Request<A>>,
    pub(crate) sink: Rc<dyn LogSink>,
    pub(crate) pending_kill: bool,
    pub(crate) elapsed: f64,
}

impl<A: Agent> HostCore<A> {
    pub(crate) fn world_time(&self) -> f64 {
        self.pawn
            .as_ref()
            .map_or(self.elapsed, |pawn| pawn.world_time())
    }

    /// Commands only step while the controller lives and drives a live pawn.
    pub(crate) fn can_drive(&self) -> bool {
        !self.pending_kill && self.pawn.as_ref().is_some_and(|pawn| pawn.is_alive())
    }

    pub(crate) fn agent_name(&self) -> String {
        self.pawn
            .as_ref()
            .map_or_else(|| "<unpossessed>".to_string(), |pawn| pawn.name())
    }

    pub(crate) fn log(&self, category: &str, severity: Severity, message: &str) {
        self.sink.log(category, severity, message);
    }
}

pub struct Controller<A: Agent> {
    core: HostCore<A>,
    chain: Vec<CommandNode<A>>,
    behavior: Box<dyn HostBehavior<A>>,
    config: ControllerConfig,
    history: CommandHistory,
    next_id: u64,
    runaway: bool,
    runaway_count: u32,
}

impl<A: Agent> Controller<A> {
    pub fn new(config: ControllerConfig) -> Self {
        let history = CommandHistory::new(config.history_capacity);
        Self {
            core: HostCore {
                pawn: None,
                frame: StateFrame::new(),
                requests: VecDeque::new(),
                sink: Rc::new(LogFacade),
                pending_kill: false,
                elapsed: 0.0,
            },
            chain: Vec::new(),
            behavior: Box::new(NullBehavior),
            config,
            history,
            next_id: 1,
            runaway: false,
            runaway_count: 0,
        }
    }

    /// Installs the default behaviour and enters its auto state.
    pub fn with_behavior(mut self, behavior: Box<dyn HostBehavior<A>>) -> Self {
        self.behavior = behavior;
        match self.behavior.auto_state() {
            Some(state) => self.core.frame.enter_state(state, BEGIN_LABEL),
            None => self.core.frame.clear_state(),
        }
        self
    }

    pub fn with_sink(mut self, sink: Rc<dyn LogSink>) -> Self {
        self.core.sink = sink;
        self
    }

    pub fn with_pawn(mut self, pawn: A) -> Self {
        self.core.pawn = Some(pawn);
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn possess(&mut self, pawn: A) -> Option<A> {
        self.core.pawn.replace(pawn)
    }

    pub fn unpossess(&mut self) -> Option<A> {
        self.core.pawn.take()
    }

    pub fn pawn(&self) -> Option<&A> {
        self.core.pawn.as_ref()
    }

    pub fn pawn_mut(&mut self) -> Option<&mut A> {
        self.core.pawn.as_mut()
    }

    /// Pawn clock, or accumulated tick time while unpossessed.
    pub fn world_time(&self) -> f64 {
        self.core.world_time()
    }

    /// The controller's own frame.
    pub fn frame(&self) -> &StateFrame {
        &self.core.frame
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn is_runaway(&self) -> bool {
        self.runaway
    }

    /// Number of ticks that detected a runaway chain.
    pub fn runaway_count(&self) -> u32 {
        self.runaway_count
    }

    pub fn is_pending_kill(&self) -> bool {
        self.core.pending_kill
    }

    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    pub fn has_commands(&self) -> bool {
        !self.chain.is_empty()
    }

    pub fn head(&self) -> Option<CommandView<'_, A>> {
        self.chain.first().map(CommandView::new)
    }

    /// Deepest command; the only one whose state code runs.
    pub fn active_command(&self) -> Option<CommandView<'_, A>> {
        self.chain.last().map(CommandView::new)
    }

    pub fn command(&self, id: CommandId) -> Option<CommandView<'_, A>> {
        self.chain
            .iter()
            .find(|node| node.runtime.id == id)
            .map(CommandView::new)
    }

    /// Head to active, optionally filtered by class.
    pub fn iter_commands(
        &self,
        filter: Option<CommandClass>,
    ) -> impl Iterator<Item = CommandView<'_, A>> + '_ {
        self.chain
            .iter()
            .filter(move |node| filter.map_or(true, |class| node.runtime.class == class))
            .map(CommandView::new)
    }

    pub fn commands(&self) -> impl Iterator<Item = CommandView<'_, A>> + '_ {
        self.iter_commands(None)
    }

    pub fn commands_of_class(
        &self,
        class: CommandClass,
    ) -> impl Iterator<Item = CommandView<'_, A>> + '_ {
        self.iter_commands(Some(class))
    }

    pub fn find_command_of_class(&self, class: CommandClass) -> Option<CommandView<'_, A>> {
        self.commands_of_class(class).next()
    }

    /// Whether observers should hold back notifications. The deepest
    /// command decides, since each command defers to its child.
    pub fn should_ignore_notifications(&self) -> bool {
        self.chain
            .last()
            .is_some_and(|node| node.runtime.ignore_notifications)
    }

    pub fn goto_state(&mut self, state: StateName) -> GotoStateOutcome {
        self.goto_state_at(state, BEGIN_LABEL)
    }

    /// Moves the default behaviour to another state. Refused while any
    /// command is stacked.
    pub fn goto_state_at(&mut self, state: StateName, label: Label) -> GotoStateOutcome {
        if let Some(active) = self.chain.last() {
            let message = format!(
                "goto_state({state}) preempted by active command {} {}",
                active.runtime.class, active.runtime.id
            );
            self.core.log(category::STATE, Severity::Debug, &message);
            return GotoStateOutcome::Preempted;
        }
        let states = self.behavior.states();
        frame::transition(&mut self.core.frame, states, state, label)
    }

    /// Text dump from head to active, cut after `limit` entries.
    pub fn dump_command_stack(&self, limit: usize) -> String {
        if self.chain.is_empty() {
            return "<no commands>".to_string();
        }
        let mut lines: Vec<String> = self
            .chain
            .iter()
            .take(limit)
            .enumerate()
            .map(|(depth, node)| {
                format!(
                    "{depth:>3}: {} {} [{:?}{}] {}",
                    node.runtime.id,
                    node.runtime.class,
                    node.runtime.status,
                    if node.runtime.aborted { ", aborted" } else { "" },
                    node.command.dump_string()
                )
            })
            .collect();
        if self.chain.len() > limit {
            lines.push(format!("... and {} more", self.chain.len() - limit));
        }
        lines.join("\n")
    }

    /// Aborts every command and stops the controller for good.
    pub fn destroy(&mut self) {
        if self.core.pending_kill {
            return;
        }
        if let Some(head) = self.chain.first().map(|node| node.runtime.id) {
            self.abort_matching(AbortTarget::Instance(head));
        }
        self.core.pending_kill = true;
        self.core.requests.clear();
        self.core.frame.clear_state();
    }

    fn position(&self, id: CommandId) -> Option<usize> {
        self.chain.iter().position(|node| node.runtime.id == id)
    }

    fn allocate_id(&mut self) -> CommandId {
        let id = CommandId(self.next_id);
        self.next_id += 1;
        id
    }
}
