//! Push, pop and abort: every structural change to the command chain.

use super::{Controller, PushOutcome};
use crate::agent::Agent;
use crate::class::{CommandClass, CommandId};
use crate::command::{AbortTarget, Command, CommandContext, CommandNode, Request, Status};
use crate::diagnostics::{category, Severity};
use crate::frame::BEGIN_LABEL;
use crate::history::HistoryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PopCause {
    Request,
    Abort,
}

impl<A: Agent> Controller<A> {
    pub fn push_command(&mut self, command: Box<dyn Command<A>>) -> PushOutcome {
        self.push_command_with(command, String::new())
    }

    /// Pushes `command` on top of the active command. `description` is kept
    /// in the push history.
    pub fn push_command_with(
        &mut self,
        command: Box<dyn Command<A>>,
        description: impl Into<String>,
    ) -> PushOutcome {
        let outcome = self.push_node(command, description.into());
        self.drain_requests();
        outcome
    }

    /// Pops `id` together with everything stacked on it.
    pub fn pop_command(&mut self, id: CommandId) -> bool {
        let Some(index) = self.position(id) else {
            let message = format!("pop of {id} ignored: not on the stack");
            self.core.log(category::STACK, Severity::Debug, &message);
            return false;
        };
        self.pop_at(index, PopCause::Request);
        self.drain_requests();
        true
    }

    pub fn abort_command(&mut self, id: CommandId) -> bool {
        self.abort_commands(AbortTarget::Instance(id))
    }

    pub fn abort_class(&mut self, class: CommandClass) -> bool {
        self.abort_commands(AbortTarget::Class(class))
    }

    /// Aborts every matching command and its descendants. Returns whether
    /// anything was aborted.
    pub fn abort_commands(&mut self, target: AbortTarget) -> bool {
        let aborted = self.abort_matching(target);
        self.drain_requests();
        aborted
    }

    pub(super) fn push_node(
        &mut self,
        command: Box<dyn Command<A>>,
        description: String,
    ) -> PushOutcome {
        let class = command.class();
        if self.core.pending_kill {
            let message = format!("push of {class} ignored: controller is being destroyed");
            self.core.log(category::STACK, Severity::Debug, &message);
            return PushOutcome::Ignored;
        }

        let mut replaced = None;
        if let Some(active) = self.chain.last() {
            if active.runtime.class == class {
                let policy = command.push_policy();
                let active_id = active.runtime.id;
                if policy.replace_same_class {
                    let message = format!("{class} replaces active instance {active_id}");
                    self.core.log(category::STACK, Severity::Debug, &message);
                    self.abort_matching(AbortTarget::Instance(active_id));
                    replaced = Some(active_id);
                } else if !policy.allow_same_class {
                    let message = format!("push of {class} ignored: {active_id} is already active");
                    self.core.log(category::STACK, Severity::Debug, &message);
                    return PushOutcome::Ignored;
                }
            }
        }

        let id = self.allocate_id();
        let mut node = CommandNode::new(command, id, class);
        {
            let CommandNode { command, runtime } = &mut node;
            let mut ctx = CommandContext::new(runtime, &mut self.core);
            command.pre_push(&mut ctx);
        }

        let paused_index = self.chain.len().checked_sub(1);
        self.chain.push(node);
        let index = self.chain.len() - 1;
        if let Some(paused) = paused_index {
            // A paused command holds no latent action; it resumes at its
            // next instruction once the child pops.
            self.chain[paused].runtime.frame.clear_latent();
            self.with_command(paused, |command, ctx| command.paused(class, ctx));
        }
        self.core.frame.clear_latent();

        let auto_state = self.chain[index].command.auto_state();
        if let Some(state) = auto_state {
            if self.chain[index].runtime.frame.state().is_none() {
                self.chain[index].runtime.frame.enter_state(state, BEGIN_LABEL);
            }
        }
        self.with_command(index, |command, ctx| command.pushed(ctx));

        if self.history.is_enabled() {
            let time = self.core.world_time();
            if !description.is_empty() {
                let message = format!("{class} {id} at {time:.2}: {description}");
                self.core.log(category::HISTORY, Severity::Debug, &message);
            }
            self.history.record(HistoryEntry {
                class,
                time,
                description,
            });
        }
        let message = format!("pushed {class} {id} at depth {}", self.chain.len());
        self.core.log(category::STACK, Severity::Debug, &message);

        match replaced {
            Some(replaced) => PushOutcome::Replaced { id, replaced },
            None => PushOutcome::Pushed(id),
        }
    }

    pub(super) fn pop_at(&mut self, index: usize, cause: PopCause) {
        if index >= self.chain.len() {
            return;
        }
        if cause == PopCause::Request {
            if let Some(child) = self.chain.get(index + 1) {
                let target = &self.chain[index].runtime;
                let message = format!(
                    "popping {} {} which still has child {} {}",
                    target.class, target.id, child.runtime.class, child.runtime.id
                );
                self.core.log(category::STACK, Severity::Warning, &message);
                // The target sees its children leave before it goes itself.
                self.pop_child(index);
            }
        }

        if index == 0 {
            self.chain[0].runtime.pending_pop = true;
            self.pop_child(0);
            self.with_command(0, |command, ctx| command.popped(ctx));
            if let Some(head) = self.chain.pop() {
                self.log_popped(&head);
            }
        } else {
            // The parent pops the target and decides whether to resume.
            self.pop_child(index - 1);
        }
        self.core.frame.clear_latent();
    }

    /// Pops the child of the command at `index`, bottom-up, then resumes
    /// that command unless the pop is part of an abort or a larger pop.
    fn pop_child(&mut self, index: usize) {
        let child_index = index + 1;
        if child_index >= self.chain.len() {
            return;
        }
        self.chain[child_index].runtime.pending_pop = true;
        self.pop_child(child_index);

        self.with_command(child_index, |command, ctx| command.popped(ctx));
        let Some(child) = self.chain.pop() else {
            return;
        };
        self.log_popped(&child);

        let child_class = child.runtime.class;
        let child_status = child.runtime.status;
        let child_aborted = child.runtime.aborted;
        drop(child);

        let parent = &mut self.chain[index].runtime;
        parent.child_status = Some(child_status);
        if !parent.aborted && !parent.pending_pop && !child_aborted {
            self.with_command(index, |command, ctx| {
                command.resumed(child_class, child_status, ctx);
            });
        }
    }

    /// Marks matching commands and their descendants aborted, then pops
    /// aborted commands starting from the head until none are left.
    pub(super) fn abort_matching(&mut self, target: AbortTarget) -> bool {
        let mut any = false;
        for index in 0..self.chain.len() {
            let runtime = &self.chain[index].runtime;
            if runtime.aborted || !target.matches(runtime) {
                continue;
            }
            let message = format!("aborting {} {}", runtime.class, runtime.id);
            self.core.log(category::STACK, Severity::Debug, &message);
            for node in &mut self.chain[index..] {
                node.runtime.aborted = true;
                node.runtime.status = Status::Aborted;
            }
            any = true;
        }

        while let Some(index) = self.chain.iter().position(|node| node.runtime.aborted) {
            self.pop_at(index, PopCause::Abort);
        }
        any
    }

    /// Applies structural requests queued by hooks and state code, including
    /// any queued while applying.
    pub(super) fn drain_requests(&mut self) {
        while let Some(request) = self.core.requests.pop_front() {
            match request {
                Request::Push {
                    command,
                    description,
                } => {
                    self.push_node(command, description);
                }
                Request::Pop(id) => match self.position(id) {
                    Some(index) => self.pop_at(index, PopCause::Request),
                    None => {
                        let message = format!("pop of {id} ignored: not on the stack");
                        self.core.log(category::STACK, Severity::Debug, &message);
                    }
                },
                Request::Abort(target) => {
                    self.abort_matching(target);
                }
            }
        }
    }

    pub(super) fn with_command<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut dyn Command<A>, &mut CommandContext<'_, A>) -> R,
    ) -> Option<R> {
        let node = self.chain.get_mut(index)?;
        let mut ctx = CommandContext::new(&mut node.runtime, &mut self.core);
        Some(f(node.command.as_mut(), &mut ctx))
    }

    fn log_popped(&self, node: &CommandNode<A>) {
        let message = format!(
            "popped {} {} with status {:?}",
            node.runtime.class, node.runtime.id, node.runtime.status
        );
        self.core.log(category::STACK, Severity::Debug, &message);
    }
}
