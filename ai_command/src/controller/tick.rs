//! Per-tick routing and the bounded latent step loops.

use super::Controller;
use crate::agent::Agent;
use crate::behavior::HostContext;
use crate::class::CommandId;
use crate::command::AbortTarget;
use crate::diagnostics::{category, Severity};
use crate::frame::{
    Flow, StepGuard, StepVerdict, LATENT_NONE, LATENT_SLEEP, MAX_INSTRUCTIONS_PER_STEP,
};

impl<A: Agent> Controller<A> {
    /// Advances the controller by `delta_seconds`. The default behaviour
    /// runs only when no command is stacked; otherwise the head command is
    /// ticked. The chain depth is checked after either.
    pub fn tick(&mut self, delta_seconds: f32) {
        self.runaway = false;
        self.core.elapsed += f64::from(delta_seconds);
        if self.core.pending_kill {
            return;
        }

        match self.chain.first().map(|node| node.runtime.id) {
            None => self.process_state(delta_seconds),
            Some(head) => self.tick_command(head, delta_seconds),
        }
        self.drain_requests();
        self.check_runaway();
    }

    /// Runs the default behaviour's latent state code. Does nothing while a
    /// command is stacked and stops as soon as one is pushed.
    pub fn process_state(&mut self, delta_seconds: f32) {
        if self.has_commands() || self.core.pending_kill {
            return;
        }

        let latent = self.core.frame.latent_action();
        if latent == LATENT_SLEEP {
            self.core.frame.poll_sleep(delta_seconds);
        } else if latent != LATENT_NONE {
            let states = self.behavior.states();
            let mut ctx = HostContext::new(&mut self.core, states);
            self.behavior.poll_latent(latent, delta_seconds, &mut ctx);
            self.drain_requests();
        }

        let mut guard = StepGuard::new();
        while !self.has_commands()
            && !self.core.pending_kill
            && self.core.frame.code().is_some()
            && self.core.frame.latent_action() == LATENT_NONE
        {
            let mark = self.core.frame.mark();
            let flow = {
                let states = self.behavior.states();
                let mut ctx = HostContext::new(&mut self.core, states);
                self.behavior.execute(&mut ctx)
            };
            let verdict = guard.advance(&mut self.core.frame, mark, flow);
            self.drain_requests();
            if verdict != StepVerdict::Continue {
                self.report_step_limit("controller", verdict);
                break;
            }
        }
    }

    /// Ticks the child first. The command's own code runs only when it has
    /// no child, including when the child popped during its own tick.
    fn tick_command(&mut self, id: CommandId, delta_seconds: f32) {
        let Some(index) = self.position(id) else {
            return;
        };
        if let Some(child) = self.chain.get(index + 1).map(|node| node.runtime.id) {
            self.tick_command(child, delta_seconds);
            match self.position(id) {
                Some(index) if index + 1 == self.chain.len() => {}
                _ => return,
            }
        }

        if let Some(index) = self.position(id) {
            self.with_command(index, |command, ctx| command.internal_tick(delta_seconds, ctx));
            self.drain_requests();
        }
        self.process_command_state(id, delta_seconds);
    }

    fn may_step(&self, id: CommandId) -> bool {
        self.core.can_drive()
            && self
                .chain
                .last()
                .is_some_and(|node| node.runtime.id == id && !node.runtime.aborted)
    }

    fn process_command_state(&mut self, id: CommandId, delta_seconds: f32) {
        if !self.may_step(id) {
            return;
        }
        let index = self.chain.len() - 1;

        let latent = self.chain[index].runtime.frame.latent_action();
        if latent == LATENT_SLEEP {
            self.chain[index].runtime.frame.poll_sleep(delta_seconds);
        } else if latent != LATENT_NONE {
            self.with_command(index, |command, ctx| {
                command.poll_latent(latent, delta_seconds, ctx);
            });
            self.drain_requests();
        }

        let mut guard = StepGuard::new();
        while self.may_step(id) {
            let index = self.chain.len() - 1;
            let frame = &self.chain[index].runtime.frame;
            if frame.code().is_none() || frame.latent_action() != LATENT_NONE {
                break;
            }
            let mark = frame.mark();
            let flow = self
                .with_command(index, |command, ctx| command.execute(ctx))
                .unwrap_or(Flow::Stop);
            let verdict = guard.advance(&mut self.chain[index].runtime.frame, mark, flow);
            self.drain_requests();
            if verdict != StepVerdict::Continue {
                self.report_step_limit("command", verdict);
                break;
            }
        }
    }

    fn check_runaway(&mut self) {
        let threshold = self.config.runaway_threshold;
        let depth = self.chain.len();
        if depth <= threshold {
            return;
        }
        self.runaway = true;
        self.runaway_count += 1;

        let message = format!(
            "{}: command stack depth {depth} exceeds limit {threshold}:\n{}",
            self.core.agent_name(),
            self.dump_command_stack(threshold)
        );
        self.core.log(category::RUNAWAY, Severity::Warning, &message);

        if self.config.abort_runaway {
            if let Some(head) = self.chain.first().map(|node| node.runtime.id) {
                self.abort_matching(AbortTarget::Instance(head));
                self.drain_requests();
            }
            self.runaway = false;
        }
    }

    fn report_step_limit(&self, owner: &str, verdict: StepVerdict) {
        match verdict {
            StepVerdict::Continue => {}
            StepVerdict::StateChangeLimit => {
                let message =
                    format!("{owner} state code changed state too often; resuming next tick");
                self.core.log(category::STATE, Severity::Debug, &message);
            }
            StepVerdict::InstructionLimit => {
                let message = format!(
                    "{owner} state code ran {} instructions without yielding",
                    MAX_INSTRUCTIONS_PER_STEP
                );
                self.core.log(category::RUNAWAY, Severity::Warning, &message);
            }
        }
    }
}
