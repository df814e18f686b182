//! Latent execution frames.
//!
//! A frame records where a piece of state code currently is: the active
//! state, a code cursor inside that state, any nested states pushed on top
//! of it and the latent action (if any) the code is blocked on. The
//! controller owns one frame for its default behaviour and every command
//! owns its own, so latent calls issued by a command never land in the
//! controller's frame.

use serde::Serialize;
use thiserror::Error;

/// Names of states are code constants.
pub type StateName = &'static str;

/// Labels are code constants as well.
pub type Label = &'static str;

/// Identifier of an outstanding latent action. Zero means none.
pub type LatentId = u32;

pub const LATENT_NONE: LatentId = 0;
/// Reserved for `sleep`; custom latent actions must use other ids.
pub const LATENT_SLEEP: LatentId = 1;

/// Label every state starts at unless told otherwise.
pub const BEGIN_LABEL: Label = "Begin";

/// State transitions allowed within a single step before the rest of the
/// step is deferred to the next tick.
pub const MAX_STATE_CHANGES_PER_STEP: u32 = 4;

/// Hard ceiling on instructions executed in one step.
pub const MAX_INSTRUCTIONS_PER_STEP: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodeCursor {
    pub label: Label,
    pub offset: u32,
}

impl CodeCursor {
    pub fn at(label: Label) -> Self {
        Self { label, offset: 0 }
    }

    pub fn next(self) -> Self {
        Self {
            label: self.label,
            offset: self.offset.saturating_add(1),
        }
    }
}

/// What the step loop should do with the cursor after an instruction ran.
///
/// Ignored whenever the instruction itself jumped (state change, label
/// change, push/pop of a nested state); the jump already placed the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Fall through to the next instruction.
    Next,
    /// End of state code; the frame idles until the next transition.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GotoStateOutcome {
    Success,
    NotFound,
    Preempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("state {0} is already on the state stack")]
    AlreadyOnStack(StateName),
    #[error("state {0} not found")]
    NotFound(StateName),
    #[error("pop_state called without a nested state")]
    EmptyStack,
}

#[derive(Debug, Clone)]
struct SavedState {
    state: Option<StateName>,
    code: Option<CodeCursor>,
}

#[derive(Debug, Clone, Default)]
pub struct StateFrame {
    state: Option<StateName>,
    code: Option<CodeCursor>,
    latent_action: LatentId,
    latent_float: f32,
    state_stack: Vec<SavedState>,
    continued_state: bool,
    state_serial: u32,
    jump_serial: u32,
}

impl StateFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<StateName> {
        self.state
    }

    pub fn code(&self) -> Option<CodeCursor> {
        self.code
    }

    pub fn latent_action(&self) -> LatentId {
        self.latent_action
    }

    pub fn is_latent_pending(&self) -> bool {
        self.latent_action != LATENT_NONE
    }

    /// Seconds left on a pending sleep.
    pub fn latent_float(&self) -> f32 {
        self.latent_float
    }

    /// Number of states saved underneath the current one.
    pub fn nested_depth(&self) -> usize {
        self.state_stack.len()
    }

    /// True after `pop_state` returned to a state that was interrupted.
    pub fn continued_state(&self) -> bool {
        self.continued_state
    }

    pub fn is_in_state(&self, name: StateName, include_stack: bool) -> bool {
        if self.state == Some(name) {
            return true;
        }
        include_stack
            && self
                .state_stack
                .iter()
                .any(|saved| saved.state == Some(name))
    }

    /// Token compared across steps to detect jumps.
    pub fn resumption_token(&self) -> (u32, u32) {
        (self.state_serial, self.jump_serial)
    }

    pub(crate) fn enter_state(&mut self, state: StateName, label: Label) {
        self.state_stack.clear();
        self.latent_action = LATENT_NONE;
        self.state = Some(state);
        self.code = Some(CodeCursor::at(label));
        self.continued_state = false;
        self.state_serial = self.state_serial.wrapping_add(1);
    }

    pub(crate) fn clear_state(&mut self) {
        self.state_stack.clear();
        self.latent_action = LATENT_NONE;
        self.state = None;
        self.code = None;
        self.continued_state = false;
        self.state_serial = self.state_serial.wrapping_add(1);
    }

    /// Jumps within the current state. Returns false when there is no state
    /// to jump in.
    pub(crate) fn goto_label(&mut self, label: Label) -> bool {
        if self.state.is_none() {
            return false;
        }
        self.latent_action = LATENT_NONE;
        self.code = Some(CodeCursor::at(label));
        self.jump_serial = self.jump_serial.wrapping_add(1);
        true
    }

    pub(crate) fn push_state(&mut self, state: StateName, label: Label) -> Result<(), StateError> {
        if self.is_in_state(state, true) {
            return Err(StateError::AlreadyOnStack(state));
        }
        self.state_stack.push(SavedState {
            state: self.state,
            code: self.code,
        });
        self.state = Some(state);
        self.code = Some(CodeCursor::at(label));
        self.latent_action = LATENT_NONE;
        self.continued_state = false;
        self.state_serial = self.state_serial.wrapping_add(1);
        Ok(())
    }

    pub(crate) fn pop_state(&mut self, pop_all: bool) -> Result<(), StateError> {
        if self.state_stack.is_empty() {
            return Err(StateError::EmptyStack);
        }
        let saved = if pop_all {
            let bottom = self.state_stack.drain(..).next();
            bottom.ok_or(StateError::EmptyStack)?
        } else {
            self.state_stack.pop().ok_or(StateError::EmptyStack)?
        };
        self.state = saved.state;
        self.code = saved.code;
        self.latent_action = LATENT_NONE;
        self.continued_state = true;
        self.state_serial = self.state_serial.wrapping_add(1);
        Ok(())
    }

    pub(crate) fn sleep(&mut self, seconds: f32) {
        self.latent_action = LATENT_SLEEP;
        self.latent_float = seconds;
    }

    /// Starts a custom latent action. Returns false and leaves the frame
    /// alone for the reserved sleep id, whose timer only `sleep` may set.
    pub(crate) fn begin_latent(&mut self, latent: LatentId) -> bool {
        if latent == LATENT_SLEEP {
            return false;
        }
        self.latent_action = latent;
        true
    }

    pub(crate) fn clear_latent(&mut self) {
        self.latent_action = LATENT_NONE;
    }

    pub(crate) fn poll_sleep(&mut self, delta_seconds: f32) {
        self.latent_float -= delta_seconds;
        if self.latent_float < 0.5 * delta_seconds {
            self.latent_action = LATENT_NONE;
        }
    }

    pub(crate) fn mark(&self) -> StepMark {
        StepMark {
            state_serial: self.state_serial,
            jump_serial: self.jump_serial,
            code: self.code,
            stack_len: self.state_stack.len(),
        }
    }
}

/// Enters `state` if the owner knows it, otherwise drops to no state.
/// An empty `known` list accepts every state name.
pub(crate) fn transition(
    frame: &mut StateFrame,
    known: &[StateName],
    state: StateName,
    label: Label,
) -> GotoStateOutcome {
    if known.is_empty() || known.contains(&state) {
        frame.enter_state(state, label);
        GotoStateOutcome::Success
    } else {
        frame.clear_state();
        GotoStateOutcome::NotFound
    }
}

pub(crate) fn push_known_state(
    frame: &mut StateFrame,
    known: &[StateName],
    state: StateName,
    label: Label,
) -> Result<(), StateError> {
    if !known.is_empty() && !known.contains(&state) {
        return Err(StateError::NotFound(state));
    }
    frame.push_state(state, label)
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct StepMark {
    state_serial: u32,
    jump_serial: u32,
    code: Option<CodeCursor>,
    stack_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepVerdict {
    Continue,
    StateChangeLimit,
    InstructionLimit,
}

/// Per-step bookkeeping shared by the controller and command step loops.
#[derive(Debug, Default)]
pub(crate) struct StepGuard {
    state_changes: u32,
    instructions: u32,
}

impl StepGuard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Applies `flow` to the frame unless the instruction jumped.
    pub(crate) fn advance(
        &mut self,
        frame: &mut StateFrame,
        mark: StepMark,
        flow: Flow,
    ) -> StepVerdict {
        self.instructions += 1;

        // A state pushed mid-instruction resumes after that instruction.
        if frame.state_stack.len() > mark.stack_len {
            if let Some(saved) = frame.state_stack.get_mut(mark.stack_len) {
                saved.code = mark.code.map(CodeCursor::next);
            }
        }

        if frame.state_serial != mark.state_serial {
            self.state_changes += 1;
            if self.state_changes > MAX_STATE_CHANGES_PER_STEP {
                return StepVerdict::StateChangeLimit;
            }
        } else if frame.jump_serial == mark.jump_serial {
            frame.code = match flow {
                Flow::Next => frame.code.map(CodeCursor::next),
                Flow::Stop => None,
            };
        }

        if self.instructions >= MAX_INSTRUCTIONS_PER_STEP {
            return StepVerdict::InstructionLimit;
        }
        StepVerdict::Continue
    }
}
