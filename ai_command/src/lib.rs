//! Hierarchical command stack for AI controllers.
//!
//! A [`Controller`] owns a chain of [`Command`]s, parent to child. Only the
//! deepest command (the active one) runs its latent state code each tick;
//! the controller's own default behaviour runs only while the chain is
//! empty. Every command carries its own [`StateFrame`], so sleeps and other
//! latent actions issued by a command never touch the controller's frame.
//!
//! Hooks and state code never mutate the chain directly. Pushes, pops and
//! aborts requested through a context are applied by the controller as soon
//! as the hook or instruction that asked for them returns, which is also
//! where a step notices that control moved to a freshly pushed child.

pub mod agent;
pub mod behavior;
pub mod class;
pub mod command;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod frame;
pub mod history;

pub use agent::Agent;
pub use behavior::{HostBehavior, HostContext, NullBehavior};
pub use class::{CommandClass, CommandId};
pub use command::{AbortTarget, Command, CommandContext, CommandView, PushPolicy, Status};
pub use config::{ConfigError, ControllerConfig};
pub use controller::{Controller, PushOutcome};
pub use diagnostics::{LogEntry, LogFacade, LogSink, MemorySink, Severity};
pub use frame::{
    CodeCursor, Flow, GotoStateOutcome, Label, LatentId, StateError, StateFrame, StateName,
    BEGIN_LABEL, LATENT_NONE, LATENT_SLEEP,
};
pub use history::{CommandHistory, HistoryEntry};
