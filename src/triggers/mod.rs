use mockall::automock;
use std::sync::mpsc::{SendError, Sender};
use thiserror::Error;

/// A trigger that polls once and then exits.
pub mod once;
/// A trigger that polls periodically.
pub mod schedule;
/// A trigger that stops the loop on a termination signal.
pub mod signal;

/// A custom error for describing the error cases for triggers
#[derive(Debug, Error)]
pub enum TriggerError {
    /// Cannot initialize trigger, because it has a misconfiguration.
    #[error("not configured correctly: {0}")]
    Misconfigured(String),
    /// Cannot send trigger with Sender. This usually because the receiver is dropped.
    #[error("cannot trigger a poll, receiver hang up")]
    ReceiverHangup(#[from] SendError<Option<()>>),
    /// Running the trigger failed.
    #[error("{0}")]
    FailedTrigger(String),
}

/// A trigger is a long running background process, which initiates the polls.
///
/// Every `Some(())` sent starts a poll, `None` stops the loop.
///
/// Triggers may include:
///   - schedules ([schedule::ScheduleTrigger])
///   - signals ([signal::SignalTrigger])
///   - etc.
#[automock]
pub trait Trigger: Sync + Send {
    /// Start the trigger process.
    fn listen(&self, tx: Sender<Option<()>>) -> Result<(), TriggerError>;
}
