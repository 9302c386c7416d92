use super::{Trigger, TriggerError};
use std::sync::mpsc::Sender;

/// A trigger that polls once and then exits.
pub struct OnceTrigger;

impl Trigger for OnceTrigger {
    /// Starts a trigger that runs once and terminates after.
    fn listen(&self, tx: Sender<Option<()>>) -> Result<(), TriggerError> {
        tx.send(Some(()))?;
        tx.send(None)?;
        Ok(())
    }
}
