use super::{Trigger, TriggerError};
use duration_string::DurationString;
use log::{debug, info};
use std::{
    sync::mpsc::Sender,
    thread::sleep,
    time::{Duration, Instant},
};

/// A trigger that polls periodically.
///
/// This is running in an infinite loop, triggering every time.
pub struct ScheduleTrigger {
    duration: Duration,
    timeout: Option<Duration>,
}

impl ScheduleTrigger {
    /// Creates a new ScheduleTrigger with duration.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            timeout: None,
        }
    }

    /// Creates a new ScheduleTrigger with duration and timeout.
    pub fn new_with_timeout(duration: Duration, timeout: Duration) -> Self {
        Self {
            duration,
            timeout: Some(timeout),
        }
    }

    /// Runs one step in the scheduled time process. Returns true, if it should continue,
    /// returns false in case of a timeout. One step should take exactly the duration,
    /// if it would reach the final timeout, it waits until the end of the timeout.
    pub fn step(
        &self,
        tx: &Sender<Option<()>>,
        final_timeout: Option<Instant>,
    ) -> Result<bool, TriggerError> {
        let next_poll = Instant::now() + self.duration;
        tx.send(Some(()))?;

        if let Some(final_timeout) = final_timeout {
            if next_poll > final_timeout {
                sleep(final_timeout.saturating_duration_since(Instant::now()));
                return Ok(false);
            }
        }

        // A long poll only delays the next one, it doesn't pile up triggers.
        sleep(next_poll.saturating_duration_since(Instant::now()));
        Ok(true)
    }
}

impl Trigger for ScheduleTrigger {
    /// Starts a scheduled trigger, starting the steps in a loop. Every step
    /// triggers and then waits the given duration. In case of an error,
    /// it terminates or if it will reach the final timeout it will wait until
    /// the end of the timeout and return.
    fn listen(&self, tx: Sender<Option<()>>) -> Result<(), TriggerError> {
        if self.duration.is_zero() {
            return Err(TriggerError::Misconfigured(String::from(
                "the interval cannot be zero",
            )));
        }

        let final_timeout = self.timeout.map(|t| Instant::now() + t);
        info!("Polling every {}.", DurationString::new(self.duration));

        while self.step(&tx, final_timeout)? {}
        debug!("Schedule reached its timeout.");

        Ok(())
    }
}
