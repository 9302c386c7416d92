use super::{Trigger, TriggerError};
use log::debug;
use std::sync::{atomic::AtomicU8, mpsc::Sender};

/// A trigger that stops the watch loop on SIGINT or SIGTERM.
///
/// The first signal lets the running poll finish (a deploy is never cut in
/// half), the second one exits right away.
pub struct SignalTrigger {
    trigger_count: AtomicU8,
}

impl SignalTrigger {
    pub fn new() -> SignalTrigger {
        SignalTrigger {
            trigger_count: AtomicU8::new(0),
        }
    }

    #[cfg(unix)]
    fn listen_inner<I>(&self, tx: Sender<Option<()>>, signals: I) -> Result<(), TriggerError>
    where
        I: IntoIterator<Item = i32>,
    {
        use log::{error, info};
        use std::{process, sync::atomic::Ordering, thread::sleep, time::Duration};

        for signal in signals {
            let previous = self.trigger_count.fetch_add(1, Ordering::AcqRel);
            if previous == 0 {
                info!("Got signal {signal}, stopping after the current poll.");
                if tx.send(None).is_err() {
                    error!("Failed stopping the watch loop with signal {signal}.");
                }
            } else {
                // Allow a little time for the clean shutdown to still happen.
                sleep(Duration::from_millis(100));
                debug!("Got signal {signal}, terminating right now.");
                process::exit(128 + signal);
            }
        }

        Ok(())
    }
}

impl Default for SignalTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl Trigger for SignalTrigger {
    /// Starts a trigger that iterates over signals and stops the loop.
    #[cfg(unix)]
    fn listen(&self, tx: Sender<Option<()>>) -> Result<(), TriggerError> {
        use signal_hook::{
            consts::TERM_SIGNALS,
            iterator::{exfiltrator::SignalOnly, SignalsInfo},
        };

        let mut signals = SignalsInfo::<SignalOnly>::new(TERM_SIGNALS).map_err(|err| {
            TriggerError::FailedTrigger(format!("cannot set up signal handler: {err}"))
        })?;
        self.listen_inner(tx, &mut signals)
    }

    #[cfg(not(unix))]
    fn listen(&self, _tx: Sender<Option<()>>) -> Result<(), TriggerError> {
        debug!("Signal handlers are not supported on non-unix systems.");

        Ok(())
    }
}
