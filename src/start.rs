use crate::{
    poll::Poller,
    render::Snapshot,
    triggers::{Trigger, TriggerError},
};
use log::{debug, error, info};
use std::{sync::mpsc, thread};
use thiserror::Error;

/// A custom error implementation for the start function
#[derive(Debug, Error)]
pub enum StartError {
    #[error("You have to define at least one trigger.")]
    NoTriggers,
    #[error("Trigger failed: {0}.")]
    MisconfiguredTrigger(#[from] TriggerError),
}

/// The watch loop, that polls on every trigger until one of them stops it.
///
/// A failing poll is logged and the loop goes on, the next trigger tries again.
pub fn start(triggers: Vec<Box<dyn Trigger>>, poller: &Poller) -> Result<(), StartError> {
    let (tx, rx) = mpsc::channel::<Option<()>>();

    if triggers.is_empty() {
        return Err(StartError::NoTriggers);
    }

    for trigger in triggers {
        let tx = tx.clone();
        thread::spawn(move || {
            let result = trigger.listen(tx);
            if let Err(err) = result {
                error!("Trigger failed: {err}.");
            }
        });
    }
    drop(tx);

    debug!("Waiting on triggers.");
    while let Ok(Some(())) = rx.recv() {
        match poller.poll() {
            Ok(snapshot) => log_snapshot(&snapshot),
            Err(err) => error!("Poll failed: {err}."),
        }
    }

    debug!("Finished running.");

    Ok(())
}

fn log_snapshot(snapshot: &Snapshot) {
    if !snapshot.online {
        info!("Offline, syncing disabled.");
        return;
    }

    match snapshot.history.first() {
        Some(record) if record.is_failed() => info!(
            "Status {}, the last deploy failed: {}.",
            snapshot.status,
            record.error.as_deref().unwrap_or_default().replace('\n', " ")
        ),
        Some(record) => info!(
            "Status {}, the last deploy uploaded {} files in {:.1}s.",
            snapshot.status, record.changed_file_count, record.duration_seconds
        ),
        None => debug!("Status {}, nothing deployed yet.", snapshot.status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        checks::{CheckError, MockCheck, MockConnectivity},
        deploy::{detached::MockLauncher, MockDeployer},
        state::{DeployRecord, StateStore, Status},
        triggers::MockTrigger,
    };
    use std::error::Error;
    use tempfile::TempDir;
    use time::OffsetDateTime;

    fn poller(dir: &TempDir, check: MockCheck, deployer: MockDeployer) -> Poller {
        let mut connectivity = MockConnectivity::new();
        connectivity.expect_is_online().returning(|| true);
        let mut launcher = MockLauncher::new();
        launcher.expect_launch().times(0);

        Poller::new(
            Box::new(check),
            Box::new(connectivity),
            Box::new(deployer),
            Box::new(launcher),
            StateStore::new(dir.path()),
        )
        .with_strategy(crate::poll::DeployStrategy::Immediate)
    }

    fn trigger_times(times: usize) -> Vec<Box<dyn Trigger>> {
        let mut mock_trigger = MockTrigger::new();
        mock_trigger.expect_listen().returning(move |tx| {
            for _ in 0..times {
                tx.send(Some(()))?;
            }
            tx.send(None)?;
            Ok(())
        });

        vec![Box::new(mock_trigger)]
    }

    #[test]
    fn it_should_deploy_once_on_changes() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let mut check = MockCheck::new();
        check
            .expect_digest()
            .times(2)
            .returning(|| Ok([("/a.txt", "1")].into_iter().collect()));
        let mut deployer = MockDeployer::new();
        deployer.expect_deploy().times(1).returning(|_, _| DeployRecord {
            timestamp: OffsetDateTime::UNIX_EPOCH,
            duration_seconds: 1.0,
            changed_file_count: 1,
            log: String::new(),
            error: None,
            remote_info: None,
        });
        let poller = poller(&dir, check, deployer);

        start(trigger_times(2), &poller)?;

        let state = StateStore::new(dir.path()).read()?;
        assert_eq!(Status::Idle, state.status);
        assert_eq!(1, state.deploy_history.len());

        Ok(())
    }

    #[test]
    fn it_should_keep_polling_after_a_failure() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let mut check = MockCheck::new();
        check
            .expect_digest()
            .times(3)
            .returning(|| Err(CheckError::Unreadable(String::from("Testing purposes."))));
        let mut deployer = MockDeployer::new();
        deployer.expect_deploy().times(0);
        let poller = poller(&dir, check, deployer);

        let result = start(trigger_times(3), &poller);

        assert!(result.is_ok());

        Ok(())
    }

    #[test]
    fn it_should_fail_without_triggers() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let mut check = MockCheck::new();
        check.expect_digest().times(0);
        let poller = poller(&dir, check, MockDeployer::new());

        let result = start(vec![], &poller);

        assert!(matches!(result, Err(StartError::NoTriggers)));

        Ok(())
    }
}
