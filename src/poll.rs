use crate::{
    checks::{digest::DirectoryDigest, Check, CheckError, Connectivity},
    deploy::{
        detached::{JobProgress, Launcher},
        DeployError, Deployer,
    },
    render::Snapshot,
    state::{PersistedState, StateError, StateStore, Status},
};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

/// A custom error describing the error cases for a poll.
#[derive(Debug, Error)]
pub enum PollError {
    /// The digest cannot be computed.
    #[error("{0}")]
    Check(#[from] CheckError),
    /// The state cannot be read or written.
    #[error("{0}")]
    State(#[from] StateError),
    /// The background deploy cannot be started or inspected.
    #[error("{0}")]
    Deploy(#[from] DeployError),
    /// Another invocation holds the state lock.
    #[error("another invocation is updating the state, try again later")]
    Busy,
}

/// When a detected change gets deployed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStrategy {
    /// Mark the deploy in one poll, run it in the next one, so the menu shows
    /// the queued and the running deploy before the long step.
    #[default]
    Staggered,
    /// Run the deploy in the same poll that detects the change.
    Immediate,
    /// Run the deploy in a background worker and check on it in the later polls.
    Detached,
}

impl FromStr for DeployStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staggered" => Ok(DeployStrategy::Staggered),
            "immediate" => Ok(DeployStrategy::Immediate),
            "detached" => Ok(DeployStrategy::Detached),
            s => Err(format!(
                "cannot parse {s}, valid values: staggered, immediate, detached"
            )),
        }
    }
}

/// The state machine driving the deploys, one step per [Poller::poll].
///
/// Every invocation of the program is independent, they only share the state
/// file. Steps take the state lock, so two invocations never step at once.
pub struct Poller {
    check: Box<dyn Check>,
    connectivity: Box<dyn Connectivity>,
    deployer: Box<dyn Deployer>,
    launcher: Box<dyn Launcher>,
    store: StateStore,
    strategy: DeployStrategy,
    history_limit: usize,
}

impl Poller {
    pub fn new(
        check: Box<dyn Check>,
        connectivity: Box<dyn Connectivity>,
        deployer: Box<dyn Deployer>,
        launcher: Box<dyn Launcher>,
        store: StateStore,
    ) -> Self {
        Poller {
            check,
            connectivity,
            deployer,
            launcher,
            store,
            strategy: DeployStrategy::default(),
            history_limit: crate::state::DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_strategy(mut self, strategy: DeployStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }

    /// Run one step of the state machine and return what to display.
    pub fn poll(&self) -> Result<Snapshot, PollError> {
        let Some(_lock) = self.store.try_lock()? else {
            info!("Another invocation is updating the state, showing it as it is.");
            return self.status();
        };

        let mut state = self.store.load()?;
        if !self.connectivity.is_online() {
            info!("The network is unreachable, skipping this poll.");
            let mut snapshot = Snapshot::from_state(&state);
            snapshot.online = false;
            return Ok(snapshot);
        }

        let mut progress = vec![];
        match state.status {
            Status::NeedsDeploy => self.start_deploy(&mut state, None)?,
            Status::Deploying => progress = self.continue_deploy(&mut state)?,
            Status::Idle | Status::Offline => self.detect_changes(&mut state)?,
            Status::Error => debug!("The last deploy failed to run, waiting for a trigger."),
        }

        let mut snapshot = Snapshot::from_state(&state);
        snapshot.progress = progress;
        Ok(snapshot)
    }

    /// The persisted state without any transition.
    pub fn status(&self) -> Result<Snapshot, PollError> {
        let state = self.store.read()?;
        let mut snapshot = Snapshot::from_state(&state);
        if state.status == Status::Deploying {
            if let JobProgress::Running { log } = self.launcher.progress()? {
                snapshot.progress = lines(&log);
            }
        }

        Ok(snapshot)
    }

    /// Poll (or only read the state) for the menu. Errors are shown in the
    /// menu next to the last known state.
    pub fn menu(&self, update: bool) -> Snapshot {
        let result = if update { self.poll() } else { self.status() };

        result.unwrap_or_else(|err| {
            error!("{err}");
            let mut snapshot = self.status().unwrap_or_default();
            snapshot.failure = Some(err.to_string());
            snapshot
        })
    }

    /// Queue a deploy for the next poll, even if nothing changed.
    pub fn trigger(&self) -> Result<Snapshot, PollError> {
        let _lock = self.store.try_lock()?.ok_or(PollError::Busy)?;

        let mut state = self.store.load()?;
        match state.status {
            Status::Deploying => info!("A deploy is already running."),
            Status::NeedsDeploy => info!("A deploy is already queued."),
            _ => {
                info!("Deploy queued.");
                state.status = Status::NeedsDeploy;
                state.failure = None;
                self.store.save(&state)?;
            }
        }

        Ok(Snapshot::from_state(&state))
    }

    /// Forget everything: the state and the background deploy files.
    pub fn reset(&self) -> Result<(), PollError> {
        let _lock = self.store.try_lock()?.ok_or(PollError::Busy)?;

        self.store.remove()?;
        self.launcher.clear()?;
        info!("State reset.");

        Ok(())
    }

    fn detect_changes(&self, state: &mut PersistedState) -> Result<(), PollError> {
        let digest = self.check.digest()?;
        if digest == state.last_digest {
            debug!("No changes in {} files.", digest.len());
            return Ok(());
        }

        info!(
            "Detected changes in {} files.",
            digest.changed_paths(&state.last_digest).len()
        );
        state.last_digest = digest.clone();
        match self.strategy {
            DeployStrategy::Staggered => {
                state.status = Status::NeedsDeploy;
                self.store.save(state)?;
                Ok(())
            }
            _ => self.start_deploy(state, Some(digest)),
        }
    }

    fn start_deploy(
        &self,
        state: &mut PersistedState,
        digest: Option<DirectoryDigest>,
    ) -> Result<(), PollError> {
        match self.strategy {
            DeployStrategy::Staggered => {
                state.status = Status::Deploying;
                self.store.save(state)?;
            }
            DeployStrategy::Immediate => {
                state.status = Status::Deploying;
                self.store.save(state)?;
                let digest = match digest {
                    Some(digest) => digest,
                    None => self.check.digest()?,
                };
                self.deploy(state, digest)?;
            }
            DeployStrategy::Detached => {
                self.launcher.launch()?;
                state.status = Status::Deploying;
                self.store.save(state)?;
            }
        }

        Ok(())
    }

    fn continue_deploy(&self, state: &mut PersistedState) -> Result<Vec<String>, PollError> {
        if self.strategy != DeployStrategy::Detached {
            let digest = self.check.digest()?;
            self.deploy(state, digest)?;
            return Ok(vec![]);
        }

        match self.launcher.progress()? {
            JobProgress::Running { log } => {
                debug!("The background deploy is still running.");
                return Ok(lines(&log));
            }
            JobProgress::Finished(result) => {
                info!("The background deploy finished.");
                state.record_deploy(result.record, result.digest, self.history_limit);
            }
            JobProgress::Crashed { output } => {
                warn!("The background deploy exited without a result.");
                state.status = Status::Error;
                state.failure = Some(format!(
                    "The deploy exited without a result\n{}",
                    output.trim_end()
                ));
            }
            JobProgress::Missing => {
                warn!("The background deploy is gone, starting it again.");
                self.launcher.launch()?;
                return Ok(vec![]);
            }
        }

        self.store.save(state)?;
        self.launcher.clear()?;
        Ok(vec![])
    }

    fn deploy(&self, state: &mut PersistedState, digest: DirectoryDigest) -> Result<(), PollError> {
        let changed = digest.changed_paths(&state.deployed_digest).len();
        let record = self.deployer.deploy(&digest, changed);
        state.record_deploy(record, digest, self.history_limit);
        self.store.save(state)?;

        Ok(())
    }
}

fn lines(log: &str) -> Vec<String> {
    log.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        checks::{MockCheck, MockConnectivity},
        deploy::{detached::JobResult, detached::MockLauncher, MockDeployer},
        state::DeployRecord,
    };
    use std::{error::Error, fs};
    use tempfile::TempDir;
    use time::OffsetDateTime;

    fn digest(entries: &[(&str, &str)]) -> DirectoryDigest {
        entries.iter().copied().collect()
    }

    fn record(error: Option<&str>) -> DeployRecord {
        DeployRecord {
            timestamp: OffsetDateTime::UNIX_EPOCH,
            duration_seconds: 1.0,
            changed_file_count: 1,
            log: String::from("✓ Finished uploading\n"),
            error: error.map(String::from),
            remote_info: None,
        }
    }

    fn online() -> Box<MockConnectivity> {
        let mut connectivity = MockConnectivity::new();
        connectivity.expect_is_online().returning(|| true);
        Box::new(connectivity)
    }

    fn check(result: DirectoryDigest) -> Box<MockCheck> {
        let mut check = MockCheck::new();
        check
            .expect_digest()
            .returning(move || Ok(result.clone()));
        Box::new(check)
    }

    fn no_check() -> Box<MockCheck> {
        let mut check = MockCheck::new();
        check.expect_digest().times(0);
        Box::new(check)
    }

    fn no_deployer() -> Box<MockDeployer> {
        let mut deployer = MockDeployer::new();
        deployer.expect_deploy().times(0);
        Box::new(deployer)
    }

    fn deployer(error: Option<&'static str>) -> Box<MockDeployer> {
        let mut deployer = MockDeployer::new();
        deployer
            .expect_deploy()
            .times(1)
            .returning(move |_, _| record(error));
        Box::new(deployer)
    }

    fn no_launcher() -> Box<MockLauncher> {
        let mut launcher = MockLauncher::new();
        launcher.expect_launch().times(0);
        launcher.expect_progress().times(0);
        launcher.expect_clear().times(0);
        Box::new(launcher)
    }

    fn save(dir: &TempDir, state: &PersistedState) -> Result<StateStore, Box<dyn Error>> {
        let store = StateStore::new(dir.path());
        store.save(state)?;
        Ok(store)
    }

    #[test]
    fn it_should_queue_a_deploy_on_the_first_poll() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = StateStore::new(dir.path());
        let poller = Poller::new(
            check(digest(&[("/a.txt", "1")])),
            online(),
            no_deployer(),
            no_launcher(),
            store.clone(),
        );

        let snapshot = poller.poll()?;

        assert_eq!(Status::NeedsDeploy, snapshot.status);
        let state = store.read()?;
        assert_eq!(Status::NeedsDeploy, state.status);
        assert_eq!(digest(&[("/a.txt", "1")]), state.last_digest);
        assert!(state.deploy_history.is_empty());

        Ok(())
    }

    #[test]
    fn it_should_mark_the_deploy_before_running_it() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                status: Status::NeedsDeploy,
                ..Default::default()
            },
        )?;
        let poller = Poller::new(no_check(), online(), no_deployer(), no_launcher(), store.clone());

        let snapshot = poller.poll()?;

        assert_eq!(Status::Deploying, snapshot.status);
        assert_eq!(Status::Deploying, store.read()?.status);

        Ok(())
    }

    #[test]
    fn it_should_deploy_and_return_to_idle() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                status: Status::Deploying,
                last_digest: digest(&[("/a.txt", "1")]),
                deployed_digest: digest(&[("/a.txt", "0"), ("/b.txt", "0")]),
                ..Default::default()
            },
        )?;
        let mut deployer = MockDeployer::new();
        deployer
            .expect_deploy()
            .times(1)
            .withf(|digest, changed| digest.len() == 2 && *changed == 3)
            .returning(|_, _| record(None));
        let poller = Poller::new(
            check(digest(&[("/a.txt", "1"), ("/c.txt", "2")])),
            online(),
            Box::new(deployer),
            no_launcher(),
            store.clone(),
        );

        let snapshot = poller.poll()?;

        assert_eq!(Status::Idle, snapshot.status);
        assert_eq!(vec![record(None)], snapshot.history);
        let state = store.read()?;
        assert_eq!(Status::Idle, state.status);
        assert_eq!(digest(&[("/a.txt", "1"), ("/c.txt", "2")]), state.last_digest);
        assert_eq!(state.last_digest, state.deployed_digest);

        Ok(())
    }

    #[test]
    fn it_should_record_a_failed_deploy_and_return_to_idle() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                status: Status::Deploying,
                ..Default::default()
            },
        )?;
        let poller = Poller::new(
            check(digest(&[("/a.txt", "1")])),
            online(),
            deployer(Some("Deploy failed\nconnection reset")),
            no_launcher(),
            store.clone(),
        );

        let snapshot = poller.poll()?;

        assert_eq!(Status::Idle, snapshot.status);
        assert!(snapshot.history[0].is_failed());
        assert_eq!(Status::Idle, store.read()?.status);

        Ok(())
    }

    #[test]
    fn it_should_not_touch_the_state_offline() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                status: Status::NeedsDeploy,
                ..Default::default()
            },
        )?;
        let before = fs::read_to_string(store.path())?;
        let mut connectivity = MockConnectivity::new();
        connectivity.expect_is_online().returning(|| false);
        let poller = Poller::new(
            no_check(),
            Box::new(connectivity),
            no_deployer(),
            no_launcher(),
            store.clone(),
        );

        let snapshot = poller.poll()?;

        assert!(!snapshot.online);
        assert_eq!(before, fs::read_to_string(store.path())?);

        Ok(())
    }

    #[test]
    fn it_should_not_write_without_changes() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                last_digest: digest(&[("/a.txt", "1")]),
                ..Default::default()
            },
        )?;
        let before = fs::metadata(store.path())?.modified()?;
        let poller = Poller::new(
            check(digest(&[("/a.txt", "1")])),
            online(),
            no_deployer(),
            no_launcher(),
            store.clone(),
        );

        let first = poller.poll()?;
        let second = poller.poll()?;

        assert_eq!(first, second);
        assert_eq!(Status::Idle, second.status);
        assert_eq!(before, fs::metadata(store.path())?.modified()?);

        Ok(())
    }

    #[test]
    fn it_should_cap_the_history() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                status: Status::Deploying,
                deploy_history: vec![record(Some("old")); 3],
                ..Default::default()
            },
        )?;
        let poller = Poller::new(
            check(digest(&[("/a.txt", "1")])),
            online(),
            deployer(None),
            no_launcher(),
            store.clone(),
        )
        .with_history_limit(2);

        let snapshot = poller.poll()?;

        assert_eq!(vec![record(None), record(Some("old"))], snapshot.history);

        Ok(())
    }

    #[test]
    fn it_should_deploy_immediately() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = StateStore::new(dir.path());
        let mut check = MockCheck::new();
        check
            .expect_digest()
            .times(1)
            .returning(|| Ok(digest(&[("/a.txt", "1")])));
        let poller = Poller::new(
            Box::new(check),
            online(),
            deployer(None),
            no_launcher(),
            store.clone(),
        )
        .with_strategy(DeployStrategy::Immediate);

        let snapshot = poller.poll()?;

        assert_eq!(Status::Idle, snapshot.status);
        assert_eq!(1, snapshot.history.len());
        assert_eq!(digest(&[("/a.txt", "1")]), store.read()?.deployed_digest);

        Ok(())
    }

    #[test]
    fn it_should_launch_a_background_deploy() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = StateStore::new(dir.path());
        let mut launcher = MockLauncher::new();
        launcher.expect_launch().times(1).returning(|| Ok(()));
        let poller = Poller::new(
            check(digest(&[("/a.txt", "1")])),
            online(),
            no_deployer(),
            Box::new(launcher),
            store.clone(),
        )
        .with_strategy(DeployStrategy::Detached);

        let snapshot = poller.poll()?;

        assert_eq!(Status::Deploying, snapshot.status);
        assert_eq!(Status::Deploying, store.read()?.status);

        Ok(())
    }

    #[test]
    fn it_should_show_the_progress_of_a_background_deploy() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                status: Status::Deploying,
                ..Default::default()
            },
        )?;
        let mut launcher = MockLauncher::new();
        launcher.expect_progress().returning(|| {
            Ok(JobProgress::Running {
                log: String::from("Hashing files\n\nUploading 2 files\n"),
            })
        });
        launcher.expect_clear().times(0);
        let poller = Poller::new(
            no_check(),
            online(),
            no_deployer(),
            Box::new(launcher),
            store.clone(),
        )
        .with_strategy(DeployStrategy::Detached);

        let snapshot = poller.poll()?;

        assert_eq!(Status::Deploying, snapshot.status);
        assert_eq!(
            vec![String::from("Hashing files"), String::from("Uploading 2 files")],
            snapshot.progress
        );

        Ok(())
    }

    #[test]
    fn it_should_finish_a_background_deploy() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                status: Status::Deploying,
                ..Default::default()
            },
        )?;
        let mut launcher = MockLauncher::new();
        launcher.expect_progress().times(1).returning(|| {
            Ok(JobProgress::Finished(JobResult {
                record: record(None),
                digest: digest(&[("/a.txt", "1")]),
            }))
        });
        launcher.expect_clear().times(1).returning(|| Ok(()));
        let poller = Poller::new(
            no_check(),
            online(),
            no_deployer(),
            Box::new(launcher),
            store.clone(),
        )
        .with_strategy(DeployStrategy::Detached);

        let snapshot = poller.poll()?;

        assert_eq!(Status::Idle, snapshot.status);
        let state = store.read()?;
        assert_eq!(vec![record(None)], state.deploy_history);
        assert_eq!(digest(&[("/a.txt", "1")]), state.deployed_digest);
        assert_eq!(state.deployed_digest, state.last_digest);

        Ok(())
    }

    #[test]
    fn it_should_fail_on_a_crashed_background_deploy() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                status: Status::Deploying,
                ..Default::default()
            },
        )?;
        let mut launcher = MockLauncher::new();
        launcher.expect_progress().times(1).returning(|| {
            Ok(JobProgress::Crashed {
                output: String::from("thread 'main' panicked\n"),
            })
        });
        launcher.expect_clear().times(1).returning(|| Ok(()));
        let poller = Poller::new(
            no_check(),
            online(),
            no_deployer(),
            Box::new(launcher),
            store.clone(),
        )
        .with_strategy(DeployStrategy::Detached);

        let snapshot = poller.poll()?;

        assert_eq!(Status::Error, snapshot.status);
        assert_eq!(
            Some(String::from(
                "The deploy exited without a result\nthread 'main' panicked"
            )),
            store.read()?.failure
        );

        Ok(())
    }

    #[test]
    fn it_should_wait_in_error_until_triggered() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                status: Status::Error,
                failure: Some(String::from("crashed")),
                ..Default::default()
            },
        )?;
        let poller = Poller::new(no_check(), online(), no_deployer(), no_launcher(), store.clone());

        assert_eq!(Status::Error, poller.poll()?.status);

        let snapshot = poller.trigger()?;

        assert_eq!(Status::NeedsDeploy, snapshot.status);
        assert_eq!(None, store.read()?.failure);

        Ok(())
    }

    #[test]
    fn it_should_not_trigger_a_running_deploy() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                status: Status::Deploying,
                ..Default::default()
            },
        )?;
        let poller = Poller::new(no_check(), online(), no_deployer(), no_launcher(), store.clone());

        assert_eq!(Status::Deploying, poller.trigger()?.status);

        Ok(())
    }

    #[test]
    fn it_should_reset_everything() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                status: Status::Error,
                ..Default::default()
            },
        )?;
        let mut launcher = MockLauncher::new();
        launcher.expect_clear().times(1).returning(|| Ok(()));
        let poller = Poller::new(
            no_check(),
            online(),
            no_deployer(),
            Box::new(launcher),
            store.clone(),
        );

        poller.reset()?;

        assert!(!store.path().exists());

        Ok(())
    }

    #[test]
    fn it_should_only_show_the_state_if_locked() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                status: Status::NeedsDeploy,
                ..Default::default()
            },
        )?;
        let poller = Poller::new(no_check(), online(), no_deployer(), no_launcher(), store.clone());

        let _lock = store.try_lock()?;
        let snapshot = poller.poll()?;

        assert_eq!(Status::NeedsDeploy, snapshot.status);
        assert_eq!(Status::NeedsDeploy, store.read()?.status);
        assert!(matches!(poller.trigger(), Err(PollError::Busy)));

        Ok(())
    }

    #[test]
    fn it_should_propagate_digest_errors() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = StateStore::new(dir.path());
        let mut check = MockCheck::new();
        check
            .expect_digest()
            .returning(|| Err(CheckError::Unreadable(String::from("permission denied"))));
        let poller = Poller::new(
            Box::new(check),
            online(),
            no_deployer(),
            no_launcher(),
            store.clone(),
        );

        let result = poller.poll();

        assert!(matches!(result, Err(PollError::Check(_))));
        assert_eq!(PersistedState::default(), store.read()?);

        Ok(())
    }

    #[test]
    fn it_should_show_the_history_next_to_a_failing_poll() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                deploy_history: vec![record(None)],
                ..Default::default()
            },
        )?;
        let mut check = MockCheck::new();
        check
            .expect_digest()
            .times(1)
            .returning(|| Err(CheckError::Unreadable(String::from("permission denied"))));
        let poller = Poller::new(
            Box::new(check),
            online(),
            no_deployer(),
            no_launcher(),
            store,
        );

        let snapshot = poller.menu(true);

        assert_eq!(Status::Idle, snapshot.status);
        assert_eq!(vec![record(None)], snapshot.history);
        let failure = snapshot.failure.unwrap_or_default();
        assert!(failure.contains("permission denied"), "{failure}");

        Ok(())
    }

    #[test]
    fn it_should_show_a_failure_if_the_state_cannot_be_shown() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let store = save(
            &dir,
            &PersistedState {
                status: Status::Deploying,
                ..Default::default()
            },
        )?;
        let mut launcher = MockLauncher::new();
        launcher
            .expect_progress()
            .returning(|| Err(DeployError::Job(String::from("invalid job file"))));
        let poller = Poller::new(no_check(), online(), no_deployer(), Box::new(launcher), store);

        let snapshot = poller.menu(false);

        assert!(snapshot.online);
        assert!(snapshot.history.is_empty());
        let failure = snapshot.failure.unwrap_or_default();
        assert!(failure.contains("invalid job file"), "{failure}");

        Ok(())
    }

    #[test]
    fn it_should_parse_strategies() {
        assert_eq!(Ok(DeployStrategy::Detached), "detached".parse());
        assert!("eventually".parse::<DeployStrategy>().is_err());
    }
}
