use crate::{
    checks::digest::DirectoryDigest,
    state::{DeployRecord, RemoteInfo, StateError},
};
use mockall::automock;
use std::{io, time::Instant};
use thiserror::Error;
use time::OffsetDateTime;

/// A deploy running in a background worker process.
pub mod detached;
/// A deploy running a shell command on a staged copy of the files.
pub mod script;

/// A custom error for describing the error cases for deploys
#[derive(Debug, Error)]
pub enum DeployError {
    /// Copying the measured files to the staging directory failed.
    #[error("cannot stage {0}: {1}")]
    Staging(String, io::Error),
    /// The underlying Rust command creation failed. The parameter contains the error.
    #[error("the deploy command cannot run: {0}")]
    CommandFailure(#[from] io::Error),
    /// The command returned a non-zero exit code. The parameters are the exit code and the output.
    #[error("the deploy command returned non-zero exit code {0} with message:\n{1}")]
    NonZeroExitcode(i32, String),
    /// The command output contains non-UTF8 characters.
    #[error("the deploy command returned invalid characters")]
    NonUtf8Return,
    /// The files of a background deploy cannot be read or written.
    #[error("background deploy failed: {0}")]
    Job(String),
    /// The state file cannot be read.
    #[error("{0}")]
    State(#[from] StateError),
}

/// A deployer uploads the watched directory to the hosting provider.
///
/// Deployers may include:
///   - running a deploy command ([script::ScriptDeployer])
///   - etc.
#[automock]
pub trait Deployer {
    /// Deploy exactly the files in `digest`, the same set that was measured.
    ///
    /// It never fails: errors are captured in [DeployRecord::error].
    /// `changed_files` is used as the file count, if the deploy doesn't report one.
    fn deploy(&self, digest: &DirectoryDigest, changed_files: usize) -> DeployRecord;
}

/// What the hosting provider reported about a successful deploy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeployOutcome {
    pub remote_info: Option<RemoteInfo>,
    pub uploaded: Option<usize>,
}

/// The progress log of a deploy, one line per event.
#[derive(Debug, Clone, Default)]
pub struct DeployLog(String);

impl DeployLog {
    pub fn push(&mut self, event: &str) {
        self.0.push_str("✓ ");
        self.0.push_str(event);
        self.0.push('\n');
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Measures one deploy attempt, from start to the finished [DeployRecord].
pub struct DeployTimer {
    timestamp: OffsetDateTime,
    started: Instant,
}

impl DeployTimer {
    pub fn start() -> Self {
        DeployTimer {
            timestamp: OffsetDateTime::now_utc(),
            started: Instant::now(),
        }
    }

    /// Create the record of the attempt, capturing the error if there was one.
    pub fn finish(
        self,
        log: DeployLog,
        result: Result<DeployOutcome, DeployError>,
        changed_files: usize,
    ) -> DeployRecord {
        let duration_seconds = self.started.elapsed().as_secs_f64();
        let (outcome, error) = match result {
            Ok(outcome) => (outcome, None),
            Err(err) => (DeployOutcome::default(), Some(format!("Deploy failed\n{err}"))),
        };

        DeployRecord {
            timestamp: self.timestamp,
            duration_seconds,
            changed_file_count: outcome.uploaded.unwrap_or(changed_files),
            log: log.into_string(),
            error,
            remote_info: outcome.remote_info,
        }
    }
}
