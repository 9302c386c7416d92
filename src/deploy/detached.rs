use super::{DeployError, DeployLog, DeployTimer, Deployer};
use crate::{
    checks::{digest::DirectoryDigest, Check},
    state::{write_atomic, DeployRecord, StateStore},
};
use duct::cmd;
use log::{debug, error, info, warn};
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use time::{Duration, OffsetDateTime};

const JOB_FILE: &str = "deploy-job.json";
const LOG_FILE: &str = "deploy.log";
const RESULT_FILE: &str = "deploy-result.json";

/// A worker running longer than this is given up on, its pid may belong to
/// another process by now.
const JOB_TIMEOUT: Duration = Duration::hours(6);

/// What a finished background deploy leaves behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub record: DeployRecord,
    /// The digest of the files that were deployed.
    pub digest: DirectoryDigest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Job {
    pid: u32,
    #[serde(with = "time::serde::rfc3339")]
    started: OffsetDateTime,
}

/// The state of the background deploy, as seen from a later invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum JobProgress {
    /// No deploy was started, or its files were cleared.
    Missing,
    /// The worker is still running, with its output so far.
    Running { log: String },
    /// The worker wrote its result.
    Finished(JobResult),
    /// The worker exited without a result.
    Crashed { output: String },
}

/// The files a background deploy uses to report back.
#[derive(Debug, Clone)]
pub struct JobFiles {
    job: PathBuf,
    log: PathBuf,
    result: PathBuf,
}

impl JobFiles {
    /// Creates the file set in the state directory.
    pub fn new(directory: &Path) -> Self {
        JobFiles {
            job: directory.join(JOB_FILE),
            log: directory.join(LOG_FILE),
            result: directory.join(RESULT_FILE),
        }
    }

    /// Check the result, then whether the worker is still alive.
    pub fn progress(&self) -> Result<JobProgress, DeployError> {
        self.progress_with(is_running)
    }

    fn progress_with(
        &self,
        is_running: impl Fn(u32) -> bool,
    ) -> Result<JobProgress, DeployError> {
        if let Some(result) = self.read_result()? {
            return Ok(JobProgress::Finished(result));
        }

        let Some(content) = read_optional(&self.job)? else {
            return Ok(JobProgress::Missing);
        };
        let job: Job = serde_json::from_str(&content)
            .map_err(|err| DeployError::Job(format!("invalid job file: {err}")))?;
        let log = read_optional(&self.log)?.unwrap_or_default();

        let elapsed = OffsetDateTime::now_utc() - job.started;
        if elapsed > JOB_TIMEOUT {
            warn!(
                "Background deploy {} started {} hours ago, giving up on it.",
                job.pid,
                elapsed.whole_hours()
            );
            return Ok(JobProgress::Crashed {
                output: format!(
                    "{log}The deploy did not finish in {} hours.",
                    JOB_TIMEOUT.whole_hours()
                ),
            });
        }

        if is_running(job.pid) {
            return Ok(JobProgress::Running { log });
        }

        // The worker may have written its result between the first read and exiting.
        match self.read_result()? {
            Some(result) => Ok(JobProgress::Finished(result)),
            None => Ok(JobProgress::Crashed { output: log }),
        }
    }

    fn read_result(&self) -> Result<Option<JobResult>, DeployError> {
        read_optional(&self.result)?
            .map(|content| {
                serde_json::from_str(&content)
                    .map_err(|err| DeployError::Job(format!("invalid result file: {err}")))
            })
            .transpose()
    }

    /// Write the result atomically, so a reader never sees half of it.
    pub fn write_result(&self, result: &JobResult) -> Result<(), DeployError> {
        let content = serde_json::to_vec_pretty(result)
            .map_err(|err| DeployError::Job(format!("cannot serialize result: {err}")))?;
        write_atomic(&self.result, &content)?;

        Ok(())
    }

    fn write_job(&self, job: &Job) -> Result<(), DeployError> {
        let content = serde_json::to_vec(job)
            .map_err(|err| DeployError::Job(format!("cannot serialize job: {err}")))?;
        write_atomic(&self.job, &content)?;

        Ok(())
    }

    /// Remove every file of the background deploy.
    pub fn clear(&self) -> Result<(), DeployError> {
        for path in [&self.job, &self.log, &self.result] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(DeployError::Job(format!(
                        "cannot remove {}: {err}",
                        path.display()
                    )))
                }
            }
        }

        Ok(())
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, DeployError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(DeployError::Job(format!("cannot read {}: {err}", path.display()))),
    }
}

#[cfg(unix)]
fn is_running(pid: u32) -> bool {
    use nix::{errno::Errno, sys::signal::kill, unistd::Pid};

    match i32::try_from(pid) {
        Ok(pid) => !matches!(kill(Pid::from_raw(pid), None), Err(Errno::ESRCH)),
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_running(_pid: u32) -> bool {
    // Without signals we wait for the result file.
    true
}

/// A launcher starts deploys that outlive the invocation starting them.
#[automock]
pub trait Launcher {
    /// Start a new background deploy, clearing the files of the previous one.
    fn launch(&self) -> Result<(), DeployError>;
    /// Inspect the current background deploy.
    fn progress(&self) -> Result<JobProgress, DeployError>;
    /// Forget the current background deploy.
    fn clear(&self) -> Result<(), DeployError>;
}

/// A launcher running a worker subprocess in the background.
///
/// The worker writes its output to the log file and its [JobResult] to the
/// result file when it finishes, so the next invocation knows exactly how it
/// went, instead of guessing from the output.
pub struct DetachedLauncher {
    files: JobFiles,
    program: PathBuf,
    args: Vec<String>,
}

impl DetachedLauncher {
    /// Creates a launcher starting `program` with `args` as the worker.
    pub fn new(files: JobFiles, program: PathBuf, args: Vec<String>) -> Self {
        DetachedLauncher {
            files,
            program,
            args,
        }
    }
}

impl Launcher for DetachedLauncher {
    fn launch(&self) -> Result<(), DeployError> {
        self.files.clear()?;
        if let Some(dir) = self.files.log.parent() {
            fs::create_dir_all(dir)?;
        }

        debug!(
            "Starting background deploy: {} {}.",
            self.program.display(),
            self.args.join(" ")
        );
        let handle = cmd(&self.program, &self.args)
            .stdin_null()
            .stderr_to_stdout()
            .stdout_path(&self.files.log)
            .unchecked()
            .start()?;
        let pid = handle
            .pids()
            .first()
            .copied()
            .ok_or_else(|| DeployError::Job(String::from("the worker has no process id")))?;

        self.files.write_job(&Job {
            pid,
            started: OffsetDateTime::now_utc(),
        })?;
        info!("Background deploy started with pid {pid}.");

        Ok(())
    }

    fn progress(&self) -> Result<JobProgress, DeployError> {
        self.files.progress()
    }

    fn clear(&self) -> Result<(), DeployError> {
        self.files.clear()
    }
}

/// The body of the worker process: digest, deploy and report the result.
///
/// A failing digest is reported as a failed deploy, so the invocation
/// waiting for it can always finish the deploy.
pub fn run_worker(
    check: &dyn Check,
    deployer: &dyn Deployer,
    store: &StateStore,
    files: &JobFiles,
) -> Result<(), DeployError> {
    let state = store.read()?;

    let result = match check.digest() {
        Ok(digest) => {
            let changed = digest.changed_paths(&state.deployed_digest).len();
            let record = deployer.deploy(&digest, changed);
            JobResult { record, digest }
        }
        Err(err) => {
            error!("Cannot compute the digest for the deploy: {err}.");
            let record = DeployTimer::start().finish(
                DeployLog::default(),
                Err(DeployError::Job(err.to_string())),
                0,
            );
            JobResult {
                record,
                digest: state.last_digest,
            }
        }
    };

    files.write_result(&result)
}
