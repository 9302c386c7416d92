use crate::checks::digest::DirectoryDigest;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use time::OffsetDateTime;

mod lock;
mod store;

pub use lock::StateLock;
pub use store::{write_atomic, StateError, StateStore};

/// The number of deploys kept in the history if nothing else is configured.
pub const DEFAULT_HISTORY_LIMIT: usize = 6;

/// The deploy lifecycle state.
///
/// `Offline` is only ever displayed, it is never written to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Idle,
    NeedsDeploy,
    Deploying,
    Offline,
    Error,
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Idle => "IDLE",
            Status::NeedsDeploy => "NEEDS_DEPLOY",
            Status::Deploying => "DEPLOYING",
            Status::Offline => "OFFLINE",
            Status::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// A reference to the deploy on the hosting provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_id: Option<String>,
    /// Link to the deploy in the provider's admin interface.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The result of one deploy attempt. An `error` means the attempt failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRecord {
    #[serde(with = "time::serde::rfc3339", default = "unix_epoch")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub changed_file_count: usize,
    #[serde(default)]
    pub log: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_info: Option<RemoteInfo>,
}

fn unix_epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

impl DeployRecord {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Everything that survives between two invocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedState {
    pub status: Status,
    /// The digest at the last comparison point.
    pub last_digest: DirectoryDigest,
    /// The digest uploaded by the last finished deploy attempt.
    pub deployed_digest: DirectoryDigest,
    /// Newest first.
    pub deploy_history: Vec<DeployRecord>,
    /// Why the status is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl PersistedState {
    /// Store a finished deploy attempt and go back to idle.
    ///
    /// The record is put in front of the history, which is cut to `limit` entries.
    pub fn record_deploy(&mut self, record: DeployRecord, digest: DirectoryDigest, limit: usize) {
        self.deploy_history.insert(0, record);
        self.deploy_history.truncate(limit);
        self.last_digest = digest.clone();
        self.deployed_digest = digest;
        self.status = Status::Idle;
        self.failure = None;
    }
}
