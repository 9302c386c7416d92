use self::digest::{DigestError, DirectoryDigest};
use mockall::automock;
use thiserror::Error;

/// A check computing the content fingerprint of the watched directory.
pub mod digest;
/// A check testing if the network is reachable.
pub mod online;

/// A custom error for describing the error cases for checks
#[derive(Debug, Error)]
pub enum CheckError {
    /// Cannot initialize check, because it has a misconfiguration.
    #[error("not configured correctly: {0}")]
    Misconfigured(String),
    /// Cannot run check, because a file or directory cannot be read.
    #[error("cannot read the directory: {0}")]
    Unreadable(String),
}

impl From<DigestError> for CheckError {
    fn from(value: DigestError) -> Self {
        match value {
            DigestError::InvalidPattern(_, _) | DigestError::NotADirectory(_) => {
                CheckError::Misconfigured(value.to_string())
            }
            DigestError::Walk(_) | DigestError::Read(_, _) | DigestError::InvalidName(_) => {
                CheckError::Unreadable(value.to_string())
            }
        }
    }
}

/// A check is a process that fingerprints the watched directory, so changes
/// can be detected by comparing two results.
///
/// Checks may include:
///   - hashing every file in a directory ([digest::DigestCheck])
///   - etc.
#[automock]
pub trait Check {
    /// Compute the current digest of the watched directory.
    fn digest(&self) -> Result<DirectoryDigest, CheckError>;
}

/// A connectivity check is a probe telling if the deploy target can be reached.
#[automock]
pub trait Connectivity {
    /// Returns true if the network is reachable.
    fn is_online(&self) -> bool;
}
