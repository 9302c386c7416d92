use super::{lock, PersistedState, StateLock};
use log::{debug, warn};
use std::{
    fs, io,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use thiserror::Error;

const STATE_FILE: &str = "state.json";
const LOCK_FILE: &str = "state.lock";

/// A custom error describing the error cases for the state file.
#[derive(Debug, Error)]
pub enum StateError {
    /// Reading or writing one of the files failed.
    #[error("cannot access {0}: {1}")]
    Io(String, io::Error),
    /// The state cannot be turned into JSON.
    #[error("cannot serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Write the contents to a temporary file next to `path` and rename it over.
///
/// Readers either see the old or the new contents, never a half-written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StateError> {
    let io_error = |err| StateError::Io(path.display().to_string(), err);

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(io_error)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_error)?;
    tmp.write_all(contents).map_err(io_error)?;
    tmp.flush().map_err(io_error)?;
    tmp.persist(path).map_err(|err| io_error(err.error))?;

    Ok(())
}

/// The JSON file holding the [PersistedState] between invocations.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl StateStore {
    /// Creates a store that keeps its files in `directory`.
    pub fn new(directory: &Path) -> Self {
        StateStore {
            path: directory.join(STATE_FILE),
            lock_path: directory.join(LOCK_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state without creating anything.
    ///
    /// A missing file is the default state. A file that cannot be parsed is
    /// replaced by the default state as well, so one bad write doesn't break
    /// every following invocation.
    pub fn read(&self) -> Result<PersistedState, StateError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(PersistedState::default())
            }
            Err(err) => return Err(StateError::Io(self.path.display().to_string(), err)),
        };

        match serde_json::from_str(&content) {
            Ok(state) => Ok(state),
            Err(err) => {
                warn!(
                    "State file {} is corrupt ({err}), starting from an empty state.",
                    self.path.display()
                );
                Ok(PersistedState::default())
            }
        }
    }

    /// Read the state, writing the default state on the first run.
    pub fn load(&self) -> Result<PersistedState, StateError> {
        if !self.path.exists() {
            debug!("No state at {}, creating it.", self.path.display());
            let state = PersistedState::default();
            self.save(&state)?;
            return Ok(state);
        }

        self.read()
    }

    /// Overwrite the state file atomically.
    pub fn save(&self, state: &PersistedState) -> Result<(), StateError> {
        let content = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.path, &content)
    }

    /// Delete the state file, the next load starts from scratch.
    pub fn remove(&self) -> Result<(), StateError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StateError::Io(self.path.display().to_string(), err)),
        }
    }

    /// Take the exclusive lock for a read-modify-write cycle.
    ///
    /// Returns `None` if another process holds it. The lock is released when
    /// the returned guard is dropped.
    pub fn try_lock(&self) -> Result<Option<StateLock>, StateError> {
        if let Some(dir) = self.lock_path.parent() {
            fs::create_dir_all(dir)
                .map_err(|err| StateError::Io(dir.display().to_string(), err))?;
        }

        lock::try_lock(&self.lock_path)
            .map_err(|err| StateError::Io(self.lock_path.display().to_string(), err))
    }
}
