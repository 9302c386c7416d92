use std::{io, path::Path};

/// An exclusive advisory lock on the state, released on drop.
#[cfg(unix)]
pub struct StateLock {
    _lock: nix::fcntl::Flock<std::fs::File>,
}

/// Locks are not supported on this platform, the guard is a no-op.
#[cfg(not(unix))]
pub struct StateLock;

#[cfg(unix)]
pub fn try_lock(path: &Path) -> Result<Option<StateLock>, io::Error> {
    use nix::{
        errno::Errno,
        fcntl::{Flock, FlockArg},
    };
    use std::fs::OpenOptions;

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)?;

    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(lock) => Ok(Some(StateLock { _lock: lock })),
        Err((_, errno)) if errno == Errno::EWOULDBLOCK => Ok(None),
        Err((_, errno)) => Err(io::Error::from(errno)),
    }
}

#[cfg(not(unix))]
pub fn try_lock(_path: &Path) -> Result<Option<StateLock>, io::Error> {
    log::debug!("File locks are not supported on non-unix systems.");

    Ok(Some(StateLock))
}
