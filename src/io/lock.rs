use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Name of the lock file inside the data directory. It is created once and
/// never removed: every process must lock the same inode.
pub const LOCK_FILE: &str = "taskflow.lock";

/// How long a writer waits for another `tf` process by default
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const FIRST_RETRY: Duration = Duration::from_millis(2);
const MAX_RETRY: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("timed out after {waited:?} waiting for {path}; is another tf process stuck?")]
    Timeout { path: PathBuf, waited: Duration },
    #[error("could not lock {path}: {source}")]
    Os { path: PathBuf, source: io::Error },
}

/// Exclusive hold on the data directory for one read-modify-write cycle.
/// Dropping it closes the descriptor, which releases the flock.
#[derive(Debug)]
pub struct StoreLock {
    _held: File,
}

impl StoreLock {
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = data_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;

        let started = Instant::now();
        let mut pause = FIRST_RETRY;
        loop {
            match try_exclusive(&file) {
                Ok(true) => return Ok(StoreLock { _held: file }),
                Ok(false) => {}
                Err(source) => return Err(LockError::Os { path, source }),
            }
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(LockError::Timeout { path, waited });
            }
            thread::sleep(pause);
            pause = (pause * 2).min(MAX_RETRY);
        }
    }

    pub fn acquire_default(data_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(data_dir, DEFAULT_TIMEOUT)
    }
}

/// `Ok(false)` when someone else holds the lock
#[cfg(unix)]
fn try_exclusive(file: &File) -> io::Result<bool> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor is owned by `file` and open for the whole call
    if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) } == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(code) if code == libc::EWOULDBLOCK || code == libc::EINTR => Ok(false),
        _ => Err(err),
    }
}

#[cfg(not(unix))]
fn try_exclusive(_file: &File) -> io::Result<bool> {
    Ok(true)
}
