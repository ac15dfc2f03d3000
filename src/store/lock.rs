//! Cross-process advisory lock on the store's sidecar lock file.
//!
//! On unix this is `flock(2)` with `LOCK_EX | LOCK_NB`, retried until the
//! timeout expires. The kernel drops the lock if the process dies, so there
//! is no stale-lock cleanup. Elsewhere an exclusive `create_new` marker file
//! stands in for it.

use crate::error::{TaskError, TaskResult};
use std::fs::{File, OpenOptions};
use std::path::Path;
#[cfg(not(unix))]
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::trace;

const LOCK_RETRY_DELAY: Duration = Duration::from_millis(5);

/// Held exclusive lock. Released on drop.
#[derive(Debug)]
pub struct FileLock {
    #[cfg(not(unix))]
    path: PathBuf,
    #[cfg_attr(not(unix), allow(dead_code))]
    file: File,
}

impl FileLock {
    /// Acquire the lock at `path`, waiting at most `timeout`.
    pub fn acquire(path: &Path, timeout: Duration) -> TaskResult<Self> {
        let started = Instant::now();
        loop {
            match Self::try_acquire(path)? {
                Some(lock) => {
                    trace!(path = %path.display(), waited_ms = started.elapsed().as_millis() as u64, "Acquired store lock");
                    return Ok(lock);
                }
                None => {
                    if started.elapsed() >= timeout {
                        return Err(TaskError::lock_timeout(
                            path.display(),
                            started.elapsed().as_millis(),
                        ));
                    }
                    std::thread::sleep(LOCK_RETRY_DELAY);
                }
            }
        }
    }

    /// One non-blocking attempt. `Ok(None)` means someone else holds it.
    #[cfg(unix)]
    fn try_acquire(path: &Path) -> TaskResult<Option<Self>> {
        use std::os::unix::io::AsRawFd;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                TaskError::storage(format!("failed to open lock file {}: {}", path.display(), e))
            })?;

        // SAFETY: the descriptor is owned by `file` and stays open for the call.
        let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if ret == 0 {
            return Ok(Some(Self { file }));
        }

        let err = std::io::Error::last_os_error();
        match err.raw_os_error() {
            Some(code) if code == libc::EWOULDBLOCK || code == libc::EINTR => Ok(None),
            _ => Err(TaskError::storage(format!(
                "failed to lock {}: {}",
                path.display(),
                err
            ))),
        }
    }

    #[cfg(not(unix))]
    fn try_acquire(path: &Path) -> TaskResult<Option<Self>> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => Ok(Some(Self {
                path: path.to_path_buf(),
                file,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(TaskError::storage(format!(
                "failed to create lock file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

impl Drop for FileLock {
    #[cfg(unix)]
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;

        // SAFETY: `self.file` is still open here.
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }

    #[cfg(not(unix))]
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
