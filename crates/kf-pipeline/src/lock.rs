//! Single-run lock for a file-backed store.
//!
//! The lock is an advisory `flock` on `<database path>.lock`, held for as
//! long as the guard lives. The kernel drops it when the holder exits, so a
//! file left behind by a crashed run does not block the next one. The file
//! itself is never removed: unlinking it would let a waiter lock an inode
//! that a new run no longer sees. In-memory stores cannot be shared between
//! processes, so they take no lock.

use crate::error::PipelineError;
use kf_core::DatabaseConfig;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Guard held for the duration of a pipeline run
#[derive(Debug)]
pub struct RunLock {
    held: Option<Held>,
}

#[derive(Debug)]
struct Held {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Lock file location for a database path
    pub fn path_for(database: &Path) -> PathBuf {
        let mut name = database.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Take the lock for `database`, failing fast if another run holds it.
    pub fn acquire(database: &DatabaseConfig, run_id: &str) -> Result<Self, PipelineError> {
        if database.is_in_memory() {
            return Ok(Self { held: None });
        }

        let path = Self::path_for(Path::new(&database.path));
        let lock_io = |source: std::io::Error| PipelineError::LockIo {
            path: path.display().to_string(),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(lock_io)?;

        if let Err(e) = try_lock_exclusive(&file) {
            if e.kind() == std::io::ErrorKind::WouldBlock {
                return Err(PipelineError::Locked {
                    path: path.display().to_string(),
                });
            }
            return Err(lock_io(e));
        }

        // Contents are informational only.
        let details = format!("pid={} run_id={}\n", std::process::id(), run_id);
        if let Err(e) = file.set_len(0).and_then(|_| (&file).write_all(details.as_bytes())) {
            log::warn!("Failed to write lock details to {}: {}", path.display(), e);
        }
        log::debug!("Acquired run lock {}", path.display());

        Ok(Self {
            held: Some(Held { file, path }),
        })
    }

    /// Lock file held by this guard, if any
    pub fn path(&self) -> Option<&Path> {
        self.held.as_ref().map(|held| held.path.as_path())
    }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // LOCK_NB turns a held lock into EWOULDBLOCK instead of waiting.
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

// Elsewhere only the open handle is held.
#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> std::io::Result<()> {
    Ok(())
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Some(held) = &self.held {
            #[cfg(unix)]
            {
                use std::os::unix::io::AsRawFd;
                unsafe {
                    libc::flock(held.file.as_raw_fd(), libc::LOCK_UN);
                }
            }
            log::debug!("Released run lock {}", held.path.display());
        }
    }
}
