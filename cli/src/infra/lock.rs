//! Advisory lock on `<data_dir>/agent.lock`, via `fs2`.
//!
//! The running agent holds this lock for its whole lifetime, so a failed
//! non-blocking attempt means the agent is live.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::application::ports::DirectoryLock;
use crate::domain::LockError;
use crate::domain::layout::LOCK_FILE_NAME;

/// Production `DirectoryLock`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLocker;

/// Held lock. Dropping it closes the file, which releases the lock.
#[derive(Debug)]
pub struct LockHandle {
    path: PathBuf,
    file: Option<File>,
}

impl LockHandle {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a lock file is actually held (false when the data directory
    /// did not exist).
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }
}

impl DirectoryLock for FileLocker {
    type Handle = LockHandle;

    fn try_lock(&self, data_dir: &Path) -> Result<LockHandle, LockError> {
        let path = data_dir.join(LOCK_FILE_NAME);
        if !data_dir.is_dir() {
            // Nothing can be running from a directory that does not exist;
            // the check must not create it.
            tracing::debug!(dir = %data_dir.display(), "no data directory, nothing to lock");
            return Ok(LockHandle { path, file: None });
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Io {
                path: path.clone(),
                source,
            })?;

        if let Err(e) = file.try_lock_exclusive() {
            tracing::debug!(path = %path.display(), error = %e, "lock attempt failed");
            return Err(if e.kind() == fs2::lock_contended_error().kind() {
                LockError::AlreadyRunning {
                    dir: data_dir.to_path_buf(),
                }
            } else {
                LockError::Io { path, source: e }
            });
        }

        tracing::debug!(path = %path.display(), "acquired lock");
        Ok(LockHandle {
            path,
            file: Some(file),
        })
    }

    fn unlock(&self, handle: LockHandle) -> Result<(), LockError> {
        let Some(file) = handle.file else {
            return Ok(());
        };
        FileExt::unlock(&file).map_err(|source| LockError::Io {
            path: handle.path.clone(),
            source,
        })?;
        tracing::debug!(path = %handle.path.display(), "released lock");
        Ok(())
    }
}
