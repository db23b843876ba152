//! One-file-per-session store.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::debug;

use super::locks::KeyLocks;
use super::SessionStore;
use crate::session::SessionId;
use crate::Result;

/// File name prefix for session records: `sess-px-<hex id>`.
pub const FILE_PREFIX: &str = "sess-px-";

/// Stores each session as a file in one directory.
///
/// Writes go to a temporary file in the same directory that is then renamed
/// over the record, so a reader never observes a partially written token.
/// Saves and deletes on the same identifier are serialized within the
/// process.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    locks: KeyLocks,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            locks: KeyLocks::new(),
        })
    }

    /// Get the root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for `id`.
    pub fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}{}", FILE_PREFIX, id.to_hex()))
    }

    /// Remove records not written for longer than `max_idle`.
    ///
    /// Returns the number of records removed.
    pub fn sweep(&self, max_idle: Duration) -> Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;

        for id in self.list_ids()? {
            let path = self.path_for(&id);
            let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            let idle = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if idle > max_idle {
                self.delete(&id)?;
                removed += 1;
            }
        }

        debug!(removed, dir = %self.dir.display(), "swept idle sessions");
        Ok(removed)
    }
}

impl SessionStore for FileStore {
    fn load(&self, id: &SessionId) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(id)) {
            Ok(token) => {
                debug!(session = %id, bytes = token.len(), "loaded session");
                Ok(Some(token))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, id: &SessionId, token: &[u8]) -> Result<()> {
        let path = self.path_for(id);

        self.locks.with_lock(id, || {
            let mut tmp = tempfile::Builder::new()
                .prefix(".sess-px-")
                .suffix(".tmp")
                .tempfile_in(&self.dir)?;
            tmp.write_all(token)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })?;

        debug!(session = %id, bytes = token.len(), "saved session");
        Ok(())
    }

    fn delete(&self, id: &SessionId) -> Result<()> {
        let path = self.path_for(id);

        self.locks.with_lock(id, || match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        })?;

        debug!(session = %id, "deleted session");
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<SessionId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(hex) = name.to_str().and_then(|n| n.strip_prefix(FILE_PREFIX)) else {
                continue;
            };
            if let Ok(id) = hex.parse::<SessionId>() {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}
