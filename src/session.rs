//! Local persistence of the signed-in user.
//!
//! The store is a small JSON object on disk with a single `connectedUser` key. Every change
//! reads, modifies and rewrites the object under an exclusive `fs2` lock on a sidecar
//! `.<name>.lock` file. The rewrite goes through a temp file and an atomic rename, so a
//! crash mid-write leaves the previous session intact.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::{debug, warn};
use serde_json::Value;

use crate::models::User;

/// Key holding the serialised session user.
pub const CONNECTED_USER_KEY: &str = "connectedUser";

/// Refuse to parse anything larger than this; a session record is a few hundred bytes.
const MAX_SESSION_BYTES: u64 = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is corrupt: {0}")]
    Corrupt(String),

    #[error("session file exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored user, if any.
    pub fn load(&self) -> Result<Option<User>, SessionError> {
        let entries = self.read_entries()?;
        match entries.get(CONNECTED_USER_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| SessionError::Corrupt(e.to_string())),
        }
    }

    /// Remember `user` as the signed-in user. The password is never written.
    pub fn save(&self, user: &User) -> Result<(), SessionError> {
        let value = serde_json::to_value(user.without_password())
            .map_err(|e| SessionError::Corrupt(e.to_string()))?;
        self.update(|entries| {
            entries.insert(CONNECTED_USER_KEY.to_string(), value);
            true
        })?;
        debug!("Session saved for {}", user.username);
        Ok(())
    }

    /// Forget the signed-in user. Other keys in the file are kept.
    pub fn clear(&self) -> Result<(), SessionError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|entries| entries.remove(CONNECTED_USER_KEY).is_some())
    }

    /// Read, modify and write the entries while holding the store's lock.
    ///
    /// `modify` returns false when nothing changed and the write can be skipped. An
    /// unreadable file is replaced.
    fn update(
        &self,
        modify: impl FnOnce(&mut BTreeMap<String, Value>) -> bool,
    ) -> Result<(), SessionError> {
        let dir = self.dir();
        fs::create_dir_all(&dir)?;
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(self.lock_path())?;
        lock_file.lock_exclusive()?;

        let (mut entries, replace) = match self.read_entries() {
            Ok(entries) => (entries, false),
            Err(SessionError::Io(e)) => return Err(SessionError::Io(e)),
            Err(e) => {
                warn!("Replacing unreadable session file {}: {}", self.path.display(), e);
                (BTreeMap::new(), true)
            }
        };
        if modify(&mut entries) || replace {
            self.write_entries(&dir, &entries)?;
        }
        FileExt::unlock(&lock_file)?;
        Ok(())
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn base_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("session.json")
    }

    /// Sidecar lock file; the session file itself is replaced by rename on every write.
    fn lock_path(&self) -> PathBuf {
        self.dir().join(format!(".{}.lock", self.base_name()))
    }

    fn read_entries(&self) -> Result<BTreeMap<String, Value>, SessionError> {
        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if metadata.len() > MAX_SESSION_BYTES {
            return Err(SessionError::TooLarge { limit: MAX_SESSION_BYTES });
        }
        let content = fs::read_to_string(&self.path)?;
        // Interrupted writes on some filesystems leave leading NULs behind.
        let normalized = content.trim_start_matches('\0');
        if normalized.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(normalized).map_err(|e| SessionError::Corrupt(e.to_string()))
    }

    fn write_entries(
        &self,
        dir: &Path,
        entries: &BTreeMap<String, Value>,
    ) -> Result<(), SessionError> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| SessionError::Corrupt(e.to_string()))?;

        let base = self.base_name();
        let mut counter = 0u32;
        let tmp_path = loop {
            let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut tmp) => {
                    tmp.write_all(content.as_bytes())?;
                    tmp.flush()?;
                    let _ = tmp.sync_all();
                    break candidate;
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    counter = counter.saturating_add(1);
                }
                Err(e) => return Err(e.into()),
            }
        };

        fs::rename(&tmp_path, &self.path)?;
        if let Ok(dir_file) = File::open(dir) {
            let _ = dir_file.sync_all();
        }
        Ok(())
    }
}
