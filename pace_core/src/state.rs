//! JSON document persistence with file locking.
//!
//! This module holds the durable user store and the shared helpers for
//! locked reads and atomic writes of whole JSON documents, plus the
//! data-directory lock that serializes commands across processes.

use crate::store::UserStore;
use crate::{Error, Result, User, UserId};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Read a whole JSON document under a shared lock.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read?;

    let value = serde_json::from_str(&contents)?;
    Ok(Some(value))
}

/// Atomically write a JSON document by:
/// 1. Writing to a temp file in the same directory
/// 2. Syncing to disk
/// 3. Renaming over the original
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "state path missing parent")
    })?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        let contents = serde_json::to_string(value)?;
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

// ============================================================================
// User store
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct UsersDocument {
    #[serde(default)]
    users: Vec<User>,
}

/// User store keeping every profile in a single JSON document
pub struct JsonUserStore {
    path: PathBuf,
}

impl JsonUserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unlike session state, a corrupt user document is an error: silently
    /// starting over would erase every profile.
    fn load(&self) -> Result<UsersDocument> {
        match read_json::<UsersDocument>(&self.path) {
            Ok(Some(doc)) => Ok(doc),
            Ok(None) => Ok(UsersDocument::default()),
            Err(Error::Json(e)) => Err(Error::State(format!(
                "user store {:?} is corrupt: {}",
                self.path, e
            ))),
            Err(e) => Err(e),
        }
    }

    fn store(&self, doc: &UsersDocument) -> Result<()> {
        write_json_atomic(&self.path, doc)?;
        tracing::debug!("Saved {} users to {:?}", doc.users.len(), self.path);
        Ok(())
    }
}

impl UserStore for JsonUserStore {
    fn find(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.load()?.users.into_iter().find(|u| u.id == id))
    }

    fn create(&mut self, user: &User) -> Result<()> {
        let mut doc = self.load()?;
        if doc.users.iter().any(|u| u.id == user.id) {
            return Err(Error::AlreadyExists(user.id));
        }
        doc.users.push(user.clone());
        self.store(&doc)
    }

    fn save(&mut self, user: &User) -> Result<()> {
        let mut doc = self.load()?;
        let slot = doc
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(Error::UnknownUser(user.id))?;
        *slot = user.clone();
        self.store(&doc)
    }

    fn list_all(&self) -> Result<Vec<User>> {
        Ok(self.load()?.users)
    }

    fn delete(&mut self, id: UserId) -> Result<()> {
        let mut doc = self.load()?;
        let before = doc.users.len();
        doc.users.retain(|u| u.id != id);
        if doc.users.len() != before {
            self.store(&doc)?;
        }
        Ok(())
    }
}

// ============================================================================
// Data directory lock
// ============================================================================

/// Exclusive advisory lock over a data directory.
///
/// Held for the duration of one command so that read-modify-write cycles
/// from different processes serialize. Released on drop.
pub struct DataDirLock {
    file: File,
}

impl DataDirLock {
    /// Block until the lock on `<dir>/.lock` is acquired
    pub fn acquire(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(dir.join(".lock"))?;
        file.lock_exclusive()?;
        tracing::debug!("Acquired data lock on {:?}", dir);
        Ok(Self { file })
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
