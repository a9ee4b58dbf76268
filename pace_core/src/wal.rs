//! Append-only JSONL event log.
//!
//! Events are appended to a JSON Lines file with file locking to ensure
//! safe concurrent access. Deletes rewrite the log atomically.
//!
//! Locks are taken on a sidecar `<log>.lock` file rather than on the log
//! itself: a rewrite renames a new file over the log, and a lock held on the
//! replaced inode would no longer exclude anyone.

use crate::store::{newest_first, EventStore};
use crate::{Error, EventId, Result, SmokingEvent, UserId};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// JSONL-backed event store
pub struct JsonlEventLog {
    path: PathBuf,
}

impl JsonlEventLog {
    /// Create a new event log for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Rewrite the log keeping only events for which `keep` holds.
    /// Returns how many events were dropped.
    fn rewrite<F>(&mut self, keep: F) -> Result<usize>
    where
        F: Fn(&SmokingEvent) -> bool,
    {
        if !self.path.exists() {
            return Ok(0);
        }

        let lock = open_lock_file(&self.path)?;
        lock.lock_exclusive()?;

        let file = File::open(&self.path)?;
        let events = parse_events(BufReader::new(&file))?;
        drop(file);
        let (kept, dropped): (Vec<_>, Vec<_>) = events.into_iter().partition(|e| keep(e));

        if dropped.is_empty() {
            lock.unlock()?;
            return Ok(0);
        }

        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "event log path missing parent")
        })?;
        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            for event in &kept {
                serde_json::to_writer(&mut writer, event)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        lock.unlock()?;
        tracing::debug!("Rewrote event log, dropped {} events", dropped.len());
        Ok(dropped.len())
    }
}

impl EventStore for JsonlEventLog {
    fn append(&mut self, mut event: SmokingEvent) -> Result<SmokingEvent> {
        self.ensure_parent_dir()?;

        // Exclusive lock covers both id assignment and the write. The log is
        // opened only once the lock is held so a concurrent rewrite cannot
        // swap the file out from under this handle.
        let lock = open_lock_file(&self.path)?;
        lock.lock_exclusive()?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        let existing = parse_events(BufReader::new(&file))?;
        let next_id = existing
            .iter()
            .filter_map(|e| e.id)
            .map(|id| id.0)
            .max()
            .unwrap_or(0)
            + 1;
        event.id = Some(EventId(next_id));

        // A torn final line from an interrupted write must not swallow this one
        let needs_newline = if file.metadata()?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            last[0] != b'\n'
        } else {
            false
        };

        let mut writer = std::io::BufWriter::new(&file);
        if needs_newline {
            writer.write_all(b"\n")?;
        }
        let line = serde_json::to_string(&event)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        lock.unlock()?;

        tracing::debug!("Appended event {} for user {}", next_id, event.user_id);
        Ok(event)
    }

    fn list_for_user(&self, user: UserId, limit: Option<usize>) -> Result<Vec<SmokingEvent>> {
        let events = read_events(&self.path)?
            .into_iter()
            .filter(|e| e.user_id == user)
            .collect();
        Ok(newest_first(events, limit))
    }

    fn delete(&mut self, id: EventId) -> Result<()> {
        match self.rewrite(|e| e.id != Some(id))? {
            0 => Err(Error::UnknownEvent(id)),
            _ => Ok(()),
        }
    }

    fn delete_for_user(&mut self, user: UserId) -> Result<usize> {
        self.rewrite(|e| e.user_id != user)
    }
}

/// Read all events from a log file
pub fn read_events(path: &Path) -> Result<Vec<SmokingEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    // Acquire shared lock for reading
    let lock = open_lock_file(path)?;
    lock.lock_shared()?;
    let file = File::open(path)?;
    let events = parse_events(BufReader::new(&file))?;
    lock.unlock()?;

    tracing::debug!("Read {} events from log", events.len());
    Ok(events)
}

/// Path of the sidecar lock file guarding a log
fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

fn open_lock_file(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(lock_path(path))?;
    Ok(file)
}

fn parse_events<R: BufRead>(reader: R) -> Result<Vec<SmokingEvent>> {
    let mut events = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SmokingEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!("Failed to parse event at line {}: {}", line_num + 1, e);
            }
        }
    }

    Ok(events)
}
