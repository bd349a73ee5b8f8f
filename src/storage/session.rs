//! Session file naming, discovery, and start/abort bookkeeping.

use std::path::PathBuf;
use std::{fs, process};

use jiff::Timestamp;
use log::info;

use crate::model::{Lock, SessionId};

use super::{Result, Storage, StorageError};

/// An in-progress session found on disk.
#[derive(Debug, Clone)]
pub struct InProgress {
    pub id: SessionId,
    pub path: PathBuf,
}

/// Everything a freshly-started session needs: its id, its in-progress log
/// path, and the lock already created for it.
#[derive(Debug, Clone)]
pub struct SessionPrep {
    pub id: SessionId,
    pub path: PathBuf,
}

/// `session_0012_2025-08-07.jsonl`, with an optional block suffix:
/// `session_0012a_2025-08-07.jsonl`.
#[must_use]
pub fn build_session_filename(id: SessionId, date: &str, suffix: Option<char>) -> String {
    match suffix {
        Some(suffix) => format!("{id}{suffix}_{date}.jsonl"),
        None => format!("{id}_{date}.jsonl"),
    }
}

/// Parsed pieces of a session filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSessionFilename {
    pub id: SessionId,
    pub suffix: Option<char>,
    pub date: String,
}

/// Inverse of [`build_session_filename`]. `None` for anything else.
#[must_use]
pub fn parse_session_filename(name: &str) -> Option<ParsedSessionFilename> {
    let stem = name.strip_suffix(".jsonl")?;
    let digits_and_rest = stem.strip_prefix("session_")?;
    let digit_count = digits_and_rest
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digit_count == 0 {
        return None;
    }
    let seq: u32 = digits_and_rest[..digit_count].parse().ok()?;
    let rest = &digits_and_rest[digit_count..];

    let (suffix, rest) = match rest.strip_prefix('_') {
        Some(date) => (None, date),
        None => {
            let mut chars = rest.chars();
            let letter = chars.next().filter(char::is_ascii_lowercase)?;
            (Some(letter), chars.as_str().strip_prefix('_')?)
        }
    };
    if rest.is_empty() {
        return None;
    }
    Some(ParsedSessionFilename {
        id: SessionId::new(seq),
        suffix,
        date: rest.to_string(),
    })
}

impl Storage {
    #[must_use]
    pub fn in_progress_path(&self, id: SessionId, date: &str) -> PathBuf {
        self.in_progress_dir()
            .join(build_session_filename(id, date, None))
    }

    /// The most recently touched in-progress log, by mtime. `None` if no
    /// session is being authored.
    pub fn latest_in_progress(&self) -> Result<Option<InProgress>> {
        let mut candidates = Vec::new();
        for entry in fs::read_dir(self.in_progress_dir())? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(parsed) = parse_session_filename(&name.to_string_lossy()) else {
                continue;
            };
            let mtime = entry.metadata()?.modified()?;
            candidates.push((mtime, parsed.id, entry.path()));
        }
        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(candidates
            .into_iter()
            .next()
            .map(|(_, id, path)| InProgress { id, path }))
    }

    /// Prepares a session start: takes the next sequence number from meta,
    /// refuses if a lock or finalized file already exists for it, and creates
    /// the lock.
    pub fn prepare_session_start(&self, now: Timestamp) -> Result<SessionPrep> {
        let meta = self.load_meta()?;
        let id = SessionId::new(meta.next_session_seq);

        if self.lock_exists(id) {
            return Err(StorageError::LockExists(id));
        }
        if !self.finalized_file_ids(id)?.is_empty() {
            return Err(StorageError::SessionExists(id));
        }

        let date = now.strftime("%Y-%m-%d").to_string();
        let path = self.in_progress_path(id, &date);
        self.create_lock(
            id,
            &Lock {
                seq: id.seq(),
                filename: build_session_filename(id, &date, None),
                created_at: now,
                pid: process::id(),
            },
        )?;
        info!("session {id} locked, logging to {}", path.display());
        Ok(SessionPrep { id, path })
    }

    /// Aborts a session: removes its lock and any in-progress log. Returns
    /// whether anything was removed.
    pub fn abort_session(&self, id: SessionId) -> Result<bool> {
        let had_lock = self.lock_exists(id);
        self.remove_lock(id)?;

        let mut removed_log = false;
        for entry in fs::read_dir(self.in_progress_dir())? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(parsed) = parse_session_filename(&name.to_string_lossy())
                && parsed.id == id
            {
                fs::remove_file(entry.path())?;
                removed_log = true;
            }
        }
        Ok(had_lock || removed_log)
    }

    /// Every finalized file belonging to a session, as `(file id, path)`
    /// pairs sorted by file id (`session_0012`, `session_0012a`, …).
    pub fn finalized_files(&self, id: SessionId) -> Result<Vec<(String, PathBuf)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(self.sessions_dir())? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(parsed) = parse_session_filename(&name.to_string_lossy()) else {
                continue;
            };
            if parsed.id == id {
                let file_id = match parsed.suffix {
                    Some(suffix) => format!("{id}{suffix}"),
                    None => id.to_string(),
                };
                files.push((file_id, entry.path()));
            }
        }
        files.sort();
        Ok(files)
    }

    /// File ids of every finalized file belonging to a session, sorted.
    pub fn finalized_file_ids(&self, id: SessionId) -> Result<Vec<String>> {
        Ok(self
            .finalized_files(id)?
            .into_iter()
            .map(|(file_id, _)| file_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("campaign")).unwrap();
        (dir, storage)
    }

    #[test]
    fn filenames_round_trip() {
        let id = SessionId::new(12);
        let plain = build_session_filename(id, "2025-08-07", None);
        assert_eq!(plain, "session_0012_2025-08-07.jsonl");
        assert_eq!(
            parse_session_filename(&plain),
            Some(ParsedSessionFilename {
                id,
                suffix: None,
                date: "2025-08-07".into()
            })
        );

        let suffixed = build_session_filename(id, "2025-08-07", Some('b'));
        let parsed = parse_session_filename(&suffixed).unwrap();
        assert_eq!(parsed.suffix, Some('b'));

        assert!(parse_session_filename("notes.jsonl").is_none());
        assert!(parse_session_filename("session_12.jsonl").is_none());
    }

    #[test]
    fn prepare_creates_lock_and_refuses_twice() {
        let (_dir, storage) = test_storage();
        let now = Timestamp::now();

        let prep = storage.prepare_session_start(now).unwrap();
        assert_eq!(prep.id, SessionId::new(1));
        assert!(storage.lock_exists(prep.id));

        let err = storage.prepare_session_start(now).unwrap_err();
        assert!(matches!(err, StorageError::LockExists(_)));
    }

    #[test]
    fn abort_removes_lock_and_log() {
        let (_dir, storage) = test_storage();
        let prep = storage.prepare_session_start(Timestamp::now()).unwrap();
        fs::write(&prep.path, "").unwrap();

        assert!(storage.abort_session(prep.id).unwrap());
        assert!(!storage.lock_exists(prep.id));
        assert!(!prep.path.exists());

        // Nothing left to abort.
        assert!(!storage.abort_session(prep.id).unwrap());
    }

    #[test]
    fn finalized_ids_are_sorted_with_suffixes() {
        let (_dir, storage) = test_storage();
        let id = SessionId::new(3);
        for suffix in ['b', 'a'] {
            let name = build_session_filename(id, "2025-08-07", Some(suffix));
            fs::write(storage.sessions_dir().join(name), "").unwrap();
        }
        assert_eq!(
            storage.finalized_file_ids(id).unwrap(),
            vec!["session_0003a", "session_0003b"]
        );
        assert!(storage.finalized_file_ids(SessionId::new(4)).unwrap().is_empty());
    }
}
