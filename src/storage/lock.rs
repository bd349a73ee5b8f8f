//! Session lock files: one per sequence number, presence-only contract.
//!
//! Creation is `create_new` so two writers racing for the same sequence
//! cannot both win. There is no lease or timeout; a stale lock is removed by
//! an explicit abort.

use std::path::PathBuf;
use std::{fs, io};

use io::Write;

use crate::model::{Lock, SessionId};

use super::{Result, Storage, StorageError};

impl Storage {
    #[must_use]
    pub fn lock_path(&self, id: SessionId) -> PathBuf {
        self.locks_dir().join(format!("{id}.lock"))
    }

    #[must_use]
    pub fn lock_exists(&self, id: SessionId) -> bool {
        self.lock_path(id).exists()
    }

    /// Creates the lock for a session. Fails with [`StorageError::LockExists`]
    /// if one is already present.
    pub fn create_lock(&self, id: SessionId, lock: &Lock) -> Result<()> {
        let path = self.lock_path(id);
        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::LockExists(id));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(serde_json::to_string_pretty(lock)?.as_bytes())?;
        Ok(())
    }

    /// Reads a lock's diagnostic payload, `None` if no lock exists.
    pub fn read_lock(&self, id: SessionId) -> Result<Option<Lock>> {
        let path = self.lock_path(id);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes a session's lock. Idempotent.
    pub fn remove_lock(&self, id: SessionId) -> Result<()> {
        let path = self.lock_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use tempfile::TempDir;

    use super::*;

    fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("campaign")).unwrap();
        (dir, storage)
    }

    fn sample_lock(seq: u32) -> Lock {
        Lock {
            seq,
            filename: format!("session_{seq:04}_2025-08-07.jsonl"),
            created_at: Timestamp::now(),
            pid: 4242,
        }
    }

    #[test]
    fn create_read_remove() {
        let (_dir, storage) = test_storage();
        let id = SessionId::new(7);

        assert!(!storage.lock_exists(id));
        storage.create_lock(id, &sample_lock(7)).unwrap();
        assert!(storage.lock_exists(id));

        let lock = storage.read_lock(id).unwrap().unwrap();
        assert_eq!(lock.seq, 7);

        storage.remove_lock(id).unwrap();
        assert!(!storage.lock_exists(id));
        assert!(storage.read_lock(id).unwrap().is_none());
    }

    #[test]
    fn double_create_fails() {
        let (_dir, storage) = test_storage();
        let id = SessionId::new(7);
        storage.create_lock(id, &sample_lock(7)).unwrap();
        let err = storage.create_lock(id, &sample_lock(7)).unwrap_err();
        assert!(matches!(err, StorageError::LockExists(conflict) if conflict == id));
    }

    #[test]
    fn remove_is_idempotent() {
        let (_dir, storage) = test_storage();
        storage.remove_lock(SessionId::new(9)).unwrap();
    }
}
