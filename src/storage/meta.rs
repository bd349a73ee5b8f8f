//! The shared meta record.

use std::{fs, io};

use crate::model::Meta;

use super::{Result, Storage, StorageError};

impl Storage {
    /// Loads the meta record. Its absence is corruption, not a fresh start —
    /// [`Storage::new`] seeds a default one.
    pub fn load_meta(&self) -> Result<Meta> {
        let path = self.meta_path();
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::MetaMissing(path))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically replaces the meta record.
    pub fn save_meta(&self, meta: &Meta) -> Result<()> {
        let json = serde_json::to_string_pretty(meta)?;
        Self::atomic_write(&self.meta_path(), json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::model::AppliedSession;

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("campaign")).unwrap();

        let mut meta = storage.load_meta().unwrap();
        meta.next_session_seq = 12;
        meta.rolled_seasons.push("1511-autumn".into());
        meta.applied_sessions.push(AppliedSession {
            session_id: "session_0011".into(),
            fingerprint: "abc123".into(),
        });
        storage.save_meta(&meta).unwrap();

        let loaded = storage.load_meta().unwrap();
        assert_eq!(loaded.next_session_seq, 12);
        assert_eq!(loaded.rolled_seasons, vec!["1511-autumn"]);
        assert_eq!(loaded.applied_sessions[0].session_id, "session_0011");
    }

    #[test]
    fn missing_meta_is_a_distinct_error() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("campaign")).unwrap();
        fs::remove_file(storage.meta_path()).unwrap();

        let err = storage.load_meta().unwrap_err();
        assert!(matches!(err, StorageError::MetaMissing(_)));
    }
}
