//! Local persistence for the campaign ledger.
//!
//! Everything lives under one campaign root:
//!
//! ```text
//! <root>/
//!   in-progress/<id>_<date>.jsonl       # the active session's mutable log
//!   sessions/<id><suffix>_<date>.jsonl  # finalized logs, immutable, header-first
//!   rollovers/rollover_<seasonId>.jsonl # one marker per season boundary
//!   locks/<id>.lock                     # presence = session being authored
//!   meta.json                           # next sequence + applied/rolled bookkeeping
//!   trails.json                         # the trail map
//! ```
//!
//! Commit-point writes (finalized logs, meta, trails, rollover markers) go
//! through [`Storage::atomic_write`]: write a sibling temp file, then rename,
//! so a crash mid-write never leaves a torn file visible to the next read.

mod events;
mod lock;
mod meta;
mod session;
mod trails;

use std::path::{Path, PathBuf};
use std::{fs, io};

use crate::model::SessionId;

pub use session::{
    InProgress, ParsedSessionFilename, SessionPrep, build_session_filename,
    parse_session_filename,
};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("missing meta record at {0}")]
    MetaMissing(PathBuf),

    #[error("lock file exists for {0}; another session may be active")]
    LockExists(SessionId),

    #[error("a finalized session file already exists for {0}")]
    SessionExists(SessionId),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// File-based storage rooted at a campaign directory.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Opens storage at the given root, creating the directory tree and a
    /// default meta record on first use.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let storage = Self { root: root.into() };
        for dir in [
            storage.in_progress_dir(),
            storage.sessions_dir(),
            storage.rollovers_dir(),
            storage.locks_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }
        if !storage.meta_path().exists() {
            storage.save_meta(&crate::model::Meta::default())?;
        }
        Ok(storage)
    }

    /// Returns the default campaign root: `~/.scribe/campaign/`.
    #[must_use]
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".scribe").join("campaign"))
    }

    #[must_use]
    pub fn in_progress_dir(&self) -> PathBuf {
        self.root.join("in-progress")
    }

    #[must_use]
    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    #[must_use]
    pub fn rollovers_dir(&self) -> PathBuf {
        self.root.join("rollovers")
    }

    #[must_use]
    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    #[must_use]
    pub fn meta_path(&self) -> PathBuf {
        self.root.join("meta.json")
    }

    #[must_use]
    pub fn trails_path(&self) -> PathBuf {
        self.root.join("trails.json")
    }

    /// Write-temp-then-rename. The temp file is a sibling so the rename
    /// stays within one filesystem.
    pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn new_creates_tree_and_default_meta() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("campaign")).unwrap();

        assert!(storage.in_progress_dir().is_dir());
        assert!(storage.sessions_dir().is_dir());
        assert!(storage.rollovers_dir().is_dir());
        assert!(storage.locks_dir().is_dir());

        let meta = storage.load_meta().unwrap();
        assert_eq!(meta.next_session_seq, 1);
    }

    #[test]
    fn atomic_write_replaces_whole_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        Storage::atomic_write(&path, b"first").unwrap();
        Storage::atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        // No temp file left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
