//! Event log I/O: JSONL read, durable append, atomic finalized writes.

use std::path::{Path, PathBuf};
use std::{fs, io};

// Traits must be in scope for `.lines()` on BufReader and `.write_all()` on File.
use io::{BufRead, Write};

use jiff::Timestamp;

use crate::model::{Event, EventBody, RolloverMarker, SessionHeader};

use super::{Result, Storage};

impl Storage {
    /// Loads all events from an in-progress log.
    ///
    /// A missing file is an empty log, not an error — callers treat "no
    /// events" as "no session". Malformed or unknown-kind lines are errors.
    pub fn read_events(path: &Path) -> Result<Vec<Event>> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let reader = io::BufReader::new(file);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.is_empty() {
                events.push(serde_json::from_str(&line)?);
            }
        }
        Ok(events)
    }

    /// Appends one event, assigning `seq = max + 1` and `ts = now`. The
    /// record is flushed to disk before this returns.
    pub fn append_event(path: &Path, body: EventBody) -> Result<Event> {
        let existing = Self::read_events(path)?;
        let seq = existing.iter().map(|e| e.seq).max().unwrap_or(0) + 1;
        let event = Event {
            seq,
            ts: Timestamp::now(),
            body,
        };

        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        file.sync_all()?;
        Ok(event)
    }

    /// Atomically replaces an in-progress log.
    pub fn write_events(path: &Path, events: &[Event]) -> Result<()> {
        let mut out = String::new();
        for event in events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Self::atomic_write(path, out.as_bytes())?;
        Ok(())
    }

    /// Atomically writes a finalized session file: header line first, then
    /// the block's events.
    pub fn write_finalized(
        path: &Path,
        header: &SessionHeader,
        events: &[Event],
    ) -> Result<()> {
        let mut out = serde_json::to_string(header)?;
        out.push('\n');
        for event in events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Self::atomic_write(path, out.as_bytes())?;
        Ok(())
    }

    /// Loads a finalized session file: the header plus its events.
    pub fn read_finalized(path: &Path) -> Result<(SessionHeader, Vec<Event>)> {
        let contents = fs::read_to_string(path)?;
        let mut lines = contents.lines().filter(|l| !l.is_empty());
        let header = serde_json::from_str(lines.next().unwrap_or_default())?;
        let events = lines
            .map(serde_json::from_str)
            .collect::<core::result::Result<Vec<Event>, _>>()?;
        Ok((header, events))
    }

    /// Writes the rollover marker for a season boundary. Returns `None`
    /// without writing when the marker already exists.
    pub fn write_rollover_marker(&self, season_id: &str) -> Result<Option<PathBuf>> {
        let path = self
            .rollovers_dir()
            .join(format!("rollover_{season_id}.jsonl"));
        if path.exists() {
            return Ok(None);
        }
        let marker = RolloverMarker {
            season_id: season_id.to_string(),
        };
        let mut line = serde_json::to_string(&marker)?;
        line.push('\n');
        Self::atomic_write(&path, line.as_bytes())?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::model::{Move, Note, SessionMarker, SessionStatus};

    fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("campaign")).unwrap();
        (dir, storage)
    }

    #[test]
    fn read_missing_log_is_empty() {
        let (dir, _storage) = test_storage();
        let events = Storage::read_events(&dir.path().join("absent.jsonl")).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn append_assigns_increasing_seq() {
        let (dir, _storage) = test_storage();
        let path = dir.path().join("log.jsonl");

        let first = Storage::append_event(
            &path,
            EventBody::SessionStart(SessionMarker::bare(
                SessionStatus::InProgress,
                "session_0001",
            )),
        )
        .unwrap();
        let second = Storage::append_event(
            &path,
            EventBody::Move(Move {
                from: None,
                to: "P13".into(),
            }),
        )
        .unwrap();

        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);

        let events = Storage::read_events(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind(), "move");
    }

    #[test]
    fn finalized_round_trips_with_header() {
        let (dir, _storage) = test_storage();
        let path = dir.path().join("final.jsonl");

        let header = SessionHeader {
            id: "session_0002".into(),
            season_id: "1511-autumn".into(),
            in_world_start: None,
            in_world_end: None,
        };
        let events = vec![Event {
            seq: 1,
            ts: Timestamp::now(),
            body: EventBody::Note(Note {
                text: "camped by the ford".into(),
            }),
        }];
        Storage::write_finalized(&path, &header, &events).unwrap();

        let (read_header, read_events) = Storage::read_finalized(&path).unwrap();
        assert_eq!(read_header.season_id, "1511-autumn");
        assert_eq!(read_events.len(), 1);

        // The header line is not a valid plain event.
        assert!(Storage::read_events(&path).is_err());
    }

    #[test]
    fn rollover_marker_writes_once() {
        let (_dir, storage) = test_storage();
        let path = storage.write_rollover_marker("1512-winter").unwrap();
        assert!(path.is_some());
        assert!(path.unwrap().exists());

        assert!(storage.write_rollover_marker("1512-winter").unwrap().is_none());
    }
}
