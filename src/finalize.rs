//! Session finalization: turn one in-progress log into immutable,
//! season-bounded session files plus rollover markers.
//!
//! The pipeline: validate the envelope, totally order the log, close it,
//! partition at season-id changes, synthesize the lifecycle events each block
//! boundary needs, normalize canonical forms, re-sequence, and emit — then
//! update lock/meta state. Validation failures abort before any write; a
//! corrupt ordering is never repaired.

use std::fs;
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use log::info;

use crate::hex;
use crate::model::{
    CanonicalDate, Event, EventBody, SessionHeader, SessionId, SessionMarker,
    SessionStatus, season_id,
};
use crate::projector;
use crate::storage::{Storage, StorageError, build_session_filename};

#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("no lock file for session {0}")]
    MissingLock(SessionId),

    #[error("lock file for {id} belongs to sequence {found}")]
    LockMismatch { id: SessionId, found: u32 },

    #[error("no events found in session file")]
    EmptyLog,

    #[error("no day_start event found in session")]
    NoDayStart,

    #[error("first event must be session_start or session_continue")]
    BadFirstEvent,

    #[error("session_pause may only appear at the end of the log")]
    PauseNotAtEnd,

    #[error("non-monotonic timestamps in event log")]
    NonMonotonicTimestamps,

    #[error("non-monotonic sequence numbers in event log")]
    NonMonotonicSequence,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = core::result::Result<T, FinalizeError>;

/// What a finalize produced.
#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    /// Finalized session files, one per season block.
    pub outputs: Vec<PathBuf>,
    /// Rollover markers, one per season boundary crossed.
    pub rollovers: Vec<PathBuf>,
}

struct Block {
    season_id: String,
    events: Vec<Event>,
}

/// Finalize one session's in-progress log.
///
/// In production mode the session's lock must exist and is consumed, and the
/// meta sequence counter is bumped; outside production only the in-progress
/// file is deleted.
pub fn finalize_session(
    storage: &Storage,
    id: SessionId,
    in_progress: &Path,
    production: bool,
) -> Result<FinalizeOutcome> {
    // Precondition, before anything else: in production the lock must exist
    // and belong to this sequence number.
    if production {
        let lock = storage
            .read_lock(id)?
            .ok_or(FinalizeError::MissingLock(id))?;
        if lock.seq != id.seq() {
            return Err(FinalizeError::LockMismatch {
                id,
                found: lock.seq,
            });
        }
    }

    // 1. Envelope validation.
    let events = Storage::read_events(in_progress)?;
    validate_envelope(&events)?;

    // 2. Total order with monotonicity enforcement.
    let mut sorted = sort_events(events)?;

    // 3. Close the log.
    if !matches!(
        sorted.last().map(Event::kind),
        Some("session_end" | "session_pause")
    ) {
        let seq = sorted.iter().map(|e| e.seq).max().unwrap_or(0) + 1;
        sorted.push(Event {
            seq,
            ts: Timestamp::now(),
            body: EventBody::SessionEnd(SessionMarker::bare(
                SessionStatus::Final,
                id.to_string(),
            )),
        });
    }

    // 4. Partition into season blocks.
    let mut blocks = partition_blocks(&sorted)?;

    // 5. Synthesize boundary lifecycle events.
    synthesize_boundaries(&mut blocks, &sorted, id);

    // 6. Normalize trail edges; 7. re-sequence.
    for block in &mut blocks {
        for event in &mut block.events {
            normalize_trail_edge(event);
        }
        for (index, event) in block.events.iter_mut().enumerate() {
            event.seq = index as u64 + 1;
        }
    }

    // 8. Emit one file per block plus rollover markers between blocks.
    let session_date = session_date_of(&sorted);
    let multi = blocks.len() > 1;
    let mut outputs = Vec::new();
    let mut rollovers = Vec::new();
    for (index, block) in blocks.iter().enumerate() {
        let suffix = multi.then(|| char::from(b'a' + index as u8));
        let file_id = match suffix {
            Some(suffix) => format!("{id}{suffix}"),
            None => id.to_string(),
        };
        let header = SessionHeader {
            id: file_id,
            season_id: block.season_id.clone(),
            in_world_start: first_day_date(&block.events).cloned(),
            in_world_end: last_day_date(&block.events).cloned(),
        };
        let path = storage
            .sessions_dir()
            .join(build_session_filename(id, &session_date, suffix));
        Storage::write_finalized(&path, &header, &block.events)?;
        outputs.push(path);

        if index + 1 < blocks.len()
            && let Some(marker) =
                storage.write_rollover_marker(&blocks[index + 1].season_id)?
        {
            rollovers.push(marker);
        }
    }

    // 9. Bookkeeping.
    if production {
        storage.remove_lock(id)?;
        remove_if_present(in_progress)?;
        if !outputs.is_empty() {
            let mut meta = storage.load_meta()?;
            let next = id.seq() + 1;
            if meta.next_session_seq < next {
                meta.next_session_seq = next;
                storage.save_meta(&meta)?;
            }
        }
    } else {
        remove_if_present(in_progress)?;
    }

    info!(
        "finalized {id}: {} file(s), {} rollover marker(s)",
        outputs.len(),
        rollovers.len()
    );
    Ok(FinalizeOutcome { outputs, rollovers })
}

fn validate_envelope(events: &[Event]) -> Result<()> {
    if events.is_empty() {
        return Err(FinalizeError::EmptyLog);
    }
    if !events
        .iter()
        .any(|e| matches!(e.body, EventBody::DayStart(_)))
    {
        return Err(FinalizeError::NoDayStart);
    }
    if !matches!(
        events[0].body,
        EventBody::SessionStart(_) | EventBody::SessionContinue(_)
    ) {
        return Err(FinalizeError::BadFirstEvent);
    }
    if let Some(pause) = events
        .iter()
        .position(|e| matches!(e.body, EventBody::SessionPause(_)))
        && pause != events.len() - 1
    {
        return Err(FinalizeError::PauseNotAtEnd);
    }
    Ok(())
}

/// Sort by `(ts, seq, original index)` — the original index keeps authored
/// order for fully tied records — then reject any ordering the sort could
/// not reconcile.
fn sort_events(events: Vec<Event>) -> Result<Vec<Event>> {
    let mut indexed: Vec<(usize, Event)> = events.into_iter().enumerate().collect();
    indexed.sort_by(|(ai, a), (bi, b)| {
        a.ts.cmp(&b.ts).then(a.seq.cmp(&b.seq)).then(ai.cmp(bi))
    });

    for pair in indexed.windows(2) {
        let (_, prev) = &pair[0];
        let (_, next) = &pair[1];
        if next.ts < prev.ts {
            return Err(FinalizeError::NonMonotonicTimestamps);
        }
        if next.seq < prev.seq {
            return Err(FinalizeError::NonMonotonicSequence);
        }
    }
    Ok(indexed.into_iter().map(|(_, event)| event).collect())
}

/// Consecutive `day_start`s sharing a season id form one block. Events before
/// the first `day_start` belong to block 0; events after the last block's
/// final `day_start` belong to the last block.
fn partition_blocks(sorted: &[Event]) -> Result<Vec<Block>> {
    let day_starts: Vec<(usize, String)> = sorted
        .iter()
        .enumerate()
        .filter_map(|(index, event)| match &event.body {
            EventBody::DayStart(day) => Some((
                index,
                season_id(day.calendar_date.year, day.season),
            )),
            _ => None,
        })
        .collect();
    if day_starts.is_empty() {
        return Err(FinalizeError::NoDayStart);
    }

    // Window starts: the first day_start of each maximal same-season run.
    let mut windows: Vec<(usize, String)> = Vec::new();
    for (index, season) in &day_starts {
        if windows.last().is_none_or(|(_, current)| current != season) {
            windows.push((*index, season.clone()));
        }
    }

    let mut blocks = Vec::new();
    for (window_index, (start, season)) in windows.iter().enumerate() {
        // Block 0 absorbs everything before its first day_start.
        let from = if window_index == 0 { 0 } else { *start };
        let to = windows
            .get(window_index + 1)
            .map_or(sorted.len(), |(next, _)| *next);
        blocks.push(Block {
            season_id: season.clone(),
            events: sorted[from..to].to_vec(),
        });
    }
    Ok(blocks)
}

/// Make every block self-delimiting: block 0 opens with a start/continue,
/// later blocks open with a `session_continue` carrying a snapshot of where
/// the previous block left the party, non-final blocks close with
/// `session_pause`, the final block with `session_end`.
fn synthesize_boundaries(blocks: &mut [Block], sorted: &[Event], id: SessionId) {
    // Index of each block's first event in the sorted log, for snapshots.
    let mut block_starts = Vec::with_capacity(blocks.len());
    let mut cursor = 0;
    for block in blocks.iter() {
        block_starts.push(cursor);
        cursor += block.events.len();
    }

    let last = blocks.len() - 1;
    for (index, block) in blocks.iter_mut().enumerate() {
        let opens_ok = block.events.first().is_some_and(|e| {
            if index == 0 {
                matches!(
                    e.body,
                    EventBody::SessionStart(_) | EventBody::SessionContinue(_)
                )
            } else {
                matches!(e.body, EventBody::SessionContinue(_))
            }
        });
        if !opens_ok {
            let prefix = &sorted[..block_starts[index]];
            let ts = block.events.first().map_or_else(Timestamp::now, |e| e.ts);
            let mut marker = SessionMarker::bare(SessionStatus::InProgress, id.to_string());
            marker.current_hex = projector::current_hex(prefix);
            let party = projector::party(prefix);
            if !party.is_empty() {
                marker.current_party = Some(party);
            }
            marker.current_date = first_day_date(&block.events).cloned();
            let body = if index == 0 {
                EventBody::SessionStart(marker)
            } else {
                EventBody::SessionContinue(marker)
            };
            block.events.insert(0, Event { seq: 0, ts, body });
        }

        let (closer_kind, status) = if index == last {
            ("session_end", SessionStatus::Final)
        } else {
            ("session_pause", SessionStatus::Paused)
        };
        let closes_ok = block
            .events
            .last()
            .is_some_and(|e| e.kind() == closer_kind);
        if !closes_ok {
            let ts = block.events.last().map_or_else(Timestamp::now, |e| e.ts);
            let marker = SessionMarker::bare(status, id.to_string());
            let body = if index == last {
                EventBody::SessionEnd(marker)
            } else {
                EventBody::SessionPause(marker)
            };
            block.events.push(Event { seq: 0, ts, body });
        }
    }
}

/// Canonicalize a `trail` payload's endpoint pair into hex order, swapping
/// if needed — the same total order the trail-map keys use.
fn normalize_trail_edge(event: &mut Event) {
    if let EventBody::Trail(trail) = &mut event.body {
        let from = hex::normalize(&trail.from);
        let to = hex::normalize(&trail.to);
        if hex::order(&from, &to).is_gt() {
            trail.from = to;
            trail.to = from;
        } else {
            trail.from = from;
            trail.to = to;
        }
    }
}

/// The out-of-world session date used in finalized filenames: taken from the
/// opening marker when recorded, otherwise from the first event's timestamp.
fn session_date_of(sorted: &[Event]) -> String {
    for event in sorted {
        if let EventBody::SessionStart(marker) | EventBody::SessionContinue(marker) =
            &event.body
            && let Some(date) = &marker.session_date
        {
            return date.clone();
        }
    }
    sorted
        .first()
        .map(|e| e.ts.strftime("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn first_day_date(events: &[Event]) -> Option<&CanonicalDate> {
    events.iter().find_map(|event| match &event.body {
        EventBody::DayStart(day) => Some(&day.calendar_date),
        _ => None,
    })
}

fn last_day_date(events: &[Event]) -> Option<&CanonicalDate> {
    events.iter().rev().find_map(|event| match &event.body {
        EventBody::DayStart(day) => Some(&day.calendar_date),
        _ => None,
    })
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::from(e).into()),
    }
}
