//! The event log record: one typed, self-describing line of JSONL.
//!
//! `kind`/`payload` form a closed, adjacently-tagged enum so every line is
//! validated once at the read boundary; downstream folds match exhaustively
//! instead of probing untyped maps. Unknown kinds are read errors, not
//! skipped records.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::ap::ApGrant;
use super::date::{CanonicalDate, Season};
use super::weather::WeatherCommitted;

/// A single committed record in an event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique, increasing within one log. Re-assigned on finalization.
    pub seq: u64,
    /// Wall-clock commit time. Non-decreasing within one log.
    pub ts: Timestamp,
    #[serde(flatten)]
    pub body: EventBody,
}

impl Event {
    /// The wire name of this event's kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.body.kind()
    }
}

/// Every event kind the ledger understands, with its payload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum EventBody {
    SessionStart(SessionMarker),
    SessionContinue(SessionMarker),
    SessionPause(SessionMarker),
    SessionEnd(SessionMarker),
    DayStart(DayStart),
    DayEnd(DayEnd),
    DateSet(DateSet),
    Move(Move),
    Trail(Trail),
    Scout(Scout),
    Note(Note),
    PartySet(PartySet),
    Lost(Lost),
    TimeLog(TimeLog),
    AdvancementPoint(ApGrant),
    WeatherCommitted(WeatherCommitted),
}

impl EventBody {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SessionStart(_) => "session_start",
            Self::SessionContinue(_) => "session_continue",
            Self::SessionPause(_) => "session_pause",
            Self::SessionEnd(_) => "session_end",
            Self::DayStart(_) => "day_start",
            Self::DayEnd(_) => "day_end",
            Self::DateSet(_) => "date_set",
            Self::Move(_) => "move",
            Self::Trail(_) => "trail",
            Self::Scout(_) => "scout",
            Self::Note(_) => "note",
            Self::PartySet(_) => "party_set",
            Self::Lost(_) => "lost",
            Self::TimeLog(_) => "time_log",
            Self::AdvancementPoint(_) => "advancement_point",
            Self::WeatherCommitted(_) => "weather_committed",
        }
    }
}

/// Where a session stands when a lifecycle event is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "paused")]
    Paused,
    #[serde(rename = "final")]
    Final,
}

/// Payload of the four session lifecycle kinds.
///
/// User-authored markers carry `status`/`id` (plus `start_hex` on
/// `session_start`). The finalizer's synthesized markers additionally carry
/// a context snapshot so a later block is self-contained.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMarker {
    pub status: SessionStatus,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_hex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_hex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_party: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_date: Option<CanonicalDate>,
}

impl SessionMarker {
    /// A bare marker with no snapshot fields.
    #[must_use]
    pub fn bare(status: SessionStatus, id: impl Into<String>) -> Self {
        Self {
            status,
            id: id.into(),
            start_hex: None,
            session_date: None,
            current_hex: None,
            current_party: None,
            current_date: None,
        }
    }
}

/// An in-world day was opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStart {
    pub calendar_date: CanonicalDate,
    pub season: Season,
    pub daylight_cap: u8,
}

/// An in-world day was closed, with its time accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayEnd {
    pub summary: DaySummary,
}

/// Hours spent during one day, split by phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySummary {
    pub active: f64,
    pub daylight: f64,
    pub night: f64,
}

/// The in-world date was set explicitly, outside a `day_start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSet {
    pub calendar_date: CanonicalDate,
}

/// The party moved to a hex. `from` may be omitted when it is derivable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Move {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
}

/// A trail between two hexes was marked (blazed) this session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trail {
    pub from: String,
    pub to: String,
    pub marked: bool,
}

/// An adjacent hex was scouted from the current one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scout {
    pub from: String,
    pub target: String,
    pub landmark: bool,
}

/// Free-form session annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
}

/// The roster was replaced wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartySet {
    pub ids: Vec<String>,
}

/// The party's lost status was toggled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lost {
    pub state: LostState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LostState {
    On,
    Off,
}

/// Time spent, in segments, attributed to a phase of the open day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeLog {
    pub phase: DayPhase,
    pub segments: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPhase {
    Daylight,
    Night,
}

/// First line of a finalized session file. Never present in in-progress logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "header", rename_all = "camelCase")]
pub struct SessionHeader {
    pub id: String,
    pub season_id: String,
    pub in_world_start: Option<CanonicalDate>,
    pub in_world_end: Option<CanonicalDate>,
}

/// Sole record of a rollover marker file, naming the season a rollover
/// applies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "season_rollover", rename_all = "camelCase")]
pub struct RolloverMarker {
    pub season_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_line_round_trips_with_kind_and_payload() {
        let json = r#"{"seq":3,"ts":"2025-08-07T10:00:00Z","kind":"move","payload":{"from":"P12","to":"P13"}}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.seq, 3);
        assert_eq!(event.kind(), "move");
        let EventBody::Move(ref mv) = event.body else {
            panic!("expected move");
        };
        assert_eq!(mv.to, "P13");

        let back = serde_json::to_string(&event).unwrap();
        let reread: Event = serde_json::from_str(&back).unwrap();
        assert_eq!(reread.kind(), "move");
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let json = r#"{"seq":1,"ts":"2025-08-07T10:00:00Z","kind":"teleport","payload":{}}"#;
        assert!(serde_json::from_str::<Event>(json).is_err());
    }

    #[test]
    fn lifecycle_marker_omits_absent_snapshot_fields() {
        let marker = SessionMarker::bare(SessionStatus::Paused, "session_0007");
        let json = serde_json::to_string(&marker).unwrap();
        assert_eq!(json, r#"{"status":"paused","id":"session_0007"}"#);
    }

    #[test]
    fn header_line_is_tagged() {
        let header = SessionHeader {
            id: "session_0007a".into(),
            season_id: "1511-autumn".into(),
            in_world_start: None,
            in_world_end: None,
        };
        let json = serde_json::to_string(&header).unwrap();
        assert!(json.starts_with(r#"{"kind":"header""#));
    }
}
