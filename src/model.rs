//! Core data model for the campaign ledger.
//!
//! The event log is the sole source of truth for session state; everything
//! here is either an event payload, a date, or one of the small bookkeeping
//! records (lock, meta, trail map) the ledger maintains alongside the logs.

mod ap;
mod date;
mod event;
mod session;
mod trail;
mod weather;

pub use ap::{ApGrant, GateReason, Pillar};
pub use date::{CanonicalDate, Season, normalize_season_id, parse_season_id, season_id};
pub use event::{
    DateSet, DayEnd, DayPhase, DayStart, DaySummary, Event, EventBody, Lost, LostState,
    Move, Note, PartySet, RolloverMarker, Scout, SessionHeader, SessionMarker,
    SessionStatus, TimeLog, Trail,
};
pub use session::{AppliedSession, Lock, Meta, SessionId};
pub use trail::{TrailEdge, TrailMap};
pub use weather::WeatherCommitted;
