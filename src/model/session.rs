//! Session identity and the shared bookkeeping records.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A session's sequence number, rendered `session_NNNN`.
///
/// Finalized file ids may append a single-letter suffix when a session spans
/// multiple seasons; that suffix is part of the file id, not the session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u32);

impl SessionId {
    #[must_use]
    pub const fn new(seq: u32) -> Self {
        Self(seq)
    }

    #[must_use]
    pub const fn seq(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session_{:04}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid session id: {0}")]
pub struct ParseSessionIdError(String);

impl FromStr for SessionId {
    type Err = ParseSessionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let seq = s
            .strip_prefix("session_")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| ParseSessionIdError(s.to_string()))?;
        Ok(Self(seq))
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Contents of a session lock file.
///
/// Existence is the contract — a lock present for a sequence number means an
/// in-progress session for it is being authored. The fields are diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lock {
    pub seq: u32,
    pub filename: String,
    pub created_at: Timestamp,
    pub pid: u32,
}

/// The shared meta record: next sequence number plus applied/rolled
/// bookkeeping consumed by callers outside the ledger core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub next_session_seq: u32,
    #[serde(default)]
    pub applied_sessions: Vec<AppliedSession>,
    #[serde(default)]
    pub rolled_seasons: Vec<String>,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            next_session_seq: 1,
            applied_sessions: Vec::new(),
            rolled_seasons: Vec::new(),
        }
    }
}

/// One applied session, fingerprinted so a re-apply is detectable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedSession {
    pub session_id: String,
    pub fingerprint: String,
}
