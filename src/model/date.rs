//! In-world dates and seasons.
//!
//! A [`CanonicalDate`] is only meaningful against a configured calendar — the
//! calendar service validates month names and day ranges. Season ids
//! (`"<year>-<season>"`, lower-case) partition finalized logs and key
//! rollover state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An in-world calendar date. Produced by `day_start`/`date_set` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalDate {
    pub year: i32,
    pub month: String,
    pub day: u8,
}

impl CanonicalDate {
    pub fn new(year: i32, month: impl Into<String>, day: u8) -> Self {
        Self {
            year,
            month: month.into(),
            day,
        }
    }
}

impl fmt::Display for CanonicalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.day, self.month, self.year)
    }
}

/// The four seasons, in chronological order within a year.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub const ALL: [Self; 4] = [Self::Winter, Self::Spring, Self::Summer, Self::Autumn];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|s| s.as_str() == lower)
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the canonical season id for a year and season: `"1511-autumn"`.
#[must_use]
pub fn season_id(year: i32, season: Season) -> String {
    format!("{year}-{season}")
}

/// Normalize a season id: trimmed, lower-case.
#[must_use]
pub fn normalize_season_id(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

/// Parse a season id back into `(year, season)`. `None` if malformed.
#[must_use]
pub fn parse_season_id(id: &str) -> Option<(i32, Season)> {
    let normalized = normalize_season_id(id);
    let (year, season) = normalized.split_once('-')?;
    Some((year.parse().ok()?, Season::from_name(season)?))
}
