//! Trail edges: the secondary graph of inter-location routes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The trail map: canonical edge key (`lower(a)-lower(b)`, smaller endpoint
/// first by hex order) to edge state. A `BTreeMap` keeps iteration — and so
/// every downstream traversal — deterministic.
pub type TrailMap = BTreeMap<String, TrailEdge>;

/// State of one trail edge across seasons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailEdge {
    /// A permanent edge never decays and is never deleted.
    #[serde(default)]
    pub permanent: bool,
    /// Consecutive seasons of upkeep; saturates at [`TrailEdge::MAX_STREAK`].
    #[serde(default)]
    pub streak: u8,
    #[serde(default)]
    pub used_this_season: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_season_touched: Option<String>,
}

impl TrailEdge {
    pub const MAX_STREAK: u8 = 3;

    /// Bump the streak, saturating; promotion to permanent is the caller's
    /// decision (it depends on haven proximity).
    pub fn bump_streak(&mut self) {
        self.streak = (self.streak + 1).min(Self::MAX_STREAK);
    }
}
