//! The seasonal rollover engine: decay or persist trail edges at a season
//! boundary, and stamp a finalized session's usage onto the map beforehand.
//!
//! Edges near a haven are maintained by the locals; edges used this season
//! persist on their own; everything else survives on a d6. Permanent edges
//! are untouchable. A dry run walks the same edges but commits nothing and
//! reports both die outcomes for the at-risk ones.

use std::collections::BTreeMap;

use log::{info, warn};
use rand::Rng;

use crate::hex;
use crate::model::{
    Event, EventBody, TrailEdge, TrailMap, normalize_season_id, parse_season_id,
    season_id,
};
use crate::storage::{Storage, StorageError};
use crate::trails::canonical_edge;

/// Hexes this close to a haven count as "near" for trail upkeep.
pub const HAVEN_RADIUS: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum RolloverError {
    #[error("season {0} has already been rolled")]
    AlreadyRolled(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result of a committed rollover pass.
#[derive(Debug, Clone)]
pub struct RolloverOutcome {
    pub trails: TrailMap,
    /// Edges kept by haven proximity.
    pub maintained: Vec<String>,
    /// Edges kept by use or by a kind die.
    pub persisted: Vec<String>,
    /// Edges the die removed.
    pub deleted: Vec<String>,
    /// The roll behind each far, unused edge's fate.
    pub checks: BTreeMap<String, DieCheck>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DieCheck {
    pub roll: u8,
    pub deleted: bool,
}

/// What a dry run would do. At-risk edges are listed separately because
/// their fate depends on a die that was never rolled.
#[derive(Debug, Clone)]
pub struct RolloverPreview {
    pub maintained: Vec<String>,
    pub persisted: Vec<String>,
    /// Deleted on 1–3, persisted with streak reset on 4–6.
    pub at_risk: Vec<String>,
}

fn near_any_haven(hex_id: &str, havens: &[String]) -> bool {
    havens
        .iter()
        .any(|haven| hex::distance(hex_id, haven) <= HAVEN_RADIUS)
}

fn edge_near_any_haven(key: &str, havens: &[String]) -> bool {
    match key.split_once('-') {
        Some((a, b)) => near_any_haven(a, havens) || near_any_haven(b, havens),
        None => false,
    }
}

/// One committed rollover pass over the whole map. Pure in its inputs: the
/// caller owns persisting the returned map.
pub fn apply_rollover(
    trails: &TrailMap,
    havens: &[String],
    rng: &mut impl Rng,
) -> RolloverOutcome {
    let mut out = trails.clone();
    let mut maintained = Vec::new();
    let mut persisted = Vec::new();
    let mut deleted = Vec::new();
    let mut checks = BTreeMap::new();

    for (key, edge) in trails {
        if edge.permanent {
            continue;
        }
        let Some(entry) = out.get_mut(key) else {
            continue;
        };
        if edge_near_any_haven(key, havens) {
            entry.bump_streak();
            if entry.streak == TrailEdge::MAX_STREAK {
                entry.permanent = true;
            }
            maintained.push(key.clone());
        } else if edge.used_this_season {
            entry.bump_streak();
            persisted.push(key.clone());
        } else {
            let roll = rng.gen_range(1..=6);
            if roll <= 3 {
                out.remove(key);
                deleted.push(key.clone());
                checks.insert(key.clone(), DieCheck {
                    roll,
                    deleted: true,
                });
            } else {
                entry.streak = 0;
                persisted.push(key.clone());
                checks.insert(key.clone(), DieCheck {
                    roll,
                    deleted: false,
                });
            }
        }
    }

    // The new season starts with a clean slate on every surviving edge.
    for edge in out.values_mut() {
        if !edge.permanent {
            edge.used_this_season = false;
        }
    }

    RolloverOutcome {
        trails: out,
        maintained,
        persisted,
        deleted,
        checks,
    }
}

/// The dry-run counterpart of [`apply_rollover`]: same traversal, no dice,
/// no mutation.
#[must_use]
pub fn preview_rollover(trails: &TrailMap, havens: &[String]) -> RolloverPreview {
    let mut preview = RolloverPreview {
        maintained: Vec::new(),
        persisted: Vec::new(),
        at_risk: Vec::new(),
    };
    for (key, edge) in trails {
        if edge.permanent {
            continue;
        }
        if edge_near_any_haven(key, havens) {
            preview.maintained.push(key.clone());
        } else if edge.used_this_season {
            preview.persisted.push(key.clone());
        } else {
            preview.at_risk.push(key.clone());
        }
    }
    preview
}

/// Effects of stamping one session's events onto the trail map.
#[derive(Debug, Clone, Default)]
pub struct SessionTrailEffects {
    /// Edges first marked this session.
    pub created: Vec<String>,
    /// Existing edges the session touched.
    pub used: Vec<String>,
    /// Edges a prior rollover deleted but the party travelled anyway.
    pub rediscovered: Vec<String>,
}

/// Stamp a finalized session's `trail` and `move` events onto the map:
/// touched edges get `used_this_season` and `last_season_touched`, newly
/// marked edges are created, and moves along deleted edges re-create them.
///
/// `deleted` is the set of edge keys the most recent rollover removed.
/// Returns the updated map; the input is untouched, so a dry run is just
/// discarding the result.
pub fn apply_session_to_trails(
    events: &[Event],
    trails: &TrailMap,
    initial_season_id: &str,
    deleted: &[String],
) -> (TrailMap, SessionTrailEffects) {
    let mut out = trails.clone();
    let mut effects = SessionTrailEffects::default();
    let mut current_season = normalize_season_id(initial_season_id);
    let mut current_hex: Option<String> = None;

    for event in events {
        match &event.body {
            EventBody::SessionStart(marker) => {
                if let Some(start_hex) = &marker.start_hex {
                    current_hex = Some(hex::normalize(start_hex));
                }
            }
            EventBody::DayStart(day) => {
                current_season = season_id(day.calendar_date.year, day.season);
            }
            EventBody::Trail(trail) if trail.marked => {
                let key = canonical_edge(&trail.from, &trail.to);
                let edge = out.entry(key.clone()).or_insert_with(|| {
                    effects.created.push(key.clone());
                    TrailEdge::default()
                });
                edge.used_this_season = true;
                edge.last_season_touched = Some(current_season.clone());
                effects.used.push(key);
            }
            EventBody::Move(mv) => {
                let from = mv
                    .from
                    .as_deref()
                    .map(hex::normalize)
                    .or_else(|| current_hex.clone());
                let to = hex::normalize(&mv.to);
                current_hex = Some(to.clone());
                let Some(from) = from else {
                    continue;
                };
                let key = canonical_edge(&from, &to);
                if let Some(edge) = out.get_mut(&key) {
                    edge.used_this_season = true;
                    edge.last_season_touched = Some(current_season.clone());
                    effects.used.push(key);
                } else if deleted.contains(&key) {
                    out.insert(key.clone(), TrailEdge {
                        permanent: false,
                        streak: 0,
                        used_this_season: true,
                        last_season_touched: Some(current_season.clone()),
                    });
                    effects.rediscovered.push(key.clone());
                    effects.used.push(key);
                }
            }
            _ => {}
        }
    }

    (out, effects)
}

/// Commit a rollover for one season: check it has not been rolled, apply the
/// pass to the stored trail map, and record the season in meta.
pub fn roll_season(
    storage: &Storage,
    havens: &[String],
    raw_season_id: &str,
    rng: &mut impl Rng,
) -> Result<RolloverOutcome, RolloverError> {
    let season = normalize_season_id(raw_season_id);
    let mut meta = storage.load_meta()?;
    if meta.rolled_seasons.iter().any(|s| *s == season) {
        return Err(RolloverError::AlreadyRolled(season));
    }
    if let (Some(last), Some(next)) = (
        meta.rolled_seasons.last().and_then(|s| parse_season_id(s)),
        parse_season_id(&season),
    ) && next < last
    {
        warn!("rolling {season} out of order; last rolled was {:?}", meta.rolled_seasons.last());
    }

    let trails = storage.load_trails()?;
    let outcome = apply_rollover(&trails, havens, rng);
    storage.save_trails(&outcome.trails)?;
    meta.rolled_seasons.push(season.clone());
    storage.save_meta(&meta)?;
    info!(
        "rolled {season}: {} maintained, {} persisted, {} deleted",
        outcome.maintained.len(),
        outcome.persisted.len(),
        outcome.deleted.len()
    );
    Ok(outcome)
}
