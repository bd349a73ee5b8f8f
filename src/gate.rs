//! The advancement-point eligibility gate.
//!
//! Grants accrue per pillar within one session; whether a character actually
//! banks them depends on their power tier and on which era the session falls
//! in. Sessions 1–19 predate tier gating: over-tier grants still count, tagged
//! `grandfathered`. From session 20 on, only eligible grants count and a
//! pillar that had both kinds is tagged `cap`.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::model::{ApGrant, GateReason, Pillar};

/// Last session of the era in which over-tier grants still count.
pub const GRANDFATHERED_THROUGH: u32 = 19;

/// One pillar's gated result for a character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PillarOutcome {
    pub delta: u32,
    pub reason: GateReason,
    /// Last non-empty note across the pillar's grants, verbatim.
    pub note: Option<String>,
}

/// Gate a session's grants for one character.
///
/// `character_tier` is the character's tier (1–4); `session_number` the
/// session's ordinal. Every pillar appears in the result, delta 0 and
/// `normal` when it had no grants.
#[must_use]
pub fn apply_event_gate(
    grants: &[ApGrant],
    character_tier: u8,
    session_number: u32,
) -> BTreeMap<Pillar, PillarOutcome> {
    let mut outcomes = BTreeMap::new();
    for pillar in Pillar::ALL {
        let mut eligible = 0;
        let mut over_tier = 0;
        let mut note = None;
        for grant in grants.iter().filter(|g| g.pillar == pillar) {
            if let Some(text) = &grant.note
                && !text.is_empty()
            {
                note = Some(text.clone());
            }
            if character_tier <= grant.max_tier {
                eligible += grant.number;
            } else {
                over_tier += grant.number;
            }
        }

        let outcome = if session_number <= GRANDFATHERED_THROUGH {
            PillarOutcome {
                delta: eligible + over_tier,
                reason: if over_tier > 0 {
                    GateReason::Grandfathered
                } else {
                    GateReason::Normal
                },
                note,
            }
        } else {
            PillarOutcome {
                delta: eligible,
                reason: if over_tier > 0 && eligible > 0 {
                    GateReason::Cap
                } else {
                    GateReason::Normal
                },
                note,
            }
        };
        outcomes.insert(pillar, outcome);
    }
    outcomes
}

/// A character's tier from their level: 1–4 at levels 1, 5, 11, 17.
#[must_use]
pub const fn tier_from_level(level: u8) -> u8 {
    match level {
        17.. => 4,
        11.. => 3,
        5.. => 2,
        _ => 1,
    }
}

/// Fingerprint of a session's finalized output: sha256 over the session id
/// and its sorted finalized-file ids. Recorded in the meta record so applying
/// the same session twice is a detectable no-op.
#[must_use]
pub fn session_fingerprint(session_id: &str, file_ids: &[String]) -> String {
    let mut sorted: Vec<&str> = file_ids.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    for id in sorted {
        hasher.update(b"\n");
        hasher.update(id.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(pillar: Pillar, number: u32, max_tier: u8) -> ApGrant {
        ApGrant {
            pillar,
            number,
            max_tier,
            note: None,
        }
    }

    #[test]
    fn era_boundary_at_session_nineteen() {
        let grants = vec![
            grant(Pillar::Combat, 2, 1),
            grant(Pillar::Combat, 1, 2),
        ];
        // Tier-2 character: the 2-point tier-1 grant is over-tier.
        let at_19 = apply_event_gate(&grants, 2, 19);
        let combat = &at_19[&Pillar::Combat];
        assert_eq!(combat.delta, 3);
        assert_eq!(combat.reason, GateReason::Grandfathered);

        let at_20 = apply_event_gate(&grants, 2, 20);
        let combat = &at_20[&Pillar::Combat];
        assert_eq!(combat.delta, 1);
        assert_eq!(combat.reason, GateReason::Cap);
    }

    #[test]
    fn late_era_without_eligible_is_normal_zero() {
        // Everything over-tier: delta 0, but no "cap" without an eligible side.
        let grants = vec![grant(Pillar::Social, 1, 1)];
        let outcome = &apply_event_gate(&grants, 3, 25)[&Pillar::Social];
        assert_eq!(outcome.delta, 0);
        assert_eq!(outcome.reason, GateReason::Normal);
    }

    #[test]
    fn no_grants_is_normal_zero() {
        let outcome = &apply_event_gate(&[], 1, 5)[&Pillar::Exploration];
        assert_eq!(outcome.delta, 0);
        assert_eq!(outcome.reason, GateReason::Normal);
        assert!(outcome.note.is_none());
    }

    #[test]
    fn last_nonempty_note_wins() {
        let grants = vec![
            ApGrant {
                pillar: Pillar::Combat,
                number: 1,
                max_tier: 1,
                note: Some("first blood".into()),
            },
            ApGrant {
                pillar: Pillar::Combat,
                number: 1,
                max_tier: 1,
                note: Some(String::new()),
            },
            ApGrant {
                pillar: Pillar::Combat,
                number: 1,
                max_tier: 1,
                note: Some("held the bridge".into()),
            },
        ];
        let outcome = &apply_event_gate(&grants, 1, 10)[&Pillar::Combat];
        assert_eq!(outcome.note.as_deref(), Some("held the bridge"));
    }

    #[test]
    fn tiers_step_at_known_levels() {
        assert_eq!(tier_from_level(1), 1);
        assert_eq!(tier_from_level(4), 1);
        assert_eq!(tier_from_level(5), 2);
        assert_eq!(tier_from_level(11), 3);
        assert_eq!(tier_from_level(17), 4);
        assert_eq!(tier_from_level(20), 4);
    }

    #[test]
    fn fingerprint_is_order_independent() {
        let a = session_fingerprint(
            "session_0007",
            &["session_0007a".into(), "session_0007b".into()],
        );
        let b = session_fingerprint(
            "session_0007",
            &["session_0007b".into(), "session_0007a".into()],
        );
        assert_eq!(a, b);
        let other = session_fingerprint("session_0008", &["session_0008".into()]);
        assert_ne!(a, other);
    }
}
