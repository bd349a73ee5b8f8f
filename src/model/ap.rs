//! Advancement-point grants and gate outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three advancement pillars.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Pillar {
    Combat,
    Exploration,
    Social,
}

impl Pillar {
    pub const ALL: [Self; 3] = [Self::Combat, Self::Exploration, Self::Social];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Combat => "combat",
            Self::Exploration => "exploration",
            Self::Social => "social",
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_max_tier() -> u8 {
    1
}

/// Payload of an `advancement_point` event: one point grant within a session.
///
/// `max_tier` is the highest character tier the grant is open to; absent on
/// the wire means tier 1 only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApGrant {
    pub pillar: Pillar,
    pub number: u32,
    #[serde(default = "default_max_tier")]
    pub max_tier: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Why a pillar's delta came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateReason {
    /// Straightforward accrual (including "no grants at all").
    Normal,
    /// Early era: over-tier grants were still counted.
    Grandfathered,
    /// Late era: over-tier grants existed and were excluded.
    Cap,
}

impl GateReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Grandfathered => "grandfathered",
            Self::Cap => "cap",
        }
    }
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_tier_defaults_to_one_on_the_wire() {
        let grant: ApGrant =
            serde_json::from_str(r#"{"pillar":"combat","number":2}"#).unwrap();
        assert_eq!(grant.max_tier, 1);
        assert!(grant.note.is_none());
    }

    #[test]
    fn pillar_names_match_the_wire() {
        for pillar in Pillar::ALL {
            let wire = serde_json::to_string(&pillar).unwrap();
            assert_eq!(wire, format!("\"{pillar}\""));
        }
    }
}
