//! Committed weather state.
//!
//! Only the shape of the weather state machine lives here; the descriptor
//! tables and dice bands that produce `category`/`detail` belong to the
//! recording shell.

use serde::{Deserialize, Serialize};

use super::date::{CanonicalDate, Season};

/// Payload of a `weather_committed` event: the weather locked in for one
/// in-world day, plus the forecast value it hands to the next day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherCommitted {
    pub date: CanonicalDate,
    pub season: Season,
    #[serde(rename = "roll2d6")]
    pub roll_2d6: u8,
    pub forecast_before: i32,
    pub total: i32,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub forecast_after: i32,
    /// True when the recorded category differs from the one the total implies.
    #[serde(rename = "override")]
    pub overridden: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names() {
        let json = r#"{
            "date": {"year": 1511, "month": "Umbraeus", "day": 12},
            "season": "autumn",
            "roll2d6": 9,
            "forecastBefore": 1,
            "total": 10,
            "category": "rain",
            "forecastAfter": 2,
            "override": false
        }"#;
        let committed: WeatherCommitted = serde_json::from_str(json).unwrap();
        assert_eq!(committed.roll_2d6, 9);
        assert_eq!(committed.forecast_after, 2);
        assert!(!committed.overridden);
    }
}
