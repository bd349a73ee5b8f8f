//! Campaign configuration.
//!
//! Loaded from `~/.scribe/campaign.toml`. A missing file means the stock
//! calendar and no havens; a malformed file is an error, never silently
//! defaulted.

use std::path::PathBuf;
use std::{fs, io};

use serde::Deserialize;

use crate::calendar::CalendarConfig;

/// Campaign configuration: the calendar definition plus the haven list the
/// rollover engine anchors trail upkeep to.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Safe-location hex ids. Trails near these are maintained across
    /// seasons.
    pub havens: Vec<String>,
    pub calendar: CalendarConfig,
}

impl Config {
    /// Load config from `~/.scribe/campaign.toml`, defaults when absent.
    pub fn load() -> Result<Self, String> {
        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };
        toml::from_str(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The config file path: `~/.scribe/campaign.toml`.
    #[must_use]
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".scribe").join("campaign.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar;

    #[test]
    fn default_config_builds_a_valid_calendar() {
        let config = Config::default();
        assert!(config.havens.is_empty());
        assert!(Calendar::new(config.calendar).is_ok());
    }

    #[test]
    fn partial_toml_overrides_only_what_it_names() {
        let config: Config = toml::from_str(r#"havens = ["K10", "P12"]"#).unwrap();
        assert_eq!(config.havens, vec!["K10", "P12"]);
        // Calendar falls back to the stock definition.
        assert_eq!(config.calendar.months.len(), 12);
    }

    #[test]
    fn calendar_can_be_redefined() {
        let config: Config = toml::from_str(
            r#"
            [calendar]
            season-by-month = { Thaw = "spring" }
            daylight-caps = { winter = 8, spring = 12, summer = 14, autumn = 10 }

            [[calendar.months]]
            name = "Thaw"
            days = 40
            aliases = ["Th"]
            "#,
        )
        .unwrap();
        assert_eq!(config.calendar.months.len(), 1);
        assert_eq!(config.calendar.months[0].days, 40);
        assert!(config.calendar.leap.is_none());
    }
}
