//! The in-world calendar: pure arithmetic over a configurable set of months.
//!
//! Month lengths vary, an optional leap rule adds days to one month every N
//! years, and each month maps to a season. The service validates its own
//! configuration at construction so every later operation can trust the
//! tables; operations themselves fail only on unknown months, out-of-range
//! days, or unparseable input.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{CanonicalDate, Season};

/// Errors raised by calendar construction and arithmetic.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar has no months")]
    NoMonths,

    #[error("invalid month definition: {0}")]
    InvalidMonth(String),

    #[error("missing season mapping for month {0:?}")]
    MissingSeason(String),

    #[error("missing daylight cap for season {0:?}")]
    MissingDaylightCap(Season),

    #[error("leap month {0:?} is not a configured month")]
    LeapMonthUnknown(String),

    #[error("leap rule must have positive 'every' and 'add-days'")]
    BadLeapRule,

    #[error("unknown month {0:?}")]
    UnknownMonth(String),

    #[error("{month} {year} has {days} days; got {got}")]
    DayOutOfRange {
        month: String,
        year: i32,
        days: u16,
        got: u8,
    },

    #[error("empty date string")]
    EmptyDate,

    #[error("relative date {0:?} requires a base date")]
    RelativeWithoutBase(String),

    #[error("unrecognized date {0:?}")]
    Unrecognized(String),

    #[error("no recognizable month in {input:?}{hint}")]
    NoMonthFound { input: String, hint: String },

    #[error("missing or invalid day in {0:?}")]
    MissingDay(String),

    #[error("missing year in {0:?} and no base date")]
    MissingYear(String),
}

pub type Result<T> = core::result::Result<T, CalendarError>;

/// One configured month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthConfig {
    pub name: String,
    pub days: u16,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// The leap rule: `add_days` extra days in `month`, every `every` years,
/// counted from `anchor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LeapRule {
    pub month: String,
    pub every: i32,
    pub add_days: u16,
    #[serde(default)]
    pub anchor: i32,
}

/// Raw calendar configuration, as loaded from `campaign.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CalendarConfig {
    pub months: Vec<MonthConfig>,
    pub season_by_month: BTreeMap<String, Season>,
    pub daylight_caps: BTreeMap<Season, u8>,
    #[serde(default)]
    pub leap: Option<LeapRule>,
}

impl Default for CalendarConfig {
    /// The campaign's stock calendar: twelve months, three per season, one
    /// leap day in Umbraeus every fourth year.
    fn default() -> Self {
        let months = [
            ("Primaris", 31, "Pri", Season::Winter),
            ("Gelidus", 30, "Gel", Season::Winter),
            ("Hibernis", 31, "Hib", Season::Winter),
            ("Vernalis", 30, "Ver", Season::Spring),
            ("Pluvoris", 31, "Plu", Season::Spring),
            ("Florara", 30, "Flo", Season::Spring),
            ("Solinus", 31, "Sol", Season::Summer),
            ("Aestara", 30, "Aes", Season::Summer),
            ("Lucidus", 31, "Luc", Season::Summer),
            ("Fructara", 30, "Fru", Season::Autumn),
            ("Umbraeus", 30, "Umb", Season::Autumn),
            ("Aridus", 30, "Ari", Season::Autumn),
        ];
        Self {
            months: months
                .iter()
                .map(|(name, days, alias, _)| MonthConfig {
                    name: (*name).to_string(),
                    days: *days,
                    aliases: vec![(*alias).to_string()],
                })
                .collect(),
            season_by_month: months
                .iter()
                .map(|(name, _, _, season)| ((*name).to_string(), *season))
                .collect(),
            daylight_caps: [
                (Season::Winter, 9),
                (Season::Spring, 12),
                (Season::Summer, 15),
                (Season::Autumn, 12),
            ]
            .into_iter()
            .collect(),
            leap: Some(LeapRule {
                month: "Umbraeus".to_string(),
                every: 4,
                add_days: 1,
                anchor: 0,
            }),
        }
    }
}

/// The calendar service. Construction validates the configuration.
#[derive(Debug, Clone)]
pub struct Calendar {
    config: CalendarConfig,
}

impl Calendar {
    pub fn new(config: CalendarConfig) -> Result<Self> {
        if config.months.is_empty() {
            return Err(CalendarError::NoMonths);
        }
        for month in &config.months {
            if month.name.is_empty() || month.days == 0 {
                return Err(CalendarError::InvalidMonth(month.name.clone()));
            }
            if !config.season_by_month.contains_key(&month.name) {
                return Err(CalendarError::MissingSeason(month.name.clone()));
            }
        }
        for season in Season::ALL {
            if !config.daylight_caps.contains_key(&season) {
                return Err(CalendarError::MissingDaylightCap(season));
            }
        }
        if let Some(leap) = &config.leap {
            if !config.months.iter().any(|m| m.name == leap.month) {
                return Err(CalendarError::LeapMonthUnknown(leap.month.clone()));
            }
            if leap.every <= 0 || leap.add_days == 0 {
                return Err(CalendarError::BadLeapRule);
            }
        }
        Ok(Self { config })
    }

    /// Number of days in a month for a specific year, leap-aware.
    pub fn days_in_month(&self, name: &str, year: i32) -> Result<u16> {
        let index = self
            .month_index(name)
            .ok_or_else(|| CalendarError::UnknownMonth(name.to_string()))?;
        let mut days = self.config.months[index].days;
        if let Some(leap) = &self.config.leap
            && leap.month == name
            && (year - leap.anchor).rem_euclid(leap.every) == 0
        {
            days += leap.add_days;
        }
        Ok(days)
    }

    /// Move a date forward or backward by whole days, rolling day → month →
    /// year boundaries with configured month lengths.
    pub fn increment_date(&self, date: &CanonicalDate, by_days: i64) -> Result<CanonicalDate> {
        self.assert_valid(date)?;
        let mut year = date.year;
        let mut month = date.month.clone();
        let mut day = u16::from(date.day);
        let mut remaining = by_days;

        while remaining != 0 {
            if remaining > 0 {
                if day < self.days_in_month(&month, year)? {
                    day += 1;
                } else {
                    match self.next_month_name(&month)? {
                        Some(next) => month = next.to_string(),
                        None => {
                            year += 1;
                            month = self.config.months[0].name.clone();
                        }
                    }
                    day = 1;
                }
                remaining -= 1;
            } else {
                if day > 1 {
                    day -= 1;
                } else {
                    match self.prev_month_name(&month)? {
                        Some(prev) => month = prev.to_string(),
                        None => {
                            year -= 1;
                            month = self.config.months[self.config.months.len() - 1]
                                .name
                                .clone();
                        }
                    }
                    day = self.days_in_month(&month, year)?;
                }
                remaining += 1;
            }
        }

        let out = CanonicalDate::new(year, month, day as u8);
        self.assert_valid(&out)?;
        Ok(out)
    }

    /// Parse a date string: either a relative integer-day offset (`+3`,
    /// `-1`, requires `base`) or free-form `"day month [year]"` with
    /// case-insensitive month names and aliases. The year defaults from
    /// `base` when omitted.
    pub fn parse_date(
        &self,
        input: &str,
        base: Option<&CanonicalDate>,
    ) -> Result<CanonicalDate> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(CalendarError::EmptyDate);
        }

        if let Some(offset) = parse_relative(raw) {
            let base = base
                .ok_or_else(|| CalendarError::RelativeWithoutBase(raw.to_string()))?;
            return self.increment_date(base, offset);
        }

        let parts: Vec<&str> = raw.split_whitespace().collect();
        if parts.len() < 2 {
            return Err(CalendarError::Unrecognized(input.to_string()));
        }

        let month_pos = parts
            .iter()
            .position(|p| self.try_resolve_month(p).is_some())
            .ok_or_else(|| CalendarError::NoMonthFound {
                input: input.to_string(),
                hint: self.suggestion_hint(parts[0]),
            })?;
        let month = self.resolve_month(parts[month_pos])?;

        let day: Option<u8> = parts
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != month_pos)
            .map(|(_, t)| *t)
            .find(|t| is_numeric(t))
            .and_then(|t| t.parse().ok());
        let Some(day) = day else {
            return Err(CalendarError::MissingDay(input.to_string()));
        };

        let numeric: Vec<i32> = parts
            .iter()
            .copied()
            .filter(|t| is_numeric(t))
            .filter_map(|t| t.parse().ok())
            .collect();
        let mut year = numeric.last().copied();
        // A single number is the day, not the year.
        if year == Some(i32::from(day)) && numeric.len() == 1 {
            year = base.map(|b| b.year);
        }
        let Some(year) = year else {
            return Err(CalendarError::MissingYear(input.to_string()));
        };

        let result = CanonicalDate::new(year, month, day);
        self.assert_valid(&result)?;
        Ok(result)
    }

    /// Chronological comparison. Errors if either month is unknown.
    pub fn compare(&self, a: &CanonicalDate, b: &CanonicalDate) -> Result<Ordering> {
        let ai = self
            .month_index(&a.month)
            .ok_or_else(|| CalendarError::UnknownMonth(a.month.clone()))?;
        let bi = self
            .month_index(&b.month)
            .ok_or_else(|| CalendarError::UnknownMonth(b.month.clone()))?;
        Ok(a.year
            .cmp(&b.year)
            .then(ai.cmp(&bi))
            .then(a.day.cmp(&b.day)))
    }

    /// The season a date falls in.
    pub fn season_for(&self, date: &CanonicalDate) -> Result<Season> {
        self.assert_valid(date)?;
        self.config
            .season_by_month
            .get(&date.month)
            .copied()
            .ok_or_else(|| CalendarError::MissingSeason(date.month.clone()))
    }

    /// Daylight cap (hours) for a season. Infallible: construction verified
    /// every season has a cap.
    #[must_use]
    pub fn daylight_cap(&self, season: Season) -> u8 {
        self.config.daylight_caps.get(&season).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn format_date(&self, date: &CanonicalDate) -> String {
        date.to_string()
    }

    /// Month names matching a prefix, name matches before alias matches.
    /// Used for parse-error hints and shell completion.
    #[must_use]
    pub fn suggest_months(&self, prefix: &str, limit: usize) -> Vec<&str> {
        let prefix = prefix.trim().to_ascii_lowercase();
        if prefix.is_empty() {
            return self
                .config
                .months
                .iter()
                .take(limit)
                .map(|m| m.name.as_str())
                .collect();
        }
        let mut scored: Vec<(&str, u8, usize)> = Vec::new();
        for (index, month) in self.config.months.iter().enumerate() {
            if month.name.to_ascii_lowercase().starts_with(&prefix) {
                scored.push((month.name.as_str(), 1, index));
            } else if month
                .aliases
                .iter()
                .any(|a| a.to_ascii_lowercase().starts_with(&prefix))
            {
                scored.push((month.name.as_str(), 2, index));
            }
        }
        scored.sort_by_key(|(_, score, index)| (*score, *index));
        scored.into_iter().map(|(name, _, _)| name).take(limit).collect()
    }

    // ── internals ──

    fn assert_valid(&self, date: &CanonicalDate) -> Result<()> {
        let days = self.days_in_month(&date.month, date.year)?;
        if date.day == 0 || u16::from(date.day) > days {
            return Err(CalendarError::DayOutOfRange {
                month: date.month.clone(),
                year: date.year,
                days,
                got: date.day,
            });
        }
        Ok(())
    }

    fn month_index(&self, name: &str) -> Option<usize> {
        self.config.months.iter().position(|m| m.name == name)
    }

    fn next_month_name(&self, name: &str) -> Result<Option<&str>> {
        let index = self
            .month_index(name)
            .ok_or_else(|| CalendarError::UnknownMonth(name.to_string()))?;
        Ok(self.config.months.get(index + 1).map(|m| m.name.as_str()))
    }

    fn prev_month_name(&self, name: &str) -> Result<Option<&str>> {
        let index = self
            .month_index(name)
            .ok_or_else(|| CalendarError::UnknownMonth(name.to_string()))?;
        Ok(index
            .checked_sub(1)
            .map(|i| self.config.months[i].name.as_str()))
    }

    fn resolve_month(&self, token: &str) -> Result<String> {
        self.try_resolve_month(token)
            .map(String::from)
            .ok_or_else(|| CalendarError::NoMonthFound {
                input: token.to_string(),
                hint: self.suggestion_hint(token),
            })
    }

    fn try_resolve_month(&self, token: &str) -> Option<&str> {
        let lower = token.to_ascii_lowercase();
        self.config
            .months
            .iter()
            .find(|m| {
                m.name.to_ascii_lowercase() == lower
                    || m.aliases.iter().any(|a| a.to_ascii_lowercase() == lower)
            })
            .map(|m| m.name.as_str())
    }

    fn suggestion_hint(&self, token: &str) -> String {
        let suggestions = self.suggest_months(token, 3);
        if suggestions.is_empty() {
            String::new()
        } else {
            format!(" (did you mean: {}?)", suggestions.join(", "))
        }
    }
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

fn parse_relative(raw: &str) -> Option<i64> {
    let rest = raw.strip_prefix(['+', '-'])?;
    if !is_numeric(rest) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar() -> Calendar {
        Calendar::new(CalendarConfig::default()).unwrap()
    }

    fn date(year: i32, month: &str, day: u8) -> CanonicalDate {
        CanonicalDate::new(year, month, day)
    }

    #[test]
    fn construction_rejects_unmapped_month() {
        let mut config = CalendarConfig::default();
        config.season_by_month.remove("Florara");
        assert!(matches!(
            Calendar::new(config),
            Err(CalendarError::MissingSeason(m)) if m == "Florara"
        ));
    }

    #[test]
    fn construction_rejects_unknown_leap_month() {
        let mut config = CalendarConfig::default();
        config.leap = Some(LeapRule {
            month: "Brumaire".into(),
            every: 4,
            add_days: 1,
            anchor: 0,
        });
        assert!(matches!(
            Calendar::new(config),
            Err(CalendarError::LeapMonthUnknown(_))
        ));
    }

    #[test]
    fn leap_year_adds_days() {
        let cal = calendar();
        assert_eq!(cal.days_in_month("Umbraeus", 1512).unwrap(), 31);
        assert_eq!(cal.days_in_month("Umbraeus", 1511).unwrap(), 30);
        assert_eq!(cal.days_in_month("Aridus", 1512).unwrap(), 30);
    }

    #[test]
    fn increment_rolls_month_and_year() {
        let cal = calendar();
        let next = cal.increment_date(&date(1511, "Aridus", 30), 1).unwrap();
        assert_eq!(next, date(1512, "Primaris", 1));

        let prev = cal.increment_date(&date(1512, "Primaris", 1), -1).unwrap();
        assert_eq!(prev, date(1511, "Aridus", 30));
    }

    #[test]
    fn increment_respects_leap_days() {
        let cal = calendar();
        // 1512 is a leap year: Umbraeus runs to 31.
        let next = cal.increment_date(&date(1512, "Umbraeus", 30), 1).unwrap();
        assert_eq!(next, date(1512, "Umbraeus", 31));
    }

    #[test]
    fn parse_relative_requires_base() {
        let cal = calendar();
        let base = date(1511, "Umbraeus", 29);
        assert_eq!(
            cal.parse_date("+2", Some(&base)).unwrap(),
            date(1511, "Aridus", 1)
        );
        assert!(matches!(
            cal.parse_date("+2", None),
            Err(CalendarError::RelativeWithoutBase(_))
        ));
    }

    #[test]
    fn parse_full_and_aliased() {
        let cal = calendar();
        assert_eq!(
            cal.parse_date("12 Umbraeus 1511", None).unwrap(),
            date(1511, "Umbraeus", 12)
        );
        assert_eq!(
            cal.parse_date("12 umb 1511", None).unwrap(),
            date(1511, "Umbraeus", 12)
        );
    }

    #[test]
    fn parse_defaults_year_from_base() {
        let cal = calendar();
        let base = date(1511, "Fructara", 3);
        assert_eq!(
            cal.parse_date("5 Umbraeus", Some(&base)).unwrap(),
            date(1511, "Umbraeus", 5)
        );
        assert!(matches!(
            cal.parse_date("5 Umbraeus", None),
            Err(CalendarError::MissingYear(_))
        ));
    }

    #[test]
    fn parse_rejects_garbage() {
        let cal = calendar();
        assert!(matches!(
            cal.parse_date("", None),
            Err(CalendarError::EmptyDate)
        ));
        assert!(matches!(
            cal.parse_date("12 Brumaire 1511", None),
            Err(CalendarError::NoMonthFound { .. })
        ));
        assert!(matches!(
            cal.parse_date("Umbraeus Umbraeus", None),
            Err(CalendarError::MissingDay(_))
        ));
    }

    #[test]
    fn out_of_range_day_is_rejected() {
        let cal = calendar();
        assert!(matches!(
            cal.parse_date("31 Umbraeus 1511", None),
            Err(CalendarError::DayOutOfRange { .. })
        ));
        // ...but valid in a leap year.
        assert!(cal.parse_date("31 Umbraeus 1512", None).is_ok());
    }

    #[test]
    fn compare_orders_chronologically() {
        let cal = calendar();
        assert_eq!(
            cal.compare(&date(1511, "Fructara", 30), &date(1511, "Umbraeus", 1))
                .unwrap(),
            Ordering::Less
        );
        assert_eq!(
            cal.compare(&date(1512, "Primaris", 1), &date(1511, "Aridus", 30))
                .unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn seasons_follow_the_month_table() {
        let cal = calendar();
        assert_eq!(
            cal.season_for(&date(1511, "Umbraeus", 12)).unwrap(),
            Season::Autumn
        );
        assert_eq!(
            cal.season_for(&date(1511, "Primaris", 1)).unwrap(),
            Season::Winter
        );
    }

    #[test]
    fn suggestions_prefer_name_matches() {
        let cal = calendar();
        assert_eq!(cal.suggest_months("umb", 3), vec!["Umbraeus"]);
        assert_eq!(cal.suggest_months("xyz", 3), Vec::<&str>::new());
    }
}
