//! Projectors: derive present-moment facts from an event log.
//!
//! Every function here is a pure fold over `&[Event]` in array order —
//! callers hold the sorted log. None of these fail; absent data projects to
//! `None`/empty and callers decide what that means ("no current location
//! known").

use crate::hex;
use crate::model::{
    CanonicalDate, Event, EventBody, LostState, WeatherCommitted,
};

/// Whether a day is open, and where its `day_start` sits in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenDay {
    pub open: bool,
    /// Index of the most recent `day_start`, open or not.
    pub last_start: Option<usize>,
}

/// The current hex: last `move` destination, else the `session_start`
/// starting hex, else unknown.
#[must_use]
pub fn current_hex(events: &[Event]) -> Option<String> {
    for event in events.iter().rev() {
        if let EventBody::Move(mv) = &event.body {
            return Some(hex::normalize(&mv.to));
        }
    }
    events.iter().find_map(|event| match &event.body {
        EventBody::SessionStart(marker) => {
            marker.start_hex.as_deref().map(hex::normalize)
        }
        _ => None,
    })
}

/// The latest roster, from the most recent `party_set`. Empty if never set.
#[must_use]
pub fn party(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .rev()
        .find_map(|event| match &event.body {
            EventBody::PartySet(set) => Some(set.ids.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

/// A day is open iff a `day_start` exists after the most recent `day_end`
/// (or no `day_end` exists at all).
#[must_use]
pub fn open_day(events: &[Event]) -> OpenDay {
    let mut last_start = None;
    let mut last_end = None;
    for (index, event) in events.iter().enumerate().rev() {
        match &event.body {
            EventBody::DayStart(_) if last_start.is_none() => last_start = Some(index),
            EventBody::DayEnd(_) if last_end.is_none() => last_end = Some(index),
            _ => {}
        }
        if last_start.is_some() && last_end.is_some() {
            break;
        }
    }
    let open = match (last_start, last_end) {
        (Some(start), Some(end)) => start > end,
        (Some(_), None) => true,
        (None, _) => false,
    };
    OpenDay { open, last_start }
}

/// Scanning backward, the most recent `lost` state wins; a `session_start`
/// encountered first resets to not-lost.
#[must_use]
pub fn is_lost(events: &[Event]) -> bool {
    for event in events.iter().rev() {
        match &event.body {
            EventBody::Lost(lost) => return lost.state == LostState::On,
            EventBody::SessionStart(_) => return false,
            _ => {}
        }
    }
    false
}

/// First in-world date seen, from `day_start` or `date_set`.
#[must_use]
pub fn first_calendar_date(events: &[Event]) -> Option<&CanonicalDate> {
    events.iter().find_map(calendar_date_of)
}

/// Most recent in-world date, from `day_start` or `date_set`.
#[must_use]
pub fn last_calendar_date(events: &[Event]) -> Option<&CanonicalDate> {
    events.iter().rev().find_map(calendar_date_of)
}

fn calendar_date_of(event: &Event) -> Option<&CanonicalDate> {
    match &event.body {
        EventBody::DayStart(day) => Some(&day.calendar_date),
        EventBody::DateSet(set) => Some(&set.calendar_date),
        _ => None,
    }
}

/// The most recent committed weather, if any.
#[must_use]
pub fn current_weather(events: &[Event]) -> Option<&WeatherCommitted> {
    events.iter().rev().find_map(|event| match &event.body {
        EventBody::WeatherCommitted(weather) => Some(weather),
        _ => None,
    })
}

/// The forecast carried into today: the `forecast_after` of the most recent
/// commit from a *prior* day. An entry dated today is skipped so the
/// carry-forward reflects the previous day's outcome. Zero if none.
#[must_use]
pub fn current_forecast(events: &[Event]) -> i32 {
    let today = last_calendar_date(events).cloned();
    for event in events.iter().rev() {
        if let EventBody::WeatherCommitted(weather) = &event.body {
            if today.as_ref() == Some(&weather.date) {
                continue;
            }
            return weather.forecast_after;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;
    use crate::model::{
        DayEnd, DayStart, DaySummary, Lost, Move, PartySet, Season, SessionMarker,
        SessionStatus, WeatherCommitted,
    };

    fn event(seq: u64, body: EventBody) -> Event {
        let ts = Timestamp::new(1_700_000_000 + i64::try_from(seq).unwrap(), 0).unwrap();
        Event { seq, ts, body }
    }

    fn start(seq: u64, hex: &str) -> Event {
        let mut marker = SessionMarker::bare(SessionStatus::InProgress, "session_0001");
        marker.start_hex = Some(hex.to_string());
        event(seq, EventBody::SessionStart(marker))
    }

    fn move_to(seq: u64, to: &str) -> Event {
        event(
            seq,
            EventBody::Move(Move {
                from: None,
                to: to.to_string(),
            }),
        )
    }

    fn day_start(seq: u64, year: i32, month: &str, day: u8) -> Event {
        event(
            seq,
            EventBody::DayStart(DayStart {
                calendar_date: CanonicalDate::new(year, month, day),
                season: Season::Autumn,
                daylight_cap: 12,
            }),
        )
    }

    fn day_end(seq: u64) -> Event {
        event(
            seq,
            EventBody::DayEnd(DayEnd {
                summary: DaySummary {
                    active: 8.0,
                    daylight: 6.0,
                    night: 2.0,
                },
            }),
        )
    }

    fn weather(seq: u64, day: u8, forecast_after: i32) -> Event {
        event(
            seq,
            EventBody::WeatherCommitted(WeatherCommitted {
                date: CanonicalDate::new(1511, "Umbraeus", day),
                season: Season::Autumn,
                roll_2d6: 7,
                forecast_before: 0,
                total: 7,
                category: "clear".into(),
                detail: None,
                forecast_after,
                overridden: false,
            }),
        )
    }

    #[test]
    fn current_hex_prefers_last_move() {
        let events = vec![start(1, "P12"), move_to(2, "P13"), move_to(3, "Q13")];
        assert_eq!(current_hex(&events), Some("Q13".to_string()));
    }

    #[test]
    fn current_hex_falls_back_to_start() {
        let events = vec![start(1, "p12")];
        assert_eq!(current_hex(&events), Some("P12".to_string()));
        assert_eq!(current_hex(&[]), None);
    }

    #[test]
    fn party_is_latest_roster() {
        let events = vec![
            start(1, "P12"),
            event(
                2,
                EventBody::PartySet(PartySet {
                    ids: vec!["ansel".into()],
                }),
            ),
            event(
                3,
                EventBody::PartySet(PartySet {
                    ids: vec!["ansel".into(), "brennor".into()],
                }),
            ),
        ];
        assert_eq!(party(&events), vec!["ansel", "brennor"]);
        assert!(party(&[start(1, "P12")]).is_empty());
    }

    #[test]
    fn open_day_tracks_start_end_pairs() {
        let events = vec![start(1, "P12"), day_start(2, 1511, "Umbraeus", 12)];
        let state = open_day(&events);
        assert!(state.open);
        assert_eq!(state.last_start, Some(1));

        let events = vec![
            start(1, "P12"),
            day_start(2, 1511, "Umbraeus", 12),
            day_end(3),
        ];
        let state = open_day(&events);
        assert!(!state.open);
        assert_eq!(state.last_start, Some(1));

        assert!(!open_day(&[start(1, "P12")]).open);
    }

    #[test]
    fn lost_flag_resets_at_session_start() {
        let events = vec![
            event(
                1,
                EventBody::Lost(Lost {
                    state: LostState::On,
                }),
            ),
            start(2, "P12"),
        ];
        assert!(!is_lost(&events));

        let events = vec![
            start(1, "P12"),
            event(
                2,
                EventBody::Lost(Lost {
                    state: LostState::On,
                }),
            ),
        ];
        assert!(is_lost(&events));
    }

    #[test]
    fn forecast_skips_todays_commit() {
        let events = vec![
            start(1, "P12"),
            day_start(2, 1511, "Umbraeus", 12),
            weather(3, 12, 2),
        ];
        // Only commit is for today: nothing carried forward.
        assert_eq!(current_forecast(&events), 0);

        let events = vec![
            start(1, "P12"),
            day_start(2, 1511, "Umbraeus", 12),
            weather(3, 12, 2),
            day_start(4, 1511, "Umbraeus", 13),
        ];
        // Yesterday's commit now carries into today.
        assert_eq!(current_forecast(&events), 2);
    }

    #[test]
    fn current_weather_is_most_recent() {
        let events = vec![weather(1, 11, 1), weather(2, 12, 3)];
        assert_eq!(current_weather(&events).unwrap().date.day, 12);
        assert!(current_weather(&[]).is_none());
    }
}
