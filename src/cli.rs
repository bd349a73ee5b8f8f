//! CLI interface for the campaign ledger.
//!
//! Each subcommand is non-interactive: arguments in, a short report out.
//! Handlers stay thin — they load state through the core, append events or
//! invoke the respective engine, and print. State is always re-derived from
//! the event log; nothing is cached between commands.

use clap::{Parser, Subcommand, ValueEnum};
use jiff::Timestamp;
use rand::thread_rng;

use crate::calendar::Calendar;
use crate::config::Config;
use crate::finalize::finalize_session;
use crate::gate::{apply_event_gate, session_fingerprint, tier_from_level};
use crate::model::{
    ApGrant, AppliedSession, DateSet, DayEnd, DayPhase, DaySummary, DayStart, EventBody,
    Lost, LostState, Move, Note, PartySet, Pillar, Scout, SessionId, SessionMarker,
    SessionStatus, TimeLog, Trail,
};
use crate::rollover::{apply_session_to_trails, preview_rollover, roll_season};
use crate::storage::{InProgress, Storage};
use crate::trails::{build_graph, shortest_path};
use crate::{hex, projector};

/// Hours per logged time segment.
const STEP_HOURS: f64 = 1.5;

/// scribe — the campaign session ledger.
#[derive(Debug, Parser)]
#[command(name = "scribe")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a new session at a hex. Takes the next sequence number and
    /// creates its lock.
    Start {
        /// Starting hex, e.g. `P12`.
        start_hex: String,
    },

    /// Show the active session: location, roster, open day, weather.
    Status,

    /// Record a move to another hex.
    Move {
        to: String,
    },

    /// Mark a trail from the current hex.
    Trail {
        to: String,
    },

    /// Scout a hex from the current one.
    Scout {
        target: String,

        /// Also reveal the hex's landmark.
        #[arg(long)]
        landmark: bool,
    },

    /// Record a free-form note.
    Note {
        text: String,
    },

    /// Replace the party roster.
    Party {
        ids: Vec<String>,
    },

    /// Toggle the lost flag.
    Lost {
        state: LostArg,
    },

    /// Open or close an in-world day.
    Day {
        #[command(subcommand)]
        command: DayCommand,
    },

    /// Set the in-world date explicitly.
    Date {
        /// `"12 Umbraeus 1511"`, `"12 umb"`, or a relative `+N`/`-N`.
        date: Vec<String>,
    },

    /// Log time against the open day; split into daylight/night against the
    /// day's cap.
    Time {
        hours: f64,
    },

    /// Grant an advancement point.
    Ap {
        pillar: PillarArg,
        number: u32,

        /// Highest character tier the grant is open to (default 1).
        #[arg(long)]
        max_tier: Option<u8>,

        note: Option<String>,
    },

    /// Plan the shortest trail route from the current hex.
    Route {
        dest: String,
    },

    /// Finalize the active session into immutable season files.
    Finalize {
        /// Skip lock/meta bookkeeping (scratch sessions).
        #[arg(long)]
        dev: bool,
    },

    /// Remove the most recent event from the active session's log.
    Undo,

    /// Gate a finalized session's advancement points for one character.
    Gate {
        /// Session id, e.g. `session_0012`.
        session: String,

        /// The character's tier (1–4).
        #[arg(long, conflicts_with = "level")]
        tier: Option<u8>,

        /// The character's level; the tier is derived from it.
        #[arg(long)]
        level: Option<u8>,

        /// Record the session as applied in the meta record.
        #[arg(long)]
        apply: bool,
    },

    /// Stamp a finalized session's travel onto the trail map.
    Apply {
        /// Session id, e.g. `session_0012`.
        session: String,

        /// Report the effects without writing the trail map.
        #[arg(long)]
        dry_run: bool,
    },

    /// Seasonal rollover: decay or persist trails for a season.
    Rollover {
        /// Season id, e.g. `1512-winter`.
        season: String,

        /// Report what would happen without committing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Abort the active session: remove its lock and in-progress log.
    Abort,
}

#[derive(Debug, Subcommand)]
pub enum DayCommand {
    /// Open a day. Without a date, the day after the last known one.
    Start {
        date: Vec<String>,
    },
    /// Close the open day with its time accounting.
    End,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LostArg {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PillarArg {
    Combat,
    Exploration,
    Social,
}

impl PillarArg {
    const fn to_domain(self) -> Pillar {
        match self {
            Self::Combat => Pillar::Combat,
            Self::Exploration => Pillar::Exploration,
            Self::Social => Pillar::Social,
        }
    }
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config, storage: &Storage) -> Result<(), String> {
    let cli = Cli::parse();
    let calendar = Calendar::new(config.calendar.clone())
        .map_err(|e| format!("invalid calendar configuration: {e}"))?;

    match cli.command {
        Command::Start { start_hex } => cmd_start(storage, &start_hex),
        Command::Status => cmd_status(storage, &calendar),
        Command::Move { to } => cmd_move(storage, &to),
        Command::Trail { to } => cmd_trail(storage, &to),
        Command::Scout { target, landmark } => cmd_scout(storage, &target, landmark),
        Command::Note { text } => {
            let session = require_session(storage)?;
            append(&session, EventBody::Note(Note { text }))?;
            println!("noted");
            Ok(())
        }
        Command::Party { ids } => {
            if ids.is_empty() {
                return Err("specify at least one character id".into());
            }
            let session = require_session(storage)?;
            append(&session, EventBody::PartySet(PartySet { ids: ids.clone() }))?;
            println!("party: {}", ids.join(", "));
            Ok(())
        }
        Command::Lost { state } => {
            let session = require_session(storage)?;
            let state = match state {
                LostArg::On => LostState::On,
                LostArg::Off => LostState::Off,
            };
            append(&session, EventBody::Lost(Lost { state }))?;
            println!(
                "party is {}",
                if state == LostState::On { "lost" } else { "found" }
            );
            Ok(())
        }
        Command::Day { command } => match command {
            DayCommand::Start { date } => cmd_day_start(storage, &calendar, &date.join(" ")),
            DayCommand::End => cmd_day_end(storage),
        },
        Command::Date { date } => cmd_date(storage, &calendar, &date.join(" ")),
        Command::Time { hours } => cmd_time(storage, hours),
        Command::Ap {
            pillar,
            number,
            max_tier,
            note,
        } => {
            let session = require_session(storage)?;
            let pillar = pillar.to_domain();
            append(
                &session,
                EventBody::AdvancementPoint(ApGrant {
                    pillar,
                    number,
                    max_tier: max_tier.unwrap_or(1),
                    note: note.clone(),
                }),
            )?;
            println!(
                "ap: {pillar} +{number}{}",
                note.map(|n| format!(" — {n}")).unwrap_or_default()
            );
            Ok(())
        }
        Command::Route { dest } => cmd_route(storage, &dest),
        Command::Undo => cmd_undo(storage),
        Command::Gate {
            session,
            tier,
            level,
            apply,
        } => {
            let tier = match (tier, level) {
                (Some(tier), _) => tier,
                (None, Some(level)) => tier_from_level(level),
                (None, None) => return Err("pass --tier or --level".into()),
            };
            cmd_gate(storage, &session, tier, apply)
        }
        Command::Apply { session, dry_run } => cmd_apply(storage, &session, dry_run),
        Command::Finalize { dev } => cmd_finalize(storage, dev),
        Command::Rollover { season, dry_run } => {
            cmd_rollover(storage, &config.havens, &season, dry_run)
        }
        Command::Abort => cmd_abort(storage),
    }
}

/// Require an in-progress session.
fn require_session(storage: &Storage) -> Result<InProgress, String> {
    storage
        .latest_in_progress()
        .map_err(|e| format!("failed to scan in-progress sessions: {e}"))?
        .ok_or_else(|| "no in-progress session — `scribe start <hex>` first".to_string())
}

fn append(session: &InProgress, body: EventBody) -> Result<(), String> {
    Storage::append_event(&session.path, body)
        .map_err(|e| format!("failed to append event: {e}"))?;
    Ok(())
}

fn require_valid_hex(raw: &str) -> Result<String, String> {
    let normalized = hex::normalize(raw);
    if !hex::is_valid(&normalized) {
        return Err(format!("invalid hex id {raw:?} — expected e.g. P12"));
    }
    Ok(normalized)
}

fn cmd_start(storage: &Storage, start_hex: &str) -> Result<(), String> {
    let start_hex = require_valid_hex(start_hex)?;
    let now = Timestamp::now();
    let prep = storage
        .prepare_session_start(now)
        .map_err(|e| format!("cannot start session: {e}"))?;

    let mut marker = SessionMarker::bare(SessionStatus::InProgress, prep.id.to_string());
    marker.start_hex = Some(start_hex.clone());
    marker.session_date = Some(now.strftime("%Y-%m-%d").to_string());
    Storage::append_event(&prep.path, EventBody::SessionStart(marker))
        .map_err(|e| format!("failed to open session log: {e}"))?;

    println!("started {} @ {start_hex}", prep.id);
    Ok(())
}

fn cmd_status(storage: &Storage, calendar: &Calendar) -> Result<(), String> {
    let session = require_session(storage)?;
    let events = Storage::read_events(&session.path)
        .map_err(|e| format!("failed to read session log: {e}"))?;

    println!("session: {} ({} events)", session.id, events.len());
    match projector::current_hex(&events) {
        Some(hex) => println!("hex: {hex}"),
        None => println!("hex: unknown"),
    }
    let party = projector::party(&events);
    if !party.is_empty() {
        println!("party: {}", party.join(", "));
    }
    match (
        projector::first_calendar_date(&events),
        projector::last_calendar_date(&events),
    ) {
        (Some(first), Some(last)) if first != last => println!(
            "dates: {} → {}",
            calendar.format_date(first),
            calendar.format_date(last)
        ),
        (_, Some(last)) => println!("date: {}", calendar.format_date(last)),
        _ => println!("date: not set"),
    }
    let day = projector::open_day(&events);
    println!("day: {}", if day.open { "open" } else { "closed" });
    if projector::is_lost(&events) {
        println!("the party is LOST");
    }
    if let Some(weather) = projector::current_weather(&events) {
        println!(
            "weather: {} ({})",
            weather.category,
            calendar.format_date(&weather.date)
        );
    }
    println!("forecast: {:+}", projector::current_forecast(&events));
    Ok(())
}

fn cmd_move(storage: &Storage, to: &str) -> Result<(), String> {
    let to = require_valid_hex(to)?;
    let session = require_session(storage)?;
    let events = Storage::read_events(&session.path)
        .map_err(|e| format!("failed to read session log: {e}"))?;
    let from = projector::current_hex(&events);
    append(
        &session,
        EventBody::Move(Move {
            from: from.clone(),
            to: to.clone(),
        }),
    )?;
    match from {
        Some(from) => println!("moved {from} → {to}"),
        None => println!("moved to {to}"),
    }
    Ok(())
}

fn cmd_trail(storage: &Storage, to: &str) -> Result<(), String> {
    let to = require_valid_hex(to)?;
    let session = require_session(storage)?;
    let events = Storage::read_events(&session.path)
        .map_err(|e| format!("failed to read session log: {e}"))?;
    let from = projector::current_hex(&events)
        .ok_or("no current hex known — move or start with a starting hex first")?;
    if from == to {
        return Err("cannot mark a trail to the current hex".into());
    }
    append(
        &session,
        EventBody::Trail(Trail {
            from: from.clone(),
            to: to.clone(),
            marked: true,
        }),
    )?;
    println!("marked trail {from} ↔ {to}");
    Ok(())
}

fn cmd_scout(storage: &Storage, target: &str, landmark: bool) -> Result<(), String> {
    let target = require_valid_hex(target)?;
    let session = require_session(storage)?;
    let events = Storage::read_events(&session.path)
        .map_err(|e| format!("failed to read session log: {e}"))?;
    let from = projector::current_hex(&events)
        .ok_or("no current hex known — move or start with a starting hex first")?;
    if from == target {
        return Err("cannot scout the current hex".into());
    }
    append(
        &session,
        EventBody::Scout(Scout {
            from,
            target: target.clone(),
            landmark,
        }),
    )?;
    println!(
        "scouted {target}: terrain & vegetation{}",
        if landmark { " and landmark" } else { "" }
    );
    Ok(())
}

fn cmd_day_start(storage: &Storage, calendar: &Calendar, date_arg: &str) -> Result<(), String> {
    let session = require_session(storage)?;
    let events = Storage::read_events(&session.path)
        .map_err(|e| format!("failed to read session log: {e}"))?;
    if projector::open_day(&events).open {
        return Err("a day is already open — `scribe day end` first".into());
    }

    let last = projector::last_calendar_date(&events);
    let date = if date_arg.trim().is_empty() {
        let last = last.ok_or("no prior date — `scribe day start <date>`")?;
        calendar
            .increment_date(last, 1)
            .map_err(|e| format!("invalid date: {e}"))?
    } else {
        calendar
            .parse_date(date_arg, last)
            .map_err(|e| format!("invalid date: {e}"))?
    };

    let season = calendar
        .season_for(&date)
        .map_err(|e| format!("invalid date: {e}"))?;
    let daylight_cap = calendar.daylight_cap(season);
    append(
        &session,
        EventBody::DayStart(DayStart {
            calendar_date: date.clone(),
            season,
            daylight_cap,
        }),
    )?;
    println!(
        "day started: {} (daylight cap {daylight_cap}h)",
        calendar.format_date(&date)
    );
    Ok(())
}

fn cmd_day_end(storage: &Storage) -> Result<(), String> {
    let session = require_session(storage)?;
    let events = Storage::read_events(&session.path)
        .map_err(|e| format!("failed to read session log: {e}"))?;
    let day = projector::open_day(&events);
    if !day.open {
        return Err("no open day — `scribe day start [date]` first".into());
    }

    let start = day.last_start.unwrap_or(0);
    let mut daylight_segments = 0u32;
    let mut night_segments = 0u32;
    for event in &events[start + 1..] {
        if let EventBody::TimeLog(time) = &event.body {
            match time.phase {
                DayPhase::Daylight => daylight_segments += time.segments,
                DayPhase::Night => night_segments += time.segments,
            }
        }
    }
    let daylight = f64::from(daylight_segments) * STEP_HOURS;
    let night = f64::from(night_segments) * STEP_HOURS;
    let active = daylight + night;

    append(
        &session,
        EventBody::DayEnd(DayEnd {
            summary: DaySummary {
                active,
                daylight,
                night,
            },
        }),
    )?;
    print!("day ended (active {active:.1}h: daylight {daylight:.1}h, night {night:.1}h)");
    if active > 12.0 {
        print!(" — exceeded the 12h exhaustion threshold");
    }
    println!();
    Ok(())
}

fn cmd_date(storage: &Storage, calendar: &Calendar, date_arg: &str) -> Result<(), String> {
    let session = require_session(storage)?;
    let events = Storage::read_events(&session.path)
        .map_err(|e| format!("failed to read session log: {e}"))?;
    let last = projector::last_calendar_date(&events);
    let date = calendar
        .parse_date(date_arg, last)
        .map_err(|e| format!("invalid date: {e}"))?;
    if let Some(last) = last
        && matches!(calendar.compare(&date, last), Ok(std::cmp::Ordering::Less))
    {
        println!(
            "warning: {} is before the last recorded {}",
            calendar.format_date(&date),
            calendar.format_date(last)
        );
    }
    append(
        &session,
        EventBody::DateSet(DateSet {
            calendar_date: date.clone(),
        }),
    )?;
    println!("date set: {}", calendar.format_date(&date));
    Ok(())
}

fn cmd_time(storage: &Storage, hours: f64) -> Result<(), String> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err("hours must be positive".into());
    }
    let session = require_session(storage)?;
    let events = Storage::read_events(&session.path)
        .map_err(|e| format!("failed to read session log: {e}"))?;
    let day = projector::open_day(&events);
    if !day.open {
        return Err("no open day — `scribe day start [date]` first".into());
    }
    let start = day.last_start.unwrap_or(0);

    // Round up to whole segments, then split against the day's daylight cap.
    let segments = (hours / STEP_HOURS).ceil() as u32;
    let cap_hours = events[start..]
        .iter()
        .find_map(|e| match &e.body {
            EventBody::DayStart(d) => Some(f64::from(d.daylight_cap)),
            _ => None,
        })
        .unwrap_or(9.0);
    let cap_segments = (cap_hours / STEP_HOURS).round() as u32;
    let used_daylight: u32 = events[start + 1..]
        .iter()
        .filter_map(|e| match &e.body {
            EventBody::TimeLog(t) if t.phase == DayPhase::Daylight => Some(t.segments),
            _ => None,
        })
        .sum();

    let daylight = segments.min(cap_segments.saturating_sub(used_daylight));
    let night = segments - daylight;
    if daylight > 0 {
        append(
            &session,
            EventBody::TimeLog(TimeLog {
                phase: DayPhase::Daylight,
                segments: daylight,
            }),
        )?;
    }
    if night > 0 {
        append(
            &session,
            EventBody::TimeLog(TimeLog {
                phase: DayPhase::Night,
                segments: night,
            }),
        )?;
    }
    println!(
        "logged {:.1}h ({:.1}h daylight, {:.1}h night)",
        f64::from(segments) * STEP_HOURS,
        f64::from(daylight) * STEP_HOURS,
        f64::from(night) * STEP_HOURS
    );
    Ok(())
}

fn cmd_route(storage: &Storage, dest: &str) -> Result<(), String> {
    let dest = require_valid_hex(dest)?;
    let session = require_session(storage)?;
    let events = Storage::read_events(&session.path)
        .map_err(|e| format!("failed to read session log: {e}"))?;
    let from = projector::current_hex(&events)
        .ok_or("no current hex known — move or start with a starting hex first")?;

    let trails = storage
        .load_trails()
        .map_err(|e| format!("failed to load trails: {e}"))?;
    let graph = build_graph(&trails);
    match shortest_path(&graph, &trails, &from, &dest) {
        Some(path) if path.is_empty() => println!("already at {dest}"),
        Some(path) => println!("route: {from} → {}", path.join(" → ")),
        None => println!("no trail route from {from} to {dest}"),
    }
    Ok(())
}

fn cmd_undo(storage: &Storage) -> Result<(), String> {
    let session = require_session(storage)?;
    let mut events = Storage::read_events(&session.path)
        .map_err(|e| format!("failed to read session log: {e}"))?;
    let Some(removed) = events.pop() else {
        return Err("nothing to undo".into());
    };
    Storage::write_events(&session.path, &events)
        .map_err(|e| format!("failed to rewrite session log: {e}"))?;
    println!("removed {} (seq {})", removed.kind(), removed.seq);
    Ok(())
}

fn cmd_apply(storage: &Storage, session: &str, dry_run: bool) -> Result<(), String> {
    let id: SessionId = session
        .parse()
        .map_err(|e| format!("{e} — expected e.g. session_0012"))?;
    let files = storage
        .finalized_files(id)
        .map_err(|e| format!("failed to scan finalized sessions: {e}"))?;
    if files.is_empty() {
        return Err(format!("no finalized logs for {id}"));
    }

    let mut trails = storage
        .load_trails()
        .map_err(|e| format!("failed to load trails: {e}"))?;
    let mut created = 0;
    let mut used = 0;
    let mut rediscovered = 0;
    for (_, path) in &files {
        let (header, events) = Storage::read_finalized(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let (next, effects) =
            apply_session_to_trails(&events, &trails, &header.season_id, &[]);
        trails = next;
        created += effects.created.len();
        used += effects.used.len();
        rediscovered += effects.rediscovered.len();
    }

    if dry_run {
        println!("would touch {used} edge(s): {created} new, {rediscovered} rediscovered");
        return Ok(());
    }
    storage
        .save_trails(&trails)
        .map_err(|e| format!("failed to save trails: {e}"))?;
    println!("applied {id}: {used} edge(s) touched, {created} new, {rediscovered} rediscovered");
    Ok(())
}

fn cmd_gate(storage: &Storage, session: &str, tier: u8, apply: bool) -> Result<(), String> {
    if !(1..=4).contains(&tier) {
        return Err("tier must be 1-4".into());
    }
    let id: SessionId = session
        .parse()
        .map_err(|e| format!("{e} — expected e.g. session_0012"))?;

    let files = storage
        .finalized_files(id)
        .map_err(|e| format!("failed to scan finalized sessions: {e}"))?;
    if files.is_empty() {
        return Err(format!("no finalized logs for {id}"));
    }

    let mut grants = Vec::new();
    for (_, path) in &files {
        let (_, events) = Storage::read_finalized(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        grants.extend(events.into_iter().filter_map(|e| match e.body {
            EventBody::AdvancementPoint(grant) => Some(grant),
            _ => None,
        }));
    }

    let outcomes = apply_event_gate(&grants, tier, id.seq());
    for (pillar, outcome) in &outcomes {
        print!("{pillar}: +{} ({})", outcome.delta, outcome.reason);
        if let Some(note) = &outcome.note {
            print!(" — {note}");
        }
        println!();
    }

    if apply {
        let file_ids: Vec<String> = files.iter().map(|(id, _)| id.clone()).collect();
        let fingerprint = session_fingerprint(&id.to_string(), &file_ids);
        let mut meta = storage
            .load_meta()
            .map_err(|e| format!("failed to load meta: {e}"))?;
        if let Some(existing) = meta
            .applied_sessions
            .iter()
            .find(|a| a.session_id == id.to_string())
        {
            if existing.fingerprint == fingerprint {
                println!("{id} already applied; no-op");
                return Ok(());
            }
            return Err(format!(
                "{id} was applied with different outputs — revert the prior apply first"
            ));
        }
        meta.applied_sessions.push(AppliedSession {
            session_id: id.to_string(),
            fingerprint,
        });
        storage
            .save_meta(&meta)
            .map_err(|e| format!("failed to save meta: {e}"))?;
        println!("{id} recorded as applied");
    }
    Ok(())
}

fn cmd_finalize(storage: &Storage, dev: bool) -> Result<(), String> {
    let session = require_session(storage)?;
    let outcome = finalize_session(storage, session.id, &session.path, !dev)
        .map_err(|e| format!("finalize failed: {e}"))?;
    for output in &outcome.outputs {
        println!("finalized → {}", output.display());
    }
    for rollover in &outcome.rollovers {
        println!("rollover → {}", rollover.display());
    }
    Ok(())
}

fn cmd_rollover(
    storage: &Storage,
    havens: &[String],
    season: &str,
    dry_run: bool,
) -> Result<(), String> {
    if dry_run {
        let trails = storage
            .load_trails()
            .map_err(|e| format!("failed to load trails: {e}"))?;
        let preview = preview_rollover(&trails, havens);
        println!("maintained (near a haven): {}", preview.maintained.len());
        println!("persisted (used this season): {}", preview.persisted.len());
        for edge in &preview.at_risk {
            println!("at risk: {edge} — deleted on 1-3, streak reset on 4-6");
        }
        return Ok(());
    }

    let outcome = roll_season(storage, havens, season, &mut thread_rng())
        .map_err(|e| format!("rollover failed: {e}"))?;
    println!(
        "rolled {season}: {} maintained, {} persisted, {} deleted",
        outcome.maintained.len(),
        outcome.persisted.len(),
        outcome.deleted.len()
    );
    for (edge, check) in &outcome.checks {
        let fate = if check.deleted { "faded" } else { "held on" };
        println!("{fate}: {edge} (d6={})", check.roll);
    }
    Ok(())
}

fn cmd_abort(storage: &Storage) -> Result<(), String> {
    let session = require_session(storage)?;
    storage
        .abort_session(session.id)
        .map_err(|e| format!("abort failed: {e}"))?;
    println!("aborted {}", session.id);
    Ok(())
}
