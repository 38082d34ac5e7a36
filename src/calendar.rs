use std::fmt;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{constants::SCHEDULE, domain::ScheduleKind};

/// Identifier of one game-day: the day's local midnight (at the fixed UTC-3
/// offset) expressed as a UTC instant.
///
/// A moment between 21:00 and 23:59 local already counts toward the *next*
/// calendar day, mirroring the daily reset boundary.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct PeriodId(DateTime<Utc>);

impl PeriodId {
    pub fn instant(self) -> DateTime<Utc> {
        self.0
    }

    /// Calendar date of the game-day, in game-local wall-clock terms.
    pub fn local_date(self) -> NaiveDate {
        self.0.with_timezone(&game_offset()).date_naive()
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid instant '{0}', expected an RFC 3339 timestamp")]
pub struct InvalidInstant(pub String);

/// Validation gate for operator-supplied timestamps. Everything downstream of
/// this function works with parsed instants only.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, InvalidInstant> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|_| InvalidInstant(value.to_string()))
}

pub fn game_offset() -> FixedOffset {
    FixedOffset::east_opt(SCHEDULE.utc_offset_minutes * 60).expect("offset fits in a day")
}

fn to_game_local(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&game_offset())
}

fn local_instant(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    date.and_time(time)
        .and_local_timezone(game_offset())
        .single()
        .expect("fixed offset is unambiguous")
        .with_timezone(&Utc)
}

fn local_midnight(date: NaiveDate) -> PeriodId {
    PeriodId(local_instant(date, NaiveTime::MIN))
}

/// Map an instant to the game-day it counts toward. At or after 21:00 local
/// the instant belongs to the next calendar day.
pub fn game_day_of(instant: DateTime<Utc>) -> PeriodId {
    let local = to_game_local(instant);
    let mut date = local.date_naive();
    if local.hour() >= SCHEDULE.daily_reset_hour {
        date = date + Duration::days(1);
    }
    local_midnight(date)
}

pub fn day_before(day: PeriodId) -> PeriodId {
    local_midnight(day.local_date() - Duration::days(1))
}

/// The 7 game-days of the game-week containing `instant`, oldest first.
/// Day 0 is the calendar day of the Monday 04:30 boundary that opened the
/// week.
pub fn game_week_days(instant: DateTime<Utc>) -> [PeriodId; 7] {
    let start = game_week_start(instant);
    std::array::from_fn(|i| local_midnight(start + Duration::days(i as i64)))
}

/// Calendar date of the Monday whose 04:30 boundary opened the game-week
/// containing `instant`. An instant exactly on the boundary belongs to the
/// week that is starting.
fn game_week_start(instant: DateTime<Utc>) -> NaiveDate {
    let local = to_game_local(instant);
    let reset_day = SCHEDULE.weekly_reset_weekday.num_days_from_monday();
    let days_into_week = (local.weekday().num_days_from_monday() + 7 - reset_day) % 7;
    let boundary_day = local.date_naive() - Duration::days(days_into_week as i64);
    if instant < weekly_boundary_on(boundary_day) {
        boundary_day - Duration::days(7)
    } else {
        boundary_day
    }
}

fn weekly_reset_time() -> NaiveTime {
    NaiveTime::from_hms_opt(SCHEDULE.weekly_reset_hour, SCHEDULE.weekly_reset_minute, 0)
        .expect("reset time is a valid wall-clock time")
}

fn daily_reset_time() -> NaiveTime {
    NaiveTime::from_hms_opt(SCHEDULE.daily_reset_hour, 0, 0)
        .expect("reset time is a valid wall-clock time")
}

fn weekly_boundary_on(date: NaiveDate) -> DateTime<Utc> {
    local_instant(date, weekly_reset_time())
}

/// Most recent 21:00 boundary at or before `now`.
pub fn last_daily_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let local = to_game_local(now);
    let mut date = local.date_naive();
    if local.hour() < SCHEDULE.daily_reset_hour {
        date = date - Duration::days(1);
    }
    local_instant(date, daily_reset_time())
}

/// Most recent Monday 04:30 boundary at or before `now`. Closed on the start
/// side: `now` exactly on the boundary yields that boundary.
pub fn last_weekly_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    weekly_boundary_on(game_week_start(now))
}

/// The next reset boundary strictly after `now`, if the schedule has one.
pub fn next_reset(kind: ScheduleKind, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match kind {
        ScheduleKind::Daily => Some(last_daily_boundary(now) + Duration::days(1)),
        ScheduleKind::Weekly => Some(last_weekly_boundary(now) + Duration::days(7)),
        ScheduleKind::None => None,
    }
}
