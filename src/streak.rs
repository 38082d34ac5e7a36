use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::calendar::{PeriodId, day_before, game_day_of, game_offset, game_week_days};

/// One cell of the recent-weeks habit view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeekCell {
    pub start: NaiveDate,
    pub label: String,
    pub completed: bool,
    pub is_current: bool,
}

/// One cell of a per-day habit grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub completed: bool,
    pub is_today: bool,
    pub is_future: bool,
}

/// Consecutive game-days completed, counted backward from `now`'s game-day.
/// Today not yet done does not break an in-progress streak (the day's reset
/// has not passed); the walk stops at the first gap or once it passes the
/// task's creation game-day. Read-only.
pub fn daily_streak(history: &[PeriodId], now: DateTime<Utc>, created_at: DateTime<Utc>) -> usize {
    if history.is_empty() {
        return 0;
    }

    let today = game_day_of(now);
    let first_day = game_day_of(created_at);

    let mut cursor = if history.contains(&today) {
        today
    } else {
        day_before(today)
    };

    let mut streak = 0;
    while cursor >= first_day && history.contains(&cursor) {
        streak += 1;
        cursor = day_before(cursor);
    }
    streak
}

/// Consecutive game-weeks completed, counted backward from the most recent
/// cell of `weeks` (oldest first, as produced by [`recent_weeks`]). Unlike
/// the daily walk there is no grace cell: an incomplete current week reads as
/// a broken streak. Read-only.
pub fn weekly_streak(history: &[PeriodId], weeks: &[WeekCell]) -> usize {
    if history.is_empty() {
        return 0;
    }
    weeks.iter().rev().take_while(|week| week.completed).count()
}

/// The most recent `count` game-weeks, oldest first. A week reads as
/// completed when its start day (the Monday the boundary opened) is in the
/// history, which is exactly how the weekly ledger writes it.
pub fn recent_weeks(history: &[PeriodId], now: DateTime<Utc>, count: usize) -> Vec<WeekCell> {
    let mut weeks: Vec<WeekCell> = (0..count)
        .map(|weeks_back| {
            let probe = now - Duration::days(7 * weeks_back as i64);
            let start_id = game_week_days(probe)[0];
            let start = start_id.local_date();
            WeekCell {
                start,
                label: format!("week of {}", start.format("%b %-d")),
                completed: history.contains(&start_id),
                is_current: weeks_back == 0,
            }
        })
        .collect();
    weeks.reverse();
    weeks
}

/// Every day of the current local month, for the monthly habit grid. Future
/// days are flagged so the view can render them inert; the today marker
/// follows the game-day (late evening highlights tomorrow's cell, which is
/// the period being filled).
pub fn month_days(history: &[PeriodId], now: DateTime<Utc>) -> Vec<DayCell> {
    let local_today = now.with_timezone(&game_offset()).date_naive();
    let first = local_today.with_day(1).expect("day 1 exists in every month");

    let mut days = Vec::new();
    let mut date = first;
    while date.month() == first.month() {
        days.push(day_cell(history, date, local_today, now));
        date = date + Duration::days(1);
    }
    days
}

/// The trailing 7 calendar days ending at the current local day.
pub fn last_week_days(history: &[PeriodId], now: DateTime<Utc>) -> Vec<DayCell> {
    let local_today = now.with_timezone(&game_offset()).date_naive();
    (0..7)
        .rev()
        .map(|days_back| {
            let date = local_today - Duration::days(days_back);
            day_cell(history, date, local_today, now)
        })
        .collect()
}

fn day_cell(history: &[PeriodId], date: NaiveDate, local_today: NaiveDate, now: DateTime<Utc>) -> DayCell {
    let id = game_day_of(
        date.and_time(chrono::NaiveTime::MIN)
            .and_local_timezone(game_offset())
            .single()
            .expect("fixed offset is unambiguous")
            .with_timezone(&Utc),
    );
    DayCell {
        date,
        completed: history.contains(&id),
        is_today: id == game_day_of(now),
        is_future: date > local_today,
    }
}
