use chrono::{DateTime, Utc};
use itertools::Itertools;

use crate::{
    calendar::{PeriodId, game_day_of, game_week_days},
    domain::ScheduleKind,
};

// Pure operations on a task's completion history. Every function returns a
// new history and leaves the input untouched; entries are game-day
// identifiers, deduplicated by the `toggle` entry point.

pub fn add_daily(history: &[PeriodId], instant: DateTime<Utc>) -> Vec<PeriodId> {
    let mut updated = history.to_vec();
    updated.push(game_day_of(instant));
    updated
}

pub fn remove_daily(history: &[PeriodId], instant: DateTime<Utc>) -> Vec<PeriodId> {
    let target = game_day_of(instant);
    history
        .iter()
        .copied()
        .filter(|entry| game_day_of(entry.instant()) != target)
        .collect()
}

/// A weekly task is done as a single unit per game-week: completing it marks
/// all 7 constituent game-days, so day-shaped and week-shaped queries share
/// one representation.
pub fn add_weekly(history: &[PeriodId], instant: DateTime<Utc>) -> Vec<PeriodId> {
    history
        .iter()
        .copied()
        .chain(game_week_days(instant))
        .unique()
        .collect()
}

/// Un-completing a week un-completes the whole week, not a single day.
pub fn remove_weekly(history: &[PeriodId], instant: DateTime<Utc>) -> Vec<PeriodId> {
    let week = game_week_days(instant);
    history
        .iter()
        .copied()
        .filter(|entry| !week.contains(entry))
        .collect()
}

/// Dispatch on the owning category's schedule. `None`-scheduled tasks record
/// history daily-style; it is simply never shown for them.
pub fn toggle(
    history: &[PeriodId],
    instant: DateTime<Utc>,
    kind: ScheduleKind,
    is_completing: bool,
) -> Vec<PeriodId> {
    match kind {
        ScheduleKind::Weekly => {
            if is_completing {
                add_weekly(history, instant)
            } else {
                remove_weekly(history, instant)
            }
        }
        ScheduleKind::Daily | ScheduleKind::None => {
            if is_completing {
                if history.contains(&game_day_of(instant)) {
                    history.to_vec()
                } else {
                    add_daily(history, instant)
                }
            } else {
                remove_daily(history, instant)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::calendar::game_offset;

    use super::*;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        game_offset()
            .with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn as_set(history: &[PeriodId]) -> std::collections::BTreeSet<PeriodId> {
        history.iter().copied().collect()
    }

    #[test]
    fn test_daily_toggle_round_trip() {
        let seed = add_daily(&[], local(2024, 1, 1, 12, 0, 0));
        let t = local(2024, 1, 2, 12, 0, 0);

        let on = toggle(&seed, t, ScheduleKind::Daily, true);
        assert_eq!(on.len(), 2);

        let off = toggle(&on, t, ScheduleKind::Daily, false);
        assert_eq!(as_set(&off), as_set(&seed));
    }

    #[test]
    fn test_daily_toggle_on_twice_does_not_duplicate() {
        let t = local(2024, 1, 2, 12, 0, 0);
        let once = toggle(&[], t, ScheduleKind::Daily, true);
        let twice = toggle(&once, t, ScheduleKind::Daily, true);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_weekly_toggle_marks_all_seven_days() {
        let t = local(2024, 1, 3, 12, 0, 0);
        let on = toggle(&[], t, ScheduleKind::Weekly, true);
        assert_eq!(as_set(&on), as_set(&game_week_days(t)));
    }

    #[test]
    fn test_weekly_toggle_off_clears_the_whole_week() {
        let this_week = local(2024, 1, 3, 12, 0, 0);
        let prior_week = local(2023, 12, 27, 12, 0, 0);

        let mut history = add_weekly(&[], prior_week);
        history = add_weekly(&history, this_week);
        assert_eq!(history.len(), 14);

        let off = toggle(&history, this_week, ScheduleKind::Weekly, false);
        assert_eq!(as_set(&off), as_set(&game_week_days(prior_week)));
    }

    #[test]
    fn test_weekly_add_twice_does_not_duplicate() {
        let t = local(2024, 1, 3, 12, 0, 0);
        let history = add_weekly(&add_weekly(&[], t), t);
        assert_eq!(history.len(), 7);
    }

    #[test]
    fn test_remove_daily_only_touches_the_target_day() {
        let day_one = local(2024, 1, 1, 12, 0, 0);
        let day_two = local(2024, 1, 2, 12, 0, 0);
        let history = add_daily(&add_daily(&[], day_one), day_two);

        // Removing at a different moment of the same game-day still hits it.
        let late_day_two = local(2024, 1, 2, 20, 59, 0);
        let removed = remove_daily(&history, late_day_two);
        assert_eq!(removed, vec![game_day_of(day_one)]);
    }

    #[test]
    fn test_none_kind_routes_daily_style() {
        let t = local(2024, 1, 2, 12, 0, 0);
        let on = toggle(&[], t, ScheduleKind::None, true);
        assert_eq!(on, vec![game_day_of(t)]);
        let off = toggle(&on, t, ScheduleKind::None, false);
        assert!(off.is_empty());
    }
}
