use chrono::{DateTime, Utc};

use crate::{
    calendar::{game_day_of, last_daily_boundary, last_weekly_boundary},
    domain::{Category, ScheduleKind, TaskBoard},
};

/// Whether a category is due for reconciliation: its last reset predates the
/// most recent schedule boundary at or before `now`. Comparing against the
/// absolute boundary (rather than counting ticks) means any number of missed
/// polls catches up in a single pass.
pub fn should_reset(
    kind: ScheduleKind,
    last_reset: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    let boundary = match kind {
        ScheduleKind::Daily => last_daily_boundary(now),
        ScheduleKind::Weekly => last_weekly_boundary(now),
        ScheduleKind::None => return false,
    };
    last_reset.map_or(true, |at| at < boundary)
}

/// Reconcile a category against a new period. Each task's transient
/// `completed` flag is re-derived from its durable history: a task completed
/// for the period `now` falls in (e.g. right after the boundary, before the
/// poll observed it) stays checked. No-op when no reset is due, so this is
/// safe to run on every poll tick.
pub fn reconcile_category(category: &Category, now: DateTime<Utc>) -> Category {
    if !should_reset(category.kind, category.last_reset_time, now) {
        return category.clone();
    }

    let today = game_day_of(now);
    let mut reconciled = category.clone();
    reconciled.last_reset_time = Some(now);
    for task in &mut reconciled.tasks {
        task.completed = task.completion_history.contains(&today);
    }
    reconciled
}

pub fn reconcile_board(board: &TaskBoard, now: DateTime<Utc>) -> TaskBoard {
    TaskBoard {
        categories: board
            .categories
            .iter()
            .map(|(key, category)| (key.clone(), reconcile_category(category, now)))
            .collect(),
    }
}

/// Keys of the categories a reconciliation pass at `now` would reset.
pub fn due_categories(board: &TaskBoard, now: DateTime<Utc>) -> Vec<String> {
    board
        .ordered_keys()
        .into_iter()
        .filter(|key| {
            board
                .category(key)
                .is_some_and(|c| should_reset(c.kind, c.last_reset_time, now))
        })
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::{calendar::game_offset, domain::TaskId};

    use super::*;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        game_offset()
            .with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_never_reset_category_is_always_due() {
        let now = local(2024, 1, 10, 12, 0, 0);
        assert!(should_reset(ScheduleKind::Daily, None, now));
        assert!(should_reset(ScheduleKind::Weekly, None, now));
        assert!(!should_reset(ScheduleKind::None, None, now));
    }

    #[test]
    fn test_daily_reset_follows_evening_boundary() {
        // Boundary under test: Friday Jan 5, 21:00 local.
        let before_boundary = local(2024, 1, 5, 20, 30, 0);
        let after_boundary = local(2024, 1, 5, 21, 30, 0);

        let reset_thursday_night = Some(local(2024, 1, 4, 22, 0, 0));
        let reset_friday_morning = Some(local(2024, 1, 5, 9, 0, 0));

        // Before 21:00 the most recent boundary is Thursday's; both stamps
        // are on its new side.
        assert!(!should_reset(ScheduleKind::Daily, reset_thursday_night, before_boundary));
        assert!(!should_reset(ScheduleKind::Daily, reset_friday_morning, before_boundary));

        // After 21:00 Friday's boundary has passed and both are stale.
        assert!(should_reset(ScheduleKind::Daily, reset_thursday_night, after_boundary));
        assert!(should_reset(ScheduleKind::Daily, reset_friday_morning, after_boundary));

        let reset_friday_night = Some(local(2024, 1, 5, 21, 5, 0));
        assert!(!should_reset(ScheduleKind::Daily, reset_friday_night, after_boundary));
    }

    #[test]
    fn test_daily_reset_due_when_stale_across_days() {
        let now = local(2024, 1, 10, 12, 0, 0);
        let two_days_stale = Some(local(2024, 1, 8, 12, 0, 0));
        assert!(should_reset(ScheduleKind::Daily, two_days_stale, now));
    }

    #[test]
    fn test_weekly_reset_follows_monday_boundary() {
        // Boundary under test: Monday Jan 8, 04:30 local.
        let last_week = Some(local(2024, 1, 3, 12, 0, 0));
        let this_week = Some(local(2024, 1, 8, 5, 0, 0));

        let wednesday = local(2024, 1, 10, 12, 0, 0);
        assert!(should_reset(ScheduleKind::Weekly, last_week, wednesday));
        assert!(!should_reset(ScheduleKind::Weekly, this_week, wednesday));

        // Exactly on the boundary the new week has started.
        let on_boundary = local(2024, 1, 8, 4, 30, 0);
        assert!(should_reset(ScheduleKind::Weekly, last_week, on_boundary));
    }

    fn daily_board_with_task() -> TaskBoard {
        let mut board = TaskBoard::new();
        board.add_task("dailies", "water the plants", local(2024, 1, 1, 10, 0, 0));
        board
    }

    #[test]
    fn test_reconcile_clears_stale_completion() {
        let mut board = daily_board_with_task();
        let monday_noon = local(2024, 1, 8, 12, 0, 0);
        board.toggle_task("dailies", TaskId::new(1), monday_noon);
        let board = reconcile_board(&board, monday_noon);

        // Past the evening boundary the completion belongs to a previous
        // period and the flag clears.
        let monday_night = local(2024, 1, 8, 21, 30, 0);
        let reconciled = reconcile_board(&board, monday_night);
        let task = &reconciled.category("dailies").unwrap().tasks[0];
        assert!(!task.completed);
        assert_eq!(task.completion_history.len(), 1);
        assert_eq!(
            reconciled.category("dailies").unwrap().last_reset_time,
            Some(monday_night)
        );
    }

    #[test]
    fn test_reconcile_keeps_completion_for_the_new_period() {
        let mut board = daily_board_with_task();
        // 21:40 belongs to Tuesday's game-day; a poll at 21:45 crosses the
        // boundary but must not uncheck it.
        let after_boundary = local(2024, 1, 8, 21, 40, 0);
        board.toggle_task("dailies", TaskId::new(1), after_boundary);

        let poll = local(2024, 1, 8, 21, 45, 0);
        let reconciled = reconcile_board(&board, poll);
        assert!(reconciled.category("dailies").unwrap().tasks[0].completed);
    }

    #[test]
    fn test_reconcile_is_idempotent_per_period() {
        let mut board = daily_board_with_task();
        let noon = local(2024, 1, 8, 12, 0, 0);
        board.toggle_task("dailies", TaskId::new(1), noon);

        let first = reconcile_board(&board, noon);
        let again = reconcile_board(&first, noon);
        let later_same_period = reconcile_board(&first, local(2024, 1, 8, 13, 0, 0));

        let stamp = first.category("dailies").unwrap().last_reset_time;
        assert_eq!(again.category("dailies").unwrap().last_reset_time, stamp);
        assert_eq!(
            later_same_period.category("dailies").unwrap().last_reset_time,
            stamp
        );
        assert!(later_same_period.category("dailies").unwrap().tasks[0].completed);
    }

    #[test]
    fn test_offline_gap_catches_up_in_one_pass() {
        let mut board = daily_board_with_task();
        let tuesday_noon = local(2024, 1, 2, 12, 0, 0);
        board.toggle_task("dailies", TaskId::new(1), tuesday_noon);
        let mut board = reconcile_board(&board, tuesday_noon);

        // The process slept for two local days; one pass must both advance
        // the stamp and re-derive the flag from history.
        let thursday_noon = local(2024, 1, 4, 12, 0, 0);
        board = reconcile_board(&board, thursday_noon);
        let category = board.category("dailies").unwrap();
        assert_eq!(category.last_reset_time, Some(thursday_noon));
        assert!(!category.tasks[0].completed);
        // History survives the gap untouched.
        assert_eq!(category.tasks[0].completion_history.len(), 1);
    }

    #[test]
    fn test_due_categories_reports_fresh_board_in_display_order() {
        let board = TaskBoard::new();
        let now = local(2024, 1, 10, 12, 0, 0);
        // `goals` never resets; the other three are due on first check.
        assert_eq!(due_categories(&board, now), vec!["weeklies", "dailies", "practice"]);

        let reconciled = reconcile_board(&board, now);
        assert!(due_categories(&reconciled, now).is_empty());
    }
}
