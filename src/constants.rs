use chrono::Weekday;

use crate::domain::ScheduleKind;

pub const SCHEDULE: ScheduleSettings = ScheduleSettings {
    utc_offset_minutes: -180,
    daily_reset_hour: 21,
    weekly_reset_weekday: Weekday::Mon,
    weekly_reset_hour: 4,
    weekly_reset_minute: 30,
    poll_interval_secs: 60,
};

pub const STREAK_SETTINGS: StreakSettings = StreakSettings { weeks_window: 8 };

pub const STATE_FILES: StateFiles = StateFiles {
    board: "cadence.json",
    clock: "clock_override.json",
};

pub const MAX_BACKUPS: usize = 10;

pub const DEFAULT_CATEGORIES: [CategoryDefaults; 4] = [
    CategoryDefaults {
        key: "weeklies",
        title: "Weekly Objectives",
        description: "Resets Mondays at 04:30 UTC-3",
        kind: ScheduleKind::Weekly,
    },
    CategoryDefaults {
        key: "dailies",
        title: "Daily Objectives",
        description: "Resets daily at 21:00 UTC-3",
        kind: ScheduleKind::Daily,
    },
    CategoryDefaults {
        key: "practice",
        title: "Practice Dailies",
        description: "Resets daily at 21:00 UTC-3",
        kind: ScheduleKind::Daily,
    },
    CategoryDefaults {
        key: "goals",
        title: "Long-term Goals",
        description: "No reset, permanent progress",
        kind: ScheduleKind::None,
    },
];

pub struct ScheduleSettings {
    pub utc_offset_minutes: i32,
    pub daily_reset_hour: u32,
    pub weekly_reset_weekday: Weekday,
    pub weekly_reset_hour: u32,
    pub weekly_reset_minute: u32,
    pub poll_interval_secs: u64,
}

pub struct StreakSettings {
    pub weeks_window: usize,
}

pub struct StateFiles {
    pub board: &'static str,
    pub clock: &'static str,
}

pub struct CategoryDefaults {
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub kind: ScheduleKind,
}
