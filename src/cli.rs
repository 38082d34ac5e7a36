use std::{collections::BTreeMap, io, path::PathBuf, thread, time::Duration as StdDuration};

use chrono::{DateTime, Datelike, Utc};
use clap::{CommandFactory, Parser, ValueEnum};
use serde::Serialize;

use crate::{
    calendar::{self, game_offset},
    clock::Clock,
    constants::{SCHEDULE, STREAK_SETTINGS},
    domain::{Category, ScheduleKind, Task, TaskBoard, TaskId},
    reset, storage, streak,
};

#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(about = "Recurring task tracker with scheduled resets", long_about = None)]
pub enum Cli {
    #[command(about = "Show all categories and their tasks")]
    List,

    #[command(about = "Toggle a task's completion")]
    Toggle {
        #[arg(help = "Category key or title")]
        category: String,

        #[arg(help = "Task ID or exact text")]
        task: String,
    },

    #[command(about = "Add a task to a category")]
    Add {
        #[arg(help = "Category key or title")]
        category: String,

        #[arg(help = "Task text")]
        text: String,
    },

    #[command(about = "Remove a task")]
    Remove {
        #[arg(help = "Category key or title")]
        category: String,

        #[arg(help = "Task ID or exact text")]
        task: String,
    },

    #[command(about = "Rewrite a task's text")]
    Edit {
        #[arg(help = "Category key or title")]
        category: String,

        #[arg(help = "Task ID or exact text")]
        task: String,

        #[arg(help = "New task text")]
        text: String,
    },

    #[command(about = "Move a task to another position in its category")]
    Move {
        #[arg(help = "Category key or title")]
        category: String,

        #[arg(help = "Current position (1-based)")]
        from: usize,

        #[arg(help = "Target position (1-based)")]
        to: usize,
    },

    #[command(about = "Show a task's completion streak")]
    Streak {
        #[arg(help = "Category key or title")]
        category: String,

        #[arg(help = "Task ID or exact text")]
        task: String,
    },

    #[command(about = "Show a task's habit history")]
    History {
        #[arg(help = "Category key or title")]
        category: String,

        #[arg(help = "Task ID or exact text")]
        task: String,
    },

    #[command(about = "Run a reset reconciliation pass")]
    Check {
        #[arg(long, help = "Keep checking once per minute")]
        watch: bool,
    },

    #[command(about = "Inspect or change the clock override")]
    Clock {
        #[arg(long, help = "Freeze the clock at an RFC 3339 instant")]
        set: Option<String>,

        #[arg(long, help = "Return to the wall clock", conflicts_with = "set")]
        real: bool,
    },

    #[command(about = "Erase all completion data")]
    WipeCompletions,

    #[command(about = "Export tracked data")]
    Export {
        #[arg(long, value_enum, help = "Export format")]
        format: ExportFormat,

        #[arg(long, short, help = "Output path")]
        out: Option<PathBuf>,
    },

    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(help = "Shell type (bash, zsh, fish)")]
        shell: String,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    pub schema_version: u32,
    pub exported_at: DateTime<Utc>,
    pub categories: BTreeMap<String, Category>,
}

/// Load persisted state and run one reconciliation pass against it, so every
/// command observes reset-correct completion flags.
fn load_reconciled() -> (Clock, TaskBoard) {
    let clock = storage::load_clock(&storage::get_clock_path());
    let board = storage::load_board(&storage::get_board_path());
    let board = reset::reconcile_board(&board, clock.now());
    (clock, board)
}

fn persist(board: &TaskBoard) -> Result<(), String> {
    storage::save_board(&storage::get_board_path(), board)
}

fn resolve_task(board: &TaskBoard, category: &str, task: &str) -> Result<(String, TaskId), String> {
    let key = board
        .resolve_category_key(category)
        .ok_or_else(|| format!("Category '{}' not found", category))?;
    let task_id = board
        .find_task_id(&key, task)
        .ok_or_else(|| format!("Task '{}' not found in '{}'", task, key))?;
    Ok((key, task_id))
}

pub fn list() -> Result<(), String> {
    let (clock, board) = load_reconciled();
    persist(&board)?;
    let now = clock.now();

    for key in board.ordered_keys() {
        let Some(category) = board.category(key) else {
            continue;
        };

        println!("{} ({})", category.title, key);
        match calendar::next_reset(category.kind, now) {
            Some(boundary) => println!("  {} | resets in {}", category.description, format_countdown(boundary - now)),
            None => println!("  {}", category.description),
        }

        if category.tasks.is_empty() {
            println!("  (no tasks)");
        }
        for task in &category.tasks {
            let mark = if task.completed { "x" } else { " " };
            let last_done = match task.last_completed {
                Some(at) => format!("  (last done {})", format_relative(at, now)),
                None => String::new(),
            };
            println!("  [{}] {:>3}  {}{}", mark, task.id.0, task.text, last_done);
        }

        let done = category.tasks.iter().filter(|task| task.completed).count();
        if !category.tasks.is_empty() {
            println!("  {}/{} done", done, category.tasks.len());
        }
        println!();
    }

    Ok(())
}

pub fn toggle(category: String, task: String) -> Result<(), String> {
    let (clock, mut board) = load_reconciled();
    let now = clock.now();
    let (key, task_id) = resolve_task(&board, &category, &task)?;

    let kind = board.category(&key).map(|c| c.kind);
    let task = board
        .toggle_task(&key, task_id, now)
        .ok_or_else(|| format!("Task '{}' not found in '{}'", task, key))?;

    let verb = if task.completed { "Completed" } else { "Unchecked" };
    let note = match kind {
        Some(ScheduleKind::Daily) if task.completed => {
            let count = streak::daily_streak(&task.completion_history, now, task.created_at);
            format!(" (streak: {})", format_count(count, "day"))
        }
        Some(ScheduleKind::Weekly) if task.completed => {
            let weeks = streak::recent_weeks(&task.completion_history, now, STREAK_SETTINGS.weeks_window);
            let count = streak::weekly_streak(&task.completion_history, &weeks);
            format!(" (streak: {})", format_count(count, "week"))
        }
        _ => String::new(),
    };
    println!("{} '{}'{}", verb, task.text, note);

    persist(&board)
}

pub fn add(category: String, text: String) -> Result<(), String> {
    let (clock, mut board) = load_reconciled();
    let now = clock.now();
    let key = board
        .resolve_category_key(&category)
        .ok_or_else(|| format!("Category '{}' not found", category))?;

    let task = board
        .add_task(&key, &text, now)
        .ok_or_else(|| "Task text must not be empty".to_string())?;
    println!("Added '{}' to '{}' (ID {})", task.text, key, task.id.0);

    persist(&board)
}

pub fn remove(category: String, task: String) -> Result<(), String> {
    let (_, mut board) = load_reconciled();
    let (key, task_id) = resolve_task(&board, &category, &task)?;

    board.remove_task(&key, task_id);
    println!("Removed task {} from '{}'", task_id.0, key);

    persist(&board)
}

pub fn edit(category: String, task: String, text: String) -> Result<(), String> {
    let (_, mut board) = load_reconciled();
    let (key, task_id) = resolve_task(&board, &category, &task)?;

    if !board.edit_task(&key, task_id, &text) {
        return Err("Task text must not be empty".to_string());
    }
    println!("Updated task {}", task_id.0);

    persist(&board)
}

pub fn move_task(category: String, from: usize, to: usize) -> Result<(), String> {
    let (_, mut board) = load_reconciled();
    let key = board
        .resolve_category_key(&category)
        .ok_or_else(|| format!("Category '{}' not found", category))?;

    let (Some(from), Some(to)) = (from.checked_sub(1), to.checked_sub(1)) else {
        return Err("Positions are 1-based".to_string());
    };
    if !board.move_task(&key, from, to) {
        return Err(format!("No task at that position in '{}'", key));
    }
    println!("Moved task to position {}", to + 1);

    persist(&board)
}

fn task_in<'a>(board: &'a TaskBoard, key: &str, task_id: TaskId) -> Option<(&'a Category, &'a Task)> {
    let category = board.category(key)?;
    let task = category.tasks.iter().find(|task| task.id == task_id)?;
    Some((category, task))
}

pub fn show_streak(category: String, task: String) -> Result<(), String> {
    let (clock, board) = load_reconciled();
    persist(&board)?;
    let now = clock.now();
    let (key, task_id) = resolve_task(&board, &category, &task)?;
    let (category, task) = task_in(&board, &key, task_id)
        .ok_or_else(|| format!("Task '{}' not found in '{}'", task, key))?;

    match category.kind {
        ScheduleKind::Daily => {
            let count = streak::daily_streak(&task.completion_history, now, task.created_at);
            println!("'{}' streak: {}", task.text, format_count(count, "day"));
        }
        ScheduleKind::Weekly => {
            let weeks = streak::recent_weeks(&task.completion_history, now, STREAK_SETTINGS.weeks_window);
            let count = streak::weekly_streak(&task.completion_history, &weeks);
            println!("'{}' streak: {}", task.text, format_count(count, "week"));
        }
        ScheduleKind::None => {
            println!("'{}' has no schedule; streaks do not apply", task.text);
        }
    }
    Ok(())
}

pub fn show_history(category: String, task: String) -> Result<(), String> {
    let (clock, board) = load_reconciled();
    persist(&board)?;
    let now = clock.now();
    let (key, task_id) = resolve_task(&board, &category, &task)?;
    let (category, task) = task_in(&board, &key, task_id)
        .ok_or_else(|| format!("Task '{}' not found in '{}'", task, key))?;

    match category.kind {
        ScheduleKind::Daily => print_daily_history(task, now),
        ScheduleKind::Weekly => print_weekly_history(task, now),
        ScheduleKind::None => {
            println!("'{}' has no schedule; no habit history to show", task.text);
        }
    }
    Ok(())
}

fn print_daily_history(task: &Task, now: DateTime<Utc>) {
    let history = &task.completion_history;
    let local_now = now.with_timezone(&game_offset());

    let strip: String = streak::last_week_days(history, now)
        .iter()
        .map(|cell| if cell.completed { " x" } else { " ." })
        .collect();
    println!("{}", task.text);
    println!("Last 7 days:{}", strip);
    println!();

    println!("{}", local_now.format("%B %Y"));
    println!("  Mo  Tu  We  Th  Fr  Sa  Su");

    let days = streak::month_days(history, now);
    let mut row = String::new();
    let leading = days[0].date.weekday().num_days_from_monday() as usize;
    for _ in 0..leading {
        row.push_str("    ");
    }
    for cell in &days {
        let mark = if cell.is_future {
            ' '
        } else if cell.completed {
            'x'
        } else {
            '.'
        };
        let today = if cell.is_today { '>' } else { ' ' };
        row.push_str(&format!("{}{:>2}{}", today, cell.date.day(), mark));
        if cell.date.weekday().num_days_from_monday() == 6 {
            println!("{}", row);
            row.clear();
        }
    }
    if !row.is_empty() {
        println!("{}", row);
    }

    let count = streak::daily_streak(history, now, task.created_at);
    println!();
    println!("Total: {}   Streak: {}", history.len(), format_count(count, "day"));
}

fn print_weekly_history(task: &Task, now: DateTime<Utc>) {
    let history = &task.completion_history;
    let weeks = streak::recent_weeks(history, now, STREAK_SETTINGS.weeks_window);

    println!("{}", task.text);
    for week in &weeks {
        let marker = if week.is_current { ">" } else { " " };
        let status = if week.completed { "done" } else { "-" };
        println!("{} {:16} {}", marker, week.label, status);
    }

    let count = streak::weekly_streak(history, &weeks);
    let completed_weeks = weeks.iter().filter(|week| week.completed).count();
    println!();
    println!(
        "Completed: {}/{}   Streak: {}",
        completed_weeks,
        weeks.len(),
        format_count(count, "week")
    );
}

pub fn check(watch: bool) -> Result<(), String> {
    if watch {
        println!(
            "Watching for resets (every {}s, Ctrl-C to stop)",
            SCHEDULE.poll_interval_secs
        );
    }

    loop {
        // Reload both files each pass so an override set from another
        // invocation is picked up mid-watch.
        let clock = storage::load_clock(&storage::get_clock_path());
        let board = storage::load_board(&storage::get_board_path());
        let now = clock.now();

        let due = reset::due_categories(&board, now);
        let board = reset::reconcile_board(&board, now);
        persist(&board)?;

        for key in &due {
            if let Some(category) = board.category(key) {
                println!("Reset '{}'", category.title);
            }
        }
        if !watch {
            if due.is_empty() {
                println!("No resets due");
            }
            return Ok(());
        }

        thread::sleep(StdDuration::from_secs(SCHEDULE.poll_interval_secs));
    }
}

pub fn clock_command(set: Option<String>, real: bool) -> Result<(), String> {
    let clock_path = storage::get_clock_path();
    let mut clock = storage::load_clock(&clock_path);

    if let Some(value) = set {
        let instant = calendar::parse_instant(&value).map_err(|e| e.to_string())?;
        clock.set_override(instant);
        storage::save_clock(&clock_path, &clock)?;
        reconcile_now(&clock)?;
        println!("Clock frozen at {}", instant.to_rfc3339());
        return Ok(());
    }

    if real {
        clock.clear_override();
        storage::save_clock(&clock_path, &clock)?;
        reconcile_now(&clock)?;
        println!("Clock returned to the wall clock");
        return Ok(());
    }

    let now = clock.now();
    if clock.use_override {
        println!("Clock: frozen at {}", clock.override_time.to_rfc3339());
    } else {
        println!("Clock: wall clock");
    }
    println!("Now (UTC-3): {}", now.with_timezone(&game_offset()).format("%Y-%m-%d %H:%M:%S"));
    println!("Game day: {}", calendar::game_day_of(now).local_date());
    if let Some(boundary) = calendar::next_reset(ScheduleKind::Daily, now) {
        println!("Next daily reset in {}", format_countdown(boundary - now));
    }
    if let Some(boundary) = calendar::next_reset(ScheduleKind::Weekly, now) {
        println!("Next weekly reset in {}", format_countdown(boundary - now));
    }
    Ok(())
}

/// An override change invalidates every transient `completed` flag; run a
/// pass immediately rather than waiting for the next poll.
fn reconcile_now(clock: &Clock) -> Result<(), String> {
    let board = storage::load_board(&storage::get_board_path());
    let board = reset::reconcile_board(&board, clock.now());
    persist(&board)
}

pub fn wipe_completions() -> Result<(), String> {
    let (_, mut board) = load_reconciled();
    board.clear_completions();
    let task_count: usize = board
        .categories
        .values()
        .map(|category| category.tasks.len())
        .sum();
    println!("Cleared completion data for {} tasks", task_count);
    persist(&board)
}

pub fn export_data(format: ExportFormat, out_path: Option<PathBuf>) -> Result<(), String> {
    let (clock, board) = load_reconciled();
    persist(&board)?;

    match format {
        ExportFormat::Json => {
            let export = DataExport {
                schema_version: 1,
                exported_at: clock.now(),
                categories: board.categories.clone(),
            };
            let json = serde_json::to_string_pretty(&export).map_err(|e| e.to_string())?;
            if let Some(path) = out_path {
                storage::write_text_file(&path, &json)?;
                println!("Exported to {}", path.display());
            } else {
                println!("{}", json);
            }
        }
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer
                .write_record(["category", "task_id", "task", "period"])
                .map_err(|e| e.to_string())?;
            for key in board.ordered_keys() {
                let Some(category) = board.category(key) else {
                    continue;
                };
                for task in &category.tasks {
                    let id = task.id.0.to_string();
                    for entry in &task.completion_history {
                        let period = entry.to_string();
                        writer
                            .write_record([key, id.as_str(), task.text.as_str(), period.as_str()])
                            .map_err(|e| e.to_string())?;
                    }
                }
            }
            let bytes = writer.into_inner().map_err(|e| e.to_string())?;
            let data = String::from_utf8(bytes).map_err(|e| e.to_string())?;
            if let Some(path) = out_path {
                storage::write_text_file(&path, &data)?;
                println!("Exported to {}", path.display());
            } else {
                print!("{}", data);
            }
        }
    }

    Ok(())
}

pub fn print_completions(shell: &str) -> Result<(), String> {
    use clap_complete::Shell;
    match shell {
        "bash" => {
            clap_complete::generate(
                Shell::Bash,
                &mut Cli::command(),
                "cadence",
                &mut io::stdout(),
            );
        }
        "zsh" => {
            clap_complete::generate(Shell::Zsh, &mut Cli::command(), "cadence", &mut io::stdout());
        }
        "fish" => {
            clap_complete::generate(
                Shell::Fish,
                &mut Cli::command(),
                "cadence",
                &mut io::stdout(),
            );
        }
        _ => {
            return Err(format!(
                "Unsupported shell: {}. Use bash, zsh, or fish.",
                shell
            ));
        }
    }
    Ok(())
}

fn format_countdown(until: chrono::Duration) -> String {
    let minutes = until.num_minutes().max(0);
    let days = minutes / (24 * 60);
    let hours = (minutes % (24 * 60)) / 60;
    let minutes = minutes % 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

fn format_relative(instant: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - instant;
    let relative = if elapsed.num_minutes() < 1 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        format!("{}d ago", elapsed.num_days())
    };

    let absolute = instant.with_timezone(&game_offset()).format("%b %-d, %H:%M");
    format!("{} ({})", relative, absolute)
}

fn format_count(count: usize, unit: &str) -> String {
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

pub fn run_cli() {
    let cli = Cli::parse();
    let result = match cli {
        Cli::List => list(),
        Cli::Toggle { category, task } => toggle(category, task),
        Cli::Add { category, text } => add(category, text),
        Cli::Remove { category, task } => remove(category, task),
        Cli::Edit {
            category,
            task,
            text,
        } => edit(category, task, text),
        Cli::Move { category, from, to } => move_task(category, from, to),
        Cli::Streak { category, task } => show_streak(category, task),
        Cli::History { category, task } => show_history(category, task),
        Cli::Check { watch } => check(watch),
        Cli::Clock { set, real } => clock_command(set, real),
        Cli::WipeCompletions => wipe_completions(),
        Cli::Export { format, out } => export_data(format, out),
        Cli::Completions { shell } => print_completions(&shell),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(chrono::Duration::minutes(95)), "1h 35m");
        assert_eq!(
            format_countdown(chrono::Duration::minutes(2 * 24 * 60 + 61)),
            "2d 1h 1m"
        );
        assert_eq!(format_countdown(chrono::Duration::seconds(-5)), "0h 0m");
    }

    #[test]
    fn test_format_relative() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 15, 0, 0).unwrap();
        let stamp = |secs| now - chrono::Duration::seconds(secs);

        assert!(format_relative(stamp(30), now).starts_with("just now"));
        assert!(format_relative(stamp(5 * 60), now).starts_with("5m ago"));
        assert!(format_relative(stamp(3 * 3600), now).starts_with("3h ago"));
        assert!(format_relative(stamp(50 * 3600), now).starts_with("2d ago"));
        // Absolute part is rendered at the UTC-3 offset.
        assert_eq!(format_relative(stamp(0), now), "just now (Jan 5, 12:00)");
    }
}
