use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    clock::Clock,
    constants::{MAX_BACKUPS, STATE_FILES},
    domain::TaskBoard,
};

pub fn get_data_dir() -> PathBuf {
    // A state file next to the binary wins, for portable setups.
    if Path::new(STATE_FILES.board).exists() {
        return PathBuf::from(".");
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "cadence", "cadence") {
        let data_dir = proj_dirs.data_dir().to_path_buf();
        fs::create_dir_all(&data_dir).ok();
        data_dir
    } else {
        PathBuf::from(".")
    }
}

fn get_state_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "cadence", "cadence") {
        if let Some(state_dir) = proj_dirs.state_dir() {
            let dir = state_dir.to_path_buf();
            fs::create_dir_all(&dir).ok();
            return dir;
        }
    }
    PathBuf::from(".")
}

pub fn get_board_path() -> PathBuf {
    get_data_dir().join(STATE_FILES.board)
}

pub fn get_clock_path() -> PathBuf {
    get_state_dir().join(STATE_FILES.clock)
}

/// Load the task board. A missing file is a fresh install and a damaged file
/// is never fatal: both fall back to the default board, the latter with a
/// warning on stderr.
pub fn load_board(path: &Path) -> TaskBoard {
    if !path.exists() {
        return TaskBoard::new();
    }

    match read_json::<TaskBoard>(path) {
        Ok(board) if !board.categories.is_empty() => board,
        Ok(_) => {
            eprintln!("Warning: task state file is empty, starting from defaults");
            TaskBoard::new()
        }
        Err(e) => {
            eprintln!("Warning: could not load task state ({}), starting from defaults", e);
            TaskBoard::new()
        }
    }
}

pub fn save_board(path: &Path, board: &TaskBoard) -> Result<(), String> {
    write_json_atomic(path, board, true)
}

/// Load the clock override. Absent or damaged both mean the wall clock.
pub fn load_clock(path: &Path) -> Clock {
    if !path.exists() {
        return Clock::system();
    }

    match read_json::<Clock>(path) {
        Ok(clock) => clock,
        Err(e) => {
            eprintln!("Warning: could not load clock override ({}), using the wall clock", e);
            Clock::system()
        }
    }
}

pub fn save_clock(path: &Path, clock: &Clock) -> Result<(), String> {
    // The override is disposable state; no backups.
    write_json_atomic(path, clock, false)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T, backup: bool) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    atomic_write(path, &json, backup)
}

pub fn write_text_file(path: &Path, content: &str) -> Result<(), String> {
    atomic_write(path, content, false)
}

fn atomic_write(path: &Path, content: &str, backup: bool) -> Result<(), String> {
    if backup && path.exists() {
        create_backup(path)?;
    }

    let tmp_path = path.with_extension("tmp");
    let mut tmp_file = File::create(&tmp_path).map_err(|e| e.to_string())?;
    tmp_file
        .write_all(content.as_bytes())
        .map_err(|e| e.to_string())?;
    tmp_file.sync_all().map_err(|e| e.to_string())?;
    fs::rename(&tmp_path, path).map_err(|e| e.to_string())?;
    Ok(())
}

/// Copy the current file into a `backups/` sibling before overwriting it,
/// pruning all but the most recent copies.
fn create_backup(path: &Path) -> Result<(), String> {
    let backup_dir = path.parent().unwrap_or(Path::new(".")).join("backups");
    fs::create_dir_all(&backup_dir).map_err(|e| e.to_string())?;

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!(
        "{}.{}",
        path.file_name().unwrap_or_default().to_string_lossy(),
        stamp
    );
    fs::copy(path, backup_dir.join(&filename)).map_err(|e| e.to_string())?;

    let stem = path.file_name().unwrap_or_default().to_string_lossy();
    if let Ok(entries) = fs::read_dir(&backup_dir) {
        let mut backups: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&*stem))
            .collect();
        backups.sort_by_key(|entry| entry.metadata().ok().and_then(|m| m.modified().ok()));

        while backups.len() > MAX_BACKUPS {
            let oldest = backups.remove(0);
            let _ = fs::remove_file(oldest.path());
        }
    }

    Ok(())
}
