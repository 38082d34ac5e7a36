use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{calendar::PeriodId, constants::DEFAULT_CATEGORIES, ledger};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Daily,
    Weekly,
    None,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn new(id: u64) -> Self {
        TaskId(id)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    /// Transient: meaningful only until the category's next reset, when it is
    /// re-derived from `completion_history`.
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub last_completed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_history: Vec<PeriodId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub title: String,
    pub description: String,
    #[serde(rename = "resetType")]
    pub kind: ScheduleKind,
    pub last_reset_time: Option<DateTime<Utc>>,
    pub tasks: Vec<Task>,
}

/// The category map and every task mutation. Serializes transparently so the
/// persisted blob is exactly `{ categoryKey: { ... } }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskBoard {
    pub categories: BTreeMap<String, Category>,
}

impl TaskBoard {
    /// The fixed default board: categories exist from first run and are not
    /// user-creatable.
    pub fn new() -> Self {
        let categories = DEFAULT_CATEGORIES
            .iter()
            .map(|defaults| {
                (
                    defaults.key.to_string(),
                    Category {
                        title: defaults.title.to_string(),
                        description: defaults.description.to_string(),
                        kind: defaults.kind,
                        last_reset_time: None,
                        tasks: Vec::new(),
                    },
                )
            })
            .collect();
        TaskBoard { categories }
    }

    /// Category keys in display order: the default definitions first, then
    /// anything else the state file carried, alphabetically.
    pub fn ordered_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = DEFAULT_CATEGORIES
            .iter()
            .filter(|defaults| self.categories.contains_key(defaults.key))
            .map(|defaults| defaults.key)
            .collect();
        for key in self.categories.keys() {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
        keys
    }

    pub fn category(&self, key: &str) -> Option<&Category> {
        self.categories.get(key)
    }

    /// Resolve a category by key or exact title.
    pub fn resolve_category_key(&self, name: &str) -> Option<String> {
        if self.categories.contains_key(name) {
            return Some(name.to_string());
        }
        self.categories
            .iter()
            .find(|(_, category)| category.title == name)
            .map(|(key, _)| key.clone())
    }

    /// Resolve a task by ID or exact text within a category.
    pub fn find_task_id(&self, key: &str, needle: &str) -> Option<TaskId> {
        let category = self.categories.get(key)?;
        category
            .tasks
            .iter()
            .find(|task| task.text == needle || task.id.0.to_string() == needle)
            .map(|task| task.id)
    }

    /// Flip a task's completion at `now`, routing the durable history through
    /// the ledger. Un-completing keeps the last-completed stamp.
    pub fn toggle_task(&mut self, key: &str, task_id: TaskId, now: DateTime<Utc>) -> Option<&Task> {
        let category = self.categories.get_mut(key)?;
        let kind = category.kind;
        let task = category.tasks.iter_mut().find(|task| task.id == task_id)?;

        let is_completing = !task.completed;
        task.completion_history =
            ledger::toggle(&task.completion_history, now, kind, is_completing);
        task.completed = is_completing;
        if is_completing {
            task.last_completed = Some(now);
        }
        Some(task)
    }

    pub fn add_task(&mut self, key: &str, text: &str, now: DateTime<Utc>) -> Option<&Task> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let category = self.categories.get_mut(key)?;
        let next_id = category
            .tasks
            .iter()
            .map(|task| task.id.0)
            .max()
            .map_or(1, |max| max + 1);

        category.tasks.push(Task {
            id: TaskId::new(next_id),
            text: text.to_string(),
            completed: false,
            created_at: now,
            last_completed: None,
            completion_history: Vec::new(),
        });
        category.tasks.last()
    }

    pub fn remove_task(&mut self, key: &str, task_id: TaskId) -> bool {
        let Some(category) = self.categories.get_mut(key) else {
            return false;
        };
        let before = category.tasks.len();
        category.tasks.retain(|task| task.id != task_id);
        category.tasks.len() < before
    }

    pub fn edit_task(&mut self, key: &str, task_id: TaskId, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let Some(category) = self.categories.get_mut(key) else {
            return false;
        };
        let Some(task) = category.tasks.iter_mut().find(|task| task.id == task_id) else {
            return false;
        };
        task.text = text.to_string();
        true
    }

    /// Reorder within a category: remove at `from`, reinsert at `to`.
    pub fn move_task(&mut self, key: &str, from: usize, to: usize) -> bool {
        let Some(category) = self.categories.get_mut(key) else {
            return false;
        };
        if from >= category.tasks.len() || to >= category.tasks.len() {
            return false;
        }
        let task = category.tasks.remove(from);
        category.tasks.insert(to, task);
        true
    }

    /// Operator maintenance action: erase all completion data everywhere.
    pub fn clear_completions(&mut self) {
        for category in self.categories.values_mut() {
            for task in &mut category.tasks {
                task.completed = false;
                task.last_completed = None;
                task.completion_history.clear();
            }
        }
    }
}
