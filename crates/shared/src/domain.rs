use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(TaskId);

pub const MAX_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub editing: bool,
    pub created_at: DateTime<Utc>,
}

/// Partial update for a [`Task`]. `completed_at` is never set directly; it
/// follows the `completed` transition in [`Task::apply_patch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editing: Option<bool>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn editing(editing: bool) -> Self {
        Self {
            editing: Some(editing),
            ..Self::default()
        }
    }

    pub fn save_description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            editing: Some(false),
            ..Self::default()
        }
    }
}

impl Task {
    /// Merges `patch` into the record, keeping `completed_at` present exactly
    /// when `completed` is true. A repeated completion keeps the first stamp.
    pub fn apply_patch(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(editing) = patch.editing {
            self.editing = editing;
        }
        if let Some(completed) = patch.completed {
            self.completed_at = match (self.completed, completed) {
                (false, true) => Some(now),
                (true, true) => self.completed_at.or(Some(now)),
                (_, false) => None,
            };
            self.completed = completed;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub total: u64,
    pub active: u64,
    pub completed: u64,
}

impl TaskCounts {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|task| task.completed).count() as u64;
        let total = tasks.len() as u64;
        Self {
            total,
            active: total - completed,
            completed,
        }
    }
}

/// List filter carried in the `view` query parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    All,
    Active,
    Completed,
}

impl View {
    pub const ALL: [View; 3] = [View::All, View::Active, View::Completed];

    /// Unknown or missing values fall back to [`View::All`].
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("active") => View::Active,
            Some("completed") => View::Completed,
            _ => View::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            View::All => "all",
            View::Active => "active",
            View::Completed => "completed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            View::All => "All",
            View::Active => "Active",
            View::Completed => "Completed",
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            View::All => true,
            View::Active => !task.completed,
            View::Completed => task.completed,
        }
    }

    pub fn apply(self, tasks: &[Task]) -> Vec<&Task> {
        tasks.iter().filter(|task| self.matches(task)).collect()
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Light, Theme::Dark, Theme::System];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "system" => Some(Theme::System),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
