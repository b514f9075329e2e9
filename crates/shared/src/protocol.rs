use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    domain::{Task, TaskCounts, TaskId, View},
    error::ApiError,
};

pub const INTENT_FIELD: &str = "intent";

/// One form mutation. Each submitted form carries exactly one `intent` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    CreateTask { description: String },
    /// `completed` is the state the task had when the form was rendered;
    /// applying the intent flips it.
    ToggleCompletion { id: TaskId, completed: bool },
    EditTask { id: TaskId },
    SaveTask { id: TaskId, description: String },
    DeleteTask { id: TaskId },
    ClearCompleted,
    DeleteAll,
}

impl Intent {
    pub const CREATE_TASK: &'static str = "create task";
    pub const TOGGLE_COMPLETION: &'static str = "toggle completion";
    pub const EDIT_TASK: &'static str = "edit task";
    pub const SAVE_TASK: &'static str = "save task";
    pub const DELETE_TASK: &'static str = "delete task";
    pub const CLEAR_COMPLETED: &'static str = "clear completed";
    pub const DELETE_ALL: &'static str = "delete all";

    pub fn tag(&self) -> &'static str {
        match self {
            Intent::CreateTask { .. } => Self::CREATE_TASK,
            Intent::ToggleCompletion { .. } => Self::TOGGLE_COMPLETION,
            Intent::EditTask { .. } => Self::EDIT_TASK,
            Intent::SaveTask { .. } => Self::SAVE_TASK,
            Intent::DeleteTask { .. } => Self::DELETE_TASK,
            Intent::ClearCompleted => Self::CLEAR_COMPLETED,
            Intent::DeleteAll => Self::DELETE_ALL,
        }
    }

    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            Intent::ToggleCompletion { id, .. }
            | Intent::EditTask { id }
            | Intent::SaveTask { id, .. }
            | Intent::DeleteTask { id } => Some(*id),
            Intent::CreateTask { .. } | Intent::ClearCompleted | Intent::DeleteAll => None,
        }
    }

    /// Parses submitted form fields. A missing or unrecognised `intent`
    /// yields the unknown-intent error before any other field is inspected.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, ApiError> {
        let tag = fields
            .get(INTENT_FIELD)
            .map(|value| value.trim())
            .ok_or_else(ApiError::unknown_intent)?;

        match tag {
            Self::CREATE_TASK => Ok(Intent::CreateTask {
                description: required(fields, "description")?.to_string(),
            }),
            Self::TOGGLE_COMPLETION => Ok(Intent::ToggleCompletion {
                id: task_id(fields)?,
                completed: parse_bool(required(fields, "completed")?)?,
            }),
            Self::EDIT_TASK => Ok(Intent::EditTask {
                id: task_id(fields)?,
            }),
            Self::SAVE_TASK => Ok(Intent::SaveTask {
                id: task_id(fields)?,
                description: required(fields, "description")?.to_string(),
            }),
            Self::DELETE_TASK => Ok(Intent::DeleteTask {
                id: task_id(fields)?,
            }),
            Self::CLEAR_COMPLETED => Ok(Intent::ClearCompleted),
            Self::DELETE_ALL => Ok(Intent::DeleteAll),
            _ => Err(ApiError::unknown_intent()),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

fn required<'a>(fields: &'a HashMap<String, String>, name: &str) -> Result<&'a str, ApiError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| ApiError::validation(format!("missing field `{name}`")))
}

fn task_id(fields: &HashMap<String, String>) -> Result<TaskId, ApiError> {
    required(fields, "id")?
        .trim()
        .parse::<i64>()
        .map(TaskId)
        .map_err(|_| ApiError::validation("field `id` must be an integer"))
}

fn parse_bool(raw: &str) -> Result<bool, ApiError> {
    match raw.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ApiError::validation(
            "field `completed` must be `true` or `false`",
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionAck {
    pub ok: bool,
}

impl ActionAck {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskList {
    pub view: View,
    pub tasks: Vec<Task>,
    pub counts: TaskCounts,
}

impl TaskList {
    /// Keeps only the tasks matching `view`; counts still describe the full set.
    pub fn filtered(self, view: View) -> Self {
        let tasks = view.apply(&self.tasks).into_iter().cloned().collect();
        Self {
            view,
            tasks,
            counts: self.counts,
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
