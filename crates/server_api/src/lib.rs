use std::collections::HashMap;

use shared::{
    domain::{TaskCounts, TaskPatch, View},
    error::{ApiError, ErrorCode},
    protocol::{ActionAck, Intent, TaskList, INTENT_FIELD},
};
use storage::{Storage, StoreError};
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

impl ApiContext {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

/// Reads the whole list and projects it through `view`. Counts always cover
/// every task so the footer stays accurate under a filter.
pub async fn load_tasks(ctx: &ApiContext, view: View) -> Result<TaskList, ApiError> {
    let tasks = ctx.storage.read_tasks().await.map_err(store_error)?;
    let counts = TaskCounts::from_tasks(&tasks);
    Ok(TaskList {
        view: View::All,
        tasks,
        counts,
    }
    .filtered(view))
}

pub async fn dispatch_form(
    ctx: &ApiContext,
    fields: &HashMap<String, String>,
) -> Result<ActionAck, ApiError> {
    let intent = Intent::from_fields(fields).inspect_err(|err| {
        warn!(
            intent = fields.get(INTENT_FIELD).map(String::as_str).unwrap_or_default(),
            code = ?err.code,
            message = %err.message,
            "rejected form submission"
        );
    })?;
    apply_intent(ctx, intent).await
}

pub async fn apply_intent(ctx: &ApiContext, intent: Intent) -> Result<ActionAck, ApiError> {
    let tag = intent.tag();
    let task_id = intent.task_id();
    debug!(intent = tag, ?task_id, "applying intent");

    let result = match intent {
        Intent::CreateTask { description } => ctx
            .storage
            .create_task(&description)
            .await
            .map(|task| info!(intent = tag, task_id = %task.id, "task created")),
        Intent::ToggleCompletion { id, completed } => ctx
            .storage
            .update_task(id, &TaskPatch::completed(!completed))
            .await
            .map(|task| info!(intent = tag, task_id = %id, completed = task.completed, "task toggled")),
        Intent::EditTask { id } => ctx
            .storage
            .update_task(id, &TaskPatch::editing(true))
            .await
            .map(|_| info!(intent = tag, task_id = %id, "task editing")),
        Intent::SaveTask { id, description } => ctx
            .storage
            .update_task(id, &TaskPatch::save_description(description))
            .await
            .map(|_| info!(intent = tag, task_id = %id, "task saved")),
        Intent::DeleteTask { id } => ctx
            .storage
            .delete_task(id)
            .await
            .map(|()| info!(intent = tag, task_id = %id, "task deleted")),
        Intent::ClearCompleted => ctx
            .storage
            .clear_completed()
            .await
            .map(|removed| info!(intent = tag, removed, "completed tasks cleared")),
        Intent::DeleteAll => ctx
            .storage
            .delete_all()
            .await
            .map(|removed| info!(intent = tag, removed, "all tasks deleted")),
    };

    result.map(|()| ActionAck::ok()).map_err(|err| {
        let err = store_error(err);
        if err.is_client_error() {
            warn!(intent = tag, ?task_id, code = ?err.code, message = %err.message, "intent rejected");
        } else {
            error!(intent = tag, ?task_id, message = %err.message, "intent failed");
        }
        err
    })
}

fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::Validation(message) => ApiError::new(ErrorCode::Validation, message),
        StoreError::NotFound(task_id) => {
            ApiError::new(ErrorCode::NotFound, format!("task {task_id} not found"))
        }
        StoreError::Database(err) => ApiError::new(ErrorCode::Internal, err.to_string()),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
