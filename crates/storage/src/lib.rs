use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;

use shared::domain::{Task, TaskCounts, TaskId, TaskPatch, MAX_DESCRIPTION_CHARS};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// SQLite-backed task list. Cloning shares the pool.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

const TASK_COLUMNS: &str = "id, description, completed, completed_at, editing, created_at";

impl Storage {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to connect to '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run task migrations")?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> anyhow::Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn read_tasks(&self) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(task_from_row).collect())
    }

    pub async fn load_task(&self, task_id: TaskId) -> StoreResult<Option<Task>> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
            .bind(task_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(task_from_row))
    }

    pub async fn create_task(&self, description: &str) -> StoreResult<Task> {
        let description = normalize_description(description)?;
        let created_at = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO tasks (description, completed, completed_at, editing, created_at)
             VALUES (?, 0, NULL, 0, ?)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(&description)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(task_from_row(&row))
    }

    /// Applies `patch` to one task inside a transaction; nothing is written
    /// when the task is missing or the description is rejected.
    pub async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> StoreResult<Task> {
        let mut patch = patch.clone();
        if let Some(description) = patch.description.as_deref() {
            patch.description = Some(normalize_description(description)?);
        }

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
            .bind(task_id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(StoreError::NotFound(task_id));
        };

        let mut task = task_from_row(&row);
        task.apply_patch(patch, Utc::now());

        sqlx::query(
            "UPDATE tasks
             SET description = ?, completed = ?, completed_at = ?, editing = ?
             WHERE id = ?",
        )
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.completed_at)
        .bind(task.editing)
        .bind(task_id.0)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(task)
    }

    pub async fn delete_task(&self, task_id: TaskId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task_id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(task_id));
        }
        Ok(())
    }

    pub async fn clear_completed(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE completed = 1")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM tasks")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn task_counts(&self) -> StoreResult<TaskCounts> {
        let row = sqlx::query("SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM tasks")
            .fetch_one(&self.pool)
            .await?;
        let total = row.get::<i64, _>(0).max(0) as u64;
        let completed = row.get::<i64, _>(1).max(0) as u64;
        Ok(TaskCounts {
            total,
            active: total.saturating_sub(completed),
            completed,
        })
    }
}

/// Trims the description and enforces the non-empty and length limits.
pub fn normalize_description(raw: &str) -> StoreResult<String> {
    let description = raw.trim();
    if description.is_empty() {
        return Err(StoreError::Validation(
            "description cannot be empty".to_string(),
        ));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(StoreError::Validation(format!(
            "description exceeds {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(description.to_string())
}

fn task_from_row(r: &SqliteRow) -> Task {
    Task {
        id: TaskId(r.get::<i64, _>(0)),
        description: r.get::<String, _>(1),
        completed: r.get::<bool, _>(2),
        completed_at: r.get::<Option<DateTime<Utc>>, _>(3),
        editing: r.get::<bool, _>(4),
        created_at: r.get::<DateTime<Utc>, _>(5),
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
