use super::*;

async fn storage() -> Storage {
    Storage::new("sqlite::memory:").await.expect("db")
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = storage().await;
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("todo.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn create_appends_active_task() {
    let storage = storage().await;
    let created = storage.create_task("  Buy milk  ").await.expect("create");
    assert_eq!(created.description, "Buy milk");
    assert!(!created.completed);
    assert!(!created.editing);
    assert!(created.completed_at.is_none());

    let tasks = storage.read_tasks().await.expect("read");
    assert_eq!(tasks, vec![created]);
}

#[tokio::test]
async fn create_rejects_blank_and_oversized_descriptions() {
    let storage = storage().await;
    let err = storage.create_task("   ").await.expect_err("blank");
    assert!(matches!(err, StoreError::Validation(_)));

    let long = "x".repeat(MAX_DESCRIPTION_CHARS + 1);
    let err = storage.create_task(&long).await.expect_err("too long");
    assert!(matches!(err, StoreError::Validation(_)));

    assert!(storage.read_tasks().await.expect("read").is_empty());
}

#[tokio::test]
async fn ids_are_never_reused_after_delete_all() {
    let storage = storage().await;
    let first = storage.create_task("a").await.expect("a");
    let second = storage.create_task("b").await.expect("b");
    assert!(second.id > first.id);

    storage.delete_all().await.expect("delete all");
    let third = storage.create_task("c").await.expect("c");
    assert!(third.id > second.id);
}

#[tokio::test]
async fn toggling_sets_and_clears_completed_at() {
    let storage = storage().await;
    let task = storage.create_task("Walk dog").await.expect("create");

    let done = storage
        .update_task(task.id, &TaskPatch::completed(true))
        .await
        .expect("complete");
    assert!(done.completed);
    let stamp = done.completed_at.expect("completed_at");

    let stored = storage.load_task(task.id).await.expect("load").expect("some");
    let stored_stamp = stored.completed_at.expect("stored completed_at");
    assert_eq!(stored_stamp.timestamp_millis(), stamp.timestamp_millis());

    let reopened = storage
        .update_task(task.id, &TaskPatch::completed(false))
        .await
        .expect("reopen");
    assert!(!reopened.completed);
    assert!(reopened.completed_at.is_none());
    let stored = storage.load_task(task.id).await.expect("load").expect("some");
    assert!(stored.completed_at.is_none());
}

#[tokio::test]
async fn edit_then_save_updates_description_and_flag() {
    let storage = storage().await;
    let task = storage.create_task("Draft").await.expect("create");

    let editing = storage
        .update_task(task.id, &TaskPatch::editing(true))
        .await
        .expect("edit");
    assert!(editing.editing);

    let saved = storage
        .update_task(task.id, &TaskPatch::save_description("Final"))
        .await
        .expect("save");
    assert_eq!(saved.description, "Final");
    assert!(!saved.editing);
}

#[tokio::test]
async fn update_missing_task_is_not_found() {
    let storage = storage().await;
    let err = storage
        .update_task(TaskId(42), &TaskPatch::editing(true))
        .await
        .expect_err("missing");
    assert!(matches!(err, StoreError::NotFound(TaskId(42))));
}

#[tokio::test]
async fn rejected_save_leaves_record_untouched() {
    let storage = storage().await;
    let task = storage.create_task("Keep me").await.expect("create");
    storage
        .update_task(task.id, &TaskPatch::editing(true))
        .await
        .expect("edit");

    let err = storage
        .update_task(task.id, &TaskPatch::save_description(""))
        .await
        .expect_err("blank save");
    assert!(matches!(err, StoreError::Validation(_)));

    let stored = storage.load_task(task.id).await.expect("load").expect("some");
    assert_eq!(stored.description, "Keep me");
    assert!(stored.editing);
}

#[tokio::test]
async fn delete_missing_task_is_not_found() {
    let storage = storage().await;
    let err = storage.delete_task(TaskId(1)).await.expect_err("missing");
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn clear_completed_removes_only_completed_in_order() {
    let storage = storage().await;
    let mut ids = Vec::new();
    for description in ["one", "two", "three", "four", "five"] {
        ids.push(storage.create_task(description).await.expect("create").id);
    }
    for id in [ids[1], ids[3]] {
        storage
            .update_task(id, &TaskPatch::completed(true))
            .await
            .expect("complete");
    }

    let removed = storage.clear_completed().await.expect("clear");
    assert_eq!(removed, 2);

    let remaining: Vec<String> = storage
        .read_tasks()
        .await
        .expect("read")
        .into_iter()
        .map(|task| task.description)
        .collect();
    assert_eq!(remaining, vec!["one", "three", "five"]);
}

#[tokio::test]
async fn counts_track_completion() {
    let storage = storage().await;
    assert_eq!(storage.task_counts().await.expect("counts"), TaskCounts::default());

    let a = storage.create_task("a").await.expect("a");
    storage.create_task("b").await.expect("b");
    storage
        .update_task(a.id, &TaskPatch::completed(true))
        .await
        .expect("complete");

    let counts = storage.task_counts().await.expect("counts");
    assert_eq!(counts.total, 2);
    assert_eq!(counts.active, 1);
    assert_eq!(counts.completed, 1);
}

#[test]
fn sqlite_path_skips_memory_urls() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert!(sqlite_path("postgres://localhost/db").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/todo.db?mode=rwc"),
        Some(PathBuf::from("./data/todo.db"))
    );
}
