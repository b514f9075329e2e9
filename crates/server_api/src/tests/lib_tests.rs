use super::*;
use shared::domain::TaskId;

async fn setup() -> ApiContext {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    ApiContext::new(storage)
}

fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[tokio::test]
async fn create_then_load_returns_new_active_task() {
    let ctx = setup().await;
    let ack = dispatch_form(
        &ctx,
        &form(&[("intent", "create task"), ("description", "Buy milk")]),
    )
    .await
    .expect("create");
    assert!(ack.ok);

    let list = load_tasks(&ctx, View::All).await.expect("load");
    assert_eq!(list.tasks.len(), 1);
    assert_eq!(list.tasks[0].description, "Buy milk");
    assert!(!list.tasks[0].completed);
    assert_eq!(list.counts.active, 1);
}

#[tokio::test]
async fn toggle_flips_submitted_state() {
    let ctx = setup().await;
    let task = ctx.storage.create_task("Walk dog").await.expect("task");
    let id = task.id.to_string();

    dispatch_form(
        &ctx,
        &form(&[
            ("intent", "toggle completion"),
            ("id", &id),
            ("completed", "false"),
        ]),
    )
    .await
    .expect("complete");
    let stored = ctx.storage.load_task(task.id).await.expect("load").expect("task");
    assert!(stored.completed);
    assert!(stored.completed_at.is_some());

    dispatch_form(
        &ctx,
        &form(&[
            ("intent", "toggle completion"),
            ("id", &id),
            ("completed", "true"),
        ]),
    )
    .await
    .expect("reopen");
    let stored = ctx.storage.load_task(task.id).await.expect("load").expect("task");
    assert!(!stored.completed);
    assert!(stored.completed_at.is_none());
}

#[tokio::test]
async fn edit_and_save_round_trip_through_intents() {
    let ctx = setup().await;
    let task = ctx.storage.create_task("Draft").await.expect("task");

    apply_intent(&ctx, Intent::EditTask { id: task.id })
        .await
        .expect("edit");
    let stored = ctx.storage.load_task(task.id).await.expect("load").expect("task");
    assert!(stored.editing);

    apply_intent(
        &ctx,
        Intent::SaveTask {
            id: task.id,
            description: "Published".to_string(),
        },
    )
    .await
    .expect("save");
    let stored = ctx.storage.load_task(task.id).await.expect("load").expect("task");
    assert_eq!(stored.description, "Published");
    assert!(!stored.editing);
}

#[tokio::test]
async fn unknown_intent_leaves_store_unchanged() {
    let ctx = setup().await;
    ctx.storage.create_task("untouched").await.expect("task");
    let before = ctx.storage.read_tasks().await.expect("read");

    let err = dispatch_form(&ctx, &form(&[("intent", "archive everything")]))
        .await
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::UnknownIntent);
    assert_eq!(err.message, "Unknown intent");
    assert!(err.is_client_error());

    assert_eq!(ctx.storage.read_tasks().await.expect("read"), before);
}

#[tokio::test]
async fn missing_task_maps_to_not_found() {
    let ctx = setup().await;
    let err = apply_intent(&ctx, Intent::DeleteTask { id: TaskId(99) })
        .await
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.code.http_status(), 404);
}

#[tokio::test]
async fn blank_description_maps_to_validation() {
    let ctx = setup().await;
    let err = dispatch_form(
        &ctx,
        &form(&[("intent", "create task"), ("description", "   ")]),
    )
    .await
    .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn clear_completed_and_delete_all() {
    let ctx = setup().await;
    let a = ctx.storage.create_task("A").await.expect("a");
    ctx.storage.create_task("B").await.expect("b");
    apply_intent(
        &ctx,
        Intent::ToggleCompletion {
            id: a.id,
            completed: false,
        },
    )
    .await
    .expect("toggle");

    apply_intent(&ctx, Intent::ClearCompleted)
        .await
        .expect("clear");
    let list = load_tasks(&ctx, View::All).await.expect("load");
    assert_eq!(list.tasks.len(), 1);
    assert_eq!(list.tasks[0].description, "B");

    apply_intent(&ctx, Intent::DeleteAll).await.expect("delete all");
    assert!(load_tasks(&ctx, View::All).await.expect("load").tasks.is_empty());
}

#[tokio::test]
async fn filtered_load_keeps_full_counts() {
    let ctx = setup().await;
    let a = ctx.storage.create_task("A").await.expect("a");
    ctx.storage.create_task("B").await.expect("b");
    ctx.storage.create_task("C").await.expect("c");
    apply_intent(
        &ctx,
        Intent::ToggleCompletion {
            id: a.id,
            completed: false,
        },
    )
    .await
    .expect("toggle");

    let completed = load_tasks(&ctx, View::Completed).await.expect("load");
    assert_eq!(completed.view, View::Completed);
    assert_eq!(completed.tasks.len(), 1);
    assert_eq!(completed.tasks[0].id, a.id);
    assert_eq!(completed.counts.total, 3);

    let active = load_tasks(&ctx, View::Active).await.expect("load");
    let names: Vec<&str> = active.tasks.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(names, vec!["B", "C"]);
}
