use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use server_api::{apply_intent, load_tasks, ApiContext};
use shared::{
    domain::{TaskId, View},
    protocol::Intent,
};
use storage::Storage;

#[derive(Parser, Debug)]
#[command(about = "Inspect and edit the todo database without the web UI")]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/todo.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        #[arg(long, default_value = "all")]
        view: String,
    },
    Add {
        description: String,
    },
    Toggle {
        id: i64,
    },
    Rename {
        id: i64,
        description: String,
    },
    Delete {
        id: i64,
    },
    ClearCompleted,
    DeleteAll,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;
    let ctx = ApiContext::new(storage);

    let intent = match cli.command {
        Command::List { view } => {
            let list = load_tasks(&ctx, View::parse(Some(&view))).await?;
            for task in &list.tasks {
                let mark = if task.completed { "x" } else { " " };
                println!("[{mark}] {:>4}  {}", task.id.0, task.description);
            }
            println!(
                "{} active, {} completed, {} total",
                list.counts.active, list.counts.completed, list.counts.total
            );
            return Ok(());
        }
        Command::Add { description } => Intent::CreateTask { description },
        Command::Toggle { id } => {
            let task = ctx
                .storage
                .load_task(TaskId(id))
                .await?
                .with_context(|| format!("task {id} not found"))?;
            Intent::ToggleCompletion {
                id: task.id,
                completed: task.completed,
            }
        }
        Command::Rename { id, description } => Intent::SaveTask {
            id: TaskId(id),
            description,
        },
        Command::Delete { id } => Intent::DeleteTask { id: TaskId(id) },
        Command::ClearCompleted => Intent::ClearCompleted,
        Command::DeleteAll => Intent::DeleteAll,
    };

    let tag = intent.tag();
    apply_intent(&ctx, intent)
        .await
        .with_context(|| format!("{tag} failed"))?;
    let counts = ctx.storage.task_counts().await?;
    println!(
        "{tag}: ok ({} active, {} completed)",
        counts.active, counts.completed
    );
    Ok(())
}
