// src/main.rs

use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use memora::{MemoryConfig, MemoryQuery, MemoryService, SqliteAdapter, TurnContext, TurnRole};

#[derive(Parser)]
#[command(name = "memora", about = "Conversational memory engine for tutoring sessions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct ContextArgs {
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    mode: Option<String>,
    #[arg(long)]
    age_group: Option<String>,
    #[arg(long)]
    board: Option<String>,
    #[arg(long)]
    grade: Option<String>,
}

impl From<ContextArgs> for TurnContext {
    fn from(args: ContextArgs) -> Self {
        TurnContext {
            mode: args.mode,
            subject: args.subject,
            age_group: args.age_group,
            board: args.board,
            grade: args.grade,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Record one chat turn into a thread's memory
    Record {
        #[arg(long)]
        thread: String,
        #[arg(long)]
        text: String,
        /// "user" or "assistant"
        #[arg(long, default_value = "user")]
        role: String,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Rank memories against a message and print the composed context
    Context {
        #[arg(long)]
        thread: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Print a thread's conversation summary
    Summary {
        #[arg(long)]
        thread: String,
    },
    /// List all known thread ids
    Threads,
    /// Print per-thread counters
    Stats {
        #[arg(long)]
        thread: String,
    },
    /// Remove all memories and the summary for a thread
    Clear {
        #[arg(long)]
        thread: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = MemoryConfig::from_env();

    let options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.sqlite_max_connections)
        .connect_with(options)
        .await?;

    let adapter = SqliteAdapter::new(pool);
    adapter.run_migrations().await?;
    let service = MemoryService::with_persistence(config, Arc::new(adapter)).await;

    match cli.command {
        Command::Record {
            thread,
            text,
            role,
            context,
        } => {
            let role = role.parse::<TurnRole>().unwrap_or(TurnRole::User);
            service
                .process_turn(&thread, &text, role, &context.into())
                .await;
            info!("Recorded turn for thread {}", thread);
        }
        Command::Context {
            thread,
            message,
            limit,
            threshold,
            context,
        } => {
            let query = MemoryQuery {
                thread_id: thread,
                current_message: message,
                context: context.into(),
                limit,
                relevance_threshold: threshold,
            };
            let result = service.get_relevant_context(&query).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Summary { thread } => {
            let summary = service.get_summary(&thread).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Threads => {
            for thread_id in service.list_threads().await {
                println!("{thread_id}");
            }
        }
        Command::Stats { thread } => {
            let stats = service.stats(&thread).await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Clear { thread } => {
            service.clear(&thread).await;
        }
    }

    Ok(())
}
