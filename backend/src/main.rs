use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use video_metrics::config::Config;
use video_metrics::handlers::answer;
use video_metrics::services::{self, MetricsDb, llm};
use video_metrics::utils::{init_logging, with_startup_logging};
use video_metrics::{AppState, build_router};

#[derive(Parser)]
#[command(name = "video-metrics", version, about = "Answer video metrics questions with one number")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API (default)
    Serve,
    /// Answer one question and print the number
    Ask {
        /// Question text
        question: Vec<String>,
    },
    /// Read questions from stdin, one per line
    Chat,
    /// Print today's system prompt
    Prompt,
    /// Replace the store contents with a JSON export
    Load {
        /// Path to the export; defaults to loader.data_path
        path: Option<String>,
    },
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let config = with_startup_logging(Config::load)?;
    let _guard = init_logging(&config.logging);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Ask { question } => {
            let state = AppState::from_config(&config).await?;
            let value = state.metrics_service.answer(&question.join(" ")).await;
            println!("{}", value);
            state.db.close().await;
            Ok(())
        },
        Command::Chat => chat(&config).await,
        Command::Prompt => {
            println!("{}", llm::system_prompt());
            Ok(())
        },
        Command::Load { path } => {
            let path = path.unwrap_or_else(|| config.loader.data_path.clone());
            let dataset = services::read_dataset(&path)?;

            let db = MetricsDb::connect(&config.database).await?;
            db.migrate().await?;
            let summary = services::load_dataset(&db, &dataset, config.loader.batch_size).await?;
            db.close().await;

            println!("Loaded: videos={}, snapshots={}", summary.videos, summary.snapshots);
            Ok(())
        },
        Command::Migrate => {
            let db = MetricsDb::connect(&config.database).await?;
            db.migrate().await?;
            db.close().await;
            tracing::info!("Migrations applied");
            Ok(())
        },
    }
}

async fn serve(config: &Config) -> Result<(), anyhow::Error> {
    let state = Arc::new(AppState::from_config(config).await?);
    let app = build_router(Arc::clone(&state));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    state.db.close().await;
    Ok(())
}

async fn chat(config: &Config) -> Result<(), anyhow::Error> {
    let state = AppState::from_config(config).await?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = answer::reply(&state.metrics_service, &line).await;
        writeln!(stdout, "{}", reply.reply)?;
        stdout.flush()?;
    }

    state.db.close().await;
    Ok(())
}
