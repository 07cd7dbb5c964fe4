use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use habit_tracker::app::{self, AppState};
use habit_tracker::auth::HttpAuthGateway;
use habit_tracker::config::AppConfig;
use habit_tracker::database::{self, HabitRepository};
use habit_tracker::listener;

#[derive(Parser)]
#[command(name = "habit-tracker")]
#[command(about = "Habit tracking API and user-deletion listener")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Serve the habits HTTP API (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overrides HABITS_PORT/PORT")]
        port: Option<u16>,
    },

    #[command(about = "Consume user-deletion events and purge their habits")]
    Listen,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, AUTH_SERVICE, etc.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_log_filter())),
        )
        .init();
    tracing::info!("Starting habit tracker in {:?} mode", config.environment);

    let pool = database::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    database::ensure_schema(&pool).await.context("failed to create schema")?;
    let habits = HabitRepository::new(pool);

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(&config, habits, port).await,
        Commands::Listen => {
            listener::run(&config.broker, habits)
                .await
                .context("deletion listener failed")?;
            Ok(())
        }
    }
}

async fn serve(config: &AppConfig, habits: HabitRepository, port: Option<u16>) -> anyhow::Result<()> {
    let gateway = HttpAuthGateway::new(&config.auth).context("failed to build auth client")?;
    tracing::info!("Resolving credentials via {}", gateway.check_url());

    let state = AppState::new(habits, Arc::new(gateway));
    let router = app::router(state);

    let bind_addr = format!("0.0.0.0:{}", port.unwrap_or(config.server.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Habit tracker listening on http://{} (public URL {})", bind_addr, config.server.backend_url);

    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
