//! Math Service - token-gated integer computations
//!
//! Runs the HTTP server by default; subcommands run single computations,
//! manage users, issue tokens and list the request log.

use std::io::{self, BufRead, Write};
use std::net::SocketAddr;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use math_service::api::auth::hash_password;
use math_service::storage::{RequestStore, UserStore};
use math_service::{api::create_router, AppState, Computation, Config};

#[derive(Debug, Parser)]
#[command(name = "math_service", version, about = "Math service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Compute BASE raised to the EXP power
    Power { base: i64, exp: u32 },
    /// Compute the N-th Fibonacci number
    Fib { n: u64 },
    /// Compute N!
    Fact { n: u64 },
    /// Create a login account for USERNAME
    CreateUser {
        username: String,
        /// Password; prompted for on stdin when omitted
        #[arg(long, env = "CREATE_USER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Issue a bearer token for SUBJECT
    Token { subject: String },
    /// Show the most recent request log records
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

/// Main entry point for the math service.
///
/// # Startup Sequence
/// 1. Load `.env` if present and initialize the tracing subscriber
/// 2. Load configuration from environment variables
/// 3. Build application state (request log database, lazy clients)
/// 4. Dispatch the selected subcommand
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "math_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Power { base, exp } => compute(&config, Computation::Power { base, exp }).await,
        Command::Fib { n } => compute(&config, Computation::Fibonacci { n }).await,
        Command::Fact { n } => compute(&config, Computation::Factorial { n }).await,
        Command::CreateUser { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt_password()?,
            };
            if password.is_empty() {
                bail!("password must not be empty");
            }

            let state = AppState::from_config(&config)?;
            let hash = hash_password(&password)
                .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))?;
            state.users.create_user(&username, &hash).await?;
            println!("User '{}' created", username);
            Ok(())
        }
        Command::Token { subject } => {
            let state = AppState::from_config(&config)?;
            println!("{}", state.auth.issue(&subject)?);
            Ok(())
        }
        Command::History { limit } => {
            let state = AppState::from_config(&config)?;
            let records = state.orchestrator.recorder().store().recent(limit).await?;
            for record in records {
                println!(
                    "{}  {}({}) = {}",
                    record.timestamp.to_rfc3339(),
                    record.endpoint,
                    record.input,
                    record.result
                );
            }
            Ok(())
        }
    }
}

/// Reads the password twice from stdin and requires both to match.
fn prompt_password() -> anyhow::Result<String> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut ask = |label: &str| -> anyhow::Result<String> {
        eprint!("{}: ", label);
        io::stderr().flush()?;
        match lines.next() {
            Some(line) => Ok(line?.trim_end_matches('\r').to_string()),
            None => bail!("no password given on stdin"),
        }
    };

    let password = ask("Password")?;
    if ask("Repeat password")? != password {
        bail!("passwords do not match");
    }
    Ok(password)
}

async fn compute(config: &Config, computation: Computation) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let result = state.orchestrator.compute(&computation).await?;
    println!("{}", result);
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Starting Math Service");
    info!(
        "Configuration loaded: port={}, cache={:?}, stream_topic={}, database={}",
        config.server_port, config.cache_backend, config.event_stream_topic, config.database_path
    );

    math_service::metrics::init_metrics();
    let state = AppState::from_config(&config)?;
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
