use clap::{Parser, Subcommand};

use healthkb::api::{create_router, AppState};
use healthkb::config::Config;
use healthkb::logging;

#[derive(Parser)]
#[command(name = "healthkb")]
#[command(about = "Health knowledge-base service")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Answer one question and record it, printing the result as JSON
    Ask {
        question: String,
    },
    /// Start an ingestion job for the configured data source
    Sync {
        /// Request id the client token is derived from; reuse it to retry
        /// the same attempt. Generated when omitted.
        #[arg(long)]
        request_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    logging::init(Config::log_format_from_env());

    let config = Config::from_env()?;
    if config.server.api_keys.is_empty() {
        tracing::warn!("HEALTHKB_API_KEYS is not set; all routes are unauthenticated");
    }

    let state = AppState::from_config(config.clone()).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, state).await,
        Command::Ask { question } => {
            let result = state.query()?.answer(&question).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Command::Sync { request_id } => {
            let request_id = request_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let job = state.ingestion()?.start(&request_id).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
            Ok(())
        }
    }
}

async fn serve(config: Config, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("HealthKB starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/health", addr);
    tracing::info!("  OpenAPI spec: http://{}/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
