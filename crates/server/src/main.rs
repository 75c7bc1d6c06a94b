//! StarDust Server
//!
//! Axum server exposing the research controller over HTTP, plus a terminal
//! mode that drives a single run without a server.

mod api;
mod config;

use axum::{
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use stardust_core::research::{ResearchController, ResearchEvent, RunOutcome, RunState};
use std::{net::SocketAddr, sync::Arc};
use tokio::{
    net::TcpListener,
    sync::{broadcast, mpsc},
};
use tracing_subscriber::EnvFilter;
use utoipa::{OpenApi, ToSchema};

use crate::config::PersistedConfig;

/// Application state
pub struct AppState {
    pub controller: ResearchController,
    /// Fan-out of controller events to SSE subscribers
    pub event_tx: broadcast::Sender<ResearchEvent>,
}

pub type SharedState = Arc<AppState>;

#[derive(Serialize, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Parser, Clone)]
#[command(author, version, about = "StarDust - Deep research on any topic")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the StarDust server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Research a topic in the terminal (no server)
    Run {
        /// The topic to research
        topic: String,
    },
}

// === OpenAPI Definition ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StarDust API",
        version = "1.0.0",
        description = "API for the StarDust research pipeline"
    ),
    paths(
        api::research::get_status,
        api::research::start_research,
        api::research::reset_research,
        config::get_config,
        config::update_config,
        config::get_providers
    ),
    components(
        schemas(
            ApiResponse,
            api::research::StartResearchRequest,
            api::research::StartResearchResponse,
            config::PersistedConfig,
            config::ConfigResponse,
            config::ConfigDefaults,
            config::ProvidersResponse,
            config::ProviderInfo
        )
    ),
    tags(
        (name = "research", description = "Research run management"),
        (name = "config", description = "Configuration management"),
        (name = "providers", description = "LLM provider discovery")
    )
)]
struct ApiDoc;

async fn serve_openapi() -> impl IntoResponse {
    let doc = ApiDoc::openapi().to_json().unwrap_or_default();
    ([(header::CONTENT_TYPE, "application/json")], doc)
}

// === Server Entry ===

pub async fn run_server(host: &str, port: u16) -> anyhow::Result<()> {
    let research_config = PersistedConfig::load().await.to_research_config();
    tracing::info!(
        provider = research_config.global_provider.id(),
        pacing_ms = research_config.pacing_delay_ms,
        questions = research_config.question_count,
        "Loaded research config"
    );

    let (event_tx, _) = broadcast::channel::<ResearchEvent>(100);
    let (research_tx, mut research_rx) = mpsc::channel::<ResearchEvent>(100);
    let controller = ResearchController::with_llm(research_config).with_event_channel(research_tx);

    // Forward controller events to every SSE subscriber
    let bridge_tx = event_tx.clone();
    tokio::spawn(async move {
        while let Some(event) = research_rx.recv().await {
            let _ = bridge_tx.send(event);
        }
    });

    let state: SharedState = Arc::new(AppState {
        controller,
        event_tx,
    });

    let app = Router::new()
        .nest("/api/v1/research", api::research::research_routes())
        .route(
            "/api/v1/config",
            get(config::get_config).patch(config::update_config),
        )
        .route("/api/v1/providers", get(config::get_providers))
        .route("/api/v1/openapi.json", get(serve_openapi))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("🚀 StarDust Server running at http://{}", addr);
    println!("   API v1 Routes:");
    println!("   Research:  /api/v1/research/status, /start, /reset, /progress, /events");
    println!("   Config:    /api/v1/config (GET, PATCH)");
    println!("   Providers: /api/v1/providers (GET)");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Drive one run in the terminal, printing step transitions as they happen
async fn run_cli(topic: &str) -> anyhow::Result<()> {
    let config = PersistedConfig::load().await.to_research_config();
    let controller = ResearchController::with_llm(config);
    let mut progress = controller.subscribe();

    let printer = tokio::spawn(async move {
        let mut last_state = RunState::Idle;
        let mut printed = 0;
        while progress.changed().await.is_ok() {
            let snapshot = progress.borrow_and_update().clone();
            if snapshot.state != last_state {
                if let Some(phase) = snapshot.phase {
                    println!("[{}/3] {}", phase.id(), phase.label());
                }
                last_state = snapshot.state;
            }
            for item in snapshot.items.iter().filter(|i| i.completed).skip(printed) {
                println!("   ✓ {}", item.question);
                printed += 1;
            }
        }
    });

    println!("🔭 Researching: {}", topic);
    let outcome = controller.run(topic).await?;

    // Closing the progress channel ends the printer
    drop(controller);
    let _ = printer.await;

    match outcome {
        RunOutcome::Complete { report } => {
            println!("\n{}", report);
            Ok(())
        }
        RunOutcome::Failed(reason) => {
            tracing::error!(detail = %reason.detail, "Research failed");
            anyhow::bail!(reason.message)
        }
        RunOutcome::Superseded => anyhow::bail!("Research run was superseded"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Provider keys may live in .env files instead of the shell environment
    let _ = dotenvy::dotenv();
    let _ = dotenvy::from_path(std::path::Path::new(config::STARDUST_DIR).join(".env"));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Some(CliCommand::Run { topic }) => run_cli(&topic).await,
        Some(CliCommand::Serve { port, host }) => run_server(&host, port).await,
        None => run_server("127.0.0.1", 8080).await,
    }
}
