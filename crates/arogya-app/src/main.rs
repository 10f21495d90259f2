//! Arogya application binary - composition root.
//!
//! Ties together all Arogya crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Build the remote call gateway over the fixed endpoint set
//! 3. Load the embedding model and the symptom reference table
//! 4. Assemble the specialist matcher and the tool executors
//! 5. Run a line-oriented conversation loop on stdin/stdout

mod cli;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use arogya_agent::{AgentError, AgentOrchestrator, ToolExecutor, Transport};
use arogya_core::config::ArogyaConfig;
use arogya_gateway::{EndpointSet, RemoteCall, RemoteGateway, RetryPolicy};
use arogya_matcher::{
    DynEmbedder, GatewayClassifier, MockEmbedder, OnnxEmbedder, ReferenceTable, SpecialistMatcher,
};

use cli::CliArgs;

/// Transport writing responses to stdout.
struct StdioTransport;

#[async_trait::async_trait]
impl Transport for StdioTransport {
    async fn send(&self, text: &str) -> Result<(), AgentError> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{}\n\n", text).as_bytes())
            .await
            .map_err(|e| AgentError::Delivery(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| AgentError::Delivery(e.to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first, so the CLI can fall back to configured values.
    let config_file = args.resolve_config_path();
    let config = ArogyaConfig::load_or_default(&config_file);

    // Tracing. Priority: RUST_LOG env > --log-level flag > config value.
    let level = args
        .resolve_log_level()
        .unwrap_or_else(|| config.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    tracing::info!("Starting Arogya v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Remote call gateway.
    let endpoints = EndpointSet::from_config(&config.endpoints)?;
    let retry = RetryPolicy::from_config(&config.retry);
    let gateway: Arc<dyn RemoteCall> = Arc::new(RemoteGateway::new(
        endpoints,
        retry,
        config.retry.pool_max_idle_per_host,
    )?);

    // Embedding model.
    let embedder: Box<dyn DynEmbedder> = if args.mock_embedding {
        tracing::warn!("Using mock embedder; specialist matching quality will be degraded");
        Box::new(MockEmbedder::new())
    } else {
        let model_dir = args.resolve_model_dir(&config.matcher.model_dir);
        Box::new(OnnxEmbedder::from_directory(&model_dir)?)
    };

    // Reference table. Missing data degrades to remote-only matching.
    let reference_path = args.resolve_reference_path(&config.matcher.reference_path);
    let table = ReferenceTable::load_or_empty(&reference_path, embedder.as_ref()).await;

    // Matcher and tool executors.
    let classifier = GatewayClassifier::new(Arc::clone(&gateway), config.matcher.model.clone());
    let matcher = Arc::new(SpecialistMatcher::new(
        embedder,
        table,
        Box::new(classifier),
        &config.matcher,
    ));
    let executor = ToolExecutor::new(
        Arc::clone(&gateway),
        matcher,
        config.matcher.model.clone(),
        config.agent.recent_specialist_window_secs,
    );

    let transport = Arc::new(StdioTransport);
    let orchestrator = AgentOrchestrator::new(executor, transport.clone(), config.agent.clone());

    // Conversation loop: one session for the life of the process.
    let session = orchestrator.start_session();
    transport.send(&config.general.welcome_message).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if let Err(e) = orchestrator.handle_turn(session, input).await {
            tracing::error!(error = %e, "Turn failed");
        }
    }

    orchestrator.end_session(session);
    tracing::info!("Session closed, shutting down");
    Ok(())
}
