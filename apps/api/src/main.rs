mod application;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;
mod tracking;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::application::storage::DEFAULT_TEMPLATE;
use crate::application::{LlmApplicationAssistant, S3Archive};
use crate::config::Config;
use crate::db::open_document_store;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobdesk API v{}", env!("CARGO_PKG_VERSION"));

    let store = open_document_store(config.database_url.as_deref()).await?;

    let s3 = build_s3_client(&config).await;
    let archive = Arc::new(S3Archive::new(s3, config.s3_bucket.clone()));
    info!("S3 archive initialized (bucket: {})", config.s3_bucket);

    let llm = LlmClient::new(config.anthropic_api_key.clone())
        .context("Failed to build the LLM HTTP client")?;
    let assistant = Arc::new(LlmApplicationAssistant::new(llm));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let template = load_template(config.cover_letter_template.as_deref()).await?;

    let state = AppState::new(store, assistant, archive, template, config.clone());

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "jobdesk-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}

async fn load_template(path: Option<&str>) -> Result<Arc<str>> {
    let Some(path) = path else {
        info!("Using the built-in cover letter template");
        return Ok(Arc::from(DEFAULT_TEMPLATE));
    };

    let template = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read cover letter template '{path}'"))?;
    info!("Loaded cover letter template from {path}");
    Ok(Arc::from(template))
}
