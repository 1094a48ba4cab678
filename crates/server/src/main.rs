use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vmctl_core::{
    create_authenticator, create_token_source, load_config, validate_config, Authenticator,
    ComfyClient, ComputeApi, GceClient, GenerationApi, InstanceRef, RemoteClient,
    SanitizedConfig,
};
use vmctl_server::{create_router, AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    // Config file is optional; the environment alone is enough
    let config_path = std::env::var("VMCTL_CONFIG").ok().map(PathBuf::from);
    match &config_path {
        Some(path) => info!("Loading configuration from {:?}", path),
        None => info!("No VMCTL_CONFIG set, using defaults and environment"),
    }

    let config = load_config(config_path.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!(version = VERSION, "Configuration loaded successfully");
    info!(
        config = %serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default(),
        "Effective configuration"
    );
    if let Err(e) = InstanceRef::resolve(&config.vm, None, None, None) {
        warn!("No complete default instance configured ({}); requests must supply it", e);
    }

    let authenticator: Arc<dyn Authenticator> = Arc::from(create_authenticator(&config.auth));
    info!("Using authenticator: {}", authenticator.method_name());

    let tokens = create_token_source(&config.credentials, &config.http)
        .context("Failed to create credential source")?;
    info!("Using credential source: {}", tokens.name());

    let compute: Arc<dyn ComputeApi> = Arc::new(GceClient::new(
        config.vm.api_base.clone(),
        RemoteClient::new("gce", &config.http)
            .context("Failed to create compute client")?
            .with_token_source(tokens),
    ));

    let comfy = ComfyClient::new(
        config.comfy.base_url.clone(),
        RemoteClient::new("comfyui", &config.http)
            .context("Failed to create generation service client")?,
    );
    info!("Generation service at {}", comfy.base_url());
    let generation: Arc<dyn GenerationApi> = Arc::new(comfy);
    info!(
        compute = compute.name(),
        generation = generation.name(),
        "Backends ready"
    );

    let shutdown = CancellationToken::new();

    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        compute,
        generation,
        shutdown.clone(),
    ));

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Waits in progress are cancelled before connections drain
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!("Server shutting down...");
        shutdown.cancel();
    })
    .await
    .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Text logs by default, JSON when `VMCTL_LOG_FORMAT=json`.
fn init_logging() {
    let json = std::env::var("VMCTL_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
}
