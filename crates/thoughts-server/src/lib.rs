//! HTTP server for the thoughts site.
//!
//! Serves the active snapshot of a [`SyncEngine`] as HTML pages and keeps it
//! current with a background refresh loop:
//! - `GET /` renders the index document
//! - `GET /{path}` renders the document routed at `path`
//! - `GET /healthz` reports the active snapshot as JSON
//!
//! # Quick Start
//!
//! ```ignore
//! use thoughts_server::{ServerConfig, Shutdown, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         repo: "https://github.com/owner/notes".to_owned(),
//!         ..ServerConfig::default()
//!     };
//!     let shutdown = Shutdown::new();
//!
//!     run_server(config, shutdown).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum router ──► SyncEngine::active() ──► Snapshot ──► Document::html()
//!                                        ▲
//! refresh loop ── every interval ── SyncEngine::refresh()
//!                                        │
//!                                        └─► ContentSource (GitHub, optionally cached on disk)
//! ```

mod app;
mod error;
mod handlers;
mod middleware;
mod refresh;
mod shutdown;
mod state;
mod template;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thoughts_site::{ExtractOptions, SyncEngine, SyncOutcome};
use thoughts_source::{CachedSource, ContentSource, GitHubSource};
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use error::ServerError;
pub use shutdown::Shutdown;
use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Site title shown in every page.
    pub site_title: String,
    /// Logical path of the index document.
    pub index_file: String,
    /// Repository URL (`https://github.com/{owner}/{name}`).
    pub repo: String,
    /// GitHub REST API base URL.
    pub api_url: String,
    /// Branch whose archive is served.
    pub branch: String,
    /// Timeout per source request.
    pub timeout: Duration,
    /// Interval between background refreshes.
    pub interval: Duration,
    /// Disk cache directory (`None` disables caching).
    pub cache_dir: Option<PathBuf>,
    /// Upper bound on draining in-flight requests after shutdown.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            site_title: "thoughts".to_owned(),
            index_file: "README.md".to_owned(),
            repo: String::new(),
            api_url: thoughts_config::DEFAULT_API_URL.to_owned(),
            branch: "main".to_owned(),
            timeout: Duration::from_secs(5),
            interval: Duration::from_secs(300),
            cache_dir: None,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Create server configuration from thoughts config.
///
/// # Errors
///
/// Returns [`thoughts_config::ConfigError`] if no repository is configured.
pub fn server_config_from_config(
    config: &thoughts_config::Config,
) -> Result<ServerConfig, thoughts_config::ConfigError> {
    Ok(ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        site_title: config.site.title.clone(),
        index_file: config.site.index.clone(),
        repo: config.source.require_repo()?.to_owned(),
        api_url: config.source.api_url.clone(),
        branch: config.source.branch.clone(),
        timeout: config.source.timeout(),
        interval: config.sync.interval(),
        cache_dir: config
            .cache_resolved
            .enabled
            .then(|| config.cache_resolved.dir.clone()),
        shutdown_grace: config.server.shutdown_grace(),
    })
}

/// Build the content source chain: the live GitHub source, wrapped in the
/// disk cache when one is configured.
///
/// # Errors
///
/// Returns [`ServerError::Source`] if the repository URL is invalid.
pub fn build_source(config: &ServerConfig) -> Result<Arc<dyn ContentSource>, ServerError> {
    let live = GitHubSource::new(&config.api_url, &config.repo, &config.branch, config.timeout)?;

    Ok(match &config.cache_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Using disk cache");
            Arc::new(CachedSource::new(live, dir))
        }
        None => Arc::new(live),
    })
}

/// Build the engine and run its first sync.
///
/// # Errors
///
/// Returns [`ServerError::Startup`] if the first sync fails.
pub async fn start_engine(
    source: Arc<dyn ContentSource>,
    config: &ServerConfig,
) -> Result<Arc<SyncEngine>, ServerError> {
    let options = ExtractOptions {
        index_file: config.index_file.clone(),
        ..ExtractOptions::default()
    };
    let engine = Arc::new(SyncEngine::new(source, options));

    let outcome = engine.sync_active().await.map_err(ServerError::Startup)?;
    if let SyncOutcome::Updated {
        fingerprint,
        documents,
    } = &outcome
    {
        info!(fingerprint = %fingerprint, documents, "Initial sync complete");
    }

    Ok(engine)
}

/// Run the server until `shutdown` fires.
///
/// Syncs once before accepting connections; a failure there is returned
/// immediately. Afterwards sync failures are only logged.
///
/// # Arguments
///
/// * `config` - Server configuration
/// * `shutdown` - Signal that stops the server and the refresh loop
///
/// # Errors
///
/// Returns an error if the source is misconfigured, the first sync fails,
/// or the listener cannot be bound.
pub async fn run_server(config: ServerConfig, shutdown: Shutdown) -> Result<(), ServerError> {
    let source = build_source(&config)?;
    let engine = start_engine(source, &config).await?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    serve(listener, engine, &config, shutdown).await
}

/// Serve `engine` on an already bound listener until `shutdown` fires.
///
/// In-flight requests get `config.shutdown_grace` to finish; connections
/// still open after that are dropped.
///
/// # Errors
///
/// Returns [`ServerError::Io`] if the server fails while running.
pub async fn serve(
    listener: TcpListener,
    engine: Arc<SyncEngine>,
    config: &ServerConfig,
    shutdown: Shutdown,
) -> Result<(), ServerError> {
    let refresh = tokio::spawn(refresh::run(
        Arc::clone(&engine),
        config.interval,
        shutdown.clone(),
    ));

    let state = Arc::new(AppState {
        engine,
        site_title: config.site_title.clone(),
    });
    let app = app::create_router(state);

    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "Starting server");
    }

    let signal = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.wait().await })
        .into_future();
    let mut server = std::pin::pin!(server);

    let result = tokio::select! {
        result = &mut server => result,
        () = shutdown.wait() => {
            info!(grace = ?config.shutdown_grace, "Shutdown signal received, draining connections");
            if let Ok(result) = tokio::time::timeout(config.shutdown_grace, &mut server).await {
                result
            } else {
                warn!("Grace period elapsed, dropping open connections");
                Ok(())
            }
        }
    };

    // The loop exits on the same signal; make sure it is gone before returning.
    shutdown.trigger();
    if let Err(e) = refresh.await {
        warn!(error = %e, "Refresh loop ended abnormally");
    }

    result.map_err(ServerError::from)
}
