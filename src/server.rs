//! Router assembly, storage selection and the serve loop.

use crate::config::{Config, StorageBackend};
use crate::memory::MemoryRepository;
use crate::parser::IngestSummary;
use crate::repository::CompanyRepository;
use crate::routes::{find_companies, health, load_websites, not_found};
use crate::service::CompanyService;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: Arc<dyn CompanyService>,
}

impl AppState {
    pub fn new(config: Config, service: Arc<dyn CompanyService>) -> Self {
        Self {
            config: Arc::new(config),
            service,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/companies", get(find_companies))
        .route("/companies/websites", post(load_websites))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_upload_size()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// JSON logs filtered by `config.log_level`.
pub fn init_tracing(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.as_str())
        .with_target(false)
        .json()
        .init();
}

/// Build the storage adapter named by `config.storage`.
pub async fn open_repository(config: &Config) -> anyhow::Result<Arc<dyn CompanyRepository>> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::info!("using in-memory company store");
            Ok(Arc::new(MemoryRepository::new()))
        }
        StorageBackend::Mongo => {
            #[cfg(feature = "mongo")]
            {
                let repo =
                    crate::mongo::MongoRepository::connect(&config.mongo_url, &config.mongo_db_name)
                        .await?;
                Ok(Arc::new(repo))
            }
            #[cfg(not(feature = "mongo"))]
            {
                anyhow::bail!("mongo storage disabled at compile time (enable feature `mongo`)")
            }
        }
    }
}

/// Load `config.init_file` into the catalog.
///
/// Failures are logged and yield `None`; the API comes up regardless.
pub async fn load_init_file(service: &dyn CompanyService, config: &Config) -> Option<IngestSummary> {
    let path = config.init_file.display();
    let loaded = match config.init_charset() {
        Ok(charset) => service
            .bootstrap(&config.init_file, charset)
            .await
            .map_err(anyhow::Error::from),
        Err(err) => Err(err),
    };
    match loaded {
        Ok(summary) => Some(summary),
        Err(err) => {
            tracing::error!(path = %path, error = %err, "bootstrap failed");
            None
        }
    }
}

/// Serve until SIGTERM or Ctrl+C.
pub async fn start_server(config: Config, service: Arc<dyn CompanyService>) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    tracing::info!(
        %addr,
        timeout_secs = config.timeout_secs,
        max_upload_mb = config.max_upload_mb,
        "starting company catalog server"
    );

    let app = build_router(Arc::new(AppState::new(config, service)));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::CatalogService;

    #[tokio::test]
    async fn memory_storage_opens_empty() {
        let repo = open_repository(&Config::default()).await.unwrap();
        assert!(repo.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_init_charset_is_logged_not_fatal() {
        let repo = Arc::new(MemoryRepository::new());
        let service = CatalogService::new(repo.clone());
        let config = Config {
            init_file_charset: "klingon".into(),
            ..Config::default()
        };
        assert!(load_init_file(&service, &config).await.is_none());
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn init_file_is_loaded_with_its_charset() {
        let dir = tempfile::tempdir().unwrap();
        let init_file = dir.path().join("catalog.csv");
        std::fs::write(&init_file, b"Caf\xe9;12345\n").unwrap();
        let repo = Arc::new(MemoryRepository::new());
        let service = CatalogService::new(repo.clone());
        let config = Config {
            init_file,
            init_file_charset: "windows-1252".into(),
            ..Config::default()
        };
        let summary = load_init_file(&service, &config).await.unwrap();
        assert_eq!(summary.accepted, 1);
        assert_eq!(repo.find_all().await.unwrap()[0].name, "Café");
    }

    #[cfg(not(feature = "mongo"))]
    #[tokio::test]
    async fn mongo_storage_needs_the_feature() {
        let config = Config {
            storage: StorageBackend::Mongo,
            ..Config::default()
        };
        assert!(open_repository(&config).await.is_err());
    }
}
