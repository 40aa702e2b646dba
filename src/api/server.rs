//! HTTP server: shared state, routes and lifecycle

use axum::{http::header, routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::{handlers, stream};
use crate::config::{AppConfig, ServerConfig};
use crate::constants::{APP_NAME, BROWSER_USER_AGENT};
use crate::resolver::Cascade;
use crate::search::{backend_from_config, Catalog};

/// Shared application state
pub struct AppState {
    pub catalog: Catalog,
    pub cascade: Cascade,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(catalog: Catalog, cascade: Cascade) -> Self {
        Self {
            catalog,
            cascade,
            started_at: Instant::now(),
        }
    }

    /// Build the backend, caches and cascade described by `config`
    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(config.youtube.request_timeout())
            .build()
            .map_err(crate::error::SearchError::from)?;

        let backend = backend_from_config(config, client.clone());
        tracing::info!("Search backend: {}", backend.name());
        let catalog = Catalog::new(backend, &config.cache);

        let cascade = Cascade::from_config(client, &config.stream);
        tracing::info!(
            "Audio strategies: {} (redirect: {})",
            cascade.strategy_names().join(" -> "),
            config.stream.redirect
        );

        Ok(Self::new(catalog, cascade))
    }
}

/// All routes, with the static front end as fallback when configured
pub fn router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/search", get(handlers::search))
        .route("/api/trending", get(handlers::trending))
        .route("/api/artist", get(handlers::artist))
        .route("/api/genre", get(handlers::genre))
        .route("/api/related/:id", get(handlers::related))
        .route("/api/video/:id", get(handlers::video))
        .route("/api/stream/:id", get(stream::stream_audio))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            header::CONTENT_RANGE,
            header::CONTENT_LENGTH,
            header::ACCEPT_RANGES,
        ]);

    app.layer(cors).layer(TraceLayer::new_for_http())
}

/// Web server for the API
pub struct WebServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    pub fn addr(&self) -> crate::Result<SocketAddr> {
        let raw = format!("{}:{}", self.config.bind_address, self.config.http_port);
        raw.parse().map_err(|_| {
            crate::error::ConfigError::InvalidValue {
                key: "server.bind_address",
                value: raw,
            }
            .into()
        })
    }

    /// Serve until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> crate::Result<()> {
        let addr = self.addr()?;
        let app = router(self.state, self.config.static_dir.as_deref());

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("{} listening on http://{}", APP_NAME, addr);
        if let Some(dir) = &self.config.static_dir {
            tracing::info!("Serving front end from {}", dir.display());
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("Server stopped");
        Ok(())
    }
}
