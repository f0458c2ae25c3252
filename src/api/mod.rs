//! HTTP API.
//!
//! Routes:
//! - `POST /search`, `GET /search` - embed-and-query (JSON body)
//! - `GET /health` - liveness and encoder details
//! - `GET /metrics` - Prometheus scrape endpoint (when enabled)

mod handlers;

pub use handlers::HealthResponse;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::time::Instant;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ApiSettings;
use crate::error::{Error, Result};
use crate::search::SearchHandler;
use crate::telemetry::MetricsService;

/// State shared by all routes.
#[derive(Clone)]
pub struct AppState {
    /// Request handler (encoder + vector store)
    pub handler: SearchHandler,
    /// When the server started
    pub start_time: Instant,
    /// Prometheus exporter, if installed
    pub metrics: Option<MetricsService>,
}

impl AppState {
    /// State without a metrics exporter.
    pub fn new(handler: SearchHandler) -> Self {
        Self {
            handler,
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Attach the Prometheus exporter.
    pub fn with_metrics(mut self, metrics: MetricsService) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// HTTP server for the search gateway.
pub struct ApiServer {
    settings: ApiSettings,
    metrics_path: String,
    state: AppState,
}

impl ApiServer {
    /// Create a server with shared state.
    pub fn with_state(settings: ApiSettings, state: AppState) -> Self {
        Self {
            settings,
            metrics_path: "/metrics".to_string(),
            state,
        }
    }

    /// Serve metrics on a different route.
    pub fn with_metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = path.into();
        self
    }

    /// Build the router with all routes and layers.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/search", post(handlers::search).get(handlers::search))
            .route("/health", get(handlers::health));

        if self.state.metrics.is_some() {
            router = router.route(&self.metrics_path, get(handlers::metrics));
        }

        let router = router
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.settings.cors_enabled {
            router.layer(self.cors_layer())
        } else {
            router
        }
    }

    /// Browsers may call from any listed origin with credentials; `*` mirrors
    /// the caller's origin back.
    fn cors_layer(&self) -> CorsLayer {
        let origin = if self.settings.cors_origins.iter().any(|o| o == "*") {
            AllowOrigin::mirror_request()
        } else {
            let origins: Vec<HeaderValue> = self
                .settings
                .cors_origins
                .iter()
                .filter_map(|o| match o.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin: {}", o);
                        None
                    }
                })
                .collect();
            AllowOrigin::list(origins)
        };

        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.settings.listen_address)
            .await
            .map_err(|e| {
                Error::Api(format!(
                    "Failed to bind {}: {}",
                    self.settings.listen_address, e
                ))
            })?;
        info!("API server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Api(format!("Server error: {}", e)))
    }
}
