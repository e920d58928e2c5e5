//! API server implementation.
//!
//! Provides health, ready, and API endpoints for the commander picker,
//! plus static serving of cached card images and the frontend build.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use picker_core::cache::SheetCache;
use picker_core::config::Config;
use picker_core::error::{Error, Result};
use picker_core::reservation::ReservationCoordinator;
use picker_core::scryfall::ImageResolver;
use picker_core::sheet::{MemorySheet, SheetStore};

// ============================================================================
// Health and Ready Responses
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Whether the sheet service is initialized.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
///
/// Constructed once at startup and injected by reference; there is no
/// global service singleton.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Snapshot cache over the sheet store.
    pub cache: Arc<SheetCache>,
    /// Reservation coordinator.
    pub coordinator: Arc<ReservationCoordinator>,
    /// Card image resolver.
    pub images: Arc<ImageResolver>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("cache", &"<SheetCache>")
            .field("coordinator", &"<ReservationCoordinator>")
            .field("images", &"<ImageResolver>")
            .finish()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint handler.
///
/// Returns 200 OK if the service is alive. This is a shallow check that
/// doesn't verify dependencies.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check endpoint handler.
///
/// Ready once a sheet snapshot has been loaded; if none has, a refresh is
/// attempted so the first probe also primes the cache.
async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.cache.primed().await {
        return (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        );
    }

    match state.cache.refresh().await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some(format!("sheet check failed: {e}")),
            }),
        ),
    }
}

// ============================================================================
// Server
// ============================================================================

/// The picker API server.
pub struct Server {
    config: Config,
    store: Arc<dyn SheetStore>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("store", &"<SheetStore>")
            .finish()
    }
}

impl Server {
    /// Creates a new server with the given configuration.
    ///
    /// Defaults to an empty in-memory sheet; use [`Server::with_store`]
    /// for production.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: Arc::new(MemorySheet::empty()),
        }
    }

    /// Creates a new server with an explicit sheet store.
    #[must_use]
    pub fn with_store(config: Config, store: Arc<dyn SheetStore>) -> Self {
        Self { config, store }
    }

    /// Creates a new `ServerBuilder`.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the router with all routes and middleware.
    fn create_router(&self) -> Router {
        let cache = Arc::new(SheetCache::new(
            Arc::clone(&self.store),
            self.config.cache_ttl(),
        ));
        let coordinator = Arc::new(ReservationCoordinator::new(
            Arc::clone(&self.store),
            Arc::clone(&cache),
        ));
        let images = Arc::new(ImageResolver::from_config(&self.config));
        let state = Arc::new(AppState {
            config: self.config.clone(),
            cache,
            coordinator,
            images,
        });

        let cors = self.build_cors_layer();

        let mut router = Router::new()
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/openapi.json", get(crate::openapi::get_openapi_json))
            .nest("/api/v1", crate::routes::api_v1_routes())
            .nest_service("/images", ServeDir::new(&self.config.image_cache_dir));

        // Frontend catch-all: unknown paths fall back to index.html so
        // client-side routing works.
        if let Some(static_dir) = self.config.static_dir.as_ref() {
            tracing::info!(dir = %static_dir.display(), "serving frontend build");
            let index = static_dir.join("index.html");
            router = router
                .fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index)));
        }

        router
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Builds the CORS layer from configuration.
    fn build_cors_layer(&self) -> CorsLayer {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderName::from_static(crate::routes::admin::ADMIN_SECRET_HEADER),
            ])
            .max_age(Duration::from_secs(self.config.cors_max_age_seconds));

        let origins = &self.config.cors_allowed_origins;
        if origins.is_empty() {
            return cors;
        }
        if origins.len() == 1 && origins[0] == "*" {
            return cors.allow_origin(Any);
        }
        if origins.iter().any(|origin| origin == "*") {
            tracing::error!(
                origins = ?origins,
                "Invalid CORS config: '*' must be the only allowed origin"
            );
            return cors;
        }

        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::error!(origin = %origin, "Invalid CORS origin");
                    None
                }
            })
            .collect();

        if allowed.is_empty() {
            tracing::warn!("All configured CORS origins were invalid; disabling CORS");
            cors
        } else {
            cors.allow_origin(AllowOrigin::list(allowed))
        }
    }

    /// Starts the server and blocks until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the server
    /// cannot bind to its port.
    pub async fn serve(&self) -> Result<()> {
        self.config.validate()?;

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.create_router();

        tracing::info!(http_port = self.config.http_port, "Starting picker API server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::internal(format!("failed to bind to {addr}: {e}")))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::internal(format!("server error: {e}")))?;

        Ok(())
    }

    /// Creates a test router for the server.
    ///
    /// This is useful for integration tests where you want to exercise
    /// the routes without binding to a port.
    #[doc(hidden)]
    #[must_use]
    pub fn test_router(&self) -> Router {
        self.create_router()
    }
}

/// Builder for constructing a server.
pub struct ServerBuilder {
    config: Config,
    store: Arc<dyn SheetStore>,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("store", &"<SheetStore>")
            .finish()
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            store: Arc::new(MemorySheet::empty()),
        }
    }
}

impl ServerBuilder {
    /// Creates a new server builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the HTTP port.
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    /// Enables debug mode.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    /// Sets the sheet store used by request handlers.
    ///
    /// By default the server uses an empty in-memory sheet intended only
    /// for tests/dev.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn SheetStore>) -> Self {
        self.store = store;
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        Server {
            config: self.config,
            store: self.store,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
