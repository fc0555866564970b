pub mod health;
pub mod pages;
pub mod upload;
pub mod view;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use ephemera_lifecycle::{Janitor, Lifecycle, LifecycleCoordinator};

use crate::config::{EphemeraConfig, UploadConfig};
use crate::error::ServerError;
use pages::Templates;

/// Room for multipart boundaries and the small form fields.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: LifecycleCoordinator,
    /// Janitor used by `POST /api/cleanup`.
    pub janitor: Janitor,
    pub upload: Arc<UploadConfig>,
    /// Base URL for share links, without a trailing slash.
    pub external_url: Arc<str>,
    /// Grant lifetime, quoted in upload confirmations.
    pub ttl_hours: u32,
    pub templates: Arc<Templates>,
    /// Parsed CORS origins; empty means any origin.
    pub allowed_origins: Arc<[HeaderValue]>,
}

impl AppState {
    /// Assemble the state from a built lifecycle and the server config.
    pub fn new(lifecycle: Lifecycle, config: &EphemeraConfig) -> Result<Self, ServerError> {
        let allowed_origins = config
            .server
            .allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|e| ServerError::Config(format!("invalid origin {origin:?}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            coordinator: lifecycle.coordinator,
            janitor: lifecycle.janitor,
            upload: Arc::new(config.upload.clone()),
            external_url: Arc::from(config.server.external_url()),
            ttl_hours: config.grants.ttl_hours,
            templates: Arc::new(Templates::new()?),
            allowed_origins: allowed_origins.into(),
        })
    }

    fn cors_layer(&self) -> CorsLayer {
        if self.allowed_origins.is_empty() {
            return CorsLayer::permissive();
        }
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.allowed_origins.iter().cloned()))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
    }
}

/// Build the Axum router with all pages, API routes and middleware.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.upload.max_bytes.saturating_add(FORM_OVERHEAD_BYTES);
    let cors = state.cors_layer();

    Router::new()
        .route("/", get(pages::index))
        .route("/view/{token}", get(pages::view_page))
        .route(
            "/upload",
            post(upload::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/grants/{token}", get(view::describe))
        .route("/api/view/{token}", post(view::view))
        .route("/api/cleanup", post(health::cleanup))
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
