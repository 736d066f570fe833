pub mod handlers;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::handlers::{health, predict};
use crate::config::CorsConfig;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { "Dementia Risk Predictor Online" }))
        .route("/health", get(health))
        .route("/predict", post(predict))
}

/// Credentials are allowed, so methods and headers are mirrored from the
/// preflight instead of using a wildcard.
pub fn cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    let origins = config
        .allowed_origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin '{}'", o))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

pub fn app(state: AppState, cors: &CorsConfig) -> Result<Router> {
    Ok(routes()
        .layer(cors_layer(cors)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
