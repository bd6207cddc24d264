pub mod health;

use std::any::Any;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::errors::AppError;
use crate::pitch::handlers;
use crate::rate_limit::rate_limit;
use crate::state::AppState;

/// CORS restricted to the configured origins. Unparseable origins are skipped.
///
/// A `*` entry echoes the caller's origin back, since a literal wildcard is
/// not allowed together with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    if origins.iter().any(|origin| origin == "*") {
        warn!("ALLOWED_ORIGINS contains '*'; any browser origin will be accepted");
        return base.allow_origin(AllowOrigin::mirror_request());
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();

    base.allow_origin(origins)
}

/// Turns a handler panic into the generic 500 body.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

pub fn build_router(state: AppState) -> Router {
    // Only the pitch route is rate limited; /health stays a pure liveness probe.
    let pitch_routes = Router::new()
        .route("/generate-pitch", post(handlers::handle_generate_pitch))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(pitch_routes)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
