use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::PitchGenerator;
use crate::rate_limit::RateLimiter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Provider behind a trait so tests can swap in a stub.
    pub generator: Arc<dyn PitchGenerator>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Config, generator: Arc<dyn PitchGenerator>) -> Self {
        let rate_limiter = Arc::new(RateLimiter::per_minute(
            config.rate_limit_per_minute,
            config.trust_forwarded_for,
        ));
        Self {
            config: Arc::new(config),
            generator,
            rate_limiter,
        }
    }
}
