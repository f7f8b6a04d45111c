//! Testing utilities for the Ad Spots Application
use std::{sync::Arc, time::Duration};

use axum::{body::BoxBody, http::Response};
use primitives::{
    config::DEVELOPMENT_CONFIG,
    test_util::{discard_logger, MockClock},
};

use crate::{limiter::RateLimiterConfig, store::MemoryStore, Application};

/// A rate limit which the tests won't hit.
pub fn unlimited() -> RateLimiterConfig {
    RateLimiterConfig {
        requests_per_second: 1_000,
        burst_size: 1_000,
        cleanup_interval: Duration::from_secs(60),
    }
}

/// An [`Application`] with an empty [`MemoryStore`], driven by the returned [`MockClock`].
pub fn setup_memory_app(
    rate_limit: RateLimiterConfig,
) -> (Arc<MockClock>, Application<MemoryStore>) {
    let clock = Arc::new(MockClock::default());

    let mut config = DEVELOPMENT_CONFIG.clone();
    config.rate_limit.requests_per_second = rate_limit.requests_per_second;
    config.rate_limit.burst_size = rate_limit.burst_size;
    config.rate_limit.cleanup_interval = rate_limit.cleanup_interval;

    let app = Application::new(MemoryStore::default(), config, discard_logger(), clock.clone());

    (clock, app)
}

pub async fn body_to_string(response: Response<BoxBody>) -> String {
    String::from_utf8(
        hyper::body::to_bytes(response.into_body())
            .await
            .expect("Should read the body")
            .to_vec(),
    )
    .expect("Body should be valid UTF-8")
}
