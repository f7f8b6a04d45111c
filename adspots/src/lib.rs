#![deny(clippy::all)]
#![deny(rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! The Ad Spots REST API server.
//!
//! See [`routes`] for the list of endpoints.

use std::sync::Arc;

use primitives::{Clock, Config};
use slog::Logger;

use crate::{
    limiter::{RateLimiter, RateLimiterConfig},
    store::AdSpotStore,
};

pub mod application;
pub mod db;
pub mod limiter;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod store;

#[cfg(test)]
pub mod test_util;

/// The state shared by every request.
#[derive(Debug)]
pub struct Application<S: AdSpotStore> {
    pub store: S,
    pub logger: Logger,
    pub config: Config,
    pub limiter: Arc<RateLimiter>,
    pub clock: Arc<dyn Clock>,
}

impl<S: AdSpotStore> Application<S> {
    pub fn new(store: S, config: Config, logger: Logger, clock: Arc<dyn Clock>) -> Self {
        let limiter = RateLimiter::new(RateLimiterConfig::from(config.rate_limit), clock.clone());

        Self {
            store,
            logger,
            config,
            limiter: Arc::new(limiter),
            clock,
        }
    }
}
