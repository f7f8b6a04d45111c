//! Assembles the Ad Spots REST API [`Router`].
//!
//! The layers, from the outermost:
//!
//! - [`Extension`] with the `Arc<Application>`
//! - [`log_request`]
//! - [`rate_limit`], so even timed out requests get the `X-RateLimit-*` headers
//! - [`TimeoutLayer`] with the configured `request_timeout`
use std::sync::Arc;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Extension, Router,
};
use tower_http::timeout::TimeoutLayer;

use crate::{
    middleware::{logging::log_request, rate_limit::rate_limit},
    routes::ad_spot::{create_ad_spot, deactivate_ad_spot, get_ad_spot, list_ad_spots},
    store::AdSpotStore,
    Application,
};

pub fn router<S: AdSpotStore>(app: Arc<Application<S>>) -> Router {
    let routes = Router::new()
        .route(
            "/adspots",
            get(list_ad_spots::<S>).post(create_ad_spot::<S>),
        )
        .route("/adspots/:id", get(get_ad_spot::<S>))
        .route("/adspots/:id/deactivate", post(deactivate_ad_spot::<S>));

    with_layers(routes, app)
}

fn with_layers<S: AdSpotStore>(routes: Router, app: Arc<Application<S>>) -> Router {
    let request_timeout = app.config.request_timeout;

    routes
        .layer(TimeoutLayer::new(request_timeout))
        .layer(from_fn(rate_limit::<S, _>))
        .layer(from_fn(log_request::<S, _>))
        .layer(Extension(app))
}
