use std::{sync::Arc, time::Instant};

use axum::{http::Request, middleware::Next, response::Response};
use slog::info;

use crate::{middleware::rate_limit::request_client_id, store::AdSpotStore, Application};

/// Logs every request once its response is ready.
pub async fn log_request<S: AdSpotStore, B>(request: Request<B>, next: Next<B>) -> Response
where
    B: Send,
{
    let logger = request
        .extensions()
        .get::<Arc<Application<S>>>()
        .expect("Application should always be present")
        .logger
        .clone();

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let client_id = request_client_id(&request);
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        &logger,
        "{} {}", method, path;
        "module" => "middleware::logging",
        "status" => response.status().as_u16(),
        "latency_ms" => started.elapsed().as_millis() as u64,
        "client" => client_id,
    );

    response
}
