//! `axum` middlewares which run before every route handler.
//!
//! They expect the `Arc<Application>` to be present in the request extensions.
pub mod logging;
pub mod rate_limit;
