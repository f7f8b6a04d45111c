//! Ad Spots REST API documentation
//!
//! All request and response bodies are JSON, responses use the
//! `Content-Type: application/json; charset=utf-8` header.
//!
//! Every route is rate limited per client,
//! see [`rate_limit`](crate::middleware::rate_limit::rate_limit).
//!
//! Failed requests respond with an [`ErrorResponse`](primitives::api::ErrorResponse).
//!
//! # Routes
//!
//! - [`POST /adspots`](ad_spot::create_ad_spot)
//!
//!   Request body: [`CreateAdSpot`](primitives::ad_spot::CreateAdSpot)
//!
//!   Response: the created [`AdSpot`](primitives::AdSpot)
//!
//! - [`GET /adspots/:id`](ad_spot::get_ad_spot)
//!
//!   Response: [`AdSpot`](primitives::AdSpot)
//!
//! - [`POST /adspots/:id/deactivate`](ad_spot::deactivate_ad_spot)
//!
//!   Response: [`DeactivateResponse`](primitives::api::DeactivateResponse)
//!
//! - [`GET /adspots`](ad_spot::list_ad_spots)
//!
//!   Query: [`AdSpotListQuery`](primitives::ad_spot::AdSpotListQuery)
//!
//!   Response: `[AdSpot]`, newest first.
//!   Expired spots are left out only when `?status=active` is requested.
pub use routers::router;

pub mod ad_spot;
pub mod routers;
