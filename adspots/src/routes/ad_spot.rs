//! `/adspots` routes
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query},
    Extension,
};
use primitives::{
    ad_spot::{AdSpotListQuery, CreateAdSpot},
    api::{DeactivateResponse, ErrorResponse},
    AdSpot, Timestamp,
};
use slog::{error, info};

use crate::{
    response::{ApiJson, ResponseError},
    store::AdSpotStore,
    Application,
};

/// `POST /adspots`
///
/// Unknown fields are rejected and every validation error is reported at once.
pub async fn create_ad_spot<S: AdSpotStore>(
    Extension(app): Extension<Arc<Application<S>>>,
    body: Bytes,
) -> Result<ApiJson<AdSpot>, ResponseError> {
    let request = serde_json::from_slice::<CreateAdSpot>(&body).map_err(|err| {
        ResponseError::BadRequest(
            ErrorResponse::new("Failed to decode JSON payload").with_context(err),
        )
    })?;

    let new_ad_spot = request.validate().map_err(|errors| {
        ResponseError::BadRequest(
            ErrorResponse::new("Failed to validate JSON payload").with_context_list(errors.0),
        )
    })?;

    let ad_spot = new_ad_spot.into_ad_spot(Timestamp::new(app.clock.now()));

    app.store.insert(&ad_spot).await.map_err(|err| {
        error!(&app.logger, "Failed to persist ad spot: {}", err; "module" => "routes::ad_spot");

        ResponseError::Internal(ErrorResponse::new("Failed to persist ad spot").with_context(err))
    })?;

    info!(&app.logger, "Created ad spot"; "module" => "routes::ad_spot", "id" => &ad_spot.id);

    Ok(ApiJson(ad_spot))
}

/// `GET /adspots/:id`
pub async fn get_ad_spot<S: AdSpotStore>(
    Extension(app): Extension<Arc<Application<S>>>,
    id: Option<Path<String>>,
) -> Result<ApiJson<AdSpot>, ResponseError> {
    let id = required_id(id)?;

    let ad_spot = app.store.find(&id).await.map_err(|err| {
        error!(&app.logger, "Failed to fetch ad spot: {}", err; "module" => "routes::ad_spot", "id" => &id);

        ResponseError::Internal(ErrorResponse::new("Database request failed").with_context(err))
    })?;

    match ad_spot {
        Some(ad_spot) => Ok(ApiJson(ad_spot)),
        None => Err(ResponseError::NotFound(
            ErrorResponse::new("Could not find ad spot with requested ID").with_id(id),
        )),
    }
}

/// `POST /adspots/:id/deactivate`
///
/// Unknown and already inactive spots get the same `400 Bad Request`.
pub async fn deactivate_ad_spot<S: AdSpotStore>(
    Extension(app): Extension<Arc<Application<S>>>,
    id: Option<Path<String>>,
) -> Result<ApiJson<DeactivateResponse>, ResponseError> {
    let id = required_id(id)?;
    let deactivated_at = Timestamp::new(app.clock.now());

    let affected = app.store.deactivate(&id, deactivated_at).await.map_err(|err| {
        error!(&app.logger, "Failed to deactivate ad spot: {}", err; "module" => "routes::ad_spot", "id" => &id);

        ResponseError::Internal(
            ErrorResponse::new("Failed to execute database update").with_context(err),
        )
    })?;

    if affected == 0 {
        return Err(ResponseError::BadRequest(ErrorResponse::new(
            "Ad spot was not found, or was already inactive",
        )));
    }

    info!(&app.logger, "Deactivated ad spot"; "module" => "routes::ad_spot", "id" => &id);

    Ok(ApiJson(DeactivateResponse::new(id)))
}

/// `GET /adspots?placement=...&status=...`
pub async fn list_ad_spots<S: AdSpotStore>(
    Extension(app): Extension<Arc<Application<S>>>,
    query: Result<Query<AdSpotListQuery>, QueryRejection>,
) -> Result<ApiJson<Vec<AdSpot>>, ResponseError> {
    let Query(query) = query.map_err(|rejection| {
        ResponseError::BadRequest(
            ErrorResponse::new("Failed to decode query parameters").with_context(rejection),
        )
    })?;

    let filter = query
        .filter()
        .map_err(|err| ResponseError::BadRequest(ErrorResponse::new(err.to_string())))?;

    let mut ad_spots = app.store.list(&filter).await.map_err(|err| {
        error!(&app.logger, "Failed to list ad spots: {}", err; "module" => "routes::ad_spot");

        ResponseError::Internal(
            ErrorResponse::new("Failed to execute database query").with_context(err),
        )
    })?;

    // expiry is only applied to the active spots,
    // an expired spot keeps its persisted status
    if filter.excludes_expired() {
        let now = app.clock.now();
        ad_spots.retain(|ad_spot| !ad_spot.is_expired_at(now));
    }

    Ok(ApiJson(ad_spots))
}

fn required_id(id: Option<Path<String>>) -> Result<String, ResponseError> {
    match id {
        Some(Path(id)) if !id.is_empty() => Ok(id),
        _ => Err(ResponseError::BadRequest(ErrorResponse::new(
            "ID parameter is missing",
        ))),
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Method, Request, StatusCode},
        response::Response,
        Router,
    };
    use pretty_assertions::assert_eq;
    use primitives::{
        ad_spot::create::{INVALID_PLACEMENT, MISSING_IMAGE_URL, MISSING_TITLE},
        test_util::{dummy_ad_spot, dummy_create_request, MockClock},
        Clock, Placement, Status,
    };
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};
    use tower::Service;

    use crate::{
        response::JSON_CONTENT_TYPE,
        routes::router,
        store::MemoryStore,
        test_util::{body_to_string, setup_memory_app, unlimited},
    };

    use super::*;

    async fn call(router: &mut Router, method: Method, uri: &str, body: Body) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .expect("Should build Request");

        router.call(request).await.expect("Router is infallible")
    }

    async fn json<T: DeserializeOwned>(response: Response) -> T {
        assert_eq!(JSON_CONTENT_TYPE, response.headers()[CONTENT_TYPE]);

        serde_json::from_str(&body_to_string(response).await).expect("Should be valid JSON")
    }

    fn setup() -> (Arc<MockClock>, Arc<Application<MemoryStore>>, Router) {
        let (clock, app) = setup_memory_app(unlimited());
        let app = Arc::new(app);
        let router = router(app.clone());

        (clock, app, router)
    }

    #[tokio::test]
    async fn create_and_get() {
        let (clock, app, mut router) = setup();

        let request = serde_json::to_string(&CreateAdSpot {
            ttl_minutes: Some(30),
            ..dummy_create_request("Spring sale", Placement::RideSummary)
        })
        .unwrap();

        let response = call(&mut router, Method::POST, "/adspots", Body::from(request)).await;
        assert_eq!(StatusCode::OK, response.status());

        let created: AdSpot = json(response).await;
        assert_eq!("Spring sale", created.title);
        assert_eq!(Placement::RideSummary, created.placement);
        assert_eq!(Status::Active, created.status);
        assert_eq!(Some(30), created.ttl_minutes);
        assert_eq!(Timestamp::new(clock.now()), created.created_at);
        assert_eq!(None, created.deactivated_at);

        let stored = app.store.find(&created.id).await.unwrap();
        assert_eq!(Some(&created), stored.as_ref());

        let uri = format!("/adspots/{}", created.id);
        let response = call(&mut router, Method::GET, &uri, Body::empty()).await;
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(created, json::<AdSpot>(response).await);
    }

    #[tokio::test]
    async fn create_reports_decode_and_validation_errors() {
        let (_clock, app, mut router) = setup();

        let response = call(&mut router, Method::POST, "/adspots", Body::from("{not json")).await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        let body: Value = json(response).await;
        assert_eq!(json!("Failed to decode JSON payload"), body["what"]);
        assert!(body["context"].is_string());

        let unknown_field = json!({
            "title": "title",
            "imageUrl": "https://example.com/a.png",
            "placement": "map_view",
            "status": "inactive",
        });
        let response = call(
            &mut router,
            Method::POST,
            "/adspots",
            Body::from(unknown_field.to_string()),
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        let body: Value = json(response).await;
        assert_eq!(json!("Failed to decode JSON payload"), body["what"]);

        let invalid = json!({ "placement": "sidebar" });
        let response = call(
            &mut router,
            Method::POST,
            "/adspots",
            Body::from(invalid.to_string()),
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        assert_eq!(
            json!({
                "what": "Failed to validate JSON payload",
                "context": [MISSING_TITLE, MISSING_IMAGE_URL, INVALID_PLACEMENT],
            }),
            json::<Value>(response).await
        );

        let nothing_stored = app.store.list(&Default::default()).await.unwrap();
        assert!(nothing_stored.is_empty());
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let (_clock, _app, mut router) = setup();

        let response = call(&mut router, Method::GET, "/adspots/missing", Body::empty()).await;

        assert_eq!(StatusCode::NOT_FOUND, response.status());
        assert_eq!(
            json!({ "what": "Could not find ad spot with requested ID", "id": "missing" }),
            json::<Value>(response).await
        );
    }

    #[tokio::test]
    async fn deactivate_twice() {
        let (clock, app, mut router) = setup();
        let ad_spot = dummy_ad_spot("spot-1", Status::Active, None, clock.as_ref());
        app.store.insert(&ad_spot).await.unwrap();

        clock.advance(Duration::from_secs(120));
        let first_call = Timestamp::new(clock.now());

        let response = call(
            &mut router,
            Method::POST,
            "/adspots/spot-1/deactivate",
            Body::empty(),
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(
            json!({ "message": "Ad spot deactivated successfully", "id": "spot-1" }),
            json::<Value>(response).await
        );

        clock.advance(Duration::from_secs(120));
        let response = call(
            &mut router,
            Method::POST,
            "/adspots/spot-1/deactivate",
            Body::empty(),
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        assert_eq!(
            json!({ "what": "Ad spot was not found, or was already inactive" }),
            json::<Value>(response).await
        );

        let stored = app.store.find("spot-1").await.unwrap().expect("Should exist");
        assert_eq!(Status::Inactive, stored.status);
        assert_eq!(Some(first_call), stored.deactivated_at);

        let unknown = call(
            &mut router,
            Method::POST,
            "/adspots/unknown/deactivate",
            Body::empty(),
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, unknown.status());
    }

    #[tokio::test]
    async fn list_active_leaves_out_expired() {
        let (clock, app, mut router) = setup();

        for (id, status, ttl) in [
            ("A", Status::Active, None),
            ("B", Status::Active, Some(120)),
            ("C", Status::Active, Some(30)),
            ("D", Status::Inactive, None),
        ] {
            let ad_spot = dummy_ad_spot(id, status, ttl, clock.as_ref());
            app.store.insert(&ad_spot).await.unwrap();
            // distinct creation times, so the order is defined
            clock.advance(Duration::from_secs(1));
        }

        clock.advance(Duration::from_secs(60 * 60));

        let ids = |ad_spots: Vec<AdSpot>| {
            ad_spots
                .into_iter()
                .map(|ad_spot| ad_spot.id)
                .collect::<Vec<_>>()
        };

        let response = call(&mut router, Method::GET, "/adspots?status=active", Body::empty()).await;
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(vec!["B", "A"], ids(json(response).await));

        // the expired "C" is still listed without the active filter
        let response = call(&mut router, Method::GET, "/adspots", Body::empty()).await;
        assert_eq!(vec!["D", "C", "B", "A"], ids(json(response).await));

        let response = call(&mut router, Method::GET, "/adspots?status=inactive", Body::empty()).await;
        assert_eq!(vec!["D"], ids(json(response).await));
    }

    #[tokio::test]
    async fn list_filters_by_placement() {
        let (clock, app, mut router) = setup();

        for (id, placement) in [
            ("home", Placement::HomeScreen),
            ("map", Placement::MapView),
            ("summary", Placement::RideSummary),
        ] {
            let mut ad_spot = dummy_ad_spot(id, Status::Active, None, clock.as_ref());
            ad_spot.placement = placement;
            app.store.insert(&ad_spot).await.unwrap();
        }

        let response = call(
            &mut router,
            Method::GET,
            "/adspots?placement=map_view&status=",
            Body::empty(),
        )
        .await;
        let ad_spots: Vec<AdSpot> = json(response).await;

        assert_eq!(1, ad_spots.len());
        assert_eq!("map", ad_spots[0].id);
    }

    #[tokio::test]
    async fn list_rejects_invalid_filters() {
        let (_clock, _app, mut router) = setup();

        for (uri, what) in [
            ("/adspots?placement=sidebar", "Invalid value for placement field"),
            ("/adspots?status=true", "Invalid value for status field"),
            ("/adspots?status=Active", "Invalid value for status field"),
        ] {
            let response = call(&mut router, Method::GET, uri, Body::empty()).await;

            assert_eq!(StatusCode::BAD_REQUEST, response.status(), "{uri}");
            assert_eq!(json!({ "what": what }), json::<Value>(response).await);
        }
    }
}
