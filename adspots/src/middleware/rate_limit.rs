use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    extract::ConnectInfo,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use primitives::api::ErrorResponse;
use slog::debug;

use crate::{response::ResponseError, store::AdSpotStore, Application};

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RETRY_AFTER: &str = "retry-after";

/// Used when the peer address isn't known, e.g. the server wasn't started
/// with `into_make_service_with_connect_info`.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// The client is identified by the first of:
///
/// 1. `X-Forwarded-For`, only if the whole value is a single IP address
/// 2. `X-Real-IP`, only if it's a valid IP address
/// 3. the IP of the peer, without the port
///
/// The id is the canonical text of the address, so every spelling of the same
/// address shares one bucket. IPv4-mapped IPv6 addresses are identified by their IPv4 address.
pub fn client_id(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> String {
    ["x-forwarded-for", "x-real-ip"]
        .into_iter()
        .filter_map(|name| headers.get(name)?.to_str().ok())
        .find_map(|value| value.trim().parse::<IpAddr>().ok())
        .or_else(|| remote_addr.map(|addr| addr.ip()))
        .map(|ip| canonical(ip).to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        IpAddr::V4(_) => ip,
    }
}

pub(crate) fn request_client_id<B>(request: &Request<B>) -> String {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0);

    client_id(request.headers(), remote_addr)
}

/// Takes a token from the client's bucket or responds with `429 Too Many Requests`.
///
/// Every response gets the `X-RateLimit-Limit` and `X-RateLimit-Remaining` headers.
pub async fn rate_limit<S: AdSpotStore, B>(request: Request<B>, next: Next<B>) -> Response
where
    B: Send,
{
    let (limiter, logger) = {
        let app = request
            .extensions()
            .get::<Arc<Application<S>>>()
            .expect("Application should always be present");

        (app.limiter.clone(), app.logger.clone())
    };

    let client_id = request_client_id(&request);
    let decision = limiter.acquire(&client_id);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        debug!(&logger, "Rate limit exceeded"; "module" => "middleware::rate_limit", "client" => &client_id);

        let mut response = ResponseError::TooManyRequests(
            ErrorResponse::new("Rate limit exceeded")
                .with_message("Too many requests. Please try again later."),
        )
        .into_response();
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(1_u32));

        response
    };

    let headers = response.headers_mut();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limiter.limit()));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));

    response
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::StatusCode,
        middleware::from_fn,
        routing::get,
        Extension, Router,
    };
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::Service;

    use crate::{
        limiter::RateLimiterConfig,
        store::MemoryStore,
        test_util::{body_to_string, setup_memory_app},
    };

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        pairs
            .iter()
            .map(|(name, value)| {
                (
                    axum::http::header::HeaderName::from_static(name),
                    HeaderValue::from_static(value),
                )
            })
            .collect()
    }

    #[test]
    fn client_id_precedence() {
        let remote: SocketAddr = "192.168.1.1:12345".parse().unwrap();

        assert_eq!("192.168.1.1", client_id(&HeaderMap::new(), Some(remote)));
        assert_eq!(UNKNOWN_CLIENT, client_id(&HeaderMap::new(), None));

        let forwarded = headers(&[("x-forwarded-for", "10.0.0.1"), ("x-real-ip", "10.0.0.2")]);
        assert_eq!("10.0.0.1", client_id(&forwarded, Some(remote)));

        let real_ip = headers(&[("x-real-ip", "2001:db8::1")]);
        assert_eq!("2001:db8::1", client_id(&real_ip, Some(remote)));

        let ipv6_peer: SocketAddr = "[::1]:8080".parse().unwrap();
        assert_eq!("::1", client_id(&HeaderMap::new(), Some(ipv6_peer)));
    }

    #[test]
    fn client_id_is_the_canonical_address() {
        let remote: SocketAddr = "192.168.1.1:12345".parse().unwrap();

        let lowercase = headers(&[("x-forwarded-for", "2001:db8::1")]);
        let uppercase = headers(&[("x-forwarded-for", "2001:DB8:0:0::1")]);
        assert_eq!("2001:db8::1", client_id(&lowercase, Some(remote)));
        assert_eq!("2001:db8::1", client_id(&uppercase, Some(remote)));

        let mapped = headers(&[("x-forwarded-for", "::ffff:10.0.0.1")]);
        assert_eq!("10.0.0.1", client_id(&mapped, Some(remote)));

        let real_ip = headers(&[("x-real-ip", " 0:0:0:0:0:ffff:a00:2 ")]);
        assert_eq!("10.0.0.2", client_id(&real_ip, Some(remote)));

        let mapped_peer: SocketAddr = "[::ffff:192.168.1.7]:8080".parse().unwrap();
        assert_eq!("192.168.1.7", client_id(&HeaderMap::new(), Some(mapped_peer)));
    }

    #[tokio::test]
    async fn spellings_of_one_address_share_a_bucket() {
        let (_clock, app) = setup_memory_app(RateLimiterConfig {
            requests_per_second: 1,
            burst_size: 1,
            cleanup_interval: Duration::from_secs(60),
        });
        let mut router = router(Arc::new(app));

        let request = |forwarded_for: &str| {
            Request::builder()
                .uri("/")
                .header("x-forwarded-for", forwarded_for)
                .body(Body::empty())
                .unwrap()
        };

        let first = router.call(request("2001:db8::1")).await.unwrap();
        assert_eq!(StatusCode::OK, first.status());

        let respelled = router.call(request("2001:DB8:0:0::1")).await.unwrap();
        assert_eq!(StatusCode::TOO_MANY_REQUESTS, respelled.status());
    }

    #[test]
    fn invalid_headers_fall_through() {
        let remote: SocketAddr = "192.168.1.1:12345".parse().unwrap();

        // a list of hops is not a single IP address
        let multi_hop = headers(&[
            ("x-forwarded-for", "10.0.0.1, 10.0.0.2"),
            ("x-real-ip", "10.0.0.3"),
        ]);
        assert_eq!("10.0.0.3", client_id(&multi_hop, Some(remote)));

        let garbage = headers(&[("x-forwarded-for", "unknown"), ("x-real-ip", "localhost")]);
        assert_eq!("192.168.1.1", client_id(&garbage, Some(remote)));
    }

    fn router(app: Arc<Application<MemoryStore>>) -> Router {
        async fn handle() -> &'static str {
            "Ok"
        }

        Router::new()
            .route("/", get(handle))
            .layer(from_fn(rate_limit::<MemoryStore, _>))
            .layer(Extension(app))
    }

    fn request_from(remote: &str) -> Request<Body> {
        let remote: SocketAddr = remote.parse().expect("Valid socket address");

        Request::builder()
            .uri("/")
            .extension(ConnectInfo(remote))
            .body(Body::empty())
            .expect("Should build Request")
    }

    #[tokio::test]
    async fn denies_with_429_and_headers() {
        let (_clock, app) = setup_memory_app(RateLimiterConfig {
            requests_per_second: 2,
            burst_size: 2,
            cleanup_interval: Duration::from_secs(60),
        });
        let mut router = router(Arc::new(app));

        let mut statuses = vec![];
        let mut last = None;
        for _ in 0..3 {
            let response = router
                .call(request_from("192.168.1.1:12345"))
                .await
                .unwrap();
            statuses.push(response.status());
            last = Some(response);
        }

        assert_eq!(
            vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS],
            statuses
        );

        let denied = last.expect("Should have a response");
        assert_eq!("2", denied.headers()[X_RATELIMIT_LIMIT]);
        assert_eq!("0", denied.headers()[X_RATELIMIT_REMAINING]);
        assert_eq!("1", denied.headers()[RETRY_AFTER]);

        let body: Value = serde_json::from_str(&body_to_string(denied).await).unwrap();
        assert_eq!(
            json!({
                "what": "Rate limit exceeded",
                "message": "Too many requests. Please try again later.",
            }),
            body
        );
    }

    #[tokio::test]
    async fn allowed_responses_report_the_remaining_tokens() {
        let (clock, app) = setup_memory_app(RateLimiterConfig {
            requests_per_second: 1,
            burst_size: 3,
            cleanup_interval: Duration::from_secs(60),
        });
        let mut router = router(Arc::new(app));

        for expected in ["2", "1", "0"] {
            let response = router.call(request_from("10.1.1.1:1000")).await.unwrap();

            assert_eq!(StatusCode::OK, response.status());
            assert_eq!("1", response.headers()[X_RATELIMIT_LIMIT]);
            assert_eq!(expected, response.headers()[X_RATELIMIT_REMAINING]);
            assert!(response.headers().get(RETRY_AFTER).is_none());
        }

        // the port doesn't matter, a different client does
        let other_port = router.call(request_from("10.1.1.1:2000")).await.unwrap();
        assert_eq!(StatusCode::TOO_MANY_REQUESTS, other_port.status());

        let other_client = router.call(request_from("10.1.1.2:1000")).await.unwrap();
        assert_eq!(StatusCode::OK, other_client.status());

        clock.advance(Duration::from_secs(1));
        let refilled = router.call(request_from("10.1.1.1:1000")).await.unwrap();
        assert_eq!(StatusCode::OK, refilled.status());
        assert_eq!("0", refilled.headers()[X_RATELIMIT_REMAINING]);
    }
}
