use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{HeaderMap, Method, Request, Response, StatusCode, Uri};

use super::*;
use crate::config::{RateLimitPolicy, RouteConfig};
use crate::http::upstream::UpstreamError;

#[derive(Debug, Clone, Copy)]
enum Behaviour {
    Respond,
    Fail,
    Hang,
    StallBody,
}

#[derive(Debug)]
struct Recorded {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

/// Upstream double that records what it was sent.
#[derive(Debug, Clone)]
struct RecordingUpstream {
    behaviour: Behaviour,
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingUpstream {
    fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> std::sync::MutexGuard<'_, Vec<Recorded>> {
        self.calls.lock().unwrap()
    }
}

impl Upstream for RecordingUpstream {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, UpstreamError> {
        let (parts, body) = request.into_parts();
        let body = to_bytes(body, 1024 * 1024).await.map_err(UpstreamError::new)?;
        self.calls.lock().unwrap().push(Recorded {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        });

        match self.behaviour {
            Behaviour::Respond => Ok(Response::builder()
                .status(StatusCode::OK)
                .header("x-backend", "h5")
                .body(Body::from("pong"))
                .unwrap()),
            Behaviour::Fail => Err(UpstreamError::new("connection refused")),
            Behaviour::Hang => std::future::pending().await,
            Behaviour::StallBody => Ok(Response::new(Body::from_stream(
                futures_util::stream::pending::<Result<Bytes, std::io::Error>>(),
            ))),
        }
    }
}

fn config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.auth.token = "abc".into();
    config.auth.whitelist = vec!["/h5/login".into()];
    config.timeouts.backend_secs = 2;
    config.routes = vec![
        RouteConfig {
            id: "h5".into(),
            path: "/h5/**".into(),
            uri: "http://10.0.0.1:801".into(),
            strip_prefix: false,
            rate_limit: None,
        },
        RouteConfig {
            id: "otc".into(),
            path: "/otc/**".into(),
            uri: "http://10.0.0.2:801/api".into(),
            strip_prefix: true,
            rate_limit: Some(RateLimitPolicy {
                replenish_rate: 1,
                burst_capacity: 2,
            }),
        },
    ];
    config
}

fn pipeline(behaviour: Behaviour) -> (Pipeline<RecordingUpstream>, RecordingUpstream) {
    pipeline_with(&config(), behaviour)
}

fn pipeline_with(
    config: &GatewayConfig,
    behaviour: Behaviour,
) -> (Pipeline<RecordingUpstream>, RecordingUpstream) {
    let upstream = RecordingUpstream::new(behaviour);
    let pipeline = Pipeline::from_config(config, upstream.clone()).unwrap();
    (pipeline, upstream)
}

fn get(path: &str, token: Option<&str>) -> RequestContext {
    let mut builder = Request::builder().method(Method::GET).uri(path);
    if let Some(token) = token {
        builder = builder.header("token", token);
    }
    RequestContext::new(builder.body(Body::empty()).unwrap(), "10.9.8.7:40000".parse().unwrap())
}

fn assert_cors(response: &Response<Body>) {
    assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(
        response.headers().get("access-control-allow-credentials").unwrap(),
        "true"
    );
}

async fn body_of(response: Response<Body>) -> Bytes {
    to_bytes(response.into_body(), 1024 * 1024).await.unwrap()
}

#[tokio::test]
async fn test_authenticated_request_is_forwarded() {
    let (pipeline, upstream) = pipeline(Behaviour::Respond);

    let response = pipeline.handle(get("/h5/ping", Some("abc"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    assert_eq!(response.headers().get("x-backend").unwrap(), "h5");
    assert_eq!(response.headers().get("x-ratelimit-remaining").unwrap(), "15");
    assert_eq!(response.headers().get("x-ratelimit-burst-capacity").unwrap(), "16");
    assert_eq!(&body_of(response).await[..], b"pong");

    let calls = upstream.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::GET);
    assert_eq!(calls[0].uri.to_string(), "http://10.0.0.1:801/h5/ping");
    assert!(calls[0].headers.get("token").is_none());
    assert_eq!(calls[0].headers.get("userId").unwrap(), "0");
    assert_eq!(calls[0].headers.get("x-forwarded-for").unwrap(), "10.9.8.7");
}

#[tokio::test]
async fn test_missing_token_is_rejected_without_forwarding() {
    let (pipeline, upstream) = pipeline(Behaviour::Respond);

    let response = pipeline.handle(get("/other/x", None)).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_cors(&response);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json;charset=utf-8"
    );
    assert!(response.headers().get("x-ratelimit-remaining").is_none());
    assert_eq!(
        &body_of(response).await[..],
        br#"{"code":403,"data":"","message":"invalid token"}"#
    );
    assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn test_wrong_token_is_rejected() {
    let (pipeline, upstream) = pipeline(Behaviour::Respond);

    let response = pipeline.handle(get("/h5/ping", Some("abd"))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn test_whitelisted_path_passes_unchanged() {
    let (pipeline, upstream) = pipeline(Behaviour::Respond);

    let response = pipeline.handle(get("/h5/login", Some("whatever"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let calls = upstream.calls();
    assert_eq!(calls[0].headers.get("token").unwrap(), "whatever");
    assert!(calls[0].headers.get("userId").is_none());
}

#[tokio::test]
async fn test_unrouted_path_is_not_found() {
    let (pipeline, upstream) = pipeline(Behaviour::Respond);

    let response = pipeline.handle(get("/other/x", Some("abc"))).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_cors(&response);
    assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn test_exhausted_bucket_is_rate_limited() {
    let (pipeline, upstream) = pipeline(Behaviour::Respond);

    for _ in 0..2 {
        let response = pipeline.handle(get("/otc/orders", Some("abc"))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = pipeline.handle(get("/otc/orders", Some("abc"))).await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_cors(&response);
    assert_eq!(response.headers().get("x-ratelimit-remaining").unwrap(), "0");
    assert_eq!(response.headers().get("x-ratelimit-replenish-rate").unwrap(), "1");
    assert_eq!(upstream.calls().len(), 2);

    // The bucket belongs to the client, not the route.
    let response = pipeline.handle(get("/h5/ping", Some("abc"))).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(upstream.calls().len(), 2);
}

#[tokio::test]
async fn test_client_bucket_is_shared_across_routes() {
    let mut config = config();
    config.routes[1].rate_limit = None;
    let (pipeline, upstream) = pipeline_with(&config, Behaviour::Respond);

    for i in 0..16 {
        let path = if i % 2 == 0 { "/h5/ping" } else { "/otc/orders" };
        let response = pipeline.handle(get(path, Some("abc"))).await;
        assert_eq!(response.status(), StatusCode::OK, "request {}", i + 1);
    }

    let response = pipeline.handle(get("/h5/ping", Some("abc"))).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let response = pipeline.handle(get("/otc/x", Some("abc"))).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(upstream.calls().len(), 16);

    // Another client is unaffected.
    let request = Request::builder()
        .uri("/otc/x")
        .header("token", "abc")
        .body(Body::empty())
        .unwrap();
    let response = pipeline
        .handle(RequestContext::new(request, "10.9.8.8:40000".parse().unwrap()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_strip_prefix_and_query_are_applied() {
    let (pipeline, upstream) = pipeline(Behaviour::Respond);

    pipeline.handle(get("/otc/orders/7?side=buy", Some("abc"))).await;

    assert_eq!(
        upstream.calls()[0].uri.to_string(),
        "http://10.0.0.2:801/api/orders/7?side=buy"
    );
}

#[tokio::test]
async fn test_method_and_body_forwarded_verbatim() {
    let (pipeline, upstream) = pipeline(Behaviour::Respond);
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/h5/profile")
        .header("token", "abc")
        .header("x-client", "web")
        .body(Body::from("{\"name\":\"x\"}"))
        .unwrap();

    pipeline
        .handle(RequestContext::new(request, "10.9.8.7:40000".parse().unwrap()))
        .await;

    let calls = upstream.calls();
    assert_eq!(calls[0].method, Method::PUT);
    assert_eq!(calls[0].headers.get("x-client").unwrap(), "web");
    assert_eq!(&calls[0].body[..], b"{\"name\":\"x\"}");
}

#[tokio::test]
async fn test_backend_failure_is_bad_gateway() {
    let (pipeline, _) = pipeline(Behaviour::Fail);

    let response = pipeline.handle(get("/h5/ping", Some("abc"))).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_cors(&response);
}

#[tokio::test(start_paused = true)]
async fn test_backend_timeout_is_gateway_timeout() {
    let (pipeline, upstream) = pipeline(Behaviour::Hang);

    let response = pipeline.handle(get("/h5/ping", Some("abc"))).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_cors(&response);
    assert_eq!(upstream.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_backend_body_is_cut_off() {
    let (pipeline, _) = pipeline(Behaviour::StallBody);

    let response = pipeline.handle(get("/h5/ping", Some("abc"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let started = tokio::time::Instant::now();
    let read = to_bytes(response.into_body(), 1024 * 1024).await;

    assert!(read.is_err());
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3), "{:?}", elapsed);
}

#[tokio::test]
async fn test_rate_limiting_disabled() {
    let mut config = config();
    config.rate_limit.enabled = false;
    let (pipeline, _) = pipeline_with(&config, Behaviour::Respond);

    for _ in 0..5 {
        let response = pipeline.handle(get("/otc/orders", Some("abc"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-ratelimit-remaining").is_none());
    }
}

#[tokio::test]
async fn test_rate_limit_headers_can_be_disabled() {
    let mut config = config();
    config.rate_limit.include_headers = false;
    let (pipeline, _) = pipeline_with(&config, Behaviour::Respond);

    let response = pipeline.handle(get("/h5/ping", Some("abc"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-ratelimit-remaining").is_none());
}

#[test]
fn test_stage_order() {
    assert!(Stage::Received < Stage::Authorizing);
    assert!(Stage::RateChecking < Stage::Forwarding);
    assert!(Stage::Decorating < Stage::Completed);
    assert_eq!(Stage::RateChecking.to_string(), "rate_checking");
}
