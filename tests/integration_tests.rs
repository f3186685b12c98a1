use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use std::time::Duration;
use tower::ServiceExt;

use ipthrottle::client_key::RemoteAddr;
use ipthrottle::response::SERVER_ERROR_BODY;
use ipthrottle::{create_app, ClientRegistry, ThrottleConfig};

fn request_from(addr: &str, uri: &str) -> Request<Body> {
    let mut request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(RemoteAddr(addr.to_string()));
    request
}

async fn send(app: &Router, addr: &str) -> Response {
    app.clone().oneshot(request_from(addr, "/")).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_burst_then_throttle_then_refill() {
    let app = create_app(ClientRegistry::default());

    for _ in 0..3 {
        let response = send(&app, "1.2.3.4:555").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Hello, world!");
    }

    let response = send(&app, "1.2.3.4:555").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    assert_eq!(body_text(response).await, "Too Many Requests");

    tokio::time::sleep(Duration::from_secs(1)).await;

    let response = send(&app, "1.2.3.4:555").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn test_clients_are_keyed_by_host() {
    let app = create_app(ClientRegistry::default());

    for port in 1000..1003 {
        assert_eq!(send(&app, &format!("1.2.3.4:{port}")).await.status(), StatusCode::OK);
    }
    assert_eq!(
        send(&app, "1.2.3.4:2000").await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    assert_eq!(send(&app, "[::1]:8080").await.status(), StatusCode::OK);
    assert_eq!(send(&app, "9.9.9.9:555").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_address_is_server_error() {
    let registry: ClientRegistry = ClientRegistry::default();
    let app = create_app(registry.clone());

    let response = send(&app, "not-an-address").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, SERVER_ERROR_BODY);

    assert!(registry.is_empty());
    let metrics = registry.metrics_snapshot();
    assert_eq!(metrics.rejected_requests, 1);
    assert_eq!(metrics.allowed_requests, 0);
}

#[tokio::test(start_paused = true)]
async fn test_idle_client_is_swept_and_starts_fresh() {
    let registry: ClientRegistry = ClientRegistry::default();
    let app = create_app(registry.clone());
    let sweeper = registry.spawn_sweeper();

    for _ in 0..3 {
        assert_eq!(send(&app, "1.2.3.4:555").await.status(), StatusCode::OK);
    }
    assert_eq!(
        send(&app, "1.2.3.4:555").await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    // Sweeps run at 1, 2, 3 and 4 minutes; the one at 4 minutes sees > 3 minutes idle
    tokio::time::sleep(Duration::from_secs(4 * 60 + 1)).await;
    assert!(registry.is_empty());
    assert_eq!(registry.metrics_snapshot().clients_evicted, 1);

    for _ in 0..3 {
        assert_eq!(send(&app, "1.2.3.4:555").await.status(), StatusCode::OK);
    }
    assert_eq!(registry.metrics_snapshot().clients_created, 2);

    sweeper.abort();
}

#[tokio::test(start_paused = true)]
async fn test_custom_quota() {
    let registry = ClientRegistry::new(ThrottleConfig {
        quota: ipthrottle::Quota::new(0.5, 1),
        ..ThrottleConfig::default()
    });
    let app = create_app(registry);

    assert_eq!(send(&app, "1.2.3.4:555").await.status(), StatusCode::OK);
    let response = send(&app, "1.2.3.4:555").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "2");
}

#[tokio::test]
async fn test_health_endpoint() {
    let registry: ClientRegistry = ClientRegistry::default();
    let app = create_app(registry);

    let response = app
        .clone()
        .oneshot(request_from("1.2.3.4:555", "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["throttling"]["tracked_clients"], 1);
    assert_eq!(body["throttling"]["allowed_requests"], 1);
}
