// Development proxy forwarding to a local upstream

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router};
use forum_client::proxy;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

/// Upstream that describes the request it received.
async fn echo(req: Request) -> impl IntoResponse {
    let (parts, body) = req.into_parts();
    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let auth = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = to_bytes(body, 1024 * 1024).await.unwrap();
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();

    let status = if path.starts_with("/api/missing") {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(json!({
            "method": parts.method.as_str(),
            "path": path,
            "host": host,
            "authorization": auth,
            "body": String::from_utf8_lossy(&body),
        })),
    )
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

/// Upstream and proxy both running; returns (upstream addr, proxy addr).
async fn spawn_pair() -> (String, String) {
    let upstream = serve(Router::new().fallback(echo)).await;
    let app = proxy::router(&format!("http://{}", upstream), "/api").unwrap();
    let proxy = serve(app).await;
    (upstream, proxy)
}

#[tokio::test]
async fn forwards_full_path_and_query_with_rewritten_host() {
    let (upstream, proxy) = spawn_pair().await;

    let reply: Value = reqwest::get(format!("http://{}/api/posts?sort=new", proxy))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(reply["method"], "GET");
    assert_eq!(reply["path"], "/api/posts?sort=new");
    assert_eq!(reply["host"], upstream);
}

#[tokio::test]
async fn forwards_method_body_and_authorization() {
    let (_, proxy) = spawn_pair().await;

    let reply: Value = reqwest::Client::new()
        .put(format!("http://{}/api/posts/p1", proxy))
        .bearer_auth("tok-1")
        .json(&json!({ "title": "t", "body": "b" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(reply["method"], "PUT");
    assert_eq!(reply["path"], "/api/posts/p1");
    assert_eq!(reply["authorization"], "Bearer tok-1");
    let body: Value = serde_json::from_str(reply["body"].as_str().unwrap()).unwrap();
    assert_eq!(body, json!({ "title": "t", "body": "b" }));
}

#[tokio::test]
async fn upstream_status_is_passed_through() {
    let (_, proxy) = spawn_pair().await;

    let response = reqwest::get(format!("http://{}/api/missing", proxy))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn paths_outside_prefix_are_not_forwarded() {
    let app = proxy::router("http://127.0.0.1:9", "/api").unwrap();

    let response = app
        .oneshot(axum::http::Request::builder().uri("/other").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);
    let app = proxy::router(&format!("http://{}", dead), "/api").unwrap();

    let response = app
        .oneshot(axum::http::Request::builder().uri("/api/posts").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
