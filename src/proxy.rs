// Development proxy
// Forwards everything under a local path prefix to the remote deployment, so a
// client pointed at http://localhost:3000/api reaches the real API. The full
// path is kept and Host is rewritten to the target's authority.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::config::ProxyConfig;
use crate::error::ClientResult;

/// Largest request body forwarded upstream.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Upstream error: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Bad request body: {0}")]
    Body(String),

    #[error("Response error: {0}")]
    Response(#[from] axum::http::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::Upstream(e) => {
                tracing::error!("Upstream error: {}", e);
                StatusCode::BAD_GATEWAY
            }
            ProxyError::Body(msg) => {
                tracing::warn!("Bad request body: {}", msg);
                StatusCode::BAD_REQUEST
            }
            ProxyError::Response(e) => {
                tracing::error!("Response error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

struct ProxyState {
    client: reqwest::Client,
    target: Url,
}

/// Router forwarding `prefix` and everything below it to `target`.
pub fn router(target: &str, prefix: &str) -> ClientResult<Router> {
    let target = Url::parse(target)?;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let state = Arc::new(ProxyState { client, target });

    let prefix = format!("/{}", prefix.trim_matches('/'));
    Ok(Router::new()
        .route(&prefix, any(forward))
        .route(&format!("{}/{{*rest}}", prefix), any(forward))
        .with_state(state)
        .layer(TraceLayer::new_for_http()))
}

/// Bind `config.listen` and proxy until the process is stopped.
pub async fn serve(config: &ProxyConfig) -> anyhow::Result<()> {
    let app = router(&config.target, &config.prefix)?;
    let addr: SocketAddr = config.listen.parse()?;
    tracing::info!(
        "Proxying http://{}{} -> {}",
        addr,
        config.prefix,
        config.target
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn forward(
    State(state): State<Arc<ProxyState>>,
    req: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!(
        "{}{}",
        state.target.as_str().trim_end_matches('/'),
        path_and_query
    );

    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ProxyError::Body(e.to_string()))?;

    // reqwest fills in Host from the target URL
    let mut headers = parts.headers;
    headers.remove(header::HOST);
    strip_hop_by_hop(&mut headers);

    tracing::debug!("{} {} -> {}", parts.method, path_and_query, url);
    let upstream = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await?;

    let status = upstream.status();
    let mut upstream_headers = upstream.headers().clone();
    strip_hop_by_hop(&mut upstream_headers);
    let bytes = upstream.bytes().await?;

    let mut response = Response::builder().status(status);
    if let Some(headers) = response.headers_mut() {
        headers.extend(upstream_headers);
    }
    Ok(response.body(Body::from(bytes))?)
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    const HOP_BY_HOP: [HeaderName; 6] = [
        header::CONNECTION,
        header::CONTENT_LENGTH,
        header::TRANSFER_ENCODING,
        header::TE,
        header::TRAILER,
        header::UPGRADE,
    ];
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}
