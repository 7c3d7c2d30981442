// HTTP client adapter
// Everything that talks to the forum API goes through `Transport`; `ApiClient`
// resolves paths against the base URL and attaches the stored bearer token

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::paths;
use crate::session::CredentialStore;

/// One request/response exchange with the forum API.
///
/// Non-2xx responses come back as errors; an empty body reads as `null`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> ClientResult<Value>;
}

/// Typed helpers layered over [`Transport::send`].
pub async fn get_json<T: DeserializeOwned>(transport: &dyn Transport, path: &str) -> ClientResult<T> {
    let value = transport.send(Method::GET, path, None).await?;
    Ok(serde_json::from_value(value)?)
}

pub async fn send_json<B, T>(
    transport: &dyn Transport,
    method: Method,
    path: &str,
    body: &B,
) -> ClientResult<T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let value = transport
        .send(method, path, Some(serde_json::to_value(body)?))
        .await?;
    Ok(serde_json::from_value(value)?)
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// reqwest-backed [`Transport`].
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: Arc<dyn CredentialStore>,
    ) -> ClientResult<Self> {
        let base = Url::parse(base_url)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve `path` under the base URL, keeping any path prefix the base has.
    ///
    /// Paths with `.` or `..` segments are refused: URL resolution would
    /// collapse them onto a different resource.
    pub fn url(&self, path: &str) -> ClientResult<String> {
        let path = path.trim_start_matches('/');
        if path.split('/').any(paths::is_dot_segment) {
            return Err(ClientError::Validation(format!(
                "Invalid resource path: /{}",
                path
            )));
        }
        Ok(format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            path
        ))
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> ClientResult<Value> {
        let url = self.url(path)?;
        tracing::debug!("{} {}", method, url);

        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = self.credentials.load()? {
            request = request.bearer_auth(token.as_str());
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("{} {} failed: {}", method, url, e);
            ClientError::Network(e)
        })?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("json"))
            .unwrap_or(false);
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_default();
            tracing::warn!("{} {} returned {}: {}", method, url, status, message);
            return Err(ClientError::from_status(status, message));
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            // Plain-text success bodies ("OK", "Deleted") carry nothing we need
            Err(_) if !is_json => Ok(Value::Null),
            Err(e) => Err(e.into()),
        }
    }
}
