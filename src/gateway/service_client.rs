// ============================================================================
// Backend RPC Client
// ============================================================================
//
// HTTP client for the rule repository backend.
// Handles:
// - Raw request dispatch (BackendClient, swappable in tests)
// - Address resolution through the service locator
// - Decoding of the backend `{code, message, data}` envelope
// - Staging commit / cancel after mutating operations
//
// ============================================================================

use crate::gateway::discovery::ServiceResolver;
use crate::gateway::middleware::{CallerContext, REQUEST_ID_HEADER};
use anyhow::Context;
use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use bytes::Bytes;
use rulegate_error::{AppError, AppResult, CODE_OK};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

// Staging endpoints on the repository backend
pub const COMMIT_PATH: &str = "/v1/public/public";
pub const CANCEL_PATH: &str = "/v1/public/cancel";

/// Raw transport to a backend: one request in, the response body out
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: &HeaderMap,
    ) -> AppResult<Bytes>;
}

/// reqwest-backed transport with a per-request timeout
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(timeout_secs: u64) -> anyhow::Result<Self> {
        // Configure connection pooling and keep-alive
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl BackendClient for ReqwestBackend {
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: &HeaderMap,
    ) -> AppResult<Bytes> {
        let mut request = self.client.request(method, url).headers(headers.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        // The envelope carries the verdict, so the HTTP status is not inspected
        let response = request
            .send()
            .await
            .map_err(|e| AppError::backend_transport(format!("{}: {}", url, e)))?;
        response
            .bytes()
            .await
            .map_err(|e| AppError::backend_transport(format!("{}: {}", url, e)))
    }
}

/// Response envelope of the repository backend
#[derive(Debug, Deserialize)]
pub struct BackendEnvelope {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl BackendEnvelope {
    pub fn decode(raw: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(raw).map_err(|e| {
            warn!(
                error = %e,
                body = %String::from_utf8_lossy(raw),
                "Backend response is not a valid envelope"
            );
            AppError::backend_decode(e.to_string())
        })
    }

    /// The payload on success, the backend's own code and message otherwise
    pub fn into_data(self) -> AppResult<Value> {
        if self.code == CODE_OK {
            Ok(self.data)
        } else {
            Err(AppError::backend_rejected(self.code, self.message))
        }
    }
}

/// Client for the rule repository service
pub struct RepoServiceClient {
    backend: Arc<dyn BackendClient>,
    resolver: ServiceResolver,
    service_name: String,
    token_header: HeaderName,
}

impl RepoServiceClient {
    pub fn new(
        backend: Arc<dyn BackendClient>,
        resolver: ServiceResolver,
        service_name: impl Into<String>,
        token_header: HeaderName,
    ) -> Self {
        Self {
            backend,
            resolver,
            service_name: service_name.into(),
            token_header,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    async fn base_url(&self) -> AppResult<String> {
        let address = self.resolver.resolve(&self.service_name).await;
        if address.is_empty() {
            return Err(AppError::service_unavailable(self.service_name.clone()));
        }
        Ok(format!("http://{}", address))
    }

    fn headers(&self, caller: &CallerContext) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(&caller.token)
            .map_err(|_| AppError::invalid_request("access token is not a valid header value"))?;
        headers.insert(self.token_header.clone(), token);

        if let Some(request_id) = &caller.request_id
            && let Ok(value) = HeaderValue::from_str(request_id)
        {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        Ok(headers)
    }

    /// Call `path` on the repository service and unwrap the envelope.
    ///
    /// GET requests carry the top-level fields of `body` as query parameters,
    /// every other method sends `body` as JSON.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: &Value,
        caller: &CallerContext,
    ) -> AppResult<Value> {
        let base = self.base_url().await?;
        let headers = self.headers(caller)?;

        let raw = if method == Method::GET {
            let url = query_url(&format!("{}{}", base, path), body)?;
            self.backend.send(method, &url, None, &headers).await?
        } else {
            let url = format!("{}{}", base, path);
            self.backend.send(method, &url, Some(body), &headers).await?
        };

        BackendEnvelope::decode(&raw)?.into_data()
    }

    /// Make the staged changes permanent, recording `message` in the audit trail
    pub async fn commit(&self, caller: &CallerContext, message: &str) -> AppResult<()> {
        self.call(Method::GET, COMMIT_PATH, &json!({ "message": message }), caller)
            .await?;
        info!(audit = message, "Staged changes committed");
        Ok(())
    }

    /// Discard the staged changes
    pub async fn cancel(&self, caller: &CallerContext) -> AppResult<()> {
        self.call(Method::POST, CANCEL_PATH, &Value::Object(Map::new()), caller)
            .await?;
        Ok(())
    }

    /// Commit, logging instead of failing
    pub async fn commit_quietly(&self, caller: &CallerContext, message: &str) {
        if let Err(e) = self.commit(caller, message).await {
            error!(error = %e, audit = message, "Staging commit failed");
        }
    }

    /// Cancel, logging instead of failing
    pub async fn cancel_quietly(&self, caller: &CallerContext) {
        if let Err(e) = self.cancel(caller).await {
            error!(error = %e, "Staging cancel failed");
        }
    }
}

/// Append the top-level fields of a JSON object to `url` as query parameters
fn query_url(url: &str, params: &Value) -> AppResult<String> {
    let pairs: Vec<(String, String)> = match params {
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect(),
        Value::Null => Vec::new(),
        _ => return Err(AppError::invalid_request("query parameters must be a JSON object")),
    };

    let url = reqwest::Url::parse_with_params(url, &pairs)
        .map_err(|e| AppError::internal(format!("bad backend url {}: {}", url, e)))?;
    Ok(url.to_string())
}
