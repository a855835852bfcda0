//! Marketplace API client.
//!
//! Thin `reqwest` wrapper that forwards the session's bearer token, tags every
//! call with an `x-request-id`, unwraps `{ data }` envelopes and maps HTTP
//! failures onto [`ApiError`]. Rate limiting (429) is surfaced as its own
//! variant so the store can schedule a retry.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use super::backend::{unwrap_envelope, RestBackend};
use crate::error::{ApiError, ApiResult};

/// Client for the marketplace REST API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// Error body returned by the marketplace API.
#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiClient {
    /// Create a new client without credentials.
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(base_url = base_url, "Marketplace API client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Clone of this client that authenticates as the given session.
    ///
    /// The underlying connection pool is shared.
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.to_string()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, req: RequestBuilder) -> ApiResult<Value> {
        let request_id = Uuid::new_v4().to_string();

        let mut req = req
            .header("x-request-id", &request_id)
            .header("Accept", "application/json");

        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.map_err(|e| {
            error!(error = %e, request_id = %request_id, "Marketplace API request failed");
            ApiError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        debug!(status = %status, request_id = %request_id, "Marketplace API response");

        if !status.is_success() {
            return Err(Self::error_from(response).await);
        }

        let bytes = response.bytes().await.map_err(|e| {
            error!(error = %e, "Failed to read marketplace API response");
            ApiError::Unavailable(e.to_string())
        })?;

        if bytes.is_empty() {
            return Ok(Value::Null);
        }

        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            error!(error = %e, "Failed to parse marketplace API response");
            ApiError::internal(format!("Invalid marketplace API response: {}", e))
        })?;

        Ok(unwrap_envelope(value))
    }

    async fn error_from(response: Response) -> ApiError {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            warn!(retry_after_secs = ?retry_after_secs, "Marketplace API rate limited");
            return ApiError::RateLimited { retry_after_secs };
        }

        let body = response.json::<UpstreamErrorBody>().await.ok();
        let message = body
            .and_then(|b| b.message.or(b.error))
            .unwrap_or_else(|| format!("Marketplace API error: {}", status));

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::BadRequest(message)
            }
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::CONFLICT => ApiError::Conflict(message),
            _ => {
                error!(status = %status, message = %message, "Marketplace API error");
                ApiError::Upstream {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }

    /// Check marketplace API health.
    pub async fn health_check(&self) -> Result<()> {
        self.client
            .get(self.url("/health"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Marketplace API health check failed")?
            .error_for_status()
            .context("Marketplace API unhealthy")?;

        Ok(())
    }
}

#[async_trait]
impl RestBackend for ApiClient {
    #[instrument(skip(self))]
    async fn get(&self, path: &str) -> ApiResult<Value> {
        self.execute(self.client.get(self.url(path))).await
    }

    #[instrument(skip(self, body))]
    async fn post(&self, path: &str, body: &Value) -> ApiResult<Value> {
        self.execute(self.client.post(self.url(path)).json(body)).await
    }

    #[instrument(skip(self, body))]
    async fn patch(&self, path: &str, body: &Value) -> ApiResult<Value> {
        self.execute(self.client.patch(self.url(path)).json(body)).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, path: &str) -> ApiResult<()> {
        self.execute(self.client.delete(self.url(path)))
            .await
            .map(|_| ())
    }
}
