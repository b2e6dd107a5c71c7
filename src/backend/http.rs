//! HTTP implementation of the run API adapters
//!
//! Implements [`CompletionOracle`] and [`TransitionExecutor`] against
//! the run API's JSON endpoints.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::BackendConfig;
use crate::status::RunStatus;

use super::error::{BackendError, message_indicates_already_ready};
use super::types::{ApiEnvelope, CompletionCheckResult, RunStatusPayload, TransitionOutcome};
use super::{CompletionOracle, TransitionExecutor};

/// Client for the remote run API.
pub struct HttpBackend {
    base_url: String,
    http: Client,
    api_key: Option<String>,
}

impl HttpBackend {
    /// Create a client from configuration.
    ///
    /// Reads the optional API key from the environment variable named
    /// in the config.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        debug!(base_url = %config.base_url, timeout_ms = config.timeout_ms, "HttpBackend::from_config: called");
        let api_key = match &config.api_key_env {
            Some(var) => std::env::var(var).ok(),
            None => None,
        };

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(BackendError::Network)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Read the current remote status of a run.
    ///
    /// Used to seed the local cache before triggering checks.
    pub async fn fetch_status(&self, run_no: u32) -> Result<RunStatus, BackendError> {
        debug!(run_no, "HttpBackend::fetch_status: called");
        let url = self.endpoint(&format!("/api/runs/{}/status", run_no));
        let response = self.request(self.http.get(&url)).send().await?;
        let payload: RunStatusPayload = unwrap_envelope(response).await?;
        Ok(payload.status)
    }
}

/// Parse a response, requiring a successful envelope with data.
async fn unwrap_envelope<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_from_response(status, response).await);
    }

    let envelope: ApiEnvelope<T> = response.json().await?;
    if !envelope.success {
        let message = envelope.message.unwrap_or_else(|| "remote reported failure".to_string());
        return Err(BackendError::ApiError {
            status: status.as_u16(),
            message,
        });
    }

    envelope
        .data
        .ok_or_else(|| BackendError::InvalidResponse("missing data in successful response".to_string()))
}

/// Build an ApiError from a non-2xx response, pulling the message out
/// of the envelope when the body carries one.
async fn error_from_response(status: StatusCode, response: Response) -> BackendError {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or(body);

    BackendError::ApiError {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl CompletionOracle for HttpBackend {
    async fn check_completion(&self, run_no: u32) -> Result<CompletionCheckResult, BackendError> {
        debug!(run_no, "HttpBackend::check_completion: called");
        let url = self.endpoint(&format!("/api/runs/{}/completion", run_no));
        let response = self.request(self.http.get(&url)).send().await?;
        unwrap_envelope(response).await
    }
}

#[async_trait]
impl TransitionExecutor for HttpBackend {
    async fn set_ready(&self, run_no: u32) -> Result<TransitionOutcome, BackendError> {
        debug!(run_no, "HttpBackend::set_ready: called");
        let url = self.endpoint(&format!("/api/runs/{}/status", run_no));
        let body = serde_json::json!({ "status": RunStatus::Ready });

        let response = self.request(self.http.put(&url).json(&body)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let err = error_from_response(status, response).await;
            // Promote the idempotent-conflict rejection to its
            // structured form at the adapter boundary.
            if err.is_already_ready() {
                return Err(BackendError::AlreadyReady { run_no });
            }
            return Err(err);
        }

        let envelope: ApiEnvelope<serde_json::Value> = response.json().await?;
        if !envelope.success {
            let message = envelope.message.unwrap_or_else(|| "remote reported failure".to_string());
            if message_indicates_already_ready(&message) {
                return Err(BackendError::AlreadyReady { run_no });
            }
            return Err(BackendError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(TransitionOutcome {
            success: true,
            message: envelope.message,
        })
    }
}
