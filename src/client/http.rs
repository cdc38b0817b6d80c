//! HTTP implementation of the analysis client
//!
//! Talks to the remote decomposition service over JSON with bounded retry
//! for transient failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::tree::StepContent;

use super::AnalysisClient;
use super::error::ServiceError;
use super::normalize::scrub_steps;
use super::types::{SolutionRequest, SolutionResponse, StepRequest, StepResponse};

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 500;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Reqwest-backed client for the decomposition service
pub struct HttpAnalysisClient {
    base_url: String,
    http: Client,
    max_retries: u32,
}

impl HttpAnalysisClient {
    /// Create a new client from configuration
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        debug!(base_url = %config.base_url, timeout_ms = config.timeout_ms, "from_config: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(ServiceError::Network)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_retries: config.max_retries,
        })
    }

    /// POST a JSON body and decode a JSON response, retrying transient errors
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ServiceError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, %url, "post_json: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self.http.post(&url).json(body).send().await {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "post_json: network error");
                    last_error = Some(ServiceError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if is_retryable_status(status) && attempt < self.max_retries {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "post_json: retryable status");
                last_error = Some(ServiceError::Api { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                debug!(status, "post_json: service error");
                return Err(ServiceError::Api { status, message: text });
            }

            debug!(status, "post_json: success");
            return response
                .json::<R>()
                .await
                .map_err(|e| ServiceError::InvalidResponse(e.to_string()));
        }

        Err(last_error.unwrap_or_else(|| ServiceError::InvalidResponse("max retries exceeded".to_string())))
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn decompose_solution(&self, solution: &str) -> Result<Vec<StepContent>, ServiceError> {
        debug!(solution_len = solution.len(), "decompose_solution: called");
        let response: SolutionResponse = self
            .post_json("decompose-solution", &SolutionRequest { solution })
            .await?;
        Ok(scrub_steps(response.steps))
    }

    async fn decompose_step(&self, step: &str) -> Result<Vec<StepContent>, ServiceError> {
        debug!(step_len = step.len(), "decompose_step: called");
        let response: StepResponse = self.post_json("decompose-step", &StepRequest { step }).await?;
        Ok(scrub_steps(response.substeps))
    }
}
