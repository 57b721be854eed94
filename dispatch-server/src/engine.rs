//! HTTP job engine client
//!
//! Talks to the external job execution engine over its REST API. The engine
//! owns job execution entirely; this client only creates, observes and
//! deletes named jobs on behalf of the controller.

use async_trait::async_trait;
use dispatch_controller::engine::{EngineError, JobEngine};
use dispatch_core::domain::job::{JobHandle, JobOutcome, JobSpec};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;

/// Job state as reported by the engine API
#[derive(Debug, Deserialize)]
struct JobStateResponse {
    state: String,
    #[serde(default)]
    results: HashMap<String, String>,
    #[serde(default)]
    reason: Option<String>,
}

/// HTTP client for the job execution engine
#[derive(Debug, Clone)]
pub struct HttpJobEngine {
    /// Base URL of the engine (e.g., "http://localhost:9090")
    base_url: String,
    client: Client,
}

impl HttpJobEngine {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_error(err: reqwest::Error) -> EngineError {
        if err.is_timeout() {
            EngineError::Timeout
        } else {
            EngineError::Backend(err.to_string())
        }
    }

    async fn error_from_response(name: &str, response: reqwest::Response) -> EngineError {
        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => EngineError::NotFound(name.to_string()),
            StatusCode::CONFLICT => EngineError::AlreadyExists(name.to_string()),
            _ => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown error".to_string());
                EngineError::Backend(format!("engine returned {status}: {body}"))
            }
        }
    }
}

#[async_trait]
impl JobEngine for HttpJobEngine {
    async fn find_job(&self, name: &str) -> Result<Option<JobHandle>, EngineError> {
        let url = format!("{}/jobs/{}", self.base_url, name);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::request_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(Self::error_from_response(name, response).await);
        }

        Ok(Some(JobHandle {
            name: name.to_string(),
        }))
    }

    async fn create_job(&self, spec: JobSpec) -> Result<JobHandle, EngineError> {
        let url = format!("{}/jobs", self.base_url);
        let name = spec.name.clone();

        let response = self
            .client
            .post(&url)
            .json(&spec)
            .send()
            .await
            .map_err(Self::request_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(&name, response).await);
        }

        Ok(JobHandle { name })
    }

    async fn observe_job(&self, handle: &JobHandle) -> Result<JobOutcome, EngineError> {
        let url = format!("{}/jobs/{}", self.base_url, handle.name);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::request_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(&handle.name, response).await);
        }

        let state: JobStateResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Backend(format!("failed to parse job state: {e}")))?;

        let outcome = match state.state.as_str() {
            "pending" => JobOutcome::Pending,
            "running" => JobOutcome::Running,
            "succeeded" => JobOutcome::Succeeded {
                results: state.results,
            },
            "failed" => JobOutcome::Failed {
                reason: state
                    .reason
                    .unwrap_or_else(|| "job failed without a reason".to_string()),
            },
            other => {
                return Err(EngineError::Backend(format!("unknown job state: {other}")));
            }
        };

        Ok(outcome)
    }

    async fn delete_job(&self, handle: &JobHandle) -> Result<(), EngineError> {
        let url = format!("{}/jobs/{}", self.base_url, handle.name);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(Self::request_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(&handle.name, response).await);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_trims_trailing_slash() {
        let engine = HttpJobEngine::new("http://localhost:9090/");
        assert_eq!(engine.base_url(), "http://localhost:9090");
    }
}
