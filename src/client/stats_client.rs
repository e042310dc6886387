use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{error, info};

use crate::submission::{
    error::SubmitError,
    models::SubmissionPayload,
    submitter::{ResultService, SaveAck},
};

#[derive(Debug, thiserror::Error)]
pub enum StatsClientError {
    #[error("Http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Api error: {0} - {1}")]
    ApiError(StatusCode, String),

    #[error("Failed to read response: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Client of a remote stats API.
#[derive(Debug, Clone)]
pub struct HttpStatsClient {
    client: Client,
    domain: String,
}

impl HttpStatsClient {
    pub fn new(client: Client, domain: impl Into<String>) -> Self {
        let domain = domain.into().trim_end_matches('/').to_string();

        Self { client, domain }
    }

    pub async fn health_check(&self) -> Result<(), StatsClientError> {
        let response = self
            .client
            .get(format!("{}/health", self.domain))
            .send()
            .await?;
        if !response.status().is_success() {
            error!("Failed health check on stats api");
            return Err(StatsClientError::ApiError(
                StatusCode::SERVICE_UNAVAILABLE,
                "Failed to reach stats api".into(),
            ));
        }
        info!("Stats api is healthy");

        Ok(())
    }

    pub async fn post_result(&self, payload: &SubmissionPayload) -> Result<SaveAck, StatsClientError> {
        self.send_json("api/save-result", payload).await
    }

    async fn send_json<T: Serialize>(
        &self,
        uri: &str,
        body: &T,
    ) -> Result<SaveAck, StatsClientError> {
        let url = format!("{}/{}", self.domain, uri);
        info!("HttpStatsClient sending request to: {}", url);
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or("No body".into());

        // Error responses still carry the envelope; fall back to the raw body.
        match serde_json::from_str::<SaveAck>(&body) {
            Ok(ack) => Ok(ack),
            Err(_) if !status.is_success() => {
                error!("HttpStatsClient request failed: {} - {}", status, body);
                Err(StatsClientError::ApiError(status, body))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ResultService for HttpStatsClient {
    async fn save_result(&self, payload: &SubmissionPayload) -> Result<SaveAck, SubmitError> {
        self.post_result(payload)
            .await
            .map_err(|e| SubmitError::Failed(e.to_string()))
    }
}
