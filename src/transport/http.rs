//! HTTP implementation of the chat backend

use super::sse;
use super::{ChatBackend, FrameStream, TransportError};
use crate::config::ClientConfig;
use crate::protocol::TurnRequest;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Backend reached over HTTP with a bearer credential
pub struct HttpBackend {
    client: Client,
    chat_url: String,
    health_url: String,
    access_token: String,
    /// Whole-request deadline for the health probe; chat streams have none
    probe_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

impl HttpBackend {
    /// Build a backend client from configuration
    ///
    /// # Errors
    ///
    /// Returns a network error if the HTTP client cannot be constructed
    /// (e.g. TLS backend initialisation failure).
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            chat_url: config.chat_url(),
            health_url: config.health_url(),
            access_token: config.access_token.clone(),
            probe_timeout: config.connect_timeout,
        })
    }

    /// Probe `GET /health`, bounded by the connect timeout
    ///
    /// # Errors
    ///
    /// Returns the classified failure when the backend is unreachable or
    /// does not report `ok`.
    pub async fn health(&self) -> Result<(), TransportError> {
        let response = self
            .client
            .get(&self.health_url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_request(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::from_status(status, &body));
        }

        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| TransportError::stream(format!("Invalid health response: {e}")))?;
        if health.status == "ok" {
            Ok(())
        } else {
            Err(TransportError::status(format!("Backend reports status {:?}", health.status)))
        }
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn open_stream(&self, request: &TurnRequest) -> Result<FrameStream, TransportError> {
        let response = self
            .client
            .post(&self.chat_url)
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "text/event-stream")
            .json(&request.to_body())
            .send()
            .await
            .map_err(|e| TransportError::from_request(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::from_status(status, &body));
        }

        tracing::debug!(status = %status, "Chat stream opened");
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::from_body(&e)));
        Ok(sse::frames(chunks).boxed())
    }
}
