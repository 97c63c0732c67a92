//! HTTP client for the streaming diagram endpoint.
//!
//! One POST per session to `{base}/api/gptStreaming`; the response body is
//! read chunk by chunk through [`HttpSource`] and never buffered whole.
//! Both the send and every body read race the session's [`CancelToken`]:
//! once it fires the connection is dropped and the source reports
//! [`TransportError::Aborted`], which is never shown as a failure.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::model::DiagramElement;
use crate::session::CancelToken;
use crate::stream::{ChunkSource, TransportError};

pub const STREAM_PATH: &str = "/api/gptStreaming";

// =============================================================================
// REQUEST PAYLOAD
// =============================================================================

/// Model tier the endpoint should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    #[default]
    Gpt3,
    Gpt4,
}

impl Model {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gpt3 => "gpt3",
            Self::Gpt4 => "gpt4",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gpt3" => Ok(Self::Gpt3),
            "gpt4" => Ok(Self::Gpt4),
            other => Err(format!("unknown model '{other}' (expected gpt3 or gpt4)")),
        }
    }
}

/// Identifies the caller to the endpoint. Passed explicitly into each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub license_key: String,
    pub model: Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub diagram_id: String,
    pub diagram_description: String,
    pub license_key: String,
    pub model: Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyRequest {
    pub diagram_id: String,
    pub diagram_node_id: String,
    pub diagram_data: Vec<DiagramElement>,
    pub instructions: String,
    pub license_key: String,
    pub model: Model,
}

/// Body of the streaming POST: `{"action": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "data", rename_all = "lowercase")]
pub enum RequestPayload {
    Generate(GenerateRequest),
    Modify(ModifyRequest),
}

impl RequestPayload {
    #[must_use]
    pub fn diagram_id(&self) -> &str {
        match self {
            Self::Generate(req) => &req.diagram_id,
            Self::Modify(req) => &req.diagram_id,
        }
    }

    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Generate(_) => "generate",
            Self::Modify(_) => "modify",
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct DiagramClient {
    http: reqwest::Client,
    endpoint: String,
}

impl DiagramClient {
    /// Build a client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// [`TransportError::HttpClientBuild`] if the TLS backend fails to initialize.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| TransportError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, endpoint: format!("{}{STREAM_PATH}", config.base_url) })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `payload` and return a source over the response body, abandoned
    /// as soon as `cancel` fires.
    ///
    /// Never fails directly: a send failure, a non-success status or an
    /// abort is delivered as the source's first chunk result, so the session
    /// reports it through the same path as a mid-stream failure.
    pub async fn open(&self, payload: &RequestPayload, cancel: &CancelToken) -> HttpSource {
        debug!(endpoint = %self.endpoint, action = payload.action(), diagram_id = payload.diagram_id(), "client: opening stream");
        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("client: cancelled before response headers");
                return HttpSource::failed(TransportError::Aborted);
            }
            sent = self.http.post(&self.endpoint).json(payload).send() => sent,
        };
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "client: request failed");
                return HttpSource::failed(TransportError::Request(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or_default().to_owned();
            warn!(status = status.as_u16(), %reason, "client: upstream rejected request");
            return HttpSource::failed(TransportError::Status { status: status.as_u16(), reason });
        }
        HttpSource { response: Some(response), pending: None, cancel: cancel.clone() }
    }
}

/// Response body of one streaming request.
pub struct HttpSource {
    response: Option<reqwest::Response>,
    pending: Option<TransportError>,
    cancel: CancelToken,
}

impl HttpSource {
    fn failed(err: TransportError) -> Self {
        Self { response: None, pending: Some(err), cancel: CancelToken::new() }
    }
}

#[async_trait]
impl ChunkSource for HttpSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if let Some(err) = self.pending.take() {
            return Err(err);
        }
        let Some(response) = self.response.as_mut() else {
            return Ok(None);
        };
        let read = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            read = response.chunk() => Some(read),
        };
        let Some(read) = read else {
            self.response = None;
            return Err(TransportError::Aborted);
        };
        match read {
            Ok(Some(bytes)) => Ok(Some(bytes.to_vec())),
            Ok(None) => {
                self.response = None;
                Ok(None)
            }
            Err(e) => {
                self.response = None;
                Err(TransportError::Body(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
