use std::time::Duration;

use async_trait::async_trait;
use facewatch_common::frame::EncodedFrame;
use facewatch_common::recognition::{MatchResult, ProcessFrameRequest};
use tracing::{debug, warn};

use crate::error::TransportError;

/// The remote face-recognition service.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, frame: &EncodedFrame) -> Result<MatchResult, TransportError>;
}

/// Posts frames as JSON to the recognition endpoint over HTTP.
pub struct HttpRecognizer {
    client: reqwest::Client,
    url: String,
}

impl HttpRecognizer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Request)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(&self, frame: &EncodedFrame) -> Result<MatchResult, TransportError> {
        let body = ProcessFrameRequest {
            image: frame.to_data_uri(),
        };
        debug!(
            seq = frame.seq,
            captured_at_ms = frame.captured_at_ms,
            width = frame.width,
            height = frame.height,
            bytes = frame.jpeg.len(),
            "sending frame for recognition"
        );

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(TransportError::Request)?;

        let status = response.status();
        if !status.is_success() {
            // The service reports errors as JSON bodies too; parse them the same way.
            warn!(status = %status, url = self.url, "non-success response from recognition service");
        }

        let bytes = response.bytes().await.map_err(TransportError::Body)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
