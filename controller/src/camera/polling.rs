use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::{FrameSink, Track, VideoSource, VideoStream};
use crate::error::AcquisitionError;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(3600);

/// Polling-based source: periodically fetch single JPEG frames.
pub struct PollingSource {
    frame_url: String,
    interval: Duration,
    connect_timeout: Duration,
}

impl PollingSource {
    /// `stream_url` is the camera's stream URL; its `/stream` path is swapped for `/frame`.
    pub fn new(stream_url: &str, quality: u32, fps: f64, connect_timeout: Duration) -> Self {
        let fps = if fps > 0.0 { fps } else { 1.0 };
        let interval = Duration::try_from_secs_f64(1.0 / fps)
            .unwrap_or(MAX_POLL_INTERVAL)
            .clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);
        Self {
            frame_url: format!("{}?quality={quality}", stream_url.replace("/stream", "/frame")),
            interval,
            connect_timeout,
        }
    }

    pub fn frame_url(&self) -> &str {
        &self.frame_url
    }
}

#[async_trait]
impl VideoSource for PollingSource {
    async fn open(&self) -> Result<VideoStream, AcquisitionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(AcquisitionError::Client)?;

        // One synchronous fetch proves the camera is reachable.
        let first = client
            .get(&self.frame_url)
            .send()
            .await
            .map_err(AcquisitionError::Connect)?;
        if !first.status().is_success() {
            return Err(AcquisitionError::Status(first.status().as_u16()));
        }
        let jpeg = first.bytes().await.map_err(AcquisitionError::Connect)?;

        info!(url = self.frame_url, interval = ?self.interval, "polling camera frames");

        let (sink, latest) = VideoStream::channel();
        sink.publish(jpeg.to_vec());
        let handle = tokio::spawn(poll_frames(
            client,
            self.frame_url.clone(),
            self.interval,
            sink,
        ));
        Ok(VideoStream::new(vec![Track::new("polling", handle)], latest))
    }

    fn name(&self) -> &str {
        "polling"
    }
}

async fn poll_frames(client: reqwest::Client, url: String, interval: Duration, sink: FrameSink) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick is immediate and `open` already fetched that frame.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                Ok(bytes) => sink.publish(bytes.to_vec()),
                Err(e) => warn!(error = %e, "failed to read camera frame body"),
            },
            Ok(resp) => {
                warn!(status = %resp.status(), "non-success response from camera");
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch camera frame");
            }
        }
    }
}
