//! Video sources and the streams they hand to the controller.

pub mod mjpeg;
pub mod polling;

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use facewatch_common::frame::Frame;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::AcquisitionError;

pub use mjpeg::MjpegSource;
pub use polling::PollingSource;

static SEQ_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Something that can open a live video stream.
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn open(&self) -> Result<VideoStream, AcquisitionError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Ended,
}

/// One reader task feeding frames into a [`VideoStream`].
pub struct Track {
    label: String,
    handle: Option<JoinHandle<()>>,
}

impl Track {
    pub fn new(label: impl Into<String>, handle: JoinHandle<()>) -> Self {
        Self {
            label: label.into(),
            handle: Some(handle),
        }
    }

    pub fn state(&self) -> TrackState {
        match &self.handle {
            Some(h) if !h.is_finished() => TrackState::Live,
            _ => TrackState::Ended,
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!(track = self.label, "track stopped");
        }
    }
}

/// Publishing half handed to a track's reader task.
#[derive(Clone)]
pub struct FrameSink {
    tx: watch::Sender<Option<Frame>>,
}

impl FrameSink {
    /// Stamp and publish a JPEG as the stream's latest frame.
    pub fn publish(&self, jpeg: Vec<u8>) {
        let seq = SEQ_COUNTER.fetch_add(1, Ordering::Relaxed);
        let frame = Frame::new(jpeg, Utc::now().timestamp_millis(), seq);
        self.tx.send_replace(Some(frame));
    }
}

/// Read side of a stream's latest-frame slot. Cheap to clone.
#[derive(Clone)]
pub struct FrameReader {
    rx: watch::Receiver<Option<Frame>>,
}

impl FrameReader {
    /// The most recent frame, if any track has produced one yet.
    pub fn latest(&self) -> Option<Frame> {
        self.rx.borrow().clone()
    }
}

/// A live video stream: its tracks plus the most recent frame they produced.
pub struct VideoStream {
    tracks: Vec<Track>,
    latest: FrameReader,
}

impl VideoStream {
    /// Create an empty stream and the sink its tracks publish into.
    pub fn channel() -> (FrameSink, watch::Receiver<Option<Frame>>) {
        let (tx, rx) = watch::channel(None);
        (FrameSink { tx }, rx)
    }

    pub fn new(tracks: Vec<Track>, latest: watch::Receiver<Option<Frame>>) -> Self {
        Self {
            tracks,
            latest: FrameReader { rx: latest },
        }
    }

    pub fn reader(&self) -> FrameReader {
        self.latest.clone()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn stop(&mut self) {
        for track in &mut self.tracks {
            track.stop();
        }
    }
}

impl Drop for VideoStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn latest_frame_reflects_last_publish() {
        let (sink, rx) = VideoStream::channel();
        let stream = VideoStream::new(Vec::new(), rx);
        let reader = stream.reader();
        assert!(reader.latest().is_none());

        sink.publish(vec![1, 2, 3]);
        sink.publish(vec![4, 5]);
        let frame = reader.latest().unwrap();
        assert_eq!(frame.jpeg, vec![4, 5]);
        assert!(frame.captured_at_ms > 0);
    }

    #[tokio::test]
    async fn stop_ends_every_track() {
        let (_sink, rx) = VideoStream::channel();
        let tracks = (0..2)
            .map(|i| {
                let handle = tokio::spawn(std::future::pending::<()>());
                Track::new(format!("t{i}"), handle)
            })
            .collect();
        let mut stream = VideoStream::new(tracks, rx);
        assert!(stream.tracks().iter().all(|t| t.state() == TrackState::Live));

        stream.stop();
        assert!(stream.tracks().iter().all(|t| t.state() == TrackState::Ended));
    }
}
