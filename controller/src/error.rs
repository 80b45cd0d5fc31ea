use facewatch_common::frame::FrameError;

/// The camera could not be opened.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("failed to build camera client: {0}")]
    Client(reqwest::Error),
    #[error("camera connection failed: {0}")]
    Connect(reqwest::Error),
    #[error("camera returned HTTP status {0}")]
    Status(u16),
}

/// A capture tick's round trip to the recognition service failed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("recognition request failed: {0}")]
    Request(reqwest::Error),
    #[error("failed to read recognition response: {0}")]
    Body(reqwest::Error),
    #[error("malformed recognition response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Why a capture tick was skipped.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("frame encoding task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
