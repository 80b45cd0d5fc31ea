use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::ImageReader;

const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// A camera frame as delivered by the video source, with capture metadata.
#[derive(Debug, Clone)]
pub struct Frame {
    pub jpeg: Vec<u8>,
    pub captured_at_ms: i64,
    pub seq: u64,
}

/// A still re-encoded from a [`Frame`] at the frame's native resolution.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at_ms: i64,
    pub seq: u64,
}

impl Frame {
    pub fn new(jpeg: Vec<u8>, captured_at_ms: i64, seq: u64) -> Self {
        Self {
            jpeg,
            captured_at_ms,
            seq,
        }
    }

    /// Decode the frame into a bitmap and re-encode it as JPEG at `quality`.
    ///
    /// The bitmap keeps the source dimensions. Quality is clamped to 1..=100.
    pub fn encode_still(&self, quality: u8) -> Result<EncodedFrame, FrameError> {
        if self.jpeg.is_empty() {
            return Err(FrameError::Empty);
        }

        let bitmap = ImageReader::new(Cursor::new(&self.jpeg))
            .with_guessed_format()
            .map_err(|e| FrameError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| FrameError::Decode(e.to_string()))?;

        let (width, height) = (bitmap.width(), bitmap.height());
        if width == 0 || height == 0 {
            return Err(FrameError::Empty);
        }

        let rgb = bitmap.to_rgb8();
        let mut out = Vec::with_capacity(self.jpeg.len());
        JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
            .encode_image(&rgb)
            .map_err(|e| FrameError::Encode(e.to_string()))?;

        Ok(EncodedFrame {
            jpeg: out,
            width,
            height,
            captured_at_ms: self.captured_at_ms,
            seq: self.seq,
        })
    }
}

impl EncodedFrame {
    /// `data:image/jpeg;base64,...` form, as carried in the recognition request.
    pub fn to_data_uri(&self) -> String {
        let mut uri = String::with_capacity(DATA_URI_PREFIX.len() + self.jpeg.len() * 4 / 3 + 4);
        uri.push_str(DATA_URI_PREFIX);
        STANDARD.encode_string(&self.jpeg, &mut uri);
        uri
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame has no image data")]
    Empty,
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("failed to encode frame: {0}")]
    Encode(String),
}
