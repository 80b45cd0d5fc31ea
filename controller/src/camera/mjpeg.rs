use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use super::{FrameSink, Track, VideoSource, VideoStream};
use crate::error::AcquisitionError;

const BOUNDARY: &[u8] = b"--frame\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";
/// Largest unterminated part the parser holds before giving up on it.
const MAX_BUFFERED_BYTES: usize = 4 * 1024 * 1024;

/// Parse state for the MJPEG multipart stream.
enum ParseState {
    /// Looking for the boundary marker `--frame\r\n`.
    SeekingBoundary,
    /// Found boundary, now looking for end of part headers `\r\n\r\n`.
    SeekingHeaderEnd,
    /// Collecting JPEG bytes until the next boundary.
    CollectingJpeg,
}

/// Incremental parser for a `multipart/x-mixed-replace` JPEG body.
pub struct MultipartParser {
    buffer: BytesMut,
    state: ParseState,
    jpeg_start: usize,
    limit: usize,
}

impl Default for MultipartParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartParser {
    pub fn new() -> Self {
        Self::with_limit(MAX_BUFFERED_BYTES)
    }

    /// A parser that drops any part whose headers or body grow past `limit`
    /// bytes without a terminating boundary.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(limit.min(256 * 1024)),
            state: ParseState::SeekingBoundary,
            jpeg_start: 0,
            limit,
        }
    }

    /// Drop an oversized part and resync on the next boundary.
    fn discard_if_oversized(&mut self) {
        if self.buffer.len() <= self.limit {
            return;
        }
        warn!(
            buffered = self.buffer.len(),
            limit = self.limit,
            "MJPEG part exceeds buffer limit, discarding"
        );
        self.buffer.clear();
        self.jpeg_start = 0;
        self.state = ParseState::SeekingBoundary;
    }

    /// Feed one chunk of the body; returns every JPEG part completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            match self.state {
                ParseState::SeekingBoundary => {
                    if let Some(pos) = find_subsequence(&self.buffer, BOUNDARY) {
                        let _ = self.buffer.split_to(pos + BOUNDARY.len());
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // Keep a tail in case the boundary spans chunks
                        if self.buffer.len() > BOUNDARY.len() {
                            let _ = self.buffer.split_to(self.buffer.len() - BOUNDARY.len());
                        }
                        break;
                    }
                }
                ParseState::SeekingHeaderEnd => {
                    if let Some(pos) = find_subsequence(&self.buffer, HEADER_END) {
                        let _ = self.buffer.split_to(pos + HEADER_END.len());
                        self.jpeg_start = 0;
                        self.state = ParseState::CollectingJpeg;
                    } else {
                        self.discard_if_oversized();
                        break;
                    }
                }
                ParseState::CollectingJpeg => {
                    let Some(pos) = find_subsequence(&self.buffer[self.jpeg_start..], BOUNDARY)
                    else {
                        // Don't re-scan what we've already searched
                        self.jpeg_start = self.buffer.len().saturating_sub(BOUNDARY.len());
                        self.discard_if_oversized();
                        break;
                    };

                    let jpeg_end = self.jpeg_start + pos;
                    let end = if self.buffer[..jpeg_end].ends_with(b"\r\n") {
                        jpeg_end - 2
                    } else {
                        jpeg_end
                    };
                    let jpeg = self.buffer[..end].to_vec();
                    let _ = self.buffer.split_to(jpeg_end + BOUNDARY.len());

                    if !jpeg.is_empty() {
                        frames.push(jpeg);
                    }
                    self.state = ParseState::SeekingHeaderEnd;
                }
            }
        }

        frames
    }
}

/// A camera that serves a continuous MJPEG stream over HTTP.
pub struct MjpegSource {
    url: String,
    connect_timeout: Duration,
}

impl MjpegSource {
    pub fn new(base_url: &str, quality: u32, fps: f64, connect_timeout: Duration) -> Self {
        Self {
            url: format!("{base_url}?quality={quality}&fps={fps}"),
            connect_timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl VideoSource for MjpegSource {
    async fn open(&self) -> Result<VideoStream, AcquisitionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(AcquisitionError::Client)?;
        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(AcquisitionError::Connect)?;

        if !response.status().is_success() {
            return Err(AcquisitionError::Status(response.status().as_u16()));
        }

        info!(url = self.url, status = %response.status(), "connected to MJPEG stream");

        let (sink, latest) = VideoStream::channel();
        let handle = tokio::spawn(read_stream(response, sink));
        Ok(VideoStream::new(vec![Track::new("mjpeg", handle)], latest))
    }

    fn name(&self) -> &str {
        "mjpeg"
    }
}

async fn read_stream(response: reqwest::Response, sink: FrameSink) {
    let mut byte_stream = response.bytes_stream();
    let mut parser = MultipartParser::new();
    let mut frames: u64 = 0;

    while let Some(chunk) = byte_stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "MJPEG stream error, track ending");
                return;
            }
        };
        for jpeg in parser.push(&chunk) {
            frames += 1;
            debug!(frames, bytes = jpeg.len(), "MJPEG frame received");
            sink.publish(jpeg);
        }
    }

    info!(frames, "MJPEG stream ended");
}

/// Find the position of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(BOUNDARY);
        out.extend_from_slice(b"Content-Type: image/jpeg\r\n");
        out.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\r\n");
        out
    }

    #[test]
    fn extracts_parts_in_one_chunk() {
        let mut body = part(b"first");
        body.extend(part(b"second"));
        body.extend_from_slice(BOUNDARY);

        let mut parser = MultipartParser::new();
        let frames = parser.push(&body);
        assert_eq!(frames, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn part_split_across_chunks() {
        let mut body = part(b"\xFF\xD8payload\xFF\xD9");
        body.extend_from_slice(BOUNDARY);

        let mut parser = MultipartParser::new();
        let mut frames = Vec::new();
        for chunk in body.chunks(3) {
            frames.extend(parser.push(chunk));
        }
        assert_eq!(frames, vec![b"\xFF\xD8payload\xFF\xD9".to_vec()]);
    }

    #[test]
    fn garbage_before_first_boundary_is_skipped() {
        let mut body = b"HTTP preamble junk".to_vec();
        body.extend(part(b"jpeg"));
        body.extend_from_slice(BOUNDARY);

        let mut parser = MultipartParser::new();
        assert_eq!(parser.push(&body), vec![b"jpeg".to_vec()]);
    }

    #[test]
    fn incomplete_part_yields_nothing() {
        let mut parser = MultipartParser::new();
        assert!(parser.push(&part(b"unfinished")).is_empty());
    }

    #[test]
    fn oversized_part_is_dropped_and_parser_resyncs() {
        let mut parser = MultipartParser::with_limit(128);

        let mut body = part(b"first");
        body.extend_from_slice(BOUNDARY);
        body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
        body.extend(std::iter::repeat(0xAB).take(1024));
        assert_eq!(parser.push(&body), vec![b"first".to_vec()]);
        assert!(parser.buffer.len() <= 128);

        let mut next = part(b"after");
        next.extend_from_slice(BOUNDARY);
        assert_eq!(parser.push(&next), vec![b"after".to_vec()]);
    }

    #[test]
    fn endless_headers_are_dropped() {
        let mut parser = MultipartParser::with_limit(128);
        let mut body = BOUNDARY.to_vec();
        body.extend(std::iter::repeat(b'x').take(1024));
        assert!(parser.push(&body).is_empty());
        assert!(parser.buffer.is_empty());
    }

    #[test]
    fn source_url_carries_quality_and_fps() {
        let source = MjpegSource::new("http://cam/stream", 80, 10.0, Duration::from_secs(1));
        assert_eq!(source.url(), "http://cam/stream?quality=80&fps=10");
    }
}
