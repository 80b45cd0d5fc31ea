use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub camera: CameraConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    pub url: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_stream_quality")]
    pub quality: u32,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Period of the capture timer.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// JPEG quality (1-100) used when re-encoding a captured frame.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionConfig {
    pub base_url: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertConfig {
    /// Player command and arguments, e.g. `["paplay", "static/alert.wav"]`.
    /// Falls back to the terminal bell when empty.
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FallbackConfig {
    /// URI handed to the OS when the camera cannot be opened.
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CaptureConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl FallbackConfig {
    /// The configured URI, or the platform default when none is set.
    pub fn resolved_uri(&self) -> Option<String> {
        self.uri.clone().or_else(default_fallback_uri)
    }
}

impl RecognitionConfig {
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_mode() -> String {
    "mjpeg".into()
}
fn default_stream_quality() -> u32 {
    80
}
fn default_fps() -> f64 {
    10.0
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_interval_ms() -> u64 {
    3000
}
fn default_jpeg_quality() -> u8 {
    92
}
fn default_endpoint() -> String {
    "/process_frame".into()
}
fn default_request_timeout() -> u64 {
    15
}
fn default_bind() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    5000
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(target_os = "windows")]
fn default_fallback_uri() -> Option<String> {
    Some("microsoft.windows.camera:".into())
}

#[cfg(not(target_os = "windows"))]
fn default_fallback_uri() -> Option<String> {
    None
}
