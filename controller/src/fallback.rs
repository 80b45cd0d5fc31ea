/// Hands a URI to the operating system to launch a native camera app.
pub trait FallbackLauncher: Send + Sync {
    fn launch(&self, uri: Option<&str>) -> Result<(), FallbackError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error("no camera app URI configured for this platform")]
    NoUri,
    #[error("failed to open {0}: {1}")]
    Open(String, std::io::Error),
}

/// Launches through the platform opener. Returns once the opener is spawned;
/// whether the app actually starts is never confirmed.
pub struct OpenLauncher;

impl FallbackLauncher for OpenLauncher {
    fn launch(&self, uri: Option<&str>) -> Result<(), FallbackError> {
        let uri = uri.ok_or(FallbackError::NoUri)?;
        open::that_detached(uri).map_err(|e| FallbackError::Open(uri.to_string(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_uri_is_reported() {
        assert!(matches!(OpenLauncher.launch(None), Err(FallbackError::NoUri)));
    }
}
