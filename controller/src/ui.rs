//! State behind the page's status line, results container and alert list.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::render::PLACEHOLDER_HTML;

pub const STATUS_READY: &str = "Ready.";
pub const STATUS_ACTIVE: &str = "Detection started...";
pub const STATUS_STOPPED: &str = "Detection stopped.";
pub const STATUS_UNAVAILABLE: &str = "Camera unavailable.";

#[derive(Debug, Clone, Serialize)]
pub struct UiState {
    pub status: String,
    pub active: bool,
    pub results_html: String,
    pub alerts: Vec<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            status: STATUS_READY.into(),
            active: false,
            results_html: PLACEHOLDER_HTML.into(),
            alerts: Vec::new(),
        }
    }
}

/// Cloneable handle to the shared [`UiState`].
#[derive(Clone, Default)]
pub struct Ui {
    inner: Arc<RwLock<UiState>>,
}

impl Ui {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> UiState {
        self.inner.read().await.clone()
    }

    pub async fn set_status(&self, status: &str, active: bool) {
        let mut state = self.inner.write().await;
        state.status = status.to_string();
        state.active = active;
    }

    /// Replace the results only if `is_current` still holds once the write
    /// lock is taken. Returns whether the results were replaced.
    pub async fn set_results_if<F>(&self, html: String, is_current: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let mut state = self.inner.write().await;
        if !is_current() {
            return false;
        }
        state.results_html = html;
        true
    }

    /// Queue a message the user must see.
    pub async fn alert(&self, message: impl Into<String>) {
        self.inner.write().await.alerts.push(message.into());
    }

    pub async fn dismiss_alerts(&self) {
        self.inner.write().await.alerts.clear();
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> Arc<RwLock<UiState>> {
        Arc::clone(&self.inner)
    }
}
