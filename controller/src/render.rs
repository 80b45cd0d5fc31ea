use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use facewatch_common::recognition::{MatchResult, Person};
use tracing::{debug, warn};

use crate::audio::AudioCue;
use crate::ui::Ui;

pub const PLACEHOLDER_HTML: &str = r#"<p class="no-matches">No matches detected yet...</p>"#;

/// Longest a cue may play before it is abandoned.
const CUE_TIMEOUT: Duration = Duration::from_secs(10);

/// Replaces the results container with the rendering of each result.
pub struct Renderer {
    ui: Ui,
    cue: Arc<dyn AudioCue>,
}

impl Renderer {
    pub fn new(ui: Ui, cue: Arc<dyn AudioCue>) -> Self {
        Self { ui, cue }
    }

    pub async fn render(&self, result: &MatchResult) {
        self.render_if(result, || true).await;
    }

    /// Render `result` unless `is_current` turns false before the container
    /// is replaced. The cue starts after the cards are in place and is never
    /// waited on.
    pub async fn render_if<F>(&self, result: &MatchResult, is_current: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        debug!(status = result.status, matches = result.matches.len(), "rendering results");
        if !self.ui.set_results_if(render_html(result), is_current).await {
            return false;
        }
        if result.has_matches() {
            self.play_cue();
        }
        true
    }

    fn play_cue(&self) {
        let cue = Arc::clone(&self.cue);
        tokio::spawn(async move {
            match tokio::time::timeout(CUE_TIMEOUT, cue.play()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "alert sound failed"),
                Err(_) => warn!(timeout = ?CUE_TIMEOUT, "alert sound timed out"),
            }
        });
    }
}

/// HTML for the results container.
pub fn render_html(result: &MatchResult) -> String {
    if !result.has_matches() {
        return match result.message.as_deref() {
            Some(message) if !message.is_empty() => format!(
                r#"{PLACEHOLDER_HTML}<p class="service-message">{}</p>"#,
                escape_html(message)
            ),
            _ => PLACEHOLDER_HTML.to_string(),
        };
    }

    let mut html = format!(
        r#"<p class="matches-heading">Matches Found! ({} candidates)</p>"#,
        result.matches.len()
    );
    for person in &result.matches {
        html.push_str(&card_html(person));
    }
    html
}

fn card_html(person: &Person) -> String {
    let mut card = String::from(r#"<div class="match-card">"#);
    let _ = write!(
        card,
        r#"<img src="{}" alt="Matched Face"/>"#,
        escape_html(&person.image_url.to_string())
    );
    for (label, value) in [
        ("Name", &person.name),
        ("Location", &person.location),
        ("Age", &person.age),
    ] {
        let _ = write!(
            card,
            "<p><strong>{label}:</strong> {}</p>",
            escape_html(&value.to_string())
        );
    }
    card.push_str("</div>");
    card
}

/// Escape text for use in HTML content and quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
