use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::audio::AudioCue;
use crate::camera::{FrameReader, VideoSource, VideoStream};
use crate::client::Recognizer;
use crate::error::{AcquisitionError, TickError};
use crate::fallback::FallbackLauncher;
use crate::render::Renderer;
use crate::ui::{Ui, STATUS_ACTIVE, STATUS_STOPPED, STATUS_UNAVAILABLE};

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub interval: Duration,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Active,
    AlreadyActive,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No session is running.
    Inactive,
    /// The stream has not produced a frame yet.
    NoFrame,
    Rendered,
    /// The session that sent the frame has since been stopped.
    Stale,
}

/// The capture stream and timer of one start..stop lifetime.
struct Session {
    stream: VideoStream,
    timer: JoinHandle<()>,
    generation: u64,
}

/// The part of the controller a timer task needs.
struct CaptureTick {
    recognizer: Arc<dyn Recognizer>,
    renderer: Renderer,
    /// Advanced on every start and stop.
    generation: AtomicU64,
    jpeg_quality: u8,
}

/// Owns the capture session: opens the camera, runs the capture timer,
/// and feeds recognition results to the renderer.
pub struct Controller {
    source: Arc<dyn VideoSource>,
    launcher: Arc<dyn FallbackLauncher>,
    fallback_uri: Option<String>,
    interval: Duration,
    ui: Ui,
    tick: Arc<CaptureTick>,
    session: Mutex<Option<Session>>,
}

impl Controller {
    pub fn new(
        source: Arc<dyn VideoSource>,
        recognizer: Arc<dyn Recognizer>,
        cue: Arc<dyn AudioCue>,
        launcher: Arc<dyn FallbackLauncher>,
        fallback_uri: Option<String>,
        settings: CaptureSettings,
        ui: Ui,
    ) -> Self {
        Self {
            source,
            launcher,
            fallback_uri,
            interval: settings.interval,
            tick: Arc::new(CaptureTick {
                recognizer,
                renderer: Renderer::new(ui.clone(), cue),
                generation: AtomicU64::new(0),
                jpeg_quality: settings.jpeg_quality,
            }),
            ui,
            session: Mutex::new(None),
        }
    }

    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    /// Open the camera and start the capture timer.
    pub async fn start(&self) -> StartOutcome {
        let mut session = self.session.lock().await;
        if session.is_some() {
            info!("capture already active, ignoring start");
            return StartOutcome::AlreadyActive;
        }

        let stream = match self.source.open().await {
            Ok(s) => s,
            Err(e) => {
                drop(session);
                self.report_acquisition_failure(e).await;
                return StartOutcome::Failed;
            }
        };

        let generation = self.tick.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let timer = tokio::spawn(run_timer(
            Arc::clone(&self.tick),
            stream.reader(),
            generation,
            self.interval,
        ));
        *session = Some(Session {
            stream,
            timer,
            generation,
        });
        self.ui.set_status(STATUS_ACTIVE, true).await;

        info!(
            source = self.source.name(),
            generation,
            interval = ?self.interval,
            "camera started"
        );
        StartOutcome::Active
    }

    /// Stop the tracks and the timer. Safe to call at any time.
    pub async fn stop(&self) {
        let session = self.session.lock().await.take();
        self.tick.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(mut session) = session {
            session.timer.abort();
            session.stream.stop();
            info!(generation = session.generation, "camera stopped");
        }
        self.ui.set_status(STATUS_STOPPED, false).await;
    }

    /// Run one capture tick against the current session, outside the timer.
    pub async fn capture_and_send(&self) -> Result<TickOutcome, TickError> {
        let (reader, generation) = {
            let session = self.session.lock().await;
            match session.as_ref() {
                Some(s) => (s.stream.reader(), s.generation),
                None => return Ok(TickOutcome::Inactive),
            }
        };
        self.tick.capture_and_send(&reader, generation).await
    }

    /// Number of running capture timers: 0 or 1.
    pub async fn active_timers(&self) -> usize {
        let session = self.session.lock().await;
        session
            .as_ref()
            .filter(|s| !s.timer.is_finished())
            .map_or(0, |_| 1)
    }

    async fn report_acquisition_failure(&self, err: AcquisitionError) {
        error!(error = %err, source = self.source.name(), "unable to access camera");
        self.ui
            .alert(format!(
                "Unable to access camera: {err}. Check that the camera is reachable and allowed. \
                 Trying to open the system camera app instead."
            ))
            .await;

        if let Err(e) = self.launcher.launch(self.fallback_uri.as_deref()) {
            error!(error = %e, "failed to open camera app");
            self.ui
                .alert("Could not open the camera app. Please open it manually.")
                .await;
        }
        self.ui.set_status(STATUS_UNAVAILABLE, false).await;
    }
}

impl CaptureTick {
    async fn capture_and_send(
        &self,
        reader: &FrameReader,
        generation: u64,
    ) -> Result<TickOutcome, TickError> {
        let Some(frame) = reader.latest() else {
            return Ok(TickOutcome::NoFrame);
        };

        let quality = self.jpeg_quality;
        let still = tokio::task::spawn_blocking(move || frame.encode_still(quality)).await??;
        let result = self.recognizer.recognize(&still).await?;

        // Checked under the UI write lock, so a stop that lands while the
        // render is queued still wins.
        let current = || self.generation.load(Ordering::SeqCst) == generation;
        if !self.renderer.render_if(&result, current).await {
            debug!(generation, seq = still.seq, "dropping result from stopped session");
            return Ok(TickOutcome::Stale);
        }
        Ok(TickOutcome::Rendered)
    }
}

async fn run_timer(tick: Arc<CaptureTick>, reader: FrameReader, generation: u64, period: Duration) {
    // Each tick is awaited here, so a session never has two requests in flight.
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        match tick.capture_and_send(&reader, generation).await {
            Ok(outcome) => debug!(?outcome, generation, "capture tick"),
            Err(e) => warn!(error = %e, generation, "capture tick skipped"),
        }
    }
}
