mod page;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use facewatch_common::config::Config;
use facewatch_controller::audio::{AudioCue, BellCue, CommandCue};
use facewatch_controller::camera::{MjpegSource, PollingSource, VideoSource};
use facewatch_controller::client::HttpRecognizer;
use facewatch_controller::fallback::OpenLauncher;
use facewatch_controller::ui::Ui;
use facewatch_controller::{CaptureSettings, Controller, StartOutcome};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

struct AppState {
    controller: Controller,
    camera_url: String,
    refresh_secs: u64,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: String,
    active: bool,
    alerts: Vec<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET / — the console page
async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ui = state.controller.ui().snapshot().await;
    Html(page::index_html(&ui, &state.camera_url, state.refresh_secs))
}

/// POST /start
async fn start(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.controller.start().await {
        StartOutcome::Active => info!("capture started from console"),
        StartOutcome::AlreadyActive => {}
        StartOutcome::Failed => warn!("capture start failed"),
    }
    Redirect::to("/")
}

/// POST /stop
async fn stop(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.controller.stop().await;
    Redirect::to("/")
}

/// GET /status
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ui = state.controller.ui().snapshot().await;
    Json(StatusBody {
        status: ui.status,
        active: ui.active,
        alerts: ui.alerts,
    })
}

/// GET /results — the results container fragment
async fn results(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(state.controller.ui().snapshot().await.results_html)
}

/// POST /alerts/dismiss
async fn dismiss_alerts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.controller.ui().dismiss_alerts().await;
    Redirect::to("/")
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn build_source(config: &Config) -> Option<Arc<dyn VideoSource>> {
    let camera = &config.camera;
    let timeout = Duration::from_secs(camera.connect_timeout_secs);
    match camera.mode.as_str() {
        "mjpeg" => Some(Arc::new(MjpegSource::new(
            &camera.url,
            camera.quality,
            camera.fps,
            timeout,
        ))),
        "polling" => Some(Arc::new(PollingSource::new(
            &camera.url,
            camera.quality,
            camera.fps,
            timeout,
        ))),
        _ => None,
    }
}

fn build_cue(config: &Config) -> Arc<dyn AudioCue> {
    match CommandCue::from_command_line(&config.alert.command) {
        Some(cue) => Arc::new(cue),
        None => Arc::new(BellCue),
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/status", get(status))
        .route("/results", get(results))
        .route("/alerts/dismiss", post(dismiss_alerts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    let Some(source) = build_source(&config) else {
        error!(mode = config.camera.mode, "unknown camera mode, expected 'mjpeg' or 'polling'");
        std::process::exit(1);
    };

    let recognizer = match HttpRecognizer::new(
        config.recognition.endpoint_url(),
        Duration::from_secs(config.recognition.request_timeout_secs),
    ) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "failed to build recognition client");
            std::process::exit(1);
        }
    };

    info!(
        camera = config.camera.url,
        mode = config.camera.mode,
        recognizer = recognizer.url(),
        interval_ms = config.capture.interval_ms,
        jpeg_quality = config.capture.jpeg_quality,
        "starting facewatch console"
    );

    let controller = Controller::new(
        source,
        Arc::new(recognizer),
        build_cue(&config),
        Arc::new(OpenLauncher),
        config.fallback.resolved_uri(),
        CaptureSettings {
            interval: config.capture.interval(),
            jpeg_quality: config.capture.jpeg_quality,
        },
        Ui::new(),
    );

    let state = Arc::new(AppState {
        controller,
        camera_url: config.camera.url.clone(),
        refresh_secs: config.capture.interval().as_secs().max(1),
    });
    let app = build_router(Arc::clone(&state));

    let addr = format!("{}:{}", config.console.bind, config.console.port);
    info!(addr, "facewatch console listening");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        eprintln!("Failed to bind to {addr}: {e}");
        std::process::exit(1);
    });
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "console server failed");
    }

    state.controller.stop().await;
    info!("facewatch console stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use facewatch_controller::camera::{Track, VideoStream};
    use facewatch_controller::error::AcquisitionError;
    use facewatch_controller::fallback::{FallbackError, FallbackLauncher};
    use facewatch_controller::render::PLACEHOLDER_HTML;
    use serde_json::Value;
    use tower::ServiceExt;

    fn config(mode: &str) -> Config {
        Config::parse(&format!(
            "[camera]\nurl = \"http://cam/stream\"\nmode = \"{mode}\"\n\n[recognition]\nbase_url = \"http://127.0.0.1:5001\"\n"
        ))
        .unwrap()
    }

    #[test]
    fn known_camera_modes_build_sources() {
        assert_eq!(build_source(&config("mjpeg")).unwrap().name(), "mjpeg");
        assert_eq!(build_source(&config("polling")).unwrap().name(), "polling");
    }

    #[test]
    fn unknown_camera_mode_is_rejected() {
        assert!(build_source(&config("h264")).is_none());
    }

    /// A camera that opens to an idle track, or refuses when `fail` is set.
    struct StubSource {
        fail: bool,
    }

    #[async_trait]
    impl VideoSource for StubSource {
        async fn open(&self) -> Result<VideoStream, AcquisitionError> {
            if self.fail {
                return Err(AcquisitionError::Status(403));
            }
            let (sink, rx) = VideoStream::channel();
            let handle = tokio::spawn(async move {
                let _sink = sink;
                std::future::pending::<()>().await
            });
            Ok(VideoStream::new(vec![Track::new("stub", handle)], rx))
        }
    }

    struct NoLauncher;

    impl FallbackLauncher for NoLauncher {
        fn launch(&self, _uri: Option<&str>) -> Result<(), FallbackError> {
            Err(FallbackError::NoUri)
        }
    }

    fn app(fail: bool) -> Router {
        let recognizer =
            HttpRecognizer::new("http://127.0.0.1:9/process_frame", Duration::from_secs(1)).unwrap();
        let controller = Controller::new(
            Arc::new(StubSource { fail }),
            Arc::new(recognizer),
            Arc::new(BellCue),
            Arc::new(NoLauncher),
            None,
            CaptureSettings {
                interval: Duration::from_secs(3600),
                jpeg_quality: 92,
            },
            Ui::new(),
        );
        build_router(Arc::new(AppState {
            controller,
            camera_url: "http://cam/stream".into(),
            refresh_secs: 3,
        }))
    }

    async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Option<String>, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, location, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn status_json(app: &Router) -> Value {
        let (code, _, body) = send(app, "GET", "/status").await;
        assert_eq!(code, StatusCode::OK);
        serde_json::from_str(&body).unwrap()
    }

    #[tokio::test]
    async fn index_serves_page_with_element_ids() {
        let app = app(false);
        let (code, _, body) = send(&app, "GET", "/").await;
        assert_eq!(code, StatusCode::OK);
        for id in ["video", "startBtn", "stopBtn", "status", "results", "alertSound"] {
            assert!(body.contains(&format!(r#"id="{id}""#)), "missing #{id}");
        }
    }

    #[tokio::test]
    async fn start_and_stop_redirect_home_and_update_status() {
        let app = app(false);
        let (code, location, _) = send(&app, "POST", "/start").await;
        assert_eq!(code, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/"));

        let body = status_json(&app).await;
        assert_eq!(body["active"], true);
        assert_eq!(body["status"], "Detection started...");

        let (code, location, _) = send(&app, "POST", "/stop").await;
        assert_eq!(code, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/"));

        let body = status_json(&app).await;
        assert_eq!(body["active"], false);
        assert_eq!(body["status"], "Detection stopped.");
    }

    #[tokio::test]
    async fn results_fragment_starts_as_placeholder() {
        let app = app(false);
        let (code, _, body) = send(&app, "GET", "/results").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, PLACEHOLDER_HTML);
    }

    #[tokio::test]
    async fn failed_start_raises_alerts_until_dismissed() {
        let app = app(true);
        send(&app, "POST", "/start").await;

        let body = status_json(&app).await;
        assert_eq!(body["active"], false);
        assert_eq!(body["alerts"].as_array().unwrap().len(), 2);

        let (code, location, _) = send(&app, "POST", "/alerts/dismiss").await;
        assert_eq!(code, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/"));
        assert!(status_json(&app).await["alerts"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = app(false);
        let (code, _, _) = send(&app, "GET", "/nope").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }
}
