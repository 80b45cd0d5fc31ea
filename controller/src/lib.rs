//! Capture-and-render controller: pulls frames from a camera, sends them to a
//! face-recognition service on a timer, and renders the returned matches.

pub mod audio;
pub mod camera;
pub mod client;
pub mod controller;
pub mod error;
pub mod fallback;
pub mod render;
pub mod ui;

pub use controller::{CaptureSettings, Controller, StartOutcome, TickOutcome};
