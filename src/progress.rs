//! Progress-callback trait for per-stage diagnosis events.
//!
//! Inject an [`Arc<dyn DiagnosisProgressCallback>`] via
//! [`crate::config::DiagnosisConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves from loading the image to writing the PDF.
//! The CLI uses it to drive a spinner while the model is thinking.
//!
//! # Example
//!
//! ```rust
//! use leafdoc::{DiagnosisConfig, DiagnosisProgressCallback, Stage};
//! use std::sync::{Arc, Mutex};
//!
//! struct StageLog(Mutex<Vec<Stage>>);
//!
//! impl DiagnosisProgressCallback for StageLog {
//!     fn on_stage_start(&self, stage: Stage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let log = Arc::new(StageLog(Mutex::new(Vec::new())));
//! let config = DiagnosisConfig::builder()
//!     .progress_callback(log as Arc<dyn DiagnosisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Pipeline stage reported to callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    LoadImage,
    Generate,
    Parse,
    RenderHtml,
    RenderDocument,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::LoadImage => "Loading image",
            Stage::Generate => "Waiting for model",
            Stage::Parse => "Parsing diagnosis",
            Stage::RenderHtml => "Rendering HTML",
            Stage::RenderDocument => "Writing PDF report",
        };
        f.write_str(label)
    }
}

/// Called by the pipeline as it processes one image.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: independent
/// diagnoses may run concurrently and share one callback.
pub trait DiagnosisProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    ///
    /// # Arguments
    /// * `stage`      — the finished stage
    /// * `elapsed_ms` — wall-clock time spent in the stage
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when a stage fails. For [`Stage::RenderDocument`] the
    /// diagnosis still completes with the HTML fragment.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DiagnosisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DiagnosisConfig`].
pub type ProgressCallback = Arc<dyn DiagnosisProgressCallback>;
