//! Error types for the leafdoc library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DiagnosisError`] — **Fatal**: the diagnosis cannot proceed at all
//!   (image missing, provider not configured, model call failed). Returned as
//!   `Err(DiagnosisError)` from the top-level `diagnose*` functions.
//!
//! * [`ReportError`] — **Non-fatal**: the PDF document could not be produced,
//!   but the model answered and the HTML fragment is fine. Stored inside
//!   [`crate::output::DiagnosisOutput`] so callers keep the HTML report
//!   rather than losing the whole request to a full disk.
//!
//! [`crate::output::DiagnosisOutput::into_result`] turns a stored
//! `ReportError` into [`DiagnosisError::IoFailure`] for callers that want
//! all-or-nothing behaviour.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the leafdoc library.
#[derive(Debug, Error)]
pub enum DiagnosisError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Image file was not found at the given path.
    #[error("Could not find image: '{path}'\nCheck the path exists and is readable.")]
    NotFound { path: PathBuf },

    /// Process does not have read permission on the image.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The image exists but could not be read.
    #[error("Failed to read image '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The provider is not initialised (missing API key etc.).
    #[error("Generation provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The model call failed: transport error, HTTP error status, quota,
    /// authentication, or a content-safety block. Never retried.
    #[error("Generation failed: {detail}")]
    GenerationFailed { detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The PDF report could not be written.
    ///
    /// Only produced by [`crate::output::DiagnosisOutput::into_result`];
    /// the pipeline itself records document failures as [`ReportError`].
    #[error("Failed to write report '{path}': {detail}")]
    IoFailure { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for the PDF document renderer.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ReportError {
    /// printpdf rejected the document (font registration, serialisation).
    #[error("PDF rendering failed: {detail}")]
    RenderFailed { detail: String },

    /// The rendered bytes could not be written to disk.
    #[error("Failed to write PDF '{path}': {detail}")]
    WriteFailed { path: PathBuf, detail: String },
}

impl ReportError {
    /// Path of the file that failed to be written, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ReportError::RenderFailed { .. } => None,
            ReportError::WriteFailed { path, .. } => Some(path),
        }
    }
}
