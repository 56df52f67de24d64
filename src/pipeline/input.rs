//! Input loading: read a leaf image from disk into an [`ImagePayload`].
//!
//! The payload is always labelled `image/jpeg`, whatever the bytes really
//! are. Gemini sniffs the content itself and the diagnosis prompt has always
//! been sent this way, so the label is kept. The real format is still
//! detected and a warning logged when it disagrees, which makes a
//! provider-side rejection of an odd file easy to explain.
//!
//! No content validation happens here: empty, truncated or non-image files
//! load fine and any problem surfaces at the model boundary.

use crate::error::DiagnosisError;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// MIME label attached to every payload.
pub const PAYLOAD_MIME_TYPE: &str = "image/jpeg";

/// Raw image bytes plus the MIME type sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    /// Wrap bytes already in memory (e.g. an upload body).
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            mime_type: PAYLOAD_MIME_TYPE.to_string(),
            data,
        }
    }

    /// Format detected from the magic bytes, if recognisable.
    pub fn detected_format(&self) -> Option<ImageFormat> {
        image::guess_format(&self.data).ok()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Read the image at `path`.
///
/// # Errors
/// * [`DiagnosisError::NotFound`] — nothing exists at `path`
/// * [`DiagnosisError::PermissionDenied`] — the file is not readable
/// * [`DiagnosisError::Io`] — any other read failure (e.g. `path` is a directory)
pub async fn load_image(path: impl AsRef<Path>) -> Result<ImagePayload, DiagnosisError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(DiagnosisError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let data = tokio::fs::read(path)
        .await
        .map_err(|e| map_read_error(path.to_path_buf(), e))?;

    let payload = ImagePayload::from_bytes(data);
    debug!("Loaded image {}: {} bytes", path.display(), payload.len());

    match payload.detected_format() {
        Some(ImageFormat::Jpeg) => {}
        Some(other) => warn!(
            "{} looks like {:?}, sending it labelled {}",
            path.display(),
            other,
            PAYLOAD_MIME_TYPE
        ),
        None => warn!(
            "{} is not a recognised image format, sending it labelled {}",
            path.display(),
            PAYLOAD_MIME_TYPE
        ),
    }

    Ok(payload)
}

fn map_read_error(path: PathBuf, e: std::io::Error) -> DiagnosisError {
    match e.kind() {
        std::io::ErrorKind::NotFound => DiagnosisError::NotFound { path },
        std::io::ErrorKind::PermissionDenied => DiagnosisError::PermissionDenied { path },
        _ => DiagnosisError::Io { path, source: e },
    }
}
