//! Result types returned by [`crate::diagnose`].

use crate::error::{DiagnosisError, ReportError};
use crate::report::DiagnosisRecord;
use serde::Serialize;
use std::path::PathBuf;

/// Everything produced for one image.
///
/// `report_path` and `report_error` are mutually exclusive: the PDF either
/// landed on disk or the reason it didn't is recorded here. The HTML
/// fragment is present in both cases.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisOutput {
    /// The image that was diagnosed.
    pub image_path: PathBuf,
    /// Model answer, unmodified.
    pub raw_response: String,
    pub record: DiagnosisRecord,
    /// HTML fragment rendered from `raw_response`.
    pub html: String,
    /// Where the PDF report was written.
    pub report_path: Option<PathBuf>,
    /// Why the PDF report is missing.
    pub report_error: Option<ReportError>,
    pub stats: DiagnosisStats,
}

impl DiagnosisOutput {
    /// `true` when the PDF was written.
    pub fn has_report(&self) -> bool {
        self.report_path.is_some()
    }

    /// Treat a missing PDF as a failure of the whole diagnosis.
    pub fn into_result(self) -> Result<Self, DiagnosisError> {
        match self.report_error {
            None => Ok(self),
            Some(e) => {
                let path = e
                    .path()
                    .cloned()
                    .unwrap_or_else(|| self.image_path.clone());
                Err(DiagnosisError::IoFailure {
                    path,
                    detail: e.to_string(),
                })
            }
        }
    }
}

/// Wall-clock timings and sizes for one diagnosis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosisStats {
    /// Image file size in bytes.
    pub image_bytes: usize,
    pub load_ms: u64,
    /// Time spent waiting for the model.
    pub generation_ms: u64,
    /// Parsing plus both renderers.
    pub render_ms: u64,
    pub total_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Analysis;

    fn output(report_error: Option<ReportError>) -> DiagnosisOutput {
        DiagnosisOutput {
            image_path: PathBuf::from("leaf.jpg"),
            raw_response: "Rust".into(),
            record: DiagnosisRecord::new("Rust", "2024-05-01 12:00:00", Analysis::default()),
            html: "<div class=\"report-section\"></div>\n".into(),
            report_path: report_error
                .is_none()
                .then(|| PathBuf::from("/tmp/plant_disease_report_20240501_120000.pdf")),
            report_error,
            stats: DiagnosisStats::default(),
        }
    }

    #[test]
    fn into_result_passes_success_through() {
        let out = output(None).into_result().unwrap();
        assert!(out.has_report());
    }

    #[test]
    fn into_result_converts_write_failure() {
        let err = output(Some(ReportError::WriteFailed {
            path: PathBuf::from("/readonly/report.pdf"),
            detail: "read-only file system".into(),
        }))
        .into_result()
        .unwrap_err();
        match err {
            DiagnosisError::IoFailure { path, detail } => {
                assert_eq!(path, PathBuf::from("/readonly/report.pdf"));
                assert!(detail.contains("read-only"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_value(output(None)).unwrap();
        assert_eq!(json["record"]["disease_name"], "Rust");
        assert!(json["report_error"].is_null());
        assert_eq!(json["stats"]["generation_ms"], 0);
    }
}
