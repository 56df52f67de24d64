//! The structured diagnosis record shared by both renderers.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// `YYYY-MM-DD HH:MM:SS`, shown in the report table.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `YYYYMMDD_HHMMSS`, used in report file names.
pub const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Current local time in [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    format_timestamp(&Local::now())
}

pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// The four extracted sections plus whatever matched none of them.
///
/// Every field is empty text when the model left the section out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub symptoms: String,
    pub causes: String,
    pub treatment: String,
    pub prevention: String,
    /// Unmatched paragraphs in order, each followed by `\n`.
    pub additional_notes: String,
}

/// One diagnosis, built once per model answer and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    disease_name: String,
    timestamp: String,
    analysis: Analysis,
}

impl DiagnosisRecord {
    pub fn new(
        disease_name: impl Into<String>,
        timestamp: impl Into<String>,
        analysis: Analysis,
    ) -> Self {
        Self {
            disease_name: disease_name.into(),
            timestamp: timestamp.into(),
            analysis,
        }
    }

    pub fn disease_name(&self) -> &str {
        &self.disease_name
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn symptoms(&self) -> &str {
        &self.analysis.symptoms
    }

    pub fn causes(&self) -> &str {
        &self.analysis.causes
    }

    pub fn treatment(&self) -> &str {
        &self.analysis.treatment
    }

    pub fn prevention(&self) -> &str {
        &self.analysis.prevention
    }

    pub fn additional_notes(&self) -> &str {
        &self.analysis.additional_notes
    }
}
