//! # leafdoc
//!
//! Diagnose plant diseases from a photo of a leaf using Google Gemini.
//!
//! The photo is sent with a fixed plant-pathologist instruction to a
//! multimodal model. The free-text answer is filed into a fixed
//! [`DiagnosisRecord`] by keyword, rendered as an HTML fragment for inline
//! display and written out as a PDF report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image
//!  │
//!  ├─ 1. Input     read the file, label it image/jpeg
//!  ├─ 2. Encode    base64 inline-data part
//!  ├─ 3. Generate  one Gemini generateContent call, no retry
//!  ├─ 4. Parse     paragraphs → symptoms / causes / treatment / prevention / notes
//!  ├─ 5. HTML      fragment built from the raw answer
//!  └─ 6. PDF       plant_disease_report_<stamp>.pdf in the output dir
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use leafdoc::{diagnose, DiagnosisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GOOGLE_API_KEY
//!     let config = DiagnosisConfig::default();
//!     let output = diagnose("leaf.jpg", &config).await?;
//!     println!("{}", output.html);
//!     if let Some(path) = &output.report_path {
//!         eprintln!("report: {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `leafdoc` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! leafdoc = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod diagnose;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DiagnosisConfig, DiagnosisConfigBuilder, GenerationConfig, SafetySetting};
pub use diagnose::{diagnose, diagnose_sync};
pub use error::{DiagnosisError, ReportError};
pub use output::{DiagnosisOutput, DiagnosisStats};
pub use pipeline::document::{layout, render_pdf, write_report, Block};
pub use pipeline::html::{render_html, render_html_page, REPORT_CSS};
pub use pipeline::input::{load_image, ImagePayload};
pub use pipeline::llm::{GeminiProvider, GeminiSettings, GenerationProvider};
pub use pipeline::parse::parse_report;
pub use progress::{DiagnosisProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use report::{Analysis, DiagnosisRecord};
