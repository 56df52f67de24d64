//! Request orchestration: one image in, one [`DiagnosisOutput`] out.
//!
//! ```text
//! load_image ─▶ resolve_provider ─▶ request_diagnosis ─▶ parse_report
//!                                                       ├─▶ render_html
//!                                                       └─▶ write_report (spawn_blocking)
//! ```
//!
//! Each call owns its record and its output file, so independent images can
//! be diagnosed concurrently with the same config.

use crate::config::DiagnosisConfig;
use crate::error::{DiagnosisError, ReportError};
use crate::output::{DiagnosisOutput, DiagnosisStats};
use crate::pipeline::{document, html, input, llm, parse};
use crate::progress::Stage;
use crate::report::now_timestamp;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Diagnose the leaf photo at `image_path`.
///
/// # Returns
/// `Ok(DiagnosisOutput)` once the model has answered, even if the PDF could
/// not be written (check `output.report_error`, or call
/// [`DiagnosisOutput::into_result`]).
///
/// # Errors
/// Returns `Err(DiagnosisError)` only for fatal errors:
/// - image not found / unreadable (before any network call)
/// - no provider configured
/// - the model call failed or was blocked (no record, no file)
pub async fn diagnose(
    image_path: impl AsRef<Path>,
    config: &DiagnosisConfig,
) -> Result<DiagnosisOutput, DiagnosisError> {
    let total_start = Instant::now();
    let image_path = image_path.as_ref().to_path_buf();
    info!("Starting diagnosis: {}", image_path.display());

    // ── Step 1: Load image ───────────────────────────────────────────────
    let started = stage_start(config, Stage::LoadImage);
    let payload = input::load_image(&image_path)
        .await
        .inspect_err(|e| stage_error(config, Stage::LoadImage, e))?;
    let load_ms = stage_complete(config, Stage::LoadImage, started);

    // ── Step 2: Get/create provider ──────────────────────────────────────
    let provider = llm::resolve_provider(config)?;

    // ── Step 3: Ask the model ────────────────────────────────────────────
    let started = stage_start(config, Stage::Generate);
    let raw = llm::request_diagnosis(&provider, &payload)
        .await
        .inspect_err(|e| stage_error(config, Stage::Generate, e))?;
    let generation_ms = stage_complete(config, Stage::Generate, started);

    // ── Step 4: Parse ────────────────────────────────────────────────────
    let render_start = Instant::now();
    let started = stage_start(config, Stage::Parse);
    let record = parse::parse_report(&raw, now_timestamp());
    stage_complete(config, Stage::Parse, started);
    debug!("Parsed diagnosis: {:?}", record.disease_name());

    // ── Step 5: HTML fragment ────────────────────────────────────────────
    let started = stage_start(config, Stage::RenderHtml);
    let html = html::render_html(&raw);
    stage_complete(config, Stage::RenderHtml, started);

    // ── Step 6: PDF report ───────────────────────────────────────────────
    let started = stage_start(config, Stage::RenderDocument);
    let dir = config.report_dir();
    let doc_record = record.clone();
    let written = tokio::task::spawn_blocking(move || document::write_report(&doc_record, &dir))
        .await
        .unwrap_or_else(|e| {
            Err(ReportError::RenderFailed {
                detail: format!("report task failed: {e}"),
            })
        });

    let (report_path, report_error) = match written {
        Ok(path) => {
            stage_complete(config, Stage::RenderDocument, started);
            (Some(path), None)
        }
        Err(e) => {
            warn!("PDF report not written: {}", e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_stage_error(Stage::RenderDocument, &e.to_string());
            }
            (None, Some(e))
        }
    };
    let render_ms = elapsed_ms(render_start);

    let stats = DiagnosisStats {
        image_bytes: payload.len(),
        load_ms,
        generation_ms,
        render_ms,
        total_ms: elapsed_ms(total_start),
    };

    info!(
        "Diagnosis complete: '{}' in {}ms",
        record.disease_name(),
        stats.total_ms
    );

    Ok(DiagnosisOutput {
        image_path,
        raw_response: raw,
        record,
        html,
        report_path,
        report_error,
        stats,
    })
}

/// Synchronous wrapper around [`diagnose`].
///
/// Creates a temporary tokio runtime internally.
pub fn diagnose_sync(
    image_path: impl AsRef<Path>,
    config: &DiagnosisConfig,
) -> Result<DiagnosisOutput, DiagnosisError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DiagnosisError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(diagnose(image_path, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

fn stage_start(config: &DiagnosisConfig, stage: Stage) -> Instant {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
    Instant::now()
}

fn stage_complete(config: &DiagnosisConfig, stage: Stage, started: Instant) -> u64 {
    let ms = elapsed_ms(started);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, ms);
    }
    ms
}

fn stage_error(config: &DiagnosisConfig, stage: Stage, error: &DiagnosisError) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_error(stage, &error.to_string());
    }
}
