//! CLI binary for leafdoc.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `DiagnosisConfig`, prints the HTML fragment and reports the PDF path.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use leafdoc::{
    diagnose, render_html_page, DiagnosisConfig, DiagnosisOutput, DiagnosisProgressCallback,
    ProgressCallback, Stage,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner with one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.green} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Diagnosing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl DiagnosisProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<20} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Keep long provider messages on one line.
        let msg = match error.char_indices().nth(100) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} {:<20} {}",
            red("✗"),
            stage.to_string(),
            red(&msg.replace('\n', " ")),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Diagnose a leaf, print the HTML fragment, write the PDF to the temp dir
  leafdoc leaf.jpg

  # Keep reports in a folder and save a standalone HTML page
  leafdoc leaf.jpg -o reports/ --html leaf.html

  # Structured output for scripts
  leafdoc --json leaf.jpg > diagnosis.json

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY       Gemini API key (also read from a .env file)
  LEAFDOC_MODEL        Override model ID (default: gemini-1.5-flash)
  LEAFDOC_ENDPOINT     Override the API base URL
  LEAFDOC_OUTPUT_DIR   Directory for PDF reports
  RUST_LOG             Log filter, overrides -v / -q

SETUP:
  1. Set API key:     export GOOGLE_API_KEY=...
  2. Diagnose:        leafdoc leaf.jpg
"#;

/// Diagnose plant diseases from leaf photos using Google Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "leafdoc",
    version,
    about = "Diagnose plant diseases from leaf photos using Google Gemini",
    long_about = "Send a leaf photo to a Gemini multimodal model acting as a plant pathologist, \
print the diagnosis as an HTML fragment and write a PDF report.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Leaf image file(s). Only the first one is diagnosed.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Gemini API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model ID.
    #[arg(long, env = "LEAFDOC_MODEL")]
    model: Option<String>,

    /// Gemini REST base URL.
    #[arg(long, env = "LEAFDOC_ENDPOINT")]
    endpoint: Option<String>,

    /// Directory for the PDF report (default: system temp dir).
    #[arg(short, long, env = "LEAFDOC_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Also write a standalone HTML page to this file.
    #[arg(long, env = "LEAFDOC_HTML")]
    html: Option<PathBuf>,

    /// Output structured JSON (DiagnosisOutput) instead of the HTML fragment.
    #[arg(long, env = "LEAFDOC_JSON")]
    json: bool,

    /// Model call timeout in seconds.
    #[arg(long, env = "LEAFDOC_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Disable the progress spinner.
    #[arg(long, env = "LEAFDOC_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LEAFDOC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "LEAFDOC_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up GOOGLE_API_KEY from .env before clap reads the environment.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep INFO logs out of
    // its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let (image, extra) = match cli.images.split_first() {
        Some(split) => split,
        None => anyhow::bail!("No image given"),
    };
    if !extra.is_empty() {
        warn!("Only the first image is diagnosed; ignoring {} more", extra.len());
        if !cli.quiet {
            eprintln!(
                "{}",
                dim(&format!("note: ignoring {} extra image(s)", extra.len()))
            );
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = spinner
        .clone()
        .map(|cb| cb as Arc<dyn DiagnosisProgressCallback>);
    let config = build_config(&cli, progress_cb)?;

    if let Some(ref dir) = cli.output_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output dir {}", dir.display()))?;
    }

    // ── Run diagnosis ────────────────────────────────────────────────────
    let result = diagnose(image, &config).await;
    if let Some(ref s) = spinner {
        s.finish();
    }
    let output = result.with_context(|| format!("Diagnosis of {} failed", image.display()))?;

    if let Some(ref path) = cli.html {
        tokio::fs::write(path, render_html_page(&output.raw_response))
            .await
            .with_context(|| format!("Failed to write HTML page to {}", path.display()))?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.html.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        print_summary(&output, cli.html.as_ref());
    }

    // A missing PDF is a failed request for the shell.
    output.into_result().context("PDF report was not written")?;
    Ok(())
}

/// One-line summary on stderr.
fn print_summary(output: &DiagnosisOutput, html: Option<&PathBuf>) {
    let name = output.record.disease_name();
    let name = if name.is_empty() { "(no name given)" } else { name };
    match (&output.report_path, &output.report_error) {
        (Some(path), _) => eprintln!(
            "{}  {}  {}ms  →  {}",
            green("✔"),
            bold(name),
            output.stats.total_ms,
            bold(&path.display().to_string()),
        ),
        (None, Some(e)) => eprintln!("{}  {}  {}", red("✘"), bold(name), red(&e.to_string())),
        (None, None) => {}
    }
    if let Some(path) = html {
        eprintln!("   HTML page  →  {}", dim(&path.display().to_string()));
    }
}

/// Map CLI args to `DiagnosisConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<DiagnosisConfig> {
    let mut builder = DiagnosisConfig::builder().api_timeout_secs(cli.api_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
