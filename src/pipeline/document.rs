//! PDF report renderer.
//!
//! Rendering is split in two so the content can be tested without reading
//! PDF bytes back:
//!
//! 1. [`layout`] — pure: record → ordered [`Block`]s (title, info table,
//!    sections, optional notes, disclaimer). Same record, same blocks.
//! 2. [`render_pdf`] — paints the blocks with `printpdf` on US-Letter pages,
//!    wrapping text and starting a new page at the bottom margin.
//!
//! [`write_report`] then stores the bytes under
//! `plant_disease_report_<YYYYMMDD_HHMMSS>.pdf`. The file is written to a
//! temp file in the target directory and moved into place without
//! clobbering; when two reports land in the same second the later one gets a
//! `_1`, `_2`, … suffix.
//!
//! The built-in PDF fonts only cover a Latin character set, so text is
//! folded to printable ASCII before painting (typographic quotes and dashes
//! become their ASCII forms, anything else becomes `?`). Content never makes
//! rendering fail.

use crate::error::ReportError;
use crate::report::{DiagnosisRecord, FILE_STAMP_FORMAT};
use chrono::Local;
use printpdf::path::PaintMode;
use printpdf::*;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const REPORT_TITLE: &str = "PLANT DISEASE ANALYSIS REPORT";

pub const DISCLAIMER: &str = "Disclaimer: This report is generated by AI and should be used as a reference only. \
Please consult with a professional plant pathologist for accurate diagnosis and treatment.";

/// File-name prefix of every report.
pub const FILE_PREFIX: &str = "plant_disease_report_";

/// Give up finding a free name after this many suffixes.
const MAX_NAME_ATTEMPTS: u32 = 1000;

// ── Layout ───────────────────────────────────────────────────────────────

/// One element of the report, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    /// Label / value rows.
    InfoTable(Vec<(String, String)>),
    Heading(String),
    Body(String),
    Disclaimer(String),
    /// Vertical gap in points.
    Spacer(f32),
}

/// Lay out a record in report order.
pub fn layout(record: &DiagnosisRecord) -> Vec<Block> {
    let mut blocks = vec![
        Block::Title(REPORT_TITLE.to_string()),
        Block::Spacer(20.0),
        Block::InfoTable(vec![
            ("Disease Name:".to_string(), record.disease_name().to_string()),
            ("Analysis Date:".to_string(), record.timestamp().to_string()),
        ]),
        Block::Spacer(20.0),
    ];

    let mut section = |title: &str, body: &str| {
        blocks.push(Block::Heading(title.to_string()));
        blocks.push(Block::Body(body.to_string()));
        blocks.push(Block::Spacer(10.0));
    };

    section("Symptoms", record.symptoms());
    section("Causes", record.causes());
    section("Treatment", record.treatment());
    section("Prevention", record.prevention());
    if !record.additional_notes().is_empty() {
        section("Additional Notes", record.additional_notes());
    }

    blocks.push(Block::Spacer(20.0));
    blocks.push(Block::Disclaimer(DISCLAIMER.to_string()));
    blocks
}

// ── Painting ─────────────────────────────────────────────────────────────

const PAGE_W: f32 = 215.9;
const PAGE_H: f32 = 279.4;
const MARGIN: f32 = 25.4;
const CONTENT_W: f32 = PAGE_W - 2.0 * MARGIN;
const PT_TO_MM: f32 = 0.352_778;

const LABEL_COL_W: f32 = 50.8;
const VALUE_COL_W: f32 = 101.6;
const CELL_PAD: f32 = 2.5;

const TITLE_SIZE: f32 = 24.0;
const HEADING_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 12.0;
const DISCLAIMER_SIZE: f32 = 10.0;

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

fn dark_green() -> Color {
    rgb(0x1b, 0x5e, 0x20)
}

fn green() -> Color {
    rgb(0x2e, 0x7d, 0x32)
}

fn pale_green() -> Color {
    rgb(0xe8, 0xf5, 0xe9)
}

fn grid_green() -> Color {
    rgb(0xa5, 0xd6, 0xa7)
}

fn grey() -> Color {
    rgb(0x80, 0x80, 0x80)
}

fn black() -> Color {
    rgb(0, 0, 0)
}

fn pt(v: f32) -> f32 {
    v * PT_TO_MM
}

/// Line advance for a font size, in mm.
fn leading(size: f32) -> f32 {
    pt(size * 1.2)
}

/// Approximate Helvetica advance of `c` in em. Errs on the wide side.
fn char_em(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => 0.3,
        'f' | 't' | 'r' | ' ' | '(' | ')' | '[' | ']' | '-' => 0.36,
        'm' | 'w' => 0.85,
        'M' | 'W' | '@' => 0.95,
        c if c.is_ascii_uppercase() => 0.75,
        _ => 0.58,
    }
}

/// Rough Helvetica width of `text` in mm.
fn approx_width(text: &str, size: f32) -> f32 {
    text.chars().map(char_em).sum::<f32>() * pt(size)
}

/// Fold text to what the built-in fonts can show.
pub(crate) fn pdf_safe(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\n' | ' '..='~' => Some(c),
            '\t' => Some(' '),
            '\u{2018}' | '\u{2019}' | '\u{201B}' => Some('\''),
            '\u{201C}' | '\u{201D}' => Some('"'),
            '\u{2010}'..='\u{2015}' => Some('-'),
            '\u{2022}' | '\u{00B7}' => Some('*'),
            '\u{00A0}' => Some(' '),
            c if c.is_control() => None,
            _ => Some('?'),
        })
        .collect()
}

/// Word-wrap each line of `text` to `max_width` mm at `size`, keeping
/// explicit breaks. Words wider than a line are split between characters.
pub(crate) fn wrap_text(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if approx_width(&candidate, size) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            for c in word.chars() {
                current.push(c);
                if current.chars().count() > 1 && approx_width(&current, size) > max_width {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }
        lines.push(current);
    }
    // Drop trailing blank lines (e.g. notes end with '\n').
    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Cursor over the pages of a document being painted.
struct Painter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Baseline position from the page bottom, in mm.
    y: f32,
    /// Lowest table cell edge painted so far.
    lowest: f32,
    pages: usize,
}

impl Painter {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::RenderFailed {
                detail: format!("font: {e}"),
            })?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::RenderFailed {
                detail: format!("font: {e}"),
            })?;
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_H - MARGIN,
            lowest: PAGE_H - MARGIN,
            pages: 1,
        })
    }

    /// Start a new page unless `height` mm still fit above the margin.
    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        }
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_H - MARGIN;
        self.pages += 1;
    }

    fn text(&self, text: &str, size: f32, x: f32, bold: bool, color: Color) {
        self.layer.set_fill_color(color);
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn centered_lines(&mut self, text: &str, size: f32, bold: bool, color: Color) {
        for line in wrap_text(text, size, CONTENT_W) {
            self.ensure_space(leading(size));
            self.y -= leading(size);
            let x = MARGIN + ((CONTENT_W - approx_width(&line, size)) / 2.0).max(0.0);
            self.text(&line, size, x, bold, color.clone());
        }
    }

    fn left_lines(&mut self, text: &str, size: f32, bold: bool, color: Color) {
        for line in wrap_text(text, size, CONTENT_W) {
            self.ensure_space(leading(size));
            self.y -= leading(size);
            self.text(&line, size, MARGIN, bold, color.clone());
        }
    }

    /// Label/value rows. A row taller than the space left is split across
    /// pages; continuation cells keep the fill and grid.
    fn info_table(&mut self, rows: &[(String, String)]) {
        let line_h = leading(BODY_SIZE);
        let pad = 2.0 * CELL_PAD + pt(6.0);

        for (label, value) in rows {
            let label_lines = wrap_text(label, BODY_SIZE, LABEL_COL_W - 2.0 * CELL_PAD);
            let value_lines = wrap_text(value, BODY_SIZE, VALUE_COL_W - 2.0 * CELL_PAD);
            let total = label_lines.len().max(value_lines.len()).max(1);

            let mut done = 0;
            while done < total {
                let fit = ((self.y - MARGIN - pad) / line_h).floor();
                if fit < 1.0 {
                    self.new_page();
                    continue;
                }
                let n = (fit as usize).min(total - done);
                self.table_segment(&label_lines, &value_lines, done, n);
                done += n;
            }
        }
    }

    /// Paint lines `first..first + count` of one row as a single cell pair.
    fn table_segment(
        &mut self,
        label_lines: &[String],
        value_lines: &[String],
        first: usize,
        count: usize,
    ) {
        let line_h = leading(BODY_SIZE);
        let row_h = count as f32 * line_h + 2.0 * CELL_PAD + pt(6.0);
        let top = self.y;
        let bottom = top - row_h;
        let x0 = MARGIN;
        let x1 = MARGIN + LABEL_COL_W;
        let x2 = x1 + VALUE_COL_W;

        self.layer.set_fill_color(pale_green());
        self.layer
            .add_rect(Rect::new(Mm(x0), Mm(bottom), Mm(x1), Mm(top)).with_mode(PaintMode::Fill));

        self.layer.set_outline_color(grid_green());
        self.layer.set_outline_thickness(1.0);
        for (l, r) in [(x0, x1), (x1, x2)] {
            self.layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(l), Mm(bottom)), false),
                    (Point::new(Mm(r), Mm(bottom)), false),
                    (Point::new(Mm(r), Mm(top)), false),
                    (Point::new(Mm(l), Mm(top)), false),
                ],
                is_closed: true,
            });
        }

        let mut y = top - CELL_PAD;
        for line in label_lines.iter().skip(first).take(count) {
            y -= line_h;
            self.layer.set_fill_color(dark_green());
            self.layer
                .use_text(line.as_str(), BODY_SIZE, Mm(x0 + CELL_PAD), Mm(y), &self.bold);
        }
        let mut y = top - CELL_PAD;
        for line in value_lines.iter().skip(first).take(count) {
            y -= line_h;
            self.layer.set_fill_color(black());
            self.layer
                .use_text(line.as_str(), BODY_SIZE, Mm(x1 + CELL_PAD), Mm(y), &self.regular);
        }

        self.y = bottom;
        self.lowest = self.lowest.min(bottom);
    }

    fn paint(&mut self, block: &Block) {
        match block {
            Block::Title(t) => {
                self.centered_lines(&pdf_safe(t), TITLE_SIZE, true, dark_green());
                self.y -= pt(30.0);
            }
            Block::InfoTable(rows) => {
                let rows: Vec<(String, String)> = rows
                    .iter()
                    .map(|(k, v)| (pdf_safe(k), pdf_safe(v)))
                    .collect();
                self.info_table(&rows);
            }
            Block::Heading(t) => {
                self.ensure_space(leading(HEADING_SIZE) + leading(BODY_SIZE));
                self.left_lines(&pdf_safe(t), HEADING_SIZE, true, green());
                self.y -= pt(12.0);
            }
            Block::Body(t) => {
                self.left_lines(&pdf_safe(t), BODY_SIZE, false, black());
                self.y -= pt(12.0);
            }
            Block::Disclaimer(t) => {
                self.centered_lines(&pdf_safe(t), DISCLAIMER_SIZE, false, grey());
            }
            Block::Spacer(h) => {
                self.y -= pt(*h);
                if self.y < MARGIN {
                    self.ensure_space(PAGE_H);
                }
            }
        }
    }

    fn finish(self) -> Result<Vec<u8>, ReportError> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc.save(&mut buf).map_err(|e| ReportError::RenderFailed {
            detail: format!("PDF save error: {e}"),
        })?;
        buf.into_inner().map_err(|e| ReportError::RenderFailed {
            detail: format!("PDF buffer error: {e}"),
        })
    }
}

/// Render the report for `record` to PDF bytes.
pub fn render_pdf(record: &DiagnosisRecord) -> Result<Vec<u8>, ReportError> {
    let blocks = layout(record);
    let mut painter = Painter::new("Plant Disease Analysis Report")?;
    for block in &blocks {
        painter.paint(block);
    }
    let pages = painter.pages;
    let bytes = painter.finish()?;
    debug!("Rendered report: {} pages, {} bytes", pages, bytes.len());
    Ok(bytes)
}

// ── Output file ──────────────────────────────────────────────────────────

/// `plant_disease_report_<stamp>.pdf`, or `…_<stamp>_<n>.pdf` for `n > 0`.
pub fn report_file_name(stamp: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("{FILE_PREFIX}{stamp}.pdf")
    } else {
        format!("{FILE_PREFIX}{stamp}_{attempt}.pdf")
    }
}

/// Render `record` and write it into `dir`. Returns the file path.
pub fn write_report(record: &DiagnosisRecord, dir: &Path) -> Result<PathBuf, ReportError> {
    let bytes = render_pdf(record)?;
    let stamp = Local::now().format(FILE_STAMP_FORMAT).to_string();
    let path = persist_unique(&bytes, dir, &stamp)?;
    info!("Report written to {}", path.display());
    Ok(path)
}

/// Write `bytes` to a fresh file named after `stamp` in `dir`.
pub(crate) fn persist_unique(bytes: &[u8], dir: &Path, stamp: &str) -> Result<PathBuf, ReportError> {
    let first = dir.join(report_file_name(stamp, 0));
    let write_err = |path: &Path, e: std::io::Error| ReportError::WriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".plant_disease_report_")
        .suffix(".pdf.tmp")
        .tempfile_in(dir)
        .map_err(|e| write_err(&first, e))?;
    tmp.write_all(bytes).map_err(|e| write_err(&first, e))?;
    tmp.flush().map_err(|e| write_err(&first, e))?;

    let mut attempt = 0;
    loop {
        let path = dir.join(report_file_name(stamp, attempt));
        match tmp.persist_noclobber(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                debug!("{} exists, trying next suffix", path.display());
                tmp = e.file;
                attempt += 1;
            }
            Err(e) => return Err(write_err(&path, e.error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Analysis;

    /// All text a reader would see, in order. Handy for comparing reports.
    fn text_content(blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .flat_map(|b| match b {
                Block::Title(t) | Block::Heading(t) | Block::Body(t) | Block::Disclaimer(t) => {
                    vec![t.clone()]
                }
                Block::InfoTable(rows) => rows
                    .iter()
                    .flat_map(|(k, v)| [k.clone(), v.clone()])
                    .collect(),
                Block::Spacer(_) => vec![],
            })
            .collect()
    }

    fn record(notes: &str) -> DiagnosisRecord {
        DiagnosisRecord::new(
            "Leaf Blight",
            "2024-05-01 12:00:00",
            Analysis {
                symptoms: "Brown spots".into(),
                causes: "Fungus".into(),
                treatment: "Fungicide".into(),
                prevention: "Drainage".into(),
                additional_notes: notes.into(),
            },
        )
    }

    #[test]
    fn layout_order() {
        let text = text_content(&layout(&record("")));
        assert_eq!(
            text,
            vec![
                REPORT_TITLE,
                "Disease Name:",
                "Leaf Blight",
                "Analysis Date:",
                "2024-05-01 12:00:00",
                "Symptoms",
                "Brown spots",
                "Causes",
                "Fungus",
                "Treatment",
                "Fungicide",
                "Prevention",
                "Drainage",
                DISCLAIMER,
            ]
        );
    }

    #[test]
    fn notes_block_only_when_present() {
        let without = layout(&record(""));
        assert!(!without.contains(&Block::Heading("Additional Notes".into())));

        let with = layout(&record("Water in the morning\n"));
        let pos = with
            .iter()
            .position(|b| b == &Block::Heading("Additional Notes".into()))
            .expect("notes heading");
        assert_eq!(with[pos + 1], Block::Body("Water in the morning\n".into()));
        assert!(matches!(with.last(), Some(Block::Disclaimer(_))));
    }

    #[test]
    fn layout_is_deterministic() {
        let r = record("x");
        assert_eq!(layout(&r), layout(&r));
    }

    #[test]
    fn render_produces_pdf() {
        let bytes = render_pdf(&record("")).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn render_accepts_any_text() {
        let long = "lesions ".repeat(2000);
        let r = DiagnosisRecord::new(
            "Mildiou de la vigne \u{1F347} \u{201C}quoted\u{201D}",
            "2024-05-01 12:00:00",
            Analysis {
                symptoms: long,
                causes: "\u{0000}\t<b>&</b>".into(),
                treatment: "averylongwordwithoutanyspaces".repeat(20),
                ..Default::default()
            },
        );
        let bytes = render_pdf(&r).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn pdf_safe_folds_text() {
        assert_eq!(pdf_safe("\u{201C}hi\u{201D} \u{2013} it\u{2019}s"), "\"hi\" - it's");
        assert_eq!(pdf_safe("caf\u{00E9}\tok\u{0007}"), "caf? ok");
    }

    #[test]
    fn wrap_keeps_breaks() {
        assert_eq!(wrap_text("one two\nfive", BODY_SIZE, CONTENT_W), vec!["one two", "five"]);
        assert_eq!(wrap_text("", BODY_SIZE, CONTENT_W), vec![String::new()]);
        assert_eq!(wrap_text("notes\n", BODY_SIZE, CONTENT_W), vec!["notes"]);
    }

    #[test]
    fn wrap_stays_within_measured_width() {
        let width = 40.0;
        let wide = "W".repeat(200);
        for text in [
            "WWWW MMMM WWWW MMMM WWWW MMMM WWWW",
            wide.as_str(),
            "short words that wrap across several lines of the cell",
        ] {
            let lines = wrap_text(text, BODY_SIZE, width);
            assert!(lines.len() > 1, "{text:?} should wrap");
            for line in &lines {
                assert!(
                    approx_width(line, BODY_SIZE) <= width,
                    "{line:?} is wider than {width}mm"
                );
            }
        }
    }

    #[test]
    fn wrap_loses_no_characters() {
        let text = "averylongwordwithoutanyspaces".repeat(10);
        assert_eq!(wrap_text(&text, BODY_SIZE, 30.0).concat(), text);
    }

    #[test]
    fn long_table_row_flows_onto_next_pages() {
        let mut p = Painter::new("t").unwrap();
        let value = "blight ".repeat(600);
        let lines = wrap_text(&value, BODY_SIZE, VALUE_COL_W - 2.0 * CELL_PAD).len();
        p.info_table(&[("Disease Name:".to_string(), value)]);

        assert!(p.y >= MARGIN, "row ended below the margin: y = {}", p.y);
        assert!(p.lowest >= MARGIN, "cell painted below the margin: {}", p.lowest);
        let per_page = ((PAGE_H - 2.0 * MARGIN) / leading(BODY_SIZE)) as usize;
        assert!(p.pages > lines / per_page, "{} pages for {lines} lines", p.pages);
    }

    #[test]
    fn short_table_fits_one_page() {
        let mut p = Painter::new("t").unwrap();
        p.info_table(&[
            ("Disease Name:".into(), "Leaf Blight".into()),
            ("Analysis Date:".into(), "2024-05-01 12:00:00".into()),
        ]);
        assert_eq!(p.pages, 1);
        assert!(p.y > MARGIN);
    }

    #[test]
    fn file_names() {
        assert_eq!(
            report_file_name("20240501_120000", 0),
            "plant_disease_report_20240501_120000.pdf"
        );
        assert_eq!(
            report_file_name("20240501_120000", 2),
            "plant_disease_report_20240501_120000_2.pdf"
        );
    }

    #[test]
    fn same_second_does_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let a = persist_unique(b"%PDF-a", dir.path(), "20240501_120000").unwrap();
        let b = persist_unique(b"%PDF-b", dir.path(), "20240501_120000").unwrap();
        assert_ne!(a, b);
        assert_eq!(
            b.file_name().unwrap(),
            "plant_disease_report_20240501_120000_1.pdf"
        );
        assert_eq!(std::fs::read(&a).unwrap(), b"%PDF-a");
        assert_eq!(std::fs::read(&b).unwrap(), b"%PDF-b");
        // No temp files left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn missing_dir_is_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("does/not/exist");
        let err = write_report(&record(""), &gone).unwrap_err();
        assert!(matches!(err, ReportError::WriteFailed { .. }), "got {err:?}");
    }

    #[test]
    fn write_report_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(&record(""), dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(FILE_PREFIX));
        assert!(name.ends_with(".pdf"));
        assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));
    }
}
