//! HTML fragment renderer for inline display of a diagnosis.
//!
//! Works on the raw model answer rather than on the [`crate::DiagnosisRecord`]:
//! it re-splits the text itself and recognises two extra labels,
//! `Disease Name:` and `Additional Notes:`, which the record parser does not.
//! Labels here include the colon. The two renderers therefore disagree on
//! where the disease name comes from (this one uses the labelled paragraph,
//! the record uses the first line); both conventions are kept.
//!
//! Paragraph text is HTML-escaped before insertion.

use crate::pipeline::parse::PARAGRAPH_BREAK;
use crate::prompts::SECTION_HEADERS;

/// Styles for the classes emitted by [`render_html`].
pub const REPORT_CSS: &str = r#".disease-name {
    font-size: 24px;
    color: #1b5e20;
    font-weight: bold;
    text-align: center;
    margin: 20px 0;
}
.report-section {
    background: linear-gradient(135deg, rgba(255,255,255,0.95), rgba(232,245,233,0.95));
    padding: 20px;
    border-radius: 15px;
    margin-bottom: 15px;
    box-shadow: 0 4px 8px rgba(0,0,0,0.1);
    border: 1px solid rgba(46,125,50,0.2);
}
.report-title {
    color: #1b5e20;
    font-size: 20px;
    font-weight: bold;
    margin-bottom: 10px;
    border-bottom: 2px solid #a5d6a7;
    padding-bottom: 5px;
}
.report-content {
    color: #333;
    line-height: 1.6;
    padding: 15px;
    background: rgba(232, 245, 233, 0.3);
    border-radius: 10px;
    white-space: pre-line;
}
"#;

/// One display block of the fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlBlock {
    /// Paragraph labelled `Disease Name:`.
    DiseaseName(String),
    /// Paragraph with a recognised section label.
    Section { title: &'static str, content: String },
    /// Paragraph matching no label.
    Untitled(String),
}

/// Classify every paragraph of `raw` into a display block.
pub fn html_blocks(raw: &str) -> Vec<HtmlBlock> {
    raw.split(PARAGRAPH_BREAK)
        .map(|paragraph| {
            // The prompt's own headers, checked in order; first match wins.
            match SECTION_HEADERS
                .iter()
                .find(|label| paragraph.contains(*label))
            {
                Some(&label) => {
                    let content = paragraph.replace(label, "").trim().to_string();
                    if label == SECTION_HEADERS[0] {
                        HtmlBlock::DiseaseName(content)
                    } else {
                        HtmlBlock::Section {
                            title: label.trim_end_matches(':'),
                            content,
                        }
                    }
                }
                None => HtmlBlock::Untitled(paragraph.trim().to_string()),
            }
        })
        .collect()
}

/// Render the fragment: one `<div>` per paragraph of `raw`.
pub fn render_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() * 2);
    for block in html_blocks(raw) {
        match block {
            HtmlBlock::DiseaseName(name) => {
                out.push_str("<div class=\"disease-name\">");
                out.push_str(&escape(&name));
                out.push_str("</div>\n");
            }
            HtmlBlock::Section { title, content } => {
                out.push_str("<div class=\"report-section\">\n");
                out.push_str("  <div class=\"report-title\">");
                out.push_str(title);
                out.push_str("</div>\n");
                push_content(&mut out, &content);
                out.push_str("</div>\n");
            }
            HtmlBlock::Untitled(content) => {
                out.push_str("<div class=\"report-section\">\n");
                push_content(&mut out, &content);
                out.push_str("</div>\n");
            }
        }
    }
    out
}

/// Standalone HTML page embedding [`REPORT_CSS`] and the fragment.
pub fn render_html_page(raw: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>Plant Disease Analysis Report</title>\n<style>\n{REPORT_CSS}</style>\n</head>\n\
<body>\n{}</body>\n</html>\n",
        render_html(raw)
    )
}

fn push_content(out: &mut String, content: &str) {
    out.push_str("  <div class=\"report-content\">");
    out.push_str(&escape(content));
    out.push_str("</div>\n");
}

/// Escape text for element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut s = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => s.push_str("&amp;"),
            '<' => s.push_str("&lt;"),
            '>' => s.push_str("&gt;"),
            '"' => s.push_str("&quot;"),
            '\'' => s.push_str("&#39;"),
            _ => s.push(c),
        }
    }
    s
}
