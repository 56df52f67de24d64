//! Report parsing: classify the model's free text into a [`DiagnosisRecord`].
//!
//! This is keyword classification, not a grammar. The answer is split into
//! paragraphs on blank lines and each paragraph is assigned to the first
//! section whose keyword it *contains*, checked in the fixed order
//! Symptoms → Causes → Treatment → Prevention. Position in the text does not
//! matter, only that order does.
//!
//! Properties callers rely on:
//!
//! - Parsing never fails; a missing section is empty text.
//! - Containment is substring-based and case-sensitive, so a paragraph that
//!   merely mentions "Causes" in prose is filed under causes.
//! - A section seen twice keeps the later paragraph.
//! - The disease name is the first line of the whole answer, independent of
//!   the paragraph pass. When the first paragraph is exactly that line it is
//!   not repeated in the additional notes.

use crate::report::{Analysis, DiagnosisRecord};

/// Paragraph separator in model output.
pub const PARAGRAPH_BREAK: &str = "\n\n";

/// The four extracted sections, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Symptoms,
    Causes,
    Treatment,
    Prevention,
}

impl Section {
    pub const PRIORITY: [Section; 4] = [
        Section::Symptoms,
        Section::Causes,
        Section::Treatment,
        Section::Prevention,
    ];

    /// Word searched for in a paragraph.
    pub fn keyword(self) -> &'static str {
        match self {
            Section::Symptoms => "Symptoms",
            Section::Causes => "Causes",
            Section::Treatment => "Treatment",
            Section::Prevention => "Prevention",
        }
    }

    /// Label removed from a matched paragraph.
    pub fn label(self) -> &'static str {
        match self {
            Section::Symptoms => "Symptoms:",
            Section::Causes => "Causes:",
            Section::Treatment => "Treatment:",
            Section::Prevention => "Prevention:",
        }
    }

    fn slot(self, analysis: &mut Analysis) -> &mut String {
        match self {
            Section::Symptoms => &mut analysis.symptoms,
            Section::Causes => &mut analysis.causes,
            Section::Treatment => &mut analysis.treatment,
            Section::Prevention => &mut analysis.prevention,
        }
    }
}

/// First line of the raw answer, trimmed.
pub fn disease_name(raw: &str) -> String {
    raw.split('\n').next().unwrap_or_default().trim().to_string()
}

/// Section a paragraph belongs to, if any.
pub fn classify(paragraph: &str) -> Option<Section> {
    Section::PRIORITY
        .into_iter()
        .find(|s| paragraph.contains(s.keyword()))
}

/// Paragraph body with every occurrence of the section label removed.
pub fn section_body(paragraph: &str, section: Section) -> String {
    paragraph.replace(section.label(), "").trim().to_string()
}

/// Run the paragraph pass over `raw`.
pub fn parse_analysis(raw: &str) -> Analysis {
    let name = disease_name(raw);
    let mut analysis = Analysis::default();

    for (i, paragraph) in raw.split(PARAGRAPH_BREAK).enumerate() {
        match classify(paragraph) {
            Some(section) => *section.slot(&mut analysis) = section_body(paragraph, section),
            None if i == 0 && paragraph.trim() == name => {}
            None => {
                analysis.additional_notes.push_str(paragraph);
                analysis.additional_notes.push('\n');
            }
        }
    }

    analysis
}

/// Build the record for one model answer.
pub fn parse_report(raw: &str, timestamp: impl Into<String>) -> DiagnosisRecord {
    DiagnosisRecord::new(disease_name(raw), timestamp, parse_analysis(raw))
}
