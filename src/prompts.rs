//! The instruction sent to the model with every leaf image.
//!
//! The section headers in [`DIAGNOSIS_PROMPT`] are the contract between the
//! model and [`crate::pipeline::parse`] / [`crate::pipeline::html`]: both
//! parsers classify paragraphs by these exact labels. Change a header here
//! and the corresponding marker constant must change with it.

/// Fixed instruction text for plant-disease analysis.
pub const DIAGNOSIS_PROMPT: &str = r#"
As a highly skilled plant pathologist, your expertise is indispensable in our pursuit of maintaining optimal plant health. You will be provided with information or samples related to plant diseases, and your role involves conducting a detailed analysis to identify the specific issues, propose solutions, and offer recommendations.

Please provide your analysis in the following structured format:

Disease Name: [Name of the disease]

Symptoms:
[Detailed description of visible symptoms]

Causes:
[Explanation of what causes this disease]

Treatment:
[Recommended treatment methods and steps]

Prevention:
[Preventive measures to avoid future occurrences]

Additional Notes:
[Any other relevant information]

Your analysis should be thorough, accurate, and focused on plant health. Please ensure the information is clear and actionable for the user.
"#;

/// Section headers the prompt asks for, in order.
pub const SECTION_HEADERS: [&str; 6] = [
    "Disease Name:",
    "Symptoms:",
    "Causes:",
    "Treatment:",
    "Prevention:",
    "Additional Notes:",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_headers_in_order() {
        let mut cursor = 0;
        for header in SECTION_HEADERS {
            let pos = DIAGNOSIS_PROMPT[cursor..]
                .find(header)
                .unwrap_or_else(|| panic!("header {header:?} missing or out of order"));
            cursor += pos + header.len();
        }
    }

    #[test]
    fn prompt_sets_pathologist_role() {
        assert!(DIAGNOSIS_PROMPT.contains("plant pathologist"));
    }
}
