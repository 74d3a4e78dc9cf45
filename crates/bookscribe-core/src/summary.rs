//! Mock summarization
//!
//! PLACEHOLDER: there is no summarization model behind this. The "summary"
//! is the first three `.`-separated segments of the text, which is enough to
//! exercise the save-summary flow.

/// Number of sentence segments kept
const SEGMENTS: usize = 3;

pub fn mock_summary(text: &str) -> String {
    let head: Vec<&str> = text.split('.').take(SEGMENTS).collect();
    format!("{}.", head.join("."))
}
