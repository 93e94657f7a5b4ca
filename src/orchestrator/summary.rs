//! Operator-facing run summaries.

use std::path::PathBuf;
use std::time::Duration;

/// Outcome of one successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// File path without extension, or the inline query text.
    pub source: String,
    pub out_path: PathBuf,
    pub columns: Vec<String>,
    pub rows: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    /// `<source padded to 35> <rows padded to 7> records processed`
    pub fn report_line(&self) -> String {
        format_report(&self.source, self.rows)
    }
}

pub fn format_report(source: &str, rows: u64) -> String {
    format!("{:<35} {:>7} records processed", source, rows)
}

/// Outcome of one csv → xlsx conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows: u32,
}

impl ConvertSummary {
    pub fn report_line(&self) -> String {
        format_report(
            &self.input.with_extension("").display().to_string(),
            self.rows as u64,
        )
    }
}
