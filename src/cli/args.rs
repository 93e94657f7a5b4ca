//! Value parsers and defaults shared by the command-line front ends.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::export::csv_export::DEFAULT_QUOTE;
use crate::query::validate_sql_file;

/// Quote character argument; `None` disables quoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteArg(pub Option<char>);

impl Default for QuoteArg {
    fn default() -> Self {
        Self(Some(DEFAULT_QUOTE))
    }
}

/// First character of the argument is the delimiter.
pub fn parse_delimiter(s: &str) -> Result<char, String> {
    s.chars()
        .next()
        .ok_or_else(|| "delimiter must not be empty".to_string())
}

/// A single character, or `none` (any case) to turn quoting off.
pub fn parse_quotechar(s: &str) -> Result<QuoteArg, String> {
    if s.eq_ignore_ascii_case("none") {
        return Ok(QuoteArg(None));
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(QuoteArg(Some(c))),
        (None, _) => Err("quote character must not be empty".to_string()),
        _ => Err(format!(
            "'{}' is not a single character (use \"none\" to disable quoting)",
            s
        )),
    }
}

pub fn parse_sql_file(s: &str) -> Result<PathBuf, String> {
    validate_sql_file(s).map_err(|e| e.to_string())
}

/// `<path without extension>.csv`
pub fn default_csv_path(sql_file: &Path) -> PathBuf {
    sql_file.with_extension("csv")
}

/// `<input file name>.xlsx`, keeping the original extension.
pub fn default_xlsx_path(csv_file: &Path) -> PathBuf {
    let mut name = OsString::from(csv_file.as_os_str());
    name.push(".xlsx");
    PathBuf::from(name)
}
