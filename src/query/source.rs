//! Assembly of the statement text from a `.sql` file or inline tokens.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::ConfigError;

/// Where the statement text comes from. A file always wins over inline text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlSource {
    File(PathBuf),
    Inline(String),
}

impl SqlSource {
    /// Pick the source from the CLI inputs. Inline text is dropped when a file is given.
    pub fn from_parts(file: Option<&Path>, text: &[String]) -> Result<Self, ConfigError> {
        if let Some(path) = file {
            if !text.is_empty() {
                log::warn!(
                    "Both a SQL file and --text were given; using {} and ignoring the inline text",
                    path.display()
                );
            }
            return Ok(Self::File(path.to_path_buf()));
        }
        if text.is_empty() {
            return Err(ConfigError::NoSqlSource);
        }
        Ok(Self::Inline(text.join(" ")))
    }

    /// Operator-facing name: the file path without extension, or the query text.
    pub fn identifier(&self) -> String {
        match self {
            Self::File(p) => p.with_extension("").display().to_string(),
            Self::Inline(t) => t.clone(),
        }
    }

    /// Read and normalize the statement text.
    pub fn load(&self) -> Result<String> {
        let raw = match self {
            Self::File(p) => std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read SQL file {}", p.display()))?,
            Self::Inline(t) => t.clone(),
        };
        let sql = normalize_statement(&raw);
        if sql.is_empty() {
            return Err(ConfigError::NoSqlSource.into());
        }
        Ok(sql.to_string())
    }
}

/// Trim surrounding whitespace and one trailing `;`.
pub fn normalize_statement(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.strip_suffix(';') {
        Some(rest) => rest.trim_end(),
        None => trimmed,
    }
}

/// Only `.sql` files are accepted as statement sources.
pub fn validate_sql_file(path: &str) -> Result<PathBuf, ConfigError> {
    let p = PathBuf::from(path);
    match p.extension().and_then(|e| e.to_str()) {
        Some("sql") => Ok(p),
        _ => Err(ConfigError::InvalidSqlFile {
            path: path.to_string(),
        }),
    }
}
