//! Rewrites `:name` placeholders to native `?` markers and orders bind values to match.

use sqlparser::dialect::{Dialect, MySqlDialect, SQLiteDialect};
use sqlparser::tokenizer::{Location, Token, Tokenizer};

use crate::config::Backend;
use crate::error::DbError;
use crate::query::binds::{BindParams, is_bind_name};

/// Statement text in driver form plus the values to bind, in marker order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundStatement {
    sql: String,
    original: String,
    values: Vec<String>,
}

impl BoundStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Statement as the operator wrote it, used in diagnostics.
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Marker {
    Named(String),
    Native,
}

fn dialect_for(backend: Backend) -> Box<dyn Dialect> {
    match backend {
        Backend::MySql => Box::new(MySqlDialect {}),
        Backend::Sqlite => Box::new(SQLiteDialect {}),
    }
}

/// Byte offsets of tokenizer locations (1-based line and column, counted in chars).
struct LineIndex<'a> {
    sql: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(sql: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(sql.match_indices('\n').map(|(i, _)| i + 1));
        Self { sql, line_starts }
    }

    fn offset(&self, loc: Location) -> Option<usize> {
        let line = usize::try_from(loc.line).ok()?.checked_sub(1)?;
        let col = usize::try_from(loc.column).ok()?.checked_sub(1)?;
        let start = *self.line_starts.get(line)?;
        let rest = &self.sql[start..];
        Some(
            start
                + rest
                    .char_indices()
                    .nth(col)
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len()),
        )
    }
}

fn named_marker(token: &Token) -> Option<String> {
    match token {
        Token::Word(w) if w.quote_style.is_none() && is_bind_name(&w.value) => Some(w.value.clone()),
        Token::Number(n, false) if is_bind_name(n) => Some(n.clone()),
        _ => None,
    }
}

/// Tokenize with the backend's dialect so literals, quoted identifiers and
/// comments follow its rules. A `:` directly followed by a name becomes `?`.
/// Returns the rewritten text and the markers in order of appearance.
fn scan(sql: &str, backend: Backend) -> Result<(String, Vec<Marker>), String> {
    let dialect = dialect_for(backend);
    let tokens = Tokenizer::new(dialect.as_ref(), sql)
        .tokenize_with_location()
        .map_err(|e| format!("unable to tokenize statement: {}", e))?;
    let index = LineIndex::new(sql);
    let bad_location = || "token location outside statement text".to_string();

    let mut out = String::with_capacity(sql.len());
    let mut markers = Vec::new();
    let mut copied = 0;
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i].token {
            Token::Placeholder(p) if p.starts_with('?') => markers.push(Marker::Native),
            Token::Placeholder(p) if p.starts_with(':') && is_bind_name(&p[1..]) => {
                let start = index.offset(tokens[i].span.start).ok_or_else(bad_location)?;
                let end = index.offset(tokens[i].span.end).ok_or_else(bad_location)?;
                out.push_str(&sql[copied..start]);
                out.push('?');
                copied = end;
                markers.push(Marker::Named(p[1..].to_string()));
            }
            Token::Colon => {
                if let Some(name) = tokens.get(i + 1).and_then(|t| named_marker(&t.token)) {
                    let start = index.offset(tokens[i].span.start).ok_or_else(bad_location)?;
                    let end = index
                        .offset(tokens[i + 1].span.end)
                        .ok_or_else(bad_location)?;
                    out.push_str(&sql[copied..start]);
                    out.push('?');
                    copied = end;
                    markers.push(Marker::Named(name));
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    out.push_str(&sql[copied..]);
    Ok((out, markers))
}

/// Match the statement's placeholders against the bind mapping.
pub fn bind_statement(
    sql: &str,
    binds: &BindParams,
    backend: Backend,
) -> Result<BoundStatement, DbError> {
    let bind_err = |message: String| DbError::Bind {
        message,
        statement: sql.to_string(),
    };
    let (rewritten, markers) = match scan(sql, backend) {
        Ok(scanned) => scanned,
        // nothing to bind: let the database judge the text
        Err(e) if binds.is_empty() => {
            log::debug!("{}; passing statement through unchanged", e);
            (sql.to_string(), Vec::new())
        }
        Err(e) => return Err(bind_err(e)),
    };

    let named = markers.iter().any(|m| matches!(m, Marker::Named(_)));
    let native = markers.iter().any(|m| matches!(m, Marker::Native));
    if named && native {
        return Err(bind_err(
            "statement mixes :name placeholders and ? markers".into(),
        ));
    }

    let values = match binds {
        BindParams::Empty => {
            if !markers.is_empty() {
                return Err(bind_err(format!(
                    "statement has {} placeholder(s) but no bind values were supplied",
                    markers.len()
                )));
            }
            Vec::new()
        }
        BindParams::Positional(vals) => {
            if markers.len() != vals.len() {
                return Err(bind_err(format!(
                    "statement has {} placeholder(s) but {} positional value(s) were supplied",
                    markers.len(),
                    vals.len()
                )));
            }
            vals.clone()
        }
        BindParams::Named(map) => {
            if native {
                return Err(bind_err(
                    "named bind values need :name placeholders, found ? markers".into(),
                ));
            }
            let mut values = Vec::with_capacity(markers.len());
            for m in &markers {
                if let Marker::Named(name) = m {
                    let v = map
                        .get(name)
                        .ok_or_else(|| bind_err(format!("no bind value supplied for :{}", name)))?;
                    values.push(v.clone());
                }
            }
            let unused: Vec<&str> = map
                .keys()
                .filter(|k| !markers.contains(&Marker::Named((*k).clone())))
                .map(String::as_str)
                .collect();
            if !unused.is_empty() {
                return Err(bind_err(format!(
                    "bind variable(s) not used by statement: {}",
                    unused.join(", ")
                )));
            }
            values
        }
    };

    Ok(BoundStatement {
        sql: if binds.is_empty() {
            sql.to_string()
        } else {
            rewritten
        },
        original: sql.to_string(),
        values,
    })
}
