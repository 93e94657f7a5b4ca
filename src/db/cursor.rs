//! Statement execution and forward-only, batched row streaming.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use rust_decimal::Decimal;
use sqlx::mysql::{MySql, MySqlRow};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Column, Executor, Row as SqlxRow, Statement, TypeInfo, ValueRef};

use crate::db::connection::DbConn;
use crate::db::value::{Row, Value};
use crate::error::DbError;
use crate::query::BoundStatement;

/// Open result set of one executed statement. Holds the connection borrow
/// (the cursor) until dropped; never restarts.
pub struct RowStream<'c> {
    columns: Arc<[String]>,
    inner: BoxStream<'c, Result<Vec<Value>, sqlx::Error>>,
    statement: String,
    batch_size: usize,
    primed: Option<Vec<Row>>,
    exhausted: bool,
    fetched: u64,
}

impl std::fmt::Debug for RowStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("columns", &self.columns)
            .field("batch_size", &self.batch_size)
            .field("exhausted", &self.exhausted)
            .field("fetched", &self.fetched)
            .finish()
    }
}

/// Execute `stmt` and return its row stream. The first batch is fetched
/// before returning so execution errors surface here rather than mid-export.
pub async fn execute<'c>(
    conn: &'c mut DbConn,
    stmt: &'c BoundStatement,
    batch_size: usize,
) -> Result<RowStream<'c>, DbError> {
    let query_err = |e: sqlx::Error| DbError::Query {
        message: e.to_string(),
        statement: stmt.original().to_string(),
    };
    let (columns, inner): (Vec<String>, BoxStream<'c, Result<Vec<Value>, sqlx::Error>>) =
        match conn {
            DbConn::MySql(c) => {
                let prepared = (&mut *c).prepare(stmt.sql()).await.map_err(query_err)?;
                let columns = prepared
                    .columns()
                    .iter()
                    .map(|col| col.name().to_string())
                    .collect();
                let mut q = sqlx::query::<MySql>(stmt.sql());
                for v in stmt.values() {
                    q = q.bind(v.as_str());
                }
                let rows = q
                    .fetch(c)
                    .map(|r| r.and_then(|row| decode_mysql_row(&row)))
                    .boxed();
                (columns, rows)
            }
            DbConn::Sqlite(c) => {
                let prepared = (&mut *c).prepare(stmt.sql()).await.map_err(query_err)?;
                let columns = prepared
                    .columns()
                    .iter()
                    .map(|col| col.name().to_string())
                    .collect();
                let mut q = sqlx::query::<Sqlite>(stmt.sql());
                for v in stmt.values() {
                    q = q.bind(v.as_str());
                }
                let rows = q
                    .fetch(c)
                    .map(|r| r.and_then(|row| decode_sqlite_row(&row)))
                    .boxed();
                (columns, rows)
            }
        };
    log::debug!("Statement prepared with {} column(s)", columns.len());

    let mut stream = RowStream {
        columns: columns.into(),
        inner,
        statement: stmt.original().to_string(),
        batch_size: batch_size.max(1),
        primed: None,
        exhausted: false,
        fetched: 0,
    };
    let first = stream.fetch_batch().await?;
    stream.primed = first;
    Ok(stream)
}

impl<'c> RowStream<'c> {
    /// Column names in result order, as the database declared them.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Rows pulled from the database so far.
    pub fn fetched(&self) -> u64 {
        self.fetched
    }

    /// Next batch of at most `batch_size` rows; `None` once the result set is drained.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Row>>, DbError> {
        if let Some(batch) = self.primed.take() {
            return Ok(Some(batch));
        }
        self.fetch_batch().await
    }

    async fn fetch_batch(&mut self) -> Result<Option<Vec<Row>>, DbError> {
        if self.exhausted {
            return Ok(None);
        }
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            let next = self.inner.try_next().await;
            match next {
                Ok(Some(values)) => batch.push(Row::new(Arc::clone(&self.columns), values)),
                Ok(None) => {
                    self.exhausted = true;
                    break;
                }
                Err(e) => {
                    self.exhausted = true;
                    return Err(match e {
                        sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } => {
                            DbError::Decode(e.to_string())
                        }
                        _ => DbError::Query {
                            message: e.to_string(),
                            statement: self.statement.clone(),
                        },
                    });
                }
            }
        }
        self.fetched += batch.len() as u64;
        log::debug!(
            "Fetched batch of {} row(s) ({} total)",
            batch.len(),
            self.fetched
        );
        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }
}

fn unsupported(type_name: &str, idx: usize) -> sqlx::Error {
    sqlx::Error::Decode(format!("unsupported column type {} at index {}", type_name, idx).into())
}

fn decode_mysql_row(row: &MySqlRow) -> Result<Vec<Value>, sqlx::Error> {
    (0..row.len()).map(|i| decode_mysql_value(row, i)).collect()
}

fn decode_mysql_value(row: &MySqlRow, idx: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();
    let typed = match type_name.as_str() {
        // TINYINT(1) reports as BOOLEAN; keep the stored number
        "BOOLEAN" => Some(row.try_get::<i64, _>(idx).map(Value::Int)),
        t if t.contains("INT") && t.contains("UNSIGNED") => {
            Some(row.try_get::<u64, _>(idx).map(Value::UInt))
        }
        t if t.contains("INT") => Some(row.try_get::<i64, _>(idx).map(Value::Int)),
        "FLOAT" => Some(row.try_get::<f32, _>(idx).map(Value::Float32)),
        "DOUBLE" => Some(row.try_get::<f64, _>(idx).map(Value::Float)),
        "DECIMAL" => Some(row.try_get::<Decimal, _>(idx).map(Value::Decimal)),
        "DATE" => Some(
            row.try_get::<NaiveDate, _>(idx)
                .map(|d| Value::Text(d.to_string())),
        ),
        "DATETIME" | "TIMESTAMP" => Some(
            row.try_get::<NaiveDateTime, _>(idx)
                .map(|d| Value::Text(d.to_string())),
        ),
        "TIME" => Some(
            row.try_get::<NaiveTime, _>(idx)
                .map(|t| Value::Text(t.to_string())),
        ),
        _ => None,
    };
    match typed {
        Some(Ok(v)) => return Ok(v),
        Some(Err(e)) => log::trace!(
            "Typed decode of {} column {} failed ({}); falling back to text",
            type_name,
            idx,
            e
        ),
        None => {}
    }
    if let Ok(s) = row.try_get::<String, _>(idx) {
        return Ok(Value::Text(s));
    }
    row.try_get::<Vec<u8>, _>(idx)
        .map(|b| Value::Text(String::from_utf8_lossy(&b).into_owned()))
        .map_err(|_| unsupported(&type_name, idx))
}

fn decode_sqlite_row(row: &SqliteRow) -> Result<Vec<Value>, sqlx::Error> {
    (0..row.len()).map(|i| decode_sqlite_value(row, i)).collect()
}

fn decode_sqlite_value(row: &SqliteRow, idx: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();
    match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => row.try_get::<i64, _>(idx).map(Value::Int),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row.try_get::<f64, _>(idx).map(Value::Float),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(idx)
            .map(|b| Value::Text(String::from_utf8_lossy(&b).into_owned())),
        _ => row
            .try_get::<String, _>(idx)
            .map(Value::Text)
            .map_err(|_| unsupported(&type_name, idx)),
    }
}
