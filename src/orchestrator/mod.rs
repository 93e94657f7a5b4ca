//! Orchestrator module: one extraction run from statement to file.
//!
//! - `run_extract`: assemble and bind the statement, execute it, stream the
//!   rows into the delimited writer
//! - `run_with_connection`: own the connection around `run_extract`
//!   (connect, read-only transaction, rollback and close on every path)
//! - `run_convert`: the independent csv → xlsx pipeline

pub mod summary;

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};

use crate::config::{DatabaseConfig, ExtractConfig};
use crate::db::{DbConn, connect, execute};
use crate::error::DbError;
use crate::export::csv_export::{CsvStreamWriter, export_rows};
use crate::export::xlsx_export::convert_csv_to_xlsx;
use crate::query::bind_statement;

pub use summary::{ConvertSummary, RunSummary};

fn log_statement_failure(e: &DbError) {
    error!("Unable to execute statement.");
    warn!("{}", e);
    debug!("{:?}", e);
    if let Some(stmt) = e.statement() {
        debug!("{}", stmt);
    }
}

/// Run the pipeline on an already open connection. The connection is left
/// open; only the statement's cursor is released before returning.
pub async fn run_extract(conn: &mut DbConn, cfg: &ExtractConfig) -> Result<RunSummary> {
    cfg.validate()?;
    let started = Instant::now();
    let sql = cfg.source.load()?;
    let stmt =
        bind_statement(&sql, &cfg.binds, conn.backend()).inspect_err(log_statement_failure)?;
    debug!("Executing statement with {} bind value(s)", stmt.values().len());

    let mut stream = execute(conn, &stmt, cfg.batch_size)
        .await
        .inspect_err(log_statement_failure)?;
    let columns = stream.columns().to_vec();
    debug!(
        "Streaming {} column(s) in batches of {}",
        columns.len(),
        stream.batch_size()
    );

    let mut writer = if cfg.atomic {
        CsvStreamWriter::create_atomic(&cfg.out_path, &columns, cfg.dialect)
    } else {
        CsvStreamWriter::create(&cfg.out_path, &columns, cfg.dialect)
    }
    .with_context(|| format!("Failed to create {}", cfg.out_path.display()))?;

    let exported = export_rows(&mut stream, &mut writer).await;
    drop(stream);
    if let Err(e) = exported {
        if let Some(db) = e.downcast_ref::<DbError>() {
            log_statement_failure(db);
        }
        warn!(
            "Export stopped after {} row(s); {} is incomplete",
            writer.rows_written(),
            writer.path().display()
        );
        return Err(e);
    }
    let rows = writer
        .finish()
        .with_context(|| format!("Failed to finalize {}", cfg.out_path.display()))?;

    Ok(RunSummary {
        source: cfg.source.identifier(),
        out_path: cfg.out_path.clone(),
        columns,
        rows,
        elapsed: started.elapsed(),
    })
}

/// Connect, run the pipeline inside a read-only transaction, then roll back
/// and close the connection whatever the outcome.
pub async fn run_with_connection(db: &DatabaseConfig, cfg: &ExtractConfig) -> Result<RunSummary> {
    cfg.validate()?;
    let mut conn = connect(db)
        .await
        .with_context(|| format!("Failed to connect to {}", db.display_target()))?;
    debug!("Connected to {}", db.display_target());

    let outcome = match conn.begin_read_only().await {
        Ok(()) => run_extract(&mut conn, cfg).await,
        Err(e) => Err(anyhow::Error::new(e).context("Failed to open read-only transaction")),
    };

    if let Err(e) = conn.rollback().await {
        warn!("Rollback failed: {}", e);
    }
    if let Err(e) = conn.close().await {
        warn!("Closing connection failed: {}", e);
    }
    outcome
}

/// Convert a delimited file to a workbook.
pub fn run_convert(input: &Path, output: &Path) -> Result<ConvertSummary> {
    let rows = convert_csv_to_xlsx(input, output)?;
    let summary = ConvertSummary {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        rows,
    };
    info!("{}", summary.report_line());
    Ok(summary)
}
