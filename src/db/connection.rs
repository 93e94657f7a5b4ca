use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection, Executor};

use crate::config::{Backend, DatabaseConfig};
use crate::error::DbError;

const DEFAULT_CONNECT_MS: u64 = 30_000;

/// A single open connection. The run owns it for its whole lifetime.
pub enum DbConn {
    MySql(MySqlConnection),
    Sqlite(SqliteConnection),
}

impl std::fmt::Debug for DbConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DbConn").field(&self.backend()).finish()
    }
}

fn connect_timeout() -> Duration {
    let ms = match std::env::var("SQL_EXTRACT_CONNECT_MS") {
        Ok(s) => match s.parse::<u64>() {
            Ok(v) if v > 0 => v,
            _ => {
                log::warn!(
                    "Invalid SQL_EXTRACT_CONNECT_MS='{}'; using default {}ms",
                    s,
                    DEFAULT_CONNECT_MS
                );
                DEFAULT_CONNECT_MS
            }
        },
        Err(_) => DEFAULT_CONNECT_MS,
    };
    Duration::from_millis(ms)
}

/// Open one connection for the configured backend.
pub async fn connect(cfg: &DatabaseConfig) -> Result<DbConn, DbError> {
    cfg.validate()
        .map_err(|e| DbError::Connection(e.to_string()))?;
    let timeout = connect_timeout();
    log::debug!(
        "Connecting to {} (timeout {}ms)",
        cfg.display_target(),
        timeout.as_millis()
    );
    let fut = async {
        match cfg.backend {
            Some(Backend::Sqlite) => SqliteConnectOptions::new()
                .filename(&cfg.database)
                .read_only(true)
                .connect()
                .await
                .map(DbConn::Sqlite),
            _ => {
                let mut opts = MySqlConnectOptions::new()
                    .host(&cfg.host)
                    .port(cfg.port)
                    .username(&cfg.username)
                    .password(&cfg.password);
                if !cfg.database.is_empty() {
                    opts = opts.database(&cfg.database);
                }
                opts.connect().await.map(DbConn::MySql)
            }
        }
    };
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(DbError::Connection(e.to_string())),
        Err(_) => Err(DbError::Connection(format!(
            "timed out after {}ms connecting to {}",
            timeout.as_millis(),
            cfg.display_target()
        ))),
    }
}

impl DbConn {
    pub fn backend(&self) -> Backend {
        match self {
            Self::MySql(_) => Backend::MySql,
            Self::Sqlite(_) => Backend::Sqlite,
        }
    }

    async fn run_control(&mut self, sql: &str) -> Result<(), DbError> {
        let res = match self {
            Self::MySql(c) => c.execute(sql).await.map(|_| ()),
            Self::Sqlite(c) => c.execute(sql).await.map(|_| ()),
        };
        res.map_err(|e| DbError::Query {
            message: e.to_string(),
            statement: sql.to_string(),
        })
    }

    /// Open the read-only transaction the export query runs in.
    pub async fn begin_read_only(&mut self) -> Result<(), DbError> {
        let sql = match self.backend() {
            Backend::MySql => "START TRANSACTION READ ONLY",
            Backend::Sqlite => "BEGIN",
        };
        self.run_control(sql).await
    }

    pub async fn rollback(&mut self) -> Result<(), DbError> {
        self.run_control("ROLLBACK").await
    }

    pub async fn close(self) -> Result<(), DbError> {
        let res = match self {
            Self::MySql(c) => c.close().await,
            Self::Sqlite(c) => c.close().await,
        };
        res.map_err(|e| DbError::Connection(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sqlite_connect_and_transaction_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        // read_only connections need an existing file
        {
            let mut c = SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true)
                .connect()
                .await
                .unwrap();
            c.execute("create table t (id integer)").await.unwrap();
            c.close().await.unwrap();
        }
        let cfg = DatabaseConfig::from_login(&format!("sqlite:{}", path.display()), "x").unwrap();
        let mut conn = connect(&cfg).await.unwrap();
        assert_eq!(conn.backend(), Backend::Sqlite);
        conn.begin_read_only().await.unwrap();
        conn.rollback().await.unwrap();
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_sqlite_file_fails_to_connect() {
        let cfg = DatabaseConfig::from_login("sqlite:/definitely/not/here.db", "x").unwrap();
        let err = connect(&cfg).await.unwrap_err();
        assert!(matches!(err, DbError::Connection(_)));
    }
}
