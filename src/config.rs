use std::path::PathBuf;

use crate::error::ConfigError;
use crate::export::csv_export::Dialect;
use crate::query::{BindParams, SqlSource};

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    MySql,
    Sqlite,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub backend: Option<Backend>,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Schema name for MySQL, file path (or `:memory:`) for SQLite.
    pub database: String,
}

impl DatabaseConfig {
    /// Parse a login string: `sqlite:<path>` or `[mysql://]user@host[:port][/database]`.
    pub fn from_login(login: &str, password: &str) -> Result<Self, ConfigError> {
        let login = login.trim();
        if let Some(path) = login
            .strip_prefix("sqlite://")
            .or_else(|| login.strip_prefix("sqlite:"))
        {
            if path.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "login",
                    reason: "sqlite login needs a file path".into(),
                });
            }
            return Ok(Self {
                backend: Some(Backend::Sqlite),
                password: password.to_string(),
                database: path.to_string(),
                ..Default::default()
            });
        }

        let rest = login.strip_prefix("mysql://").unwrap_or(login);
        let (user, rest) = rest.split_once('@').ok_or_else(|| ConfigError::InvalidValue {
            field: "login",
            reason: "expected user@host[:port][/database]".into(),
        })?;
        let (hostport, database) = match rest.split_once('/') {
            Some((hp, db)) => (hp, db),
            None => (rest, ""),
        };
        let (host, port) = match hostport.rsplit_once(':') {
            Some((h, p)) => {
                let port = p.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                    field: "login",
                    reason: format!("invalid port '{}'", p),
                })?;
                (h, port)
            }
            None => (hostport, DEFAULT_MYSQL_PORT),
        };
        let cfg = Self {
            backend: Some(Backend::MySql),
            username: user.to_string(),
            password: password.to_string(),
            host: host.to_string(),
            port,
            database: database.to_string(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            None => Err(ConfigError::MissingField { field: "backend" }),
            Some(Backend::Sqlite) => {
                if self.database.trim().is_empty() {
                    return Err(ConfigError::MissingField { field: "database" });
                }
                Ok(())
            }
            Some(Backend::MySql) => {
                if self.host.trim().is_empty() {
                    return Err(ConfigError::MissingField { field: "host" });
                }
                if self.username.trim().is_empty() {
                    return Err(ConfigError::MissingField { field: "username" });
                }
                if self.port == 0 {
                    return Err(ConfigError::InvalidValue {
                        field: "port",
                        reason: "0 is out of range".into(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Connection target for log lines; never includes the password.
    pub fn display_target(&self) -> String {
        match self.backend {
            Some(Backend::Sqlite) => format!("sqlite:{}", self.database),
            _ => format!(
                "mysql://{}@{}:{}/{}",
                self.username, self.host, self.port, self.database
            ),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

/// Everything one extraction run needs besides the connection.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub source: SqlSource,
    pub out_path: PathBuf,
    pub dialect: Dialect,
    pub binds: BindParams,
    pub batch_size: usize,
    /// Write to a side file and rename it into place on success.
    pub atomic: bool,
}

impl ExtractConfig {
    pub fn new(source: SqlSource, out_path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            out_path: out_path.into(),
            dialect: Dialect::default(),
            binds: BindParams::Empty,
            batch_size: DEFAULT_BATCH_SIZE,
            atomic: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size",
                reason: "must be > 0".into(),
            });
        }
        if self.out_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField { field: "outfile" });
        }
        Ok(())
    }
}
