use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("cannot mix positional and named bind parameters")]
    MixedBindStyles,
    #[error("malformed bind parameter '{token}', expected key=value")]
    MalformedBind { token: String },
    #[error("no SQL source provided, pass a .sql file or --text")]
    NoSqlSource,
    #[error("input file must be a .sql file: {path}")]
    InvalidSqlFile { path: String },
    #[error(
        "missing database credentials, set full_login and db_password or pass --login and --password"
    )]
    MissingCredentials,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("query error: {message}")]
    Query { message: String, statement: String },
    #[error("bind error: {message}")]
    Bind { message: String, statement: String },
    #[error("decode error: {0}")]
    Decode(String),
}

impl DbError {
    /// Statement text attached to query and bind failures.
    pub fn statement(&self) -> Option<&str> {
        match self {
            Self::Query { statement, .. } | Self::Bind { statement, .. } => Some(statement),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv export error: {0}")]
    Csv(String),
    #[error("xlsx export error: {0}")]
    Xlsx(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            match e.into_kind() {
                csv::ErrorKind::Io(io) => Self::Io(io),
                other => Self::Csv(format!("{:?}", other)),
            }
        } else {
            Self::Csv(e.to_string())
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        match e {
            rust_xlsxwriter::XlsxError::IoError(io) => Self::Io(io),
            other => Self::Xlsx(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_messages_name_the_problem() {
        let e = ConfigError::MalformedBind {
            token: "=x".into(),
        };
        assert!(e.to_string().contains("'=x'"));
        assert_eq!(
            ConfigError::MixedBindStyles.to_string(),
            "cannot mix positional and named bind parameters"
        );
    }

    #[test]
    fn statement_only_on_query_errors() {
        let q = DbError::Query {
            message: "ORA-00942".into(),
            statement: "select * from nope".into(),
        };
        assert_eq!(q.statement(), Some("select * from nope"));
        assert!(DbError::Connection("refused".into()).statement().is_none());
    }
}
