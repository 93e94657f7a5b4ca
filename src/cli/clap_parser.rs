use std::path::PathBuf;

use clap::Parser;

use super::args::{
    QuoteArg, default_csv_path, default_xlsx_path, parse_delimiter, parse_quotechar,
    parse_sql_file,
};
use crate::config::{DEFAULT_BATCH_SIZE, DatabaseConfig, ExtractConfig};
use crate::error::ConfigError;
use crate::export::csv_export::{DEFAULT_DELIMITER, Dialect};
use crate::query::{SqlSource, resolve_binds};

#[derive(Parser, Debug)]
#[command(
    name = "sql-extract",
    version,
    about = "Run one SQL query and stream its result set to a delimited file",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// SQL file to run (must end in .sql)
    #[arg(value_name = "FILENAME", value_parser = parse_sql_file)]
    pub filename: Option<PathBuf>,
    /// Bind values, in placeholder order (ignored when -b is given)
    #[arg(value_name = "VALUE")]
    pub positional_variables: Vec<String>,
    /// Output file (default: <FILENAME without extension>.csv)
    #[arg(short = 'o', long = "outfile", value_name = "PATH")]
    pub outfile: Option<PathBuf>,
    /// Field delimiter; only the first character is used
    #[arg(
        short = 'd',
        long = "delimiter",
        value_parser = parse_delimiter,
        default_value_t = DEFAULT_DELIMITER
    )]
    pub delimiter: char,
    /// Quote character, or "none" to disable quoting
    #[arg(
        short = 'c',
        long = "quotechar",
        value_parser = parse_quotechar,
        default_value = "\""
    )]
    pub quotechar: QuoteArg,
    /// Named bind values as key=value
    #[arg(short = 'b', long = "bind-variables", value_name = "KEY=VALUE", num_args = 0..)]
    pub bind_variables: Vec<String>,
    /// Inline SQL, used when FILENAME is absent
    #[arg(short = 't', long = "text", value_name = "SQL", num_args = 0..)]
    pub text: Vec<String>,
    /// Login string: user@host[:port][/database] or sqlite:<path> (env: full_login)
    #[arg(short = 'l', long = "login", env = "full_login")]
    pub login: Option<String>,
    /// Database password (env: db_password)
    #[arg(short = 'p', long = "password", env = "db_password", hide_env_values = true)]
    pub password: Option<String>,
    /// Rows fetched per round-trip (env: SQL_EXTRACT_BATCH_SIZE)
    #[arg(
        long = "batch-size",
        env = "SQL_EXTRACT_BATCH_SIZE",
        default_value_t = DEFAULT_BATCH_SIZE
    )]
    pub batch_size: usize,
    /// Write to <outfile>.partial and rename it into place on success
    #[arg(long = "atomic")]
    pub atomic: bool,
    /// Write a .env template to PATH and exit
    #[arg(long = "env-template", value_name = "PATH")]
    pub env_template: Option<PathBuf>,
}

impl Cli {
    /// Turn parsed arguments into run configuration. Credentials are checked
    /// first so a misconfigured environment fails before anything else.
    pub fn to_configs(&self) -> Result<(DatabaseConfig, ExtractConfig), ConfigError> {
        let (login, password) = match (self.login.as_deref(), self.password.as_deref()) {
            (Some(l), Some(p)) if !l.trim().is_empty() => (l, p),
            _ => return Err(ConfigError::MissingCredentials),
        };
        let database = DatabaseConfig::from_login(login, password)?;

        let binds = resolve_binds(&self.positional_variables, &self.bind_variables)?;
        let source = SqlSource::from_parts(self.filename.as_deref(), &self.text)?;
        let out_path = match (&self.outfile, &source) {
            (Some(o), _) => o.clone(),
            (None, SqlSource::File(p)) => default_csv_path(p),
            (None, SqlSource::Inline(_)) => {
                return Err(ConfigError::MissingField { field: "outfile" });
            }
        };

        let cfg = ExtractConfig {
            source,
            out_path,
            dialect: Dialect::new(self.delimiter, self.quotechar.0)?,
            binds,
            batch_size: self.batch_size,
            atomic: self.atomic,
        };
        cfg.validate()?;
        Ok((database, cfg))
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "csv2xlsx",
    version,
    about = "Convert a comma-delimited file into a single-sheet xlsx workbook"
)]
pub struct ConvertCli {
    /// CSV file to convert
    #[arg(value_name = "FILENAME")]
    pub filename: PathBuf,
    /// Output workbook (default: <FILENAME>.xlsx)
    #[arg(short = 'o', long = "outfile", value_name = "PATH")]
    pub outfile: Option<PathBuf>,
}

impl ConvertCli {
    pub fn output_path(&self) -> PathBuf {
        self.outfile
            .clone()
            .unwrap_or_else(|| default_xlsx_path(&self.filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::csv_export::Quoting;
    use crate::query::BindParams;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["sql-extract", "-l", "sqlite::memory:", "-p", "x"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn file_with_defaults() {
        let cli = parse(&["q/report.sql"]);
        let (db, cfg) = cli.to_configs().unwrap();
        assert_eq!(db.database, ":memory:");
        assert_eq!(cfg.source, SqlSource::File(PathBuf::from("q/report.sql")));
        assert_eq!(cfg.out_path, PathBuf::from("q/report.csv"));
        assert_eq!(cfg.dialect, Dialect::default());
        assert_eq!(cfg.binds, BindParams::Empty);
        assert_eq!(cfg.batch_size, DEFAULT_BATCH_SIZE);
        assert!(!cfg.atomic);
    }

    #[test]
    fn non_sql_file_is_rejected_by_parser() {
        let res = Cli::try_parse_from(["sql-extract", "-l", "a@b", "-p", "x", "report.txt"]);
        assert!(res.is_err());
    }

    #[test]
    fn positional_values_follow_file() {
        let cli = parse(&["q.sql", "A", "B"]);
        let (_, cfg) = cli.to_configs().unwrap();
        assert_eq!(
            cfg.binds,
            BindParams::Positional(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn inline_text_with_named_binds() {
        let cli = parse(&[
            "-o", "out.csv", "-c", "none", "-d", "|", "-b", "0=A", "1=B", "-t", "select", ":0,",
            ":1",
        ]);
        let (_, cfg) = cli.to_configs().unwrap();
        assert_eq!(cfg.source, SqlSource::Inline("select :0, :1".to_string()));
        assert_eq!(cfg.dialect.quoting(), Quoting::NoneEscaped);
        assert_eq!(cfg.dialect.delimiter(), '|');
        assert_eq!(cfg.binds.get("1"), Some("B"));
    }

    #[test]
    fn inline_text_needs_outfile() {
        let cli = parse(&["-t", "select 1"]);
        assert!(matches!(
            cli.to_configs(),
            Err(ConfigError::MissingField { field: "outfile" })
        ));
    }

    #[test]
    fn mixed_binds_rejected() {
        let cli = parse(&["q.sql", "A", "-b", "k=v"]);
        assert!(matches!(cli.to_configs(), Err(ConfigError::MixedBindStyles)));
    }

    #[test]
    fn no_source_rejected() {
        let cli = parse(&[]);
        assert!(matches!(cli.to_configs(), Err(ConfigError::NoSqlSource)));
    }

    #[test]
    fn missing_credentials_checked_first() {
        let mut cli = parse(&[]);
        cli.login = None;
        assert!(matches!(
            cli.to_configs(),
            Err(ConfigError::MissingCredentials)
        ));
        let mut cli = parse(&["q.sql"]);
        cli.password = None;
        assert!(matches!(
            cli.to_configs(),
            Err(ConfigError::MissingCredentials)
        ));
    }

    #[test]
    fn quote_equal_to_delimiter_rejected() {
        let cli = parse(&["q.sql", "-d", ";", "-c", ";"]);
        assert!(matches!(
            cli.to_configs(),
            Err(ConfigError::InvalidValue {
                field: "quotechar",
                ..
            })
        ));
    }

    #[test]
    fn converter_default_output() {
        let cli = ConvertCli::try_parse_from(["csv2xlsx", "data/t.csv"]).unwrap();
        assert_eq!(cli.output_path(), PathBuf::from("data/t.csv.xlsx"));
        let cli = ConvertCli::try_parse_from(["csv2xlsx", "t.csv", "-o", "x.xlsx"]).unwrap();
        assert_eq!(cli.output_path(), PathBuf::from("x.xlsx"));
    }
}
