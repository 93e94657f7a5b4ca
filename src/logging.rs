/// Environment variable holding the log level (`debug`, `info`, `warning`...).
pub const LOG_LEVEL_ENV: &str = "LOGLEVEL";

const DEFAULT_LEVEL: &str = "info";

fn level_name(level: &str) -> &str {
    match level {
        "warning" => "warn",
        "critical" | "fatal" => "error",
        "notset" => "trace",
        other => other,
    }
}

/// Turn a `LOGLEVEL` value into env_logger filter directives. Level names are
/// case-insensitive and the Python-style `WARNING` / `CRITICAL` are accepted.
pub fn filter_directives(raw: &str) -> String {
    let raw = raw.trim().to_ascii_lowercase();
    if raw.is_empty() {
        return DEFAULT_LEVEL.to_string();
    }
    raw.split(',')
        .map(|directive| match directive.split_once('=') {
            Some((target, level)) => format!("{}={}", target.trim(), level_name(level.trim())),
            None => level_name(directive.trim()).to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global logger. Level comes from `LOGLEVEL`, defaulting to info.
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let directives = std::env::var(LOG_LEVEL_ENV)
        .map(|v| filter_directives(&v))
        .unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
    let _ = env_logger::Builder::new()
        .parse_filters(&directives)
        .format_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log, Metadata};

    fn enabled(raw: &str, level: Level) -> bool {
        let logger = env_logger::Builder::new()
            .parse_filters(&filter_directives(raw))
            .build();
        logger.enabled(
            &Metadata::builder()
                .level(level)
                .target("sql_extract::orchestrator")
                .build(),
        )
    }

    #[test]
    fn python_level_names_are_mapped() {
        assert_eq!(filter_directives("WARNING"), "warn");
        assert_eq!(filter_directives("CRITICAL"), "error");
        assert_eq!(filter_directives(" Debug "), "debug");
        assert_eq!(filter_directives(""), "info");
        assert_eq!(
            filter_directives("sql_extract=WARNING,sqlx=error"),
            "sql_extract=warn,sqlx=error"
        );
    }

    #[test]
    fn errors_pass_every_level_name() {
        for raw in ["WARNING", "warning", "CRITICAL", "ERROR", "INFO", "DEBUG"] {
            assert!(enabled(raw, Level::Error), "{raw}");
        }
        assert!(!enabled("WARNING", Level::Info));
        assert!(enabled("WARNING", Level::Warn));
        assert!(!enabled("CRITICAL", Level::Warn));
    }
}
