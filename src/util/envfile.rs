use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

const DOTENV: &str = ".env";

/// Parse `KEY=value` lines. Blank lines and `#` comments are skipped, one pair
/// of surrounding quotes is removed from values.
pub fn parse_env_str(content: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for (idx, line) in content.lines().enumerate() {
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        if let Some((key, val)) = s.split_once('=') {
            let mut val = val.trim();
            if val.len() >= 2
                && ((val.starts_with('"') && val.ends_with('"'))
                    || (val.starts_with('\'') && val.ends_with('\'')))
            {
                val = &val[1..val.len() - 1];
            }
            map.insert(key.trim().to_string(), val.to_string());
        } else {
            // logger is not up yet: .env may carry LOGLEVEL
            eprintln!(
                "Warning: ignoring .env line {} without '=': {}",
                idx + 1,
                line
            );
        }
    }
    map
}

/// Parse an env file. A missing file yields an empty map.
pub fn parse_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse_env_str(&content))
}

/// Load `.env` from the working directory into the process environment.
/// Variables that are already set are left alone.
pub fn load_dotenv_if_present() -> Result<()> {
    for (k, v) in parse_env_file(Path::new(DOTENV))? {
        if std::env::var_os(&k).is_none() {
            // SAFETY: called once at startup before any other thread exists
            unsafe {
                std::env::set_var(&k, &v);
            }
        }
    }
    Ok(())
}

const TEMPLATE: &str = r#"# sql-extract environment configuration template
# Copy this file to .env and fill in your connection settings.
# Variables already set in the environment take precedence over .env.

# Login string: user@host[:port][/database] or sqlite:<path>
full_login=report_user@127.0.0.1:3306/warehouse
db_password=secret

# Log level: error, warn, info, debug, trace
#LOGLEVEL=info

# Rows fetched per round-trip
#SQL_EXTRACT_BATCH_SIZE=1000

# Connection timeout in milliseconds
#SQL_EXTRACT_CONNECT_MS=30000
"#;

/// Write a commented `.env` template.
pub fn write_env_template(path: &Path) -> Result<()> {
    let mut f =
        fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    f.write_all(TEMPLATE.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_comments_and_quotes() {
        let map = parse_env_str(
            "# comment\n\nfull_login = u@h/db\ndb_password=\"p=w\"\nLOGLEVEL='debug'\nbroken line\n",
        );
        assert_eq!(map.len(), 3);
        assert_eq!(map["full_login"], "u@h/db");
        assert_eq!(map["db_password"], "p=w");
        assert_eq!(map["LOGLEVEL"], "debug");
    }

    #[test]
    fn lone_quote_is_kept() {
        let map = parse_env_str("K=\"\n");
        assert_eq!(map["K"], "\"");
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(parse_env_file(&dir.path().join(".env")).unwrap().is_empty());
    }

    #[test]
    fn template_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env.template");
        write_env_template(&path).unwrap();
        let map = parse_env_file(&path).unwrap();
        assert!(map.contains_key("full_login"));
        assert!(map.contains_key("db_password"));
        assert!(!map.contains_key("LOGLEVEL"));
    }
}
