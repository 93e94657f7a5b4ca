//! Resolution of CLI bind tokens into a single parameter mapping.

use std::collections::BTreeMap;

use crate::error::ConfigError;

/// Bind values for one invocation. A run uses positional or named values, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BindParams {
    #[default]
    Empty,
    /// Keyed by zero-based index.
    Positional(Vec<String>),
    Named(BTreeMap<String, String>),
}

impl BindParams {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Positional(v) => v.len(),
            Self::Named(m) => m.len(),
        }
    }

    /// Look up a value by mapping key. Positional keys are stringified indices.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Positional(v) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| v.get(i))
                .map(String::as_str),
            Self::Named(m) => m.get(key).map(String::as_str),
        }
    }
}

pub(crate) fn is_bind_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_named(token: &str) -> Result<(String, String), ConfigError> {
    let malformed = || ConfigError::MalformedBind {
        token: token.to_string(),
    };
    let (key, value) = token.split_once('=').ok_or_else(malformed)?;
    if !is_bind_name(key) || value.is_empty() {
        return Err(malformed());
    }
    Ok((key.to_string(), value.to_string()))
}

/// Build the mapping from positional tokens and `key=value` tokens.
pub fn resolve_binds(positional: &[String], named: &[String]) -> Result<BindParams, ConfigError> {
    match (positional.is_empty(), named.is_empty()) {
        (false, false) => Err(ConfigError::MixedBindStyles),
        (false, true) => Ok(BindParams::Positional(positional.to_vec())),
        (true, false) => {
            let mut map = BTreeMap::new();
            for token in named {
                let (k, v) = parse_named(token)?;
                if map.insert(k.clone(), v).is_some() {
                    log::warn!("Bind variable '{}' given more than once; last value wins", k);
                }
            }
            Ok(BindParams::Named(map))
        }
        (true, true) => Ok(BindParams::Empty),
    }
}
