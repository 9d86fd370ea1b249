// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::str::FromStr;

use {
    log::warn,
    toml::{Table, Value},
};

/// An ordered list of configuration key/value pairs. Order follows the configuration file, and
/// is preserved all the way to the request sent to the management API.
pub type Settings = Vec<(String, String)>;

/// Delimiter used for list-valued keys such as host lists.
pub const LIST_DELIMITER: char = ',';

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not open config file \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing key \"{key}\" in section [{section}]")]
    MissingKey { section: String, key: String },

    #[error("key \"{key}\" in section [{section}] is not a valid {expected}")]
    InvalidValue {
        section: String,
        key: String,
        expected: &'static str,
    },

    #[error("unknown service kind \"{0}\"")]
    UnknownServiceKind(String),

    #[error("key \"{key}\" in section [{section}] does not list any hosts")]
    EmptyHostList { section: String, key: String },

    #[error("service name \"{0}\" is declared more than once")]
    DuplicateService(String),
}

/// Config is the section-keyed document describing the desired state of a cluster.
///
/// Every top-level table of the TOML file is a section; the entries of that table are the
/// section's key/value pairs. Apart from checking that keys are present, no validation happens
/// here: turning a value into a number or a host list is up to the caller.
#[derive(Debug, Clone, Default)]
pub struct Config {
    sections: Table,
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sections: Table = toml::from_str(s)?;
        Ok(Config { sections })
    }
}

impl Config {
    /// Read and parse the config file at `path`.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        contents.parse()
    }

    pub fn has_section(&self, section: &str) -> bool {
        matches!(self.sections.get(section), Some(Value::Table(_)))
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .filter(|(_, v)| v.is_table())
            .map(|(k, _)| k.as_str())
    }

    /// All key/value pairs of a section in file order. An absent section yields an empty list.
    pub fn section_values(&self, section: &str) -> Settings {
        let Some(Value::Table(table)) = self.sections.get(section) else {
            return Settings::new();
        };

        table
            .iter()
            .filter_map(|(key, value)| match value_to_string(value) {
                Some(v) => Some((key.clone(), v)),
                None => {
                    warn!("Ignoring non-scalar value \"{key}\" in section [{section}]");
                    None
                }
            })
            .collect()
    }

    pub fn optional_scalar(&self, section: &str, key: &str) -> Result<Option<String>, ConfigError> {
        let Some(Value::Table(table)) = self.sections.get(section) else {
            return Ok(None);
        };
        match table.get(key) {
            None => Ok(None),
            Some(value) => match value_to_string(value) {
                Some(v) => Ok(Some(v)),
                None => Err(ConfigError::InvalidValue {
                    section: section.to_string(),
                    key: key.to_string(),
                    expected: "scalar",
                }),
            },
        }
    }

    /// Get a single value, failing with `MissingKey` if it is absent.
    pub fn scalar(&self, section: &str, key: &str) -> Result<String, ConfigError> {
        self.optional_scalar(section, key)?
            .ok_or_else(|| ConfigError::MissingKey {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    pub fn optional_list(&self, section: &str, key: &str) -> Result<Option<Vec<String>>, ConfigError> {
        Ok(self.optional_scalar(section, key)?.map(|v| split_list(&v)))
    }

    /// Get a list value. The value is split on `LIST_DELIMITER`, with surrounding whitespace and
    /// empty entries removed.
    pub fn list(&self, section: &str, key: &str) -> Result<Vec<String>, ConfigError> {
        Ok(split_list(&self.scalar(section, key)?))
    }

    /// Parse an optional value with `FromStr`, reporting `InvalidValue` if it does not parse.
    pub fn optional_parsed<T: FromStr>(
        &self,
        section: &str,
        key: &str,
        expected: &'static str,
    ) -> Result<Option<T>, ConfigError> {
        match self.optional_scalar(section, key)? {
            None => Ok(None),
            Some(v) => v
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    section: section.to_string(),
                    key: key.to_string(),
                    expected,
                }),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render a TOML value the way the management API expects to receive it: as a string.
///
/// Arrays of scalars are flattened into a delimited list so that `hosts = ["a", "b"]` and
/// `hosts = "a,b"` mean the same thing. Tables have no string form.
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        // TOML float syntax, so `1.0` stays "1.0" rather than "1".
        Value::Float(_) => Some(value.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(d) => Some(d.to_string()),
        Value::Array(items) => {
            let items: Option<Vec<String>> = items
                .iter()
                .map(|item| match item {
                    Value::Array(_) | Value::Table(_) => None,
                    other => value_to_string(other),
                })
                .collect();
            Some(items?.join(&LIST_DELIMITER.to_string()))
        }
        Value::Table(_) => None,
    }
}
