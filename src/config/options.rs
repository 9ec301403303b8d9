// src/config/options.rs

//! Free-form per-service option table with tolerant typed getters.

use std::time::Duration;

use serde::Deserialize;

/// Options handed to a provider's `init` / `build` / `watch`.
///
/// Every getter falls back to the caller's default when the key is missing
/// or has the wrong type; providers never fail on option shape alone.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ProviderOptions(toml::Table);

impl ProviderOptions {
    pub fn new(table: toml::Table) -> Self {
        Self(table)
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.0.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(toml::Value::as_str)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.0
            .get(key)
            .and_then(toml::Value::as_bool)
            .unwrap_or(default)
    }

    /// Floats and integers are both accepted.
    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        match self.0.get(key) {
            Some(toml::Value::Float(f)) => *f,
            Some(toml::Value::Integer(i)) => *i as f64,
            _ => default,
        }
    }

    pub fn duration_secs_or(&self, key: &str, default: Duration) -> Duration {
        secs_to_duration(self.f64_or(key, default.as_secs_f64())).unwrap_or(default)
    }

    /// String list. A single string is accepted and split on commas.
    pub fn str_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(toml::Value::Array(items)) => items
                .iter()
                .filter_map(toml::Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Some(toml::Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn table(&self, key: &str) -> Option<&toml::Table> {
        self.0.get(key).and_then(toml::Value::as_table)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<toml::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Seconds as a `Duration`; `None` for negative, NaN or out-of-range values.
pub fn secs_to_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

impl From<toml::Table> for ProviderOptions {
    fn from(table: toml::Table) -> Self {
        Self(table)
    }
}
