// src/watch/transform.rs

//! Per-pattern derived-file rules (`file_transformations` option).
//!
//! ```toml
//! [services.hot_reload.options.file_transformations."*.tailwind.css"]
//! output_pattern = "{path}/{name}.css"
//! debounce_delay = 0.5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::GlobMatcher;

use crate::config::options::secs_to_duration;
use crate::errors::{DevwatchError, Result};
use crate::watch::path_filter::compile_glob;

const DEFAULT_TRANSFORM_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct FileTransformationRule {
    pattern: String,
    matcher: GlobMatcher,
    /// Patterns without a `/` match the file name only.
    name_only: bool,
    output_pattern: String,
    debounce_delay: Duration,
    command: Option<String>,
    exclude_from_reload: bool,
}

impl FileTransformationRule {
    pub fn new(pattern: impl Into<String>, output_pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let matcher = compile_glob(&pattern)?.compile_matcher();
        Ok(Self {
            name_only: !pattern.contains('/'),
            matcher,
            pattern,
            output_pattern: output_pattern.into(),
            debounce_delay: DEFAULT_TRANSFORM_DEBOUNCE,
            command: None,
            exclude_from_reload: false,
        })
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn excluded_from_reload(mut self, exclude: bool) -> Self {
        self.exclude_from_reload = exclude;
        self
    }

    /// Parse the `file_transformations` option table, sorted by pattern.
    pub fn from_table(table: &toml::Table) -> Result<Vec<Self>> {
        let mut rules = Vec::with_capacity(table.len());
        for (pattern, value) in table {
            let spec = value.as_table().ok_or_else(|| {
                DevwatchError::ConfigError(format!(
                    "file_transformations.'{pattern}' must be a table"
                ))
            })?;
            let output = spec
                .get("output_pattern")
                .and_then(toml::Value::as_str)
                .ok_or_else(|| {
                    DevwatchError::ConfigError(format!(
                        "file_transformations.'{pattern}' needs an `output_pattern`"
                    ))
                })?;

            let mut rule = FileTransformationRule::new(pattern.clone(), output)?;
            let delay = match spec.get("debounce_delay") {
                Some(toml::Value::Float(f)) => Some(*f),
                Some(toml::Value::Integer(i)) => Some(*i as f64),
                _ => None,
            };
            if let Some(delay) = delay.and_then(secs_to_duration) {
                rule = rule.with_debounce(delay);
            }
            if let Some(cmd) = spec.get("command").and_then(toml::Value::as_str) {
                rule = rule.with_command(cmd);
            }
            if let Some(flag) = spec.get("exclude_from_reload").and_then(toml::Value::as_bool) {
                rule = rule.excluded_from_reload(flag);
            }
            rules.push(rule);
        }
        Ok(rules)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn debounce_delay(&self) -> Duration {
        self.debounce_delay
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn exclude_from_reload(&self) -> bool {
        self.exclude_from_reload
    }

    /// `rel` is relative to the watch root, forward slashes.
    pub fn matches(&self, rel: &str) -> bool {
        if self.name_only {
            let name = rel.rsplit('/').next().unwrap_or(rel);
            self.matcher.is_match(name)
        } else {
            self.matcher.is_match(rel)
        }
    }

    /// Derived output path for `input`.
    ///
    /// `{path}` is the input's directory, `{name}` its file name minus the
    /// literal suffix the pattern matched (`app.tailwind.css` with
    /// `*.tailwind.css` gives `app`), or minus the extension otherwise.
    pub fn output_for(&self, input: &Path) -> PathBuf {
        let dir = input
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = if dir.is_empty() { ".".to_string() } else { dir };
        let rendered = self
            .output_pattern
            .replace("{path}", &dir)
            .replace("{name}", &self.stem_of(input));
        PathBuf::from(rendered)
    }

    /// Shell command with `{input}` / `{output}` filled in.
    pub fn render_command(&self, input: &Path, output: &Path) -> Option<String> {
        self.command.as_ref().map(|cmd| {
            cmd.replace("{input}", &input.to_string_lossy())
                .replace("{output}", &output.to_string_lossy())
        })
    }

    fn stem_of(&self, input: &Path) -> String {
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let last_segment = self.pattern.rsplit('/').next().unwrap_or(&self.pattern);
        let literal_suffix = last_segment
            .strip_prefix('*')
            .filter(|s| !s.is_empty() && !s.contains(['*', '?', '[', '{']));
        if let Some(suffix) = literal_suffix {
            let lowered = file_name.to_lowercase();
            if lowered.len() == file_name.len()
                && lowered.len() > suffix.len()
                && lowered.ends_with(&suffix.to_lowercase())
            {
                if let Some(stem) = file_name.get(..file_name.len() - suffix.len()) {
                    return stem.to_string();
                }
            }
        }

        input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(file_name)
    }
}
