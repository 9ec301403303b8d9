// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::config::options::{ProviderOptions, secs_to_duration};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [project]
/// environment = "dev"
/// var_dir = "var"
///
/// [services.styles]
/// provider = "tailwind"
/// flags = { dev = true }
///
/// [services.styles.options]
/// source_dirs = ["assets"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    /// All services from `[services.<id>]`, keyed by service id.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
}

/// Validated configuration.
///
/// Built from [`RawConfigFile`] through `TryFrom` (see `validate.rs`). Keeps
/// the raw TOML document around for dotted-key lookups.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub project: ProjectSection,
    pub services: BTreeMap<String, ServiceConfig>,
    document: toml::Table,
    base_dir: PathBuf,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Project root. Relative paths resolve against the config file's
    /// directory; `None` means that directory itself.
    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default = "default_environment")]
    pub environment: String,

    /// Binary and package cache root, relative to the project root.
    #[serde(default = "default_var_dir")]
    pub var_dir: String,

    /// Where npm packages are re-published for serving.
    #[serde(default = "default_public_vendor_dir")]
    pub public_vendor_dir: String,

    /// Seconds the orchestrator waits for stopped tasks before aborting them.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: f64,
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_var_dir() -> String {
    "var".to_string()
}

fn default_public_vendor_dir() -> String {
    "public/vendor".to_string()
}

fn default_shutdown_grace() -> f64 {
    5.0
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: None,
            environment: default_environment(),
            var_dir: default_var_dir(),
            public_vendor_dir: default_public_vendor_dir(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

/// `[services.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Registered provider name this service is backed by.
    pub provider: String,

    #[serde(default)]
    pub flags: ServiceFlags,

    /// Free-form table handed to `init` / `build` / `watch`.
    #[serde(default)]
    pub options: ProviderOptions,
}

fn default_enabled() -> bool {
    true
}

impl ServiceConfig {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            enabled: true,
            provider: provider.into(),
            flags: ServiceFlags::default(),
            options: ProviderOptions::default(),
        }
    }
}

/// `flags = { dev = .., init = .. }`.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub struct ServiceFlags {
    /// Run as a continuous watch task. If `None`, defaults to `!init`.
    #[serde(default)]
    pub dev: Option<bool>,

    /// One-shot setup service.
    #[serde(default)]
    pub init: bool,
}

impl ServiceFlags {
    pub fn is_long_running(&self) -> bool {
        self.dev.unwrap_or(!self.init)
    }

    pub fn is_init_only(&self) -> bool {
        self.init
    }
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile, document: toml::Table, base_dir: PathBuf) -> Self {
        Self {
            project: raw.project,
            services: raw.services,
            document,
            base_dir,
        }
    }

    /// Config with no services, rooted at `base_dir`. Used when no config
    /// file exists and by tests.
    pub fn empty(base_dir: impl Into<PathBuf>) -> Self {
        Self::new_unchecked(RawConfigFile::default(), toml::Table::new(), base_dir.into())
    }

    /// Resolved project root.
    pub fn project_root(&self) -> PathBuf {
        match &self.project.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => self.base_dir.join(root),
            None => self.base_dir.clone(),
        }
    }

    pub fn var_dir(&self) -> PathBuf {
        self.project_root().join(&self.project.var_dir)
    }

    pub fn public_vendor_dir(&self) -> PathBuf {
        self.project_root().join(&self.project.public_vendor_dir)
    }

    pub fn environment(&self) -> &str {
        &self.project.environment
    }

    pub fn shutdown_grace(&self) -> Duration {
        secs_to_duration(self.project.shutdown_grace)
            .unwrap_or_else(|| Duration::from_secs_f64(default_shutdown_grace()))
    }

    /// Enabled services in id order.
    pub fn enabled_services(&self) -> impl Iterator<Item = (&String, &ServiceConfig)> {
        self.services.iter().filter(|(_, svc)| svc.enabled)
    }

    /// Dotted-key lookup over the raw document, e.g.
    /// `"services.binaries.options.required"`.
    pub fn lookup(&self, key: &str) -> Option<&toml::Value> {
        let mut parts = key.split('.');
        let first = parts.next()?;
        let mut current = self.document.get(first)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }

    /// Options table of service `id`, empty when the service is absent.
    pub fn service_options(&self, id: &str) -> ProviderOptions {
        self.services
            .get(id)
            .map(|svc| svc.options.clone())
            .unwrap_or_default()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
