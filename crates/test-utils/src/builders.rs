#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use devwatch::config::{ConfigFile, ProviderOptions, RawConfigFile, ServiceConfig, ServiceFlags};
use devwatch::provider::{ProviderContext, ServiceEntry};
use devwatch::types::{LogSink, Narrator};

use crate::fake_source::FakeSource;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_service(mut self, id: &str, service: ServiceConfig) -> Self {
        self.config.services.insert(id.to_string(), service);
        self
    }

    pub fn with_environment(mut self, env: &str) -> Self {
        self.config.project.environment = env.to_string();
        self
    }

    pub fn with_shutdown_grace(mut self, secs: f64) -> Self {
        self.config.project.shutdown_grace = secs;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ServiceEntry`.
pub struct ServiceBuilder {
    entry: ServiceEntry,
}

impl ServiceBuilder {
    pub fn new(id: &str, provider: &str) -> Self {
        Self {
            entry: ServiceEntry::new(id, provider),
        }
    }

    /// One-shot setup service (`init = true`, not started in watch mode).
    pub fn init_only(mut self) -> Self {
        self.entry.flags = ServiceFlags {
            dev: Some(false),
            init: true,
        };
        self
    }

    pub fn option(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.entry.options.insert(key, value);
        self
    }

    pub fn options(mut self, options: ProviderOptions) -> Self {
        self.entry.options = options;
        self
    }

    pub fn build(self) -> ServiceEntry {
        self.entry
    }
}

/// Context rooted at `root`, backed by `source`, narrating into nothing.
pub fn test_context(root: &Path, source: Arc<FakeSource>) -> ProviderContext {
    ProviderContext::from_config(&ConfigFile::empty(root), source)
}

/// A narrator that keeps every line it is given.
#[derive(Clone, Default)]
pub struct CapturedLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CapturedLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> LogSink {
        let lines = Arc::clone(&self.lines);
        Arc::new(move |msg: &str| lines.lock().unwrap().push(msg.to_string()))
    }

    pub fn narrator(&self) -> Narrator {
        Narrator::new(self.sink())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}
