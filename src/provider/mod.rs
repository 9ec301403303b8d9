// src/provider/mod.rs

//! Build providers and the registry that orders them.

pub mod registry;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use crate::binary::source::RemoteSource;
use crate::config::{ConfigFile, ProviderOptions};
use crate::errors::Result;
use crate::lifecycle::ShutdownSignal;
use crate::types::{ExitStatus, Narrator};

pub use registry::{ProviderRegistry, ResolvedService, ServiceEntry};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Default `service_order` for providers that do not declare one.
pub const DEFAULT_SERVICE_ORDER: i32 = 100;

/// One build concern (CSS compiler, hot reload, binary install, ...).
///
/// Providers are shared (`Arc<dyn Provider>`) and may be invoked for several
/// services; per-service state lives in the options and context passed in.
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Lower runs earlier among unconstrained providers.
    fn service_order(&self) -> i32 {
        DEFAULT_SERVICE_ORDER
    }

    /// Provider names that must be initialised first.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Idempotent setup.
    fn init<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        options: &'a ProviderOptions,
    ) -> ProviderFuture<'a, ()>;

    /// One-shot build.
    fn build<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        options: &'a ProviderOptions,
    ) -> ProviderFuture<'a, ExitStatus>;

    /// Runs until `shutdown` is requested or a fatal error occurs.
    fn watch<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        options: &'a ProviderOptions,
        shutdown: ShutdownSignal,
    ) -> ProviderFuture<'a, ExitStatus>;
}

/// Project-level facts every provider invocation gets.
#[derive(Clone)]
pub struct ProviderContext {
    /// Id of the service being run (`[services.<id>]`).
    pub service_id: String,
    pub project_root: PathBuf,
    pub environment: String,
    pub var_dir: PathBuf,
    pub public_vendor_dir: PathBuf,
    pub source: Arc<dyn RemoteSource>,
    pub log: Narrator,
}

impl ProviderContext {
    pub fn from_config(config: &ConfigFile, source: Arc<dyn RemoteSource>) -> Self {
        Self {
            service_id: String::new(),
            project_root: config.project_root(),
            environment: config.environment().to_string(),
            var_dir: config.var_dir(),
            public_vendor_dir: config.public_vendor_dir(),
            source,
            log: Narrator::silent(),
        }
    }

    pub fn for_service(&self, service_id: &str, log: Narrator) -> Self {
        Self {
            service_id: service_id.to_string(),
            log,
            ..self.clone()
        }
    }

    pub fn is_dev(&self) -> bool {
        self.environment == "dev"
    }

    /// Resolve a possibly relative path against the project root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = PathBuf::from(path);
        if p.is_absolute() {
            p
        } else {
            self.project_root.join(p)
        }
    }
}

impl std::fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderContext")
            .field("service_id", &self.service_id)
            .field("project_root", &self.project_root)
            .field("environment", &self.environment)
            .field("var_dir", &self.var_dir)
            .finish()
    }
}
