// src/orchestrator/mod.rs

//! Top-level orchestrators: resolve services through the provider registry,
//! init them in dependency order, then run them.
//!
//! - [`DevService`]: init-only services.
//! - [`DevWatchService`]: init everything, then supervise watch tasks.
//! - [`BuildService`]: init everything, then one-shot builds.
//! - [`plan`]: dry-run rendering of the resolved order.

pub mod build;
pub mod dev;
pub mod dev_watch;
pub mod plan;
pub mod task;

use tracing::{error, info};

use crate::errors::DevwatchError;
use crate::provider::{ProviderContext, ProviderRegistry, ResolvedService, ServiceEntry};
use crate::types::Narrator;

pub use build::BuildService;
pub use dev::DevService;
pub use dev_watch::DevWatchService;
pub use plan::{plan, render_plan};
pub use task::ProviderTask;

/// What every orchestrator needs to resolve and run services.
#[derive(Clone)]
pub struct Orchestration {
    pub registry: ProviderRegistry,
    pub entries: Vec<ServiceEntry>,
    pub ctx: ProviderContext,
}

impl Orchestration {
    pub fn new(registry: ProviderRegistry, entries: Vec<ServiceEntry>, ctx: ProviderContext) -> Self {
        Self { registry, entries, ctx }
    }

    /// Resolve the start order, narrating configuration errors.
    pub(crate) fn resolve(&self, entries: &[ServiceEntry], log: &Narrator) -> Option<Vec<ResolvedService>> {
        match self.registry.ordered_providers(entries) {
            Ok(ordered) => Some(ordered),
            Err(err) => {
                error!(error = %err, "service configuration rejected");
                match err {
                    DevwatchError::ConfigError(_) => log.error(err.to_string()),
                    _ => log.error(format!("Configuration error: {err}")),
                }
                None
            }
        }
    }

    /// `init` every service in order; stops at the first failure and
    /// returns the failing service id.
    pub(crate) async fn init_all(&self, ordered: &[ResolvedService], log: &Narrator) -> Result<(), String> {
        for svc in ordered {
            let ctx = self.ctx.for_service(&svc.id, log.prefixed(&svc.id));
            info!(service = %svc.id, provider = %svc.provider_name(), "initialising");
            if let Err(err) = svc.provider.init(&ctx, &svc.options).await {
                error!(service = %svc.id, provider = %svc.provider_name(), error = %err, "init failed");
                log.error(format!(
                    "Service '{}' (provider '{}') failed to initialise: {err}",
                    svc.id,
                    svc.provider_name()
                ));
                return Err(svc.id.clone());
            }
        }
        Ok(())
    }
}
