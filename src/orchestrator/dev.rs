// src/orchestrator/dev.rs

//! `DevService`: runs `init` for the one-shot services only.

use tracing::info;

use crate::errors::Result;
use crate::lifecycle::{Lifecycle, Service, ServiceFuture, ShutdownSignal};
use crate::orchestrator::Orchestration;
use crate::provider::ServiceEntry;
use crate::types::ExitStatus;

pub struct DevService {
    lifecycle: Lifecycle,
    orchestration: Orchestration,
}

impl DevService {
    pub fn new(orchestration: Orchestration) -> Self {
        Self {
            lifecycle: Lifecycle::new("dev"),
            orchestration,
        }
    }

    async fn run_inits(&self, shutdown: ShutdownSignal) -> Result<ExitStatus> {
        let log = self.lifecycle.narrator();

        // Every configured provider must exist, even if only some run here.
        if let Some(missing) = self
            .orchestration
            .entries
            .iter()
            .find(|e| !self.orchestration.registry.has(&e.provider))
        {
            log.error(format!(
                "Configuration error: service '{}' uses unknown provider '{}'",
                missing.id, missing.provider
            ));
            return Ok(ExitStatus::Failure);
        }

        let init_only: Vec<ServiceEntry> = self
            .orchestration
            .entries
            .iter()
            .filter(|e| e.flags.is_init_only())
            .cloned()
            .collect();

        if init_only.is_empty() {
            log.say("No init services configured");
            return Ok(ExitStatus::Success);
        }

        let Some(ordered) = self.orchestration.resolve(&init_only, &log) else {
            return Ok(ExitStatus::Failure);
        };
        if shutdown.is_requested() {
            return Ok(ExitStatus::Success);
        }

        match self.orchestration.init_all(&ordered, &log).await {
            Ok(()) => {
                info!(services = ordered.len(), "init services complete");
                log.say(format!("{} init service(s) complete", ordered.len()));
                Ok(ExitStatus::Success)
            }
            Err(failed) => {
                log.error(format!("Init failed for service '{failed}'"));
                Ok(ExitStatus::Failure)
            }
        }
    }
}

impl Service for DevService {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn run(&self, shutdown: ShutdownSignal) -> ServiceFuture<'_, Result<ExitStatus>> {
        Box::pin(self.run_inits(shutdown))
    }
}
