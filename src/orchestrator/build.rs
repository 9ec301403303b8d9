// src/orchestrator/build.rs

//! `BuildService`: one-shot build of every configured service.

use tracing::{error, info};

use crate::errors::Result;
use crate::lifecycle::{Lifecycle, Service, ServiceFuture, ShutdownSignal};
use crate::orchestrator::Orchestration;
use crate::types::ExitStatus;

pub struct BuildService {
    lifecycle: Lifecycle,
    orchestration: Orchestration,
}

impl BuildService {
    pub fn new(orchestration: Orchestration) -> Self {
        Self {
            lifecycle: Lifecycle::new("build"),
            orchestration,
        }
    }

    async fn build_all(&self, shutdown: ShutdownSignal) -> Result<ExitStatus> {
        let log = self.lifecycle.narrator();
        let orchestration = &self.orchestration;

        if orchestration.entries.is_empty() {
            log.say("No services configured");
            return Ok(ExitStatus::Success);
        }

        let Some(ordered) = orchestration.resolve(&orchestration.entries, &log) else {
            return Ok(ExitStatus::Failure);
        };
        if orchestration.init_all(&ordered, &log).await.is_err() {
            return Ok(ExitStatus::Failure);
        }

        let mut failed = Vec::new();
        for svc in ordered.iter().filter(|s| !s.implicit) {
            if shutdown.is_requested() {
                log.warn("Build interrupted");
                return Ok(ExitStatus::Failure);
            }

            let ctx = orchestration.ctx.for_service(&svc.id, log.prefixed(&svc.id));
            info!(service = %svc.id, provider = %svc.provider_name(), "building");
            let status = match svc.provider.build(&ctx, &svc.options).await {
                Ok(status) => status,
                Err(err) => {
                    error!(service = %svc.id, error = %err, "build failed");
                    log.error(format!("Service '{}' build failed: {err}", svc.id));
                    ExitStatus::Failure
                }
            };
            if !status.is_success() {
                failed.push(svc.id.as_str());
            }
        }

        if failed.is_empty() {
            log.say("Build complete");
            Ok(ExitStatus::Success)
        } else {
            log.error(format!("Failed services: {}", failed.join(", ")));
            Ok(ExitStatus::Failure)
        }
    }
}

impl Service for BuildService {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn run(&self, shutdown: ShutdownSignal) -> ServiceFuture<'_, Result<ExitStatus>> {
        Box::pin(self.build_all(shutdown))
    }
}
