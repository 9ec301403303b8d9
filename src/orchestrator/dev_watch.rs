// src/orchestrator/dev_watch.rs

//! `DevWatchService`: the full orchestrator.
//!
//! Resolve -> init all (in order) -> spawn every long-running service ->
//! wait for shutdown or the first failure -> stop everything -> aggregate.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{Id, JoinError, JoinSet};
use tracing::{error, info, warn};

use crate::errors::Result;
use crate::lifecycle::{Lifecycle, Service, ServiceFuture, ShutdownSignal};
use crate::orchestrator::Orchestration;
use crate::orchestrator::task::ProviderTask;
use crate::types::{ExitStatus, Narrator};

pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct DevWatchService {
    lifecycle: Lifecycle,
    orchestration: Orchestration,
    shutdown_grace: Duration,
}

/// Bookkeeping for the running task set.
struct Running {
    set: JoinSet<(String, ExitStatus)>,
    tasks: Vec<Arc<ProviderTask>>,
    ids: HashMap<Id, String>,
    results: BTreeMap<String, ExitStatus>,
}

impl Running {
    fn record(&mut self, joined: std::result::Result<(String, ExitStatus), JoinError>, log: &Narrator) -> ExitStatus {
        match joined {
            Ok((id, status)) => {
                info!(service = %id, %status, "service finished");
                if !status.is_success() {
                    log.error(format!("Service '{id}' failed"));
                }
                self.results.insert(id, status);
                status
            }
            Err(err) => {
                let id = self
                    .ids
                    .get(&err.id())
                    .cloned()
                    .unwrap_or_else(|| "<unknown>".to_string());
                if err.is_cancelled() {
                    warn!(service = %id, "service aborted after grace period");
                    log.error(format!("Service '{id}' did not stop in time and was aborted"));
                } else {
                    error!(service = %id, error = %err, "service task panicked");
                    log.error(format!("Service '{id}' crashed: {err}"));
                }
                self.results.insert(id, ExitStatus::Failure);
                ExitStatus::Failure
            }
        }
    }

    fn stop_all(&self) {
        for task in &self.tasks {
            task.stop();
        }
    }
}

impl DevWatchService {
    pub fn new(orchestration: Orchestration) -> Self {
        Self {
            lifecycle: Lifecycle::new("dev-watch"),
            orchestration,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Upper bound on waiting for stopped tasks before aborting them.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    async fn orchestrate(&self, mut shutdown: ShutdownSignal) -> Result<ExitStatus> {
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

        let watchers: Vec<_> = ordered.iter().filter(|s| s.flags.is_long_running()).collect();
        if watchers.is_empty() {
            log.say("No watch services to run");
            return Ok(ExitStatus::Success);
        }
        if shutdown.is_requested() {
            return Ok(ExitStatus::Success);
        }

        let mut running = Running {
            set: JoinSet::new(),
            tasks: Vec::with_capacity(watchers.len()),
            ids: HashMap::new(),
            results: BTreeMap::new(),
        };
        for svc in watchers {
            let ctx = orchestration.ctx.for_service(&svc.id, log.prefixed(&svc.id));
            let task = Arc::new(ProviderTask::new(
                svc.id.clone(),
                Arc::clone(&svc.provider),
                svc.options.clone(),
                ctx,
            ));
            let handle = task.spawn_into(&mut running.set);
            running.ids.insert(handle.id(), svc.id.clone());
            running.tasks.push(task);
            info!(service = %svc.id, provider = %svc.provider_name(), "service started");
        }
        log.say(format!("Started {} service(s); waiting for changes", running.tasks.len()));

        loop {
            tokio::select! {
                _ = shutdown.requested() => {
                    info!("shutdown requested; stopping services");
                    log.say("Stopping services");
                    break;
                }
                joined = running.set.join_next() => match joined {
                    None => break,
                    Some(joined) => {
                        if !running.record(joined, &log).is_success() {
                            log.say("Stopping remaining services");
                            break;
                        }
                    }
                },
            }
        }

        running.stop_all();
        let drained = tokio::time::timeout(self.shutdown_grace, async {
            while let Some(joined) = running.set.join_next().await {
                running.record(joined, &log);
            }
        })
        .await;

        if drained.is_err() {
            warn!("services did not stop within grace period; aborting");
            running.set.abort_all();
            while let Some(joined) = running.set.join_next().await {
                running.record(joined, &log);
            }
        }

        let failed: Vec<&str> = running
            .results
            .iter()
            .filter(|(_, status)| !status.is_success())
            .map(|(id, _)| id.as_str())
            .collect();

        if failed.is_empty() {
            log.say("All services stopped cleanly");
            Ok(ExitStatus::Success)
        } else {
            log.error(format!("Failed services: {}", failed.join(", ")));
            Ok(ExitStatus::Failure)
        }
    }
}

impl Service for DevWatchService {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn run(&self, shutdown: ShutdownSignal) -> ServiceFuture<'_, Result<ExitStatus>> {
        Box::pin(self.orchestrate(shutdown))
    }
}
