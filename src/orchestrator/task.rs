// src/orchestrator/task.rs

//! One watch-mode provider run as an independently scheduled task.

use std::sync::Arc;

use tokio::task::{AbortHandle, JoinSet};

use crate::config::ProviderOptions;
use crate::errors::Result;
use crate::lifecycle::{Lifecycle, Service, ServiceFuture, ShutdownSignal};
use crate::provider::{Provider, ProviderContext};
use crate::types::ExitStatus;

pub struct ProviderTask {
    id: String,
    provider: Arc<dyn Provider>,
    options: ProviderOptions,
    ctx: ProviderContext,
    lifecycle: Lifecycle,
}

impl ProviderTask {
    pub fn new(id: impl Into<String>, provider: Arc<dyn Provider>, options: ProviderOptions, ctx: ProviderContext) -> Self {
        let id = id.into();
        let lifecycle = Lifecycle::new(id.clone());
        if let Some(sink) = ctx.log.sink() {
            lifecycle.set_logger(sink);
        }
        Self {
            id,
            provider,
            options,
            ctx,
            lifecycle,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Enter `Running` now and run the provider's `watch` on `set`.
    ///
    /// Because the state change happens before spawning, a `stop()` issued
    /// right after this returns is never lost.
    pub fn spawn_into(self: &Arc<Self>, set: &mut JoinSet<(String, ExitStatus)>) -> AbortHandle {
        let begun = self.lifecycle.begin();
        let task = Arc::clone(self);
        set.spawn(async move {
            let status = task.run_begun(begun).await;
            (task.id.clone(), status)
        })
    }
}

impl Service for ProviderTask {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn run(&self, shutdown: ShutdownSignal) -> ServiceFuture<'_, Result<ExitStatus>> {
        self.provider.watch(&self.ctx, &self.options, shutdown)
    }
}
