#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use devwatch::config::ProviderOptions;
use devwatch::errors::DevwatchError;
use devwatch::lifecycle::ShutdownSignal;
use devwatch::provider::{Provider, ProviderContext, ProviderFuture};
use devwatch::types::ExitStatus;

/// Shared, ordered record of provider calls: `"init:<service>"`,
/// `"build:<service>"`, `"watch:<service>"`, `"stopped:<service>"`.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// How a fake provider's `watch` behaves.
#[derive(Debug, Clone)]
pub enum WatchMode {
    /// Block until shutdown, then return `Success`.
    UntilShutdown,
    /// Return immediately.
    Exit(ExitStatus),
    /// Return `status` after `delay`, unless stopped first.
    ExitAfter(Duration, ExitStatus),
    /// Return an error.
    Fail(String),
    /// Never return, even when stopped.
    IgnoreShutdown,
}

/// A provider that records its calls and does whatever it is told.
pub struct FakeProvider {
    name: String,
    order: i32,
    deps: Vec<String>,
    init_error: Option<String>,
    build_status: ExitStatus,
    watch: WatchMode,
    log: CallLog,
}

impl FakeProvider {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            order: 100,
            deps: Vec::new(),
            init_error: None,
            build_status: ExitStatus::Success,
            watch: WatchMode::UntilShutdown,
            log: Arc::clone(log),
        }
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.deps.push(dep.to_string());
        self
    }

    pub fn failing_init(mut self, message: &str) -> Self {
        self.init_error = Some(message.to_string());
        self
    }

    pub fn build_status(mut self, status: ExitStatus) -> Self {
        self.build_status = status;
        self
    }

    pub fn watch(mut self, mode: WatchMode) -> Self {
        self.watch = mode;
        self
    }

    pub fn shared(self) -> Arc<dyn Provider> {
        Arc::new(self)
    }

    fn record(&self, call: &str, ctx: &ProviderContext) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{call}:{}", ctx.service_id));
    }
}

impl Provider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn service_order(&self) -> i32 {
        self.order
    }

    fn dependencies(&self) -> Vec<String> {
        self.deps.clone()
    }

    fn init<'a>(&'a self, ctx: &'a ProviderContext, _options: &'a ProviderOptions) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            self.record("init", ctx);
            match &self.init_error {
                Some(message) => Err(DevwatchError::Other(anyhow::anyhow!("{message}"))),
                None => Ok(()),
            }
        })
    }

    fn build<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        _options: &'a ProviderOptions,
    ) -> ProviderFuture<'a, ExitStatus> {
        Box::pin(async move {
            self.record("build", ctx);
            Ok(self.build_status)
        })
    }

    fn watch<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        _options: &'a ProviderOptions,
        mut shutdown: ShutdownSignal,
    ) -> ProviderFuture<'a, ExitStatus> {
        Box::pin(async move {
            self.record("watch", ctx);
            match &self.watch {
                WatchMode::UntilShutdown => {
                    shutdown.requested().await;
                    self.record("stopped", ctx);
                    Ok(ExitStatus::Success)
                }
                WatchMode::Exit(status) => Ok(*status),
                WatchMode::ExitAfter(delay, status) => {
                    tokio::select! {
                        _ = tokio::time::sleep(*delay) => Ok(*status),
                        _ = shutdown.requested() => {
                            self.record("stopped", ctx);
                            Ok(ExitStatus::Success)
                        }
                    }
                }
                WatchMode::Fail(message) => Err(DevwatchError::Other(anyhow::anyhow!("{message}"))),
                WatchMode::IgnoreShutdown => Ok(std::future::pending::<ExitStatus>().await),
            }
        })
    }
}
