// src/lifecycle/mod.rs

//! Shared start/stop/running state machine for every dev service.
//!
//! A [`Lifecycle`] is `Idle -> Running -> Stopped`. Shutdown is a cooperative
//! flag owned by the lifecycle instance: `stop()` sets it, the service's own
//! loop observes it through a [`ShutdownSignal`] and returns. Nothing is
//! interrupted forcibly.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, error};

use crate::errors::{DevwatchError, Result};
use crate::types::{ExitStatus, LogSink, Narrator};

pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Running,
    Stopped,
}

/// Cloneable handle; all clones share one state.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    state: Mutex<LifecycleState>,
    shutdown: watch::Sender<bool>,
    sink: Mutex<Option<LogSink>>,
}

impl Lifecycle {
    pub fn new(name: impl Into<String>) -> Self {
        let (shutdown, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                state: Mutex::new(LifecycleState::Idle),
                shutdown,
                sink: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> LifecycleState {
        *lock(&self.inner.state)
    }

    /// True only while in `Running`; the shutdown flag does not affect it.
    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    pub fn shutdown_requested(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Attach the user-facing output sink. Meant to be called before `start`.
    pub fn set_logger(&self, sink: LogSink) {
        *lock(&self.inner.sink) = Some(sink);
    }

    pub fn narrator(&self) -> Narrator {
        Narrator::from_option(lock(&self.inner.sink).clone())
    }

    /// Enter `Running` and hand out the signal the body must observe.
    ///
    /// Clears any stale shutdown flag. Fails if the service is already
    /// running.
    pub fn begin(&self) -> Result<ShutdownSignal> {
        let mut state = lock(&self.inner.state);
        if *state == LifecycleState::Running {
            return Err(DevwatchError::Other(anyhow::anyhow!(
                "service '{}' is already running",
                self.inner.name
            )));
        }
        self.inner.shutdown.send_replace(false);
        *state = LifecycleState::Running;
        debug!(service = %self.inner.name, "lifecycle running");
        Ok(ShutdownSignal::new(self.inner.shutdown.subscribe()))
    }

    /// Ask a running body to exit. A no-op in any other state.
    pub fn stop(&self) {
        let state = lock(&self.inner.state);
        if *state == LifecycleState::Running {
            self.inner.shutdown.send_replace(true);
            debug!(service = %self.inner.name, "shutdown requested");
        }
    }

    pub fn finish(&self) {
        *lock(&self.inner.state) = LifecycleState::Stopped;
        debug!(service = %self.inner.name, "lifecycle stopped");
    }

    /// Await `body`, turning an error into `Failure` plus a narrated line,
    /// and move to `Stopped`.
    pub async fn complete<F>(&self, body: F) -> ExitStatus
    where
        F: Future<Output = Result<ExitStatus>>,
    {
        let status = match body.await {
            Ok(status) => status,
            Err(err) => {
                error!(service = %self.inner.name, error = %err, "service failed");
                self.narrator()
                    .error(format!("{} failed: {err}", self.inner.name));
                ExitStatus::Failure
            }
        };
        self.finish();
        status
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("shutdown_requested", &self.shutdown_requested())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Receiving side of a lifecycle's shutdown flag.
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// A signal that is never raised (one-shot builds, tests).
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested.
    ///
    /// If the owning lifecycle is gone no request can arrive, so this pends.
    pub async fn requested(&mut self) {
        let closed = self.rx.wait_for(|flag| *flag).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// A long- or short-lived dev service driven by a [`Lifecycle`].
pub trait Service: Send + Sync {
    fn lifecycle(&self) -> &Lifecycle;

    /// Service body. Must return once `shutdown` is requested.
    fn run(&self, shutdown: ShutdownSignal) -> ServiceFuture<'_, Result<ExitStatus>>;

    /// Run the body to completion.
    ///
    /// The transition to `Running` happens when `start` is called, before the
    /// returned future is first polled.
    fn start(&self) -> ServiceFuture<'_, ExitStatus> {
        let begun = self.lifecycle().begin();
        self.run_begun(begun)
    }

    fn run_begun(&self, begun: Result<ShutdownSignal>) -> ServiceFuture<'_, ExitStatus> {
        Box::pin(async move {
            match begun {
                Ok(signal) => self.lifecycle().complete(self.run(signal)).await,
                Err(err) => {
                    error!(service = %self.lifecycle().name(), error = %err, "start rejected");
                    self.lifecycle().narrator().error(err.to_string());
                    ExitStatus::Failure
                }
            }
        })
    }

    fn stop(&self) {
        self.lifecycle().stop();
    }

    fn is_running(&self) -> bool {
        self.lifecycle().is_running()
    }

    fn set_logger(&self, sink: LogSink) {
        self.lifecycle().set_logger(sink);
    }
}

/// Start `service` and stop it once `shutdown` is requested from outside.
pub async fn run_until_shutdown<S: Service + ?Sized>(service: &S, mut shutdown: ShutdownSignal) -> ExitStatus {
    let mut run = service.start();
    tokio::select! {
        status = &mut run => return status,
        _ = shutdown.requested() => service.stop(),
    }
    run.await
}
