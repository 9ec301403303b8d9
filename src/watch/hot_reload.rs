// src/watch/hot_reload.rs

//! Hot-reload service: notify watcher + [`ReloadEngine`] + reload hooks.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::config::ProviderOptions;
use crate::errors::{DevwatchError, Result};
use crate::exec::{ProcessSpec, run_to_completion};
use crate::lifecycle::{Lifecycle, Service, ServiceFuture, ShutdownSignal, run_until_shutdown};
use crate::provider::{Provider, ProviderContext, ProviderFuture};
use crate::types::{ExitStatus, Narrator};
use crate::watch::engine::{EngineAction, ReloadEngine, TransformJob};
use crate::watch::notifier::{BroadcastHook, ReloadBatch, ReloadHook, SignalFileHook};
use crate::watch::path_filter::PathFilter;
use crate::watch::transform::FileTransformationRule;

pub const DEFAULT_EXTENSIONS: &[&str] = &["php", "twig", "html", "css", "js", "ts", "json", "yaml", "yml"];
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Resolved hot-reload options.
#[derive(Debug, Clone)]
pub struct HotReloadSettings {
    pub project_root: PathBuf,
    pub watch_dirs: Vec<PathBuf>,
    pub debounce: Duration,
    pub poll_interval: Duration,
    pub extensions: Vec<String>,
    pub filter: PathFilter,
    pub transformations: Vec<FileTransformationRule>,
    pub content_hash: bool,
    pub signal_file: Option<PathBuf>,
}

impl HotReloadSettings {
    pub fn new(project_root: impl Into<PathBuf>, watch_dirs: Vec<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            watch_dirs,
            debounce: DEFAULT_DEBOUNCE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            filter: PathFilter::create_default(),
            transformations: Vec::new(),
            content_hash: false,
            signal_file: None,
        }
    }

    /// Read the `hot_reload` option table.
    ///
    /// `watch_dirs` defaults to the project root when absent; an explicitly
    /// empty list means "nothing to watch".
    pub fn from_options(ctx: &ProviderContext, options: &ProviderOptions) -> Result<Self> {
        let watch_dirs = if options.get("watch_dirs").is_some() {
            options
                .str_list("watch_dirs")
                .iter()
                .map(|d| ctx.resolve(d))
                .collect()
        } else {
            vec![ctx.project_root.clone()]
        };

        let mut settings = Self::new(ctx.project_root.clone(), watch_dirs);
        settings.debounce = options.duration_secs_or("debounce_delay", DEFAULT_DEBOUNCE);
        settings.poll_interval = options.duration_secs_or("poll_interval", DEFAULT_POLL_INTERVAL);

        let extensions = options.str_list("extended_extensions");
        if !extensions.is_empty() {
            settings.extensions = extensions;
        }
        settings.filter = PathFilter::create_default().with_patterns(&options.str_list("excluded_patterns"))?;
        if let Some(table) = options.table("file_transformations") {
            settings.transformations = FileTransformationRule::from_table(table)?;
        }
        settings.content_hash = options.bool_or("content_hash", false);
        settings.signal_file = options.str("signal_file").map(|p| ctx.resolve(p));

        Ok(settings)
    }

    /// Existing watch directories; missing ones are reported and dropped.
    pub fn resolve_targets(&self, log: &Narrator) -> Vec<PathBuf> {
        let mut targets = Vec::with_capacity(self.watch_dirs.len());
        for dir in &self.watch_dirs {
            if dir.is_dir() {
                targets.push(dir.clone());
            } else {
                warn!(dir = ?dir, "watch directory does not exist; skipping");
                log.warn(format!("Watch directory not found, skipping: {}", dir.display()));
            }
        }
        targets
    }

    pub fn engine(&self) -> ReloadEngine {
        ReloadEngine::new(
            self.project_root.clone(),
            &self.extensions,
            self.filter.clone(),
            self.transformations.clone(),
            self.debounce,
        )
        .with_content_hash(self.content_hash)
    }
}

pub struct HotReloadService {
    lifecycle: Lifecycle,
    settings: HotReloadSettings,
    hooks: Vec<Arc<dyn ReloadHook>>,
}

impl HotReloadService {
    pub fn new(settings: HotReloadSettings) -> Self {
        Self {
            lifecycle: Lifecycle::new("hot_reload"),
            settings,
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn ReloadHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn settings(&self) -> &HotReloadSettings {
        &self.settings
    }

    async fn watch_loop(&self, mut shutdown: ShutdownSignal) -> Result<ExitStatus> {
        let log = self.lifecycle.narrator();

        let targets = self.settings.resolve_targets(&log);
        if targets.is_empty() {
            info!("no watch targets; hot reload idle");
            log.say("No directories to watch; hot reload has nothing to do");
            return Ok(ExitStatus::Success);
        }

        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // Receiver gone means the loop has exited.
                let _ = event_tx.send(res);
            },
            Config::default(),
        )?;
        for dir in &targets {
            watcher.watch(dir, RecursiveMode::Recursive)?;
            debug!(dir = ?dir, "watching");
        }

        let listed: Vec<String> = targets.iter().map(|d| d.display().to_string()).collect();
        info!(targets = ?listed, "hot reload started");
        log.say(format!("Watching for changes in {}", listed.join(", ")));

        let mut engine = self.settings.engine();
        loop {
            let wake = engine
                .next_deadline()
                .unwrap_or_else(|| Instant::now() + self.settings.poll_interval);

            tokio::select! {
                _ = shutdown.requested() => break,

                msg = event_rx.recv() => match msg {
                    Some(Ok(event)) => {
                        if matches!(event.kind, EventKind::Access(_)) {
                            continue;
                        }
                        let now = Instant::now();
                        for path in &event.paths {
                            engine.on_change(path, now);
                        }
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "watch backend failed");
                        return Err(DevwatchError::WatchBackend(err));
                    }
                    None => {
                        return Err(DevwatchError::Other(anyhow::anyhow!(
                            "watch backend stopped delivering events"
                        )));
                    }
                },

                _ = tokio::time::sleep_until(tokio::time::Instant::from_std(wake)) => {
                    for action in engine.due(Instant::now()) {
                        match action {
                            EngineAction::Reload(batch) => self.reload(batch, &log).await,
                            EngineAction::Transform(job) => {
                                let rule = engine.rules()[job.rule_index].clone();
                                self.transform(&rule, job, &log).await;
                            }
                        }
                    }
                }
            }
        }

        drop(watcher);
        info!("hot reload stopped");
        Ok(ExitStatus::Success)
    }

    async fn reload(&self, batch: ReloadBatch, log: &Narrator) {
        if batch.files.is_empty() {
            return;
        }
        info!(files = batch.files.len(), "reload triggered");
        log.say(format!(
            "Reloading ({} changed: {})",
            batch.files.len(),
            batch.files.join(", ")
        ));
        for hook in &self.hooks {
            if let Err(err) = hook.notify(&batch).await {
                warn!(hook = hook.name(), error = %err, "reload hook failed");
                log.warn(format!("reload hook {} failed: {err}", hook.name()));
            }
        }
    }

    async fn transform(&self, rule: &FileTransformationRule, job: TransformJob, log: &Narrator) {
        let Some(cmd) = rule.render_command(&job.input, &job.output) else {
            log.say(format!(
                "{} changed; {} is regenerated by its build provider",
                job.input.display(),
                job.output.display()
            ));
            return;
        };

        let spec = ProcessSpec::shell(format!("transform {}", rule.pattern()), cmd)
            .cwd(self.settings.project_root.clone());
        match run_to_completion(&spec, log).await {
            Ok(ExitStatus::Success) => {
                log.say(format!("Transformed {} -> {}", job.input.display(), job.output.display()));
            }
            Ok(ExitStatus::Failure) => {
                log.warn(format!("Transformation of {} failed", job.input.display()));
            }
            Err(err) => {
                warn!(error = %err, "transformation could not run");
                log.warn(format!("Transformation of {} could not run: {err}", job.input.display()));
            }
        }
    }
}

impl Service for HotReloadService {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn run(&self, shutdown: ShutdownSignal) -> ServiceFuture<'_, Result<ExitStatus>> {
        Box::pin(self.watch_loop(shutdown))
    }
}

/// `hot_reload` provider.
#[derive(Debug, Clone, Default)]
pub struct HotReloadProvider {
    reloads: BroadcastHook,
}

impl HotReloadProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every reload batch of every `hot_reload` service.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadBatch> {
        self.reloads.subscribe()
    }
}

impl Provider for HotReloadProvider {
    fn name(&self) -> &str {
        "hot_reload"
    }

    fn service_order(&self) -> i32 {
        30
    }

    fn init<'a>(&'a self, ctx: &'a ProviderContext, options: &'a ProviderOptions) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            HotReloadSettings::from_options(ctx, options)?;
            Ok(())
        })
    }

    fn build<'a>(&'a self, _ctx: &'a ProviderContext, _options: &'a ProviderOptions) -> ProviderFuture<'a, ExitStatus> {
        Box::pin(async move { Ok(ExitStatus::Success) })
    }

    fn watch<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        options: &'a ProviderOptions,
        shutdown: ShutdownSignal,
    ) -> ProviderFuture<'a, ExitStatus> {
        Box::pin(async move {
            let settings = HotReloadSettings::from_options(ctx, options)?;
            let signal_file = settings.signal_file.clone();

            let mut service =
                HotReloadService::new(settings).with_hook(Arc::new(self.reloads.clone()));
            if let Some(path) = signal_file {
                service = service.with_hook(Arc::new(SignalFileHook::new(path)));
            }
            if let Some(sink) = ctx.log.sink() {
                service.set_logger(sink);
            }
            Ok(run_until_shutdown(&service, shutdown).await)
        })
    }
}
