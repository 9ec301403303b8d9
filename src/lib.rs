// src/lib.rs

pub mod binary;
pub mod builtin;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod lifecycle;
pub mod logging;
pub mod orchestrator;
pub mod provider;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::binary::{BinaryRegistry, HttpSource, install_binaries};
use crate::builtin::{BinariesProvider, default_registry};
use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, ProviderOptions, load_and_validate};
use crate::lifecycle::{Lifecycle, Service, ShutdownSignal, run_until_shutdown};
use crate::orchestrator::{BuildService, DevService, DevWatchService, Orchestration};
use crate::provider::{ProviderContext, ServiceEntry};

pub use crate::errors::DevwatchError;
pub use crate::types::{ExitStatus, LogSink, Narrator};

/// High-level entry point used by `main.rs`.
///
/// Loads the config (an absent file means "no services"), builds the
/// provider context and dispatches the subcommand. Ctrl-C asks the running
/// service to stop.
pub async fn run(args: CliArgs) -> Result<ExitStatus> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_config(&config_path)?;
    let log = logging::console_narrator();

    let source = Arc::new(HttpSource::new()?);
    let mut ctx = ProviderContext::from_config(&cfg, source);
    ctx.log = log.clone();

    let registry = default_registry();
    let entries = ServiceEntry::from_config(&cfg);
    info!(
        config = %config_path.display(),
        services = entries.len(),
        "configuration loaded"
    );

    match args.command {
        Command::Plan => {
            print!("{}", orchestrator::plan(&registry, &entries)?);
            Ok(ExitStatus::Success)
        }
        Command::Install => {
            let options = binaries_options(&cfg);
            let binaries = BinaryRegistry::from_options(&options)?;
            let plan = BinariesProvider::plan(&ctx, &options);
            Ok(install_binaries(&binaries, &plan, &log).await)
        }
        Command::Dev => {
            let service = DevService::new(Orchestration::new(registry, entries, ctx));
            run_interruptible(&service, &log).await
        }
        Command::Build => {
            let service = BuildService::new(Orchestration::new(registry, entries, ctx));
            run_interruptible(&service, &log).await
        }
        Command::Watch => {
            let service = DevWatchService::new(Orchestration::new(registry, entries, ctx))
                .with_shutdown_grace(cfg.shutdown_grace());
            run_interruptible(&service, &log).await
        }
    }
}

fn load_config(path: &Path) -> Result<ConfigFile> {
    if path.exists() {
        Ok(load_and_validate(path)?)
    } else {
        warn!(config = %path.display(), "config file not found; running with no services");
        Ok(ConfigFile::empty(config_root_dir(path)))
    }
}

/// Directory a missing config would have lived in.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Options of the first enabled `binaries` service, if any.
fn binaries_options(cfg: &ConfigFile) -> ProviderOptions {
    cfg.enabled_services()
        .find(|(_, svc)| svc.provider == "binaries")
        .map(|(_, svc)| svc.options.clone())
        .unwrap_or_default()
}

/// Run `service` until it returns or Ctrl-C is pressed.
async fn run_interruptible<S: Service>(service: &S, log: &Narrator) -> Result<ExitStatus> {
    if let Some(sink) = log.sink() {
        service.set_logger(sink);
    }

    let session = Lifecycle::new("session");
    let shutdown: ShutdownSignal = session.begin()?;
    let ctrl_c = {
        let session = session.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    debug!("Ctrl-C received");
                    session.stop();
                }
                Err(e) => eprintln!("failed to listen for Ctrl+C: {e}"),
            }
        })
    };

    let status = run_until_shutdown(service, shutdown).await;
    ctrl_c.abort();
    session.finish();
    Ok(status)
}
