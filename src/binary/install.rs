// src/binary/install.rs

//! The install routine behind `devwatch install` and the `binaries` provider.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::binary::platform::Platform;
use crate::binary::registry::BinaryRegistry;
use crate::binary::source::RemoteSource;
use crate::types::{ExitStatus, Narrator};

/// Inputs of one install run.
#[derive(Clone)]
pub struct InstallPlan {
    /// Binary names from `services.binaries.options.required`.
    pub required: Vec<String>,
    pub var_dir: PathBuf,
    pub public_vendor_dir: PathBuf,
    pub remote: Arc<dyn RemoteSource>,
}

/// Install every required binary, then every configured npm package and
/// publish those to the public vendor directory.
///
/// `Success` only if everything requested was installed.
pub async fn install_binaries(registry: &BinaryRegistry, plan: &InstallPlan, log: &Narrator) -> ExitStatus {
    let npm = registry.generic_npm().filter(|p| p.package_count() > 0);

    if plan.required.is_empty() && npm.is_none() {
        warn!("no binaries required");
        log.warn("No binaries required in configuration.");
        return ExitStatus::Success;
    }

    let mut total = 0usize;
    let mut succeeded = 0usize;

    for binary in &plan.required {
        // Packages of the npm provider are handled as a batch below.
        if registry
            .get(binary)
            .is_ok_and(|p| p.as_generic_npm().is_some())
        {
            continue;
        }
        total += 1;
        log.say(format!("Installing {binary}"));

        let provider = match registry.get(binary) {
            Ok(provider) => provider,
            Err(_) => {
                warn!(%binary, "binary not in registry");
                log.warn(format!("Binary {binary} not found in registry, skipping..."));
                continue;
            }
        };

        let manager = match provider.create_manager(&plan.var_dir, Some(binary), Arc::clone(&plan.remote)) {
            Ok(Some(manager)) => manager,
            Ok(None) => {
                log.warn(format!("Binary {binary} has nothing configured to install"));
                continue;
            }
            Err(err) => {
                error!(%binary, error = %err, "cannot create asset manager");
                log.error(format!("Failed to install {binary}: {err}"));
                continue;
            }
        };

        match manager.ensure_latest(log).await {
            Ok(version) => {
                info!(%binary, %version, "binary installed");
                log.say(format!("✓ {binary} installed ({version})"));
                succeeded += 1;
            }
            Err(err) => {
                error!(%binary, error = %err, "binary install failed");
                log.error(format!("Failed to install {binary}: {err}"));
            }
        }
    }

    if let Some(npm) = npm {
        log.say("Installing npm packages");
        total += npm.package_count();

        let installed = match Platform::detect() {
            Ok(platform) => {
                npm.ensure_all(&plan.var_dir, platform, Arc::clone(&plan.remote), log)
                    .await
            }
            Err(err) => Err(err),
        };

        match installed {
            Ok(versions) => {
                for (name, version) in npm.packages().iter().zip(&versions) {
                    log.say(format!("✓ {name} installed ({version})"));
                }
                succeeded += versions.len();

                log.say(format!("Syncing packages to {}", plan.public_vendor_dir.display()));
                for name in npm.sync_to_public_vendor(&plan.var_dir, &plan.public_vendor_dir, log) {
                    log.say(format!("✓ {name} synced"));
                }
            }
            Err(err) => {
                error!(error = %err, "npm package install failed");
                log.error(format!("Failed to install npm packages: {err}"));
            }
        }
    }

    if succeeded == total {
        log.say(format!("All {total} binaries installed successfully!"));
        ExitStatus::Success
    } else {
        log.warn(format!("{succeeded}/{total} binaries installed successfully."));
        ExitStatus::Failure
    }
}
