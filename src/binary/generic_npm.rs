// src/binary/generic_npm.rs

//! Multi-package npm provider (`generic_npm_packages` option).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::binary::extract::copy_dir_recursive;
use crate::binary::manager::{AssetEntry, AssetSpec, BinaryAssetManager};
use crate::binary::manifest::current_install;
use crate::binary::package::{PackageSpec, package_dir};
use crate::binary::platform::Platform;
use crate::binary::registry::BinaryProvider;
use crate::binary::source::{AssetSource, RemoteSource};
use crate::errors::{DevwatchError, Result};
use crate::types::Narrator;

/// Files that must exist next to the manifest for a package cache to count.
const PACKAGE_EXPECTED_FILES: &[&str] = &["package.json"];

#[derive(Debug, Clone)]
pub struct GenericNpmBinaryProvider {
    packages: Vec<PackageSpec>,
}

impl GenericNpmBinaryProvider {
    /// Packages whose flattened directory names collide are rejected.
    pub fn new(packages: Vec<PackageSpec>) -> Result<Self> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for spec in &packages {
            let dir = spec.dir_name();
            if let Some(other) = seen.get(&dir) {
                if *other != spec.package {
                    return Err(DevwatchError::ConfigError(format!(
                        "npm packages '{}' and '{}' both map to cache directory '{}'",
                        other, spec.package, dir
                    )));
                }
            }
            seen.insert(dir, &spec.package);
        }
        Ok(Self { packages })
    }

    /// From a comma-separated list such as
    /// `"@valksor/valksor@next, htmx.org"`.
    pub fn from_list(list: &str) -> Result<Self> {
        Self::new(PackageSpec::parse_list(list))
    }

    pub fn packages(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.package.as_str()).collect()
    }

    pub fn specs(&self) -> &[PackageSpec] {
        &self.packages
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn has_package(&self, name: &str) -> bool {
        self.packages.iter().any(|p| p.package == name)
    }

    /// Cache directory of `package` under `var_dir`.
    pub fn package_target_dir(var_dir: &Path, package: &str) -> PathBuf {
        var_dir.join(package_dir(package))
    }

    pub fn spec_for(var_dir: &Path, package: &PackageSpec) -> AssetSpec {
        AssetSpec {
            name: package.package.clone(),
            source: AssetSource::Npm {
                package: package.package.clone(),
                dist_tag: package.tag.clone(),
            },
            assets: vec![AssetEntry::archive("package", ".", "package")],
            target_dir: Self::package_target_dir(var_dir, &package.package),
            expected_files: PACKAGE_EXPECTED_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Pick the package for `requested`: a configured package of that name
    /// (a `pkg@tag` request overrides the tag), else the first one.
    fn select(&self, requested: Option<&str>) -> Option<PackageSpec> {
        let first = self.packages.first()?.clone();
        let Some(requested) = requested else {
            return Some(first);
        };
        let wanted = PackageSpec::parse(requested);
        match self.packages.iter().find(|p| p.package == wanted.package) {
            Some(found) if PackageSpec::has_explicit_tag(requested) => {
                Some(PackageSpec::new(found.package.clone(), wanted.tag))
            }
            Some(found) => Some(found.clone()),
            None => Some(first),
        }
    }

    pub fn manager_for(
        &self,
        var_dir: &Path,
        requested_name: Option<&str>,
        platform: Platform,
        remote: Arc<dyn RemoteSource>,
    ) -> Option<BinaryAssetManager> {
        let package = self.select(requested_name)?;
        Some(BinaryAssetManager::with_platform(
            Self::spec_for(var_dir, &package),
            platform,
            remote,
        ))
    }

    /// Acquire every configured package; one version per package, in order.
    ///
    /// A package with a complete cache is reported as current without any
    /// network access.
    pub async fn ensure_all(
        &self,
        var_dir: &Path,
        platform: Platform,
        remote: Arc<dyn RemoteSource>,
        log: &Narrator,
    ) -> Result<Vec<String>> {
        let mut versions = Vec::with_capacity(self.packages.len());
        let expected: Vec<String> = PACKAGE_EXPECTED_FILES.iter().map(|s| s.to_string()).collect();

        for package in &self.packages {
            let target = Self::package_target_dir(var_dir, &package.package);
            if let Some(manifest) = current_install(&target, &expected) {
                info!(package = %package.package, version = %manifest.version, "package cache current");
                log.say(format!(
                    "{} assets already current ({})",
                    package.package, manifest.version
                ));
                versions.push(manifest.version);
                continue;
            }

            let manager = BinaryAssetManager::with_platform(
                Self::spec_for(var_dir, package),
                platform,
                Arc::clone(&remote),
            );
            versions.push(manager.ensure_latest(log).await?);
        }
        Ok(versions)
    }

    /// Copy each package from `var_dir` into `public_dir`.
    ///
    /// Missing sources are warned about and skipped. Returns the names of the
    /// packages that were copied.
    pub fn sync_to_public_vendor(&self, var_dir: &Path, public_dir: &Path, log: &Narrator) -> Vec<String> {
        let mut synced = Vec::new();
        for package in &self.packages {
            let dir = package.dir_name();
            let source = var_dir.join(&dir);
            let target = public_dir.join(&dir);

            if !source.is_dir() {
                warn!(package = %package.package, source = ?source, "package source missing");
                log.warn(format!(
                    "Source directory not found for {}: {}",
                    package.package,
                    source.display()
                ));
                continue;
            }

            match copy_dir_recursive(&source, &target) {
                Ok(files) => {
                    info!(package = %package.package, files, "synced to public vendor");
                    log.say(format!("Synced {} to {}", package.package, public_dir.display()));
                    synced.push(package.package.clone());
                }
                Err(err) => {
                    warn!(package = %package.package, error = %err, "sync failed");
                    log.warn(format!("Failed to sync {}: {err}", package.package));
                }
            }
        }
        synced
    }
}

impl BinaryProvider for GenericNpmBinaryProvider {
    fn name(&self) -> &str {
        "generic_npm"
    }

    fn create_manager(
        &self,
        var_dir: &Path,
        requested_name: Option<&str>,
        remote: Arc<dyn RemoteSource>,
    ) -> Result<Option<BinaryAssetManager>> {
        Ok(self.manager_for(var_dir, requested_name, Platform::detect()?, remote))
    }

    fn as_generic_npm(&self) -> Option<&GenericNpmBinaryProvider> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colliding_directories_are_rejected() {
        let err = GenericNpmBinaryProvider::from_list("@a/b, a-b").unwrap_err();
        assert!(err.is_configuration_error());

        assert!(GenericNpmBinaryProvider::from_list("@a/b@next, @a/b").is_ok());
    }
}
