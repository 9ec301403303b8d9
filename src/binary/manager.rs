// src/binary/manager.rs

//! Ensures one asset bundle is present and current in a target directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::binary::extract::{
    extract_tar_gz, is_gzip, make_executable, replace_from_staging, write_file,
};
use crate::binary::manifest::{VersionManifest, current_install};
use crate::binary::platform::Platform;
use crate::binary::source::{AssetSource, Release, RemoteSource};
use crate::errors::{DevwatchError, Result};
use crate::types::Narrator;

/// One file (or archive) to fetch from a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    /// Release asset name; `{platform}` is substituted.
    pub pattern: String,
    /// Destination relative to the target dir. `.` for archives unpacked in
    /// place.
    pub target: String,
    pub executable: bool,
    /// Archive sub-directory to unpack (`package` for npm tarballs). `None`
    /// for raw single-file assets.
    pub extract_path: Option<String>,
}

impl AssetEntry {
    pub fn file(pattern: impl Into<String>, target: impl Into<String>, executable: bool) -> Self {
        Self {
            pattern: pattern.into(),
            target: target.into(),
            executable,
            extract_path: None,
        }
    }

    pub fn archive(pattern: impl Into<String>, target: impl Into<String>, extract_path: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            target: target.into(),
            executable: false,
            extract_path: Some(extract_path.into()),
        }
    }
}

/// Declarative description of what to acquire and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    /// Display name used in narration.
    pub name: String,
    pub source: AssetSource,
    pub assets: Vec<AssetEntry>,
    pub target_dir: PathBuf,
    /// Files (relative to the target dir) that must exist besides the
    /// manifest for a cache to count as complete. Single-file assets are
    /// always expected.
    pub expected_files: Vec<String>,
}

pub struct BinaryAssetManager {
    spec: AssetSpec,
    platform: Platform,
    remote: Arc<dyn RemoteSource>,
}

impl BinaryAssetManager {
    pub fn new(spec: AssetSpec, remote: Arc<dyn RemoteSource>) -> Result<Self> {
        Ok(Self::with_platform(spec, Platform::detect()?, remote))
    }

    pub fn with_platform(spec: AssetSpec, platform: Platform, remote: Arc<dyn RemoteSource>) -> Self {
        Self {
            spec,
            platform,
            remote,
        }
    }

    pub fn spec(&self) -> &AssetSpec {
        &self.spec
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn target_dir(&self) -> &Path {
        &self.spec.target_dir
    }

    fn expected_files(&self) -> Vec<String> {
        let mut expected = self.spec.expected_files.clone();
        for asset in &self.spec.assets {
            if asset.extract_path.is_none() && asset.target != "." {
                expected.push(asset.target.clone());
            }
        }
        expected
    }

    /// Installed version, if the cache is complete.
    pub fn cached_version(&self) -> Option<String> {
        current_install(&self.spec.target_dir, &self.expected_files()).map(|m| m.version)
    }

    /// Make sure the latest release is installed and return its version.
    ///
    /// Network failures fall back to a complete cache (with a warning)
    /// and are fatal only when nothing usable is installed.
    pub async fn ensure_latest(&self, log: &Narrator) -> Result<String> {
        let name = &self.spec.name;
        let cached = self.cached_version();

        log.say(format!("Resolving latest {name} version ({})", self.spec.source.describe()));
        let release = match self.remote.resolve(&self.spec.source).await {
            Ok(release) => release,
            Err(err) => return self.fall_back(cached, "resolve", err, log),
        };

        if cached.as_deref() == Some(release.version.as_str()) {
            info!(asset = %name, version = %release.version, "already current");
            log.say(format!("{name} already current ({})", release.version));
            return Ok(release.version);
        }

        let payloads = match self.download_all(&release, log).await {
            Ok(payloads) => payloads,
            Err(err) => return self.fall_back(cached, "download", err, log),
        };

        let staging = match self.stage(payloads, log) {
            Ok(staging) => staging,
            Err(err) => {
                self.discard_staging();
                return self.fall_back(cached, "extract", err, log);
            }
        };
        self.commit(&release, &staging)?;
        info!(asset = %name, version = %release.version, "installed");
        log.say(format!("{name} {} installed", release.version));
        Ok(release.version)
    }

    fn fall_back(
        &self,
        cached: Option<String>,
        step: &str,
        err: DevwatchError,
        log: &Narrator,
    ) -> Result<String> {
        match cached {
            Some(version) => {
                warn!(asset = %self.spec.name, step, error = %err, %version, "using cached version");
                log.warn(format!(
                    "could not {step} {} ({err}); using cached version {version}",
                    self.spec.name
                ));
                Ok(version)
            }
            None => Err(match err {
                DevwatchError::AcquisitionError(_) => err,
                other => DevwatchError::AcquisitionError(format!(
                    "failed to {step} {}: {other}",
                    self.spec.name
                )),
            }),
        }
    }

    async fn download_all(&self, release: &Release, log: &Narrator) -> Result<Vec<(AssetEntry, Vec<u8>)>> {
        let mut payloads = Vec::with_capacity(self.spec.assets.len());
        for entry in &self.spec.assets {
            let asset_name = self.platform.substitute(&entry.pattern);
            let asset = release.asset(&asset_name).ok_or_else(|| {
                DevwatchError::AcquisitionError(format!(
                    "asset '{asset_name}' not found in {} release {}",
                    self.spec.name, release.version
                ))
            })?;

            log.say(format!("Downloading {asset_name} ({})", release.version));
            let bytes = self.remote.download(&asset.url).await?;
            payloads.push((entry.clone(), bytes));
        }
        Ok(payloads)
    }

    /// Sibling of the target dir, so the final move stays on one filesystem.
    fn staging_dir(&self) -> PathBuf {
        let dir = &self.spec.target_dir;
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "asset".to_string());
        dir.with_file_name(format!(".{name}.staging"))
    }

    fn discard_staging(&self) {
        let staging = self.staging_dir();
        if staging.exists() {
            if let Err(err) = std::fs::remove_dir_all(&staging) {
                warn!(path = ?staging, error = %err, "failed to remove staging directory");
            }
        }
    }

    /// Unpack every payload into a fresh staging dir. The installed copy is
    /// untouched until all payloads check out.
    fn stage(&self, payloads: Vec<(AssetEntry, Vec<u8>)>, log: &Narrator) -> Result<PathBuf> {
        let staging = self.staging_dir();
        self.discard_staging();
        std::fs::create_dir_all(&staging)?;

        for (entry, bytes) in payloads {
            let target = if entry.target == "." {
                staging.clone()
            } else {
                staging.join(&entry.target)
            };

            match &entry.extract_path {
                Some(sub) if is_gzip(&bytes) => {
                    log.say(format!("Extracting {} for {}", entry.pattern, self.spec.name));
                    let files = extract_tar_gz(&bytes, &target, Some(sub.as_str()))?;
                    if files == 0 {
                        return Err(DevwatchError::AcquisitionError(format!(
                            "archive for {} contained nothing under '{sub}'",
                            self.spec.name
                        )));
                    }
                    if entry.executable {
                        make_executable(&target)?;
                    }
                }
                Some(_) => {
                    return Err(DevwatchError::AcquisitionError(format!(
                        "asset {} for {} is not a gzip archive",
                        entry.pattern, self.spec.name
                    )));
                }
                None => write_file(&bytes, &target, entry.executable)?,
            }
        }
        Ok(staging)
    }

    fn commit(&self, release: &Release, staging: &Path) -> Result<()> {
        let dir = &self.spec.target_dir;
        std::fs::create_dir_all(dir)?;
        // A crash mid-swap must not leave a manifest behind.
        VersionManifest::remove(dir)?;
        replace_from_staging(staging, dir)?;
        VersionManifest::new(&release.version).write(dir)
    }
}

impl std::fmt::Debug for BinaryAssetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryAssetManager")
            .field("spec", &self.spec)
            .field("platform", &self.platform)
            .finish()
    }
}
