// src/binary/tailwind.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::binary::manager::{AssetEntry, AssetSpec, BinaryAssetManager};
use crate::binary::platform::Platform;
use crate::binary::registry::BinaryProvider;
use crate::binary::source::{AssetSource, RemoteSource};
use crate::errors::Result;

pub const TAILWIND_REPO: &str = "tailwindlabs/tailwindcss";
pub const TAILWIND_DIR: &str = "tailwindcss";

/// Standalone Tailwind CSS CLI from GitHub releases.
#[derive(Debug, Clone, Default)]
pub struct TailwindBinary;

impl TailwindBinary {
    pub fn spec(var_dir: &Path) -> AssetSpec {
        AssetSpec {
            name: "Tailwind CSS".to_string(),
            source: AssetSource::GitHub {
                repo: TAILWIND_REPO.to_string(),
            },
            assets: vec![AssetEntry::file("tailwindcss-{platform}", Self::executable_name(), true)],
            target_dir: var_dir.join(TAILWIND_DIR),
            expected_files: Vec::new(),
        }
    }

    /// Host executable name (`tailwindcss.exe` on Windows).
    pub fn executable_name() -> String {
        format!("tailwindcss{}", std::env::consts::EXE_SUFFIX)
    }

    /// Where the executable lands under `var_dir`.
    pub fn executable_path(var_dir: &Path) -> PathBuf {
        var_dir.join(TAILWIND_DIR).join(Self::executable_name())
    }

    pub fn manager_for(
        var_dir: &Path,
        platform: Platform,
        remote: Arc<dyn RemoteSource>,
    ) -> BinaryAssetManager {
        BinaryAssetManager::with_platform(Self::spec(var_dir), platform, remote)
    }
}

impl BinaryProvider for TailwindBinary {
    fn name(&self) -> &str {
        "tailwindcss"
    }

    fn create_manager(
        &self,
        var_dir: &Path,
        _requested_name: Option<&str>,
        remote: Arc<dyn RemoteSource>,
    ) -> Result<Option<BinaryAssetManager>> {
        BinaryAssetManager::new(Self::spec(var_dir), remote).map(Some)
    }
}
