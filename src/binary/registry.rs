// src/binary/registry.rs

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::binary::generic_npm::GenericNpmBinaryProvider;
use crate::binary::manager::BinaryAssetManager;
use crate::binary::package::PackageSpec;
use crate::binary::source::RemoteSource;
use crate::binary::tailwind::TailwindBinary;
use crate::config::ProviderOptions;
use crate::errors::{DevwatchError, Result};

/// Maps a logical binary name to a configured asset manager.
pub trait BinaryProvider: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when the provider has nothing configured to manage.
    fn create_manager(
        &self,
        var_dir: &Path,
        requested_name: Option<&str>,
        remote: Arc<dyn RemoteSource>,
    ) -> Result<Option<BinaryAssetManager>>;

    fn as_generic_npm(&self) -> Option<&GenericNpmBinaryProvider> {
        None
    }
}

#[derive(Clone, Default)]
pub struct BinaryRegistry {
    providers: BTreeMap<String, Arc<dyn BinaryProvider>>,
}

impl BinaryRegistry {
    pub fn new(providers: Vec<Arc<dyn BinaryProvider>>) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|p| (p.name().to_string(), p))
                .collect(),
        }
    }

    /// Built-in providers, with the npm package list taken from
    /// `generic_npm_packages` (comma-separated string or array).
    pub fn from_options(options: &ProviderOptions) -> Result<Self> {
        let packages = options
            .str_list("generic_npm_packages")
            .iter()
            .map(|s| PackageSpec::parse(s))
            .collect();
        Ok(Self::new(vec![
            Arc::new(TailwindBinary),
            Arc::new(GenericNpmBinaryProvider::new(packages)?),
        ]))
    }

    pub fn has(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn BinaryProvider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| DevwatchError::ConfigError(format!("unknown binary '{name}'")))
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn generic_npm(&self) -> Option<&GenericNpmBinaryProvider> {
        self.providers.values().find_map(|p| p.as_generic_npm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_options() {
        let options = ProviderOptions::default()
            .with("generic_npm_packages", "@valksor/valksor@next, htmx.org");
        let registry = BinaryRegistry::from_options(&options).unwrap();

        assert!(registry.has("tailwindcss"));
        assert!(registry.get("esbuild").is_err());
        let npm = registry.generic_npm().unwrap();
        assert_eq!(npm.packages(), vec!["@valksor/valksor", "htmx.org"]);
    }
}
