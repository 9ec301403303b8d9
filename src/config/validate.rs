// src/config/validate.rs

use std::path::PathBuf;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::config::options::secs_to_duration;
use crate::errors::{DevwatchError, Result};

impl ConfigFile {
    pub(crate) fn from_parts(
        raw: RawConfigFile,
        document: toml::Table,
        base_dir: PathBuf,
    ) -> Result<Self> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw, document, base_dir))
    }
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DevwatchError;

    /// Validate without a backing document; dotted lookups see nothing and
    /// the project root defaults to the current directory.
    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ConfigFile::from_parts(raw, toml::Table::new(), PathBuf::from("."))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_project(cfg)?;
    validate_services(cfg)?;
    Ok(())
}

fn validate_project(cfg: &RawConfigFile) -> Result<()> {
    let grace = cfg.project.shutdown_grace;
    if secs_to_duration(grace).is_none() {
        return Err(DevwatchError::ConfigError(format!(
            "[project].shutdown_grace must be a non-negative number of seconds (got {grace})"
        )));
    }

    if cfg.project.var_dir.trim().is_empty() {
        return Err(DevwatchError::ConfigError(
            "[project].var_dir must not be empty".to_string(),
        ));
    }

    Ok(())
}

// Provider names are resolved later by the ProviderRegistry; here we only
// reject entries that cannot name anything.
fn validate_services(cfg: &RawConfigFile) -> Result<()> {
    for (id, svc) in cfg.services.iter() {
        if svc.provider.trim().is_empty() {
            return Err(DevwatchError::ConfigError(format!(
                "service '{id}' has an empty `provider`"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::loader::from_str;

    #[test]
    fn rejects_empty_provider() {
        let err = from_str("[services.a]\nprovider = \" \"\n", ".").unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn rejects_negative_grace_and_empty_var_dir() {
        assert!(from_str("[project]\nshutdown_grace = -1.0\n", ".").is_err());
        assert!(from_str("[project]\nvar_dir = \"\"\n", ".").is_err());
    }

    #[test]
    fn rejects_grace_beyond_duration_range() {
        let err = from_str("[project]\nshutdown_grace = 1e30\n", ".").unwrap_err();
        assert!(err.is_configuration_error());
        assert!(from_str("[project]\nshutdown_grace = 0.25\n", ".").is_ok());
    }
}
