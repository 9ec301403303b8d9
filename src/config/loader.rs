// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file and return the raw document plus its typed view.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<(RawConfigFile, toml::Table)> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

pub fn parse_str(contents: &str) -> Result<(RawConfigFile, toml::Table)> {
    let document: toml::Table = toml::from_str(contents)?;
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok((config, document))
}

/// Load a configuration file from path and run basic validation.
///
/// Relative project paths resolve against the config file's directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let (raw, document) = load_from_path(path)?;
    ConfigFile::from_parts(raw, document, base_dir_of(path))
}

/// Parse and validate TOML text, resolving relative paths against `base_dir`.
pub fn from_str(contents: &str, base_dir: impl Into<PathBuf>) -> Result<ConfigFile> {
    let (raw, document) = parse_str(contents)?;
    ConfigFile::from_parts(raw, document, base_dir.into())
}

fn base_dir_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
