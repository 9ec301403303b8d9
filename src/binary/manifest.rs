// src/binary/manifest.rs

//! `version.json` records for acquired assets.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::errors::Result;

pub const MANIFEST_FILE: &str = "version.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionManifest {
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl VersionManifest {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    /// Read the manifest in `dir`.
    ///
    /// Returns `None` for a missing or unparsable file or an empty version.
    /// Older manifests with a numeric timestamp are accepted.
    pub fn read(dir: &Path) -> Option<Self> {
        let bytes = fs::read(Self::path_in(dir)).ok()?;
        let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;

        let version = value.get("version")?.as_str()?.trim().to_string();
        if version.is_empty() {
            return None;
        }
        let timestamp = match value.get("timestamp") {
            Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .ok(),
            Some(serde_json::Value::Number(n)) => {
                n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0))
            }
            _ => None,
        }
        .unwrap_or(DateTime::UNIX_EPOCH);

        Some(Self { version, timestamp })
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(Self::path_in(dir), json)?;
        debug!(dir = ?dir, version = %self.version, "manifest written");
        Ok(())
    }

    pub fn remove(dir: &Path) -> Result<()> {
        match fs::remove_file(Self::path_in(dir)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The cached manifest if `dir` holds a complete install: a valid manifest
/// *and* every file in `expected` (relative to `dir`).
pub fn current_install(dir: &Path, expected: &[String]) -> Option<VersionManifest> {
    if !dir.is_dir() {
        return None;
    }
    let manifest = VersionManifest::read(dir)?;
    if expected.iter().all(|f| dir.join(f).exists()) {
        Some(manifest)
    } else {
        debug!(dir = ?dir, "manifest present but assets incomplete");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_alone_is_not_enough() {
        let dir = tempfile::tempdir().unwrap();
        let expected = vec!["package.json".to_string()];

        VersionManifest::new("1.2.3").write(dir.path()).unwrap();
        assert!(current_install(dir.path(), &expected).is_none());

        fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert_eq!(current_install(dir.path(), &expected).unwrap().version, "1.2.3");
    }

    #[test]
    fn rejects_empty_or_broken_manifests() {
        let dir = tempfile::tempdir().unwrap();

        fs::write(dir.path().join(MANIFEST_FILE), r#"{"version": ""}"#).unwrap();
        assert!(VersionManifest::read(dir.path()).is_none());

        fs::write(dir.path().join(MANIFEST_FILE), "{not json").unwrap();
        assert!(VersionManifest::read(dir.path()).is_none());

        fs::write(dir.path().join(MANIFEST_FILE), r#"{"version": "v4", "timestamp": 1700000000}"#)
            .unwrap();
        assert_eq!(VersionManifest::read(dir.path()).unwrap().version, "v4");
    }
}
