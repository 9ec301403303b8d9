// src/binary/extract.rs

//! Unpacking downloaded assets into a target directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::{DevwatchError, Result};

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0x1f, 0x8b])
}

/// Extract a `.tar.gz` into `target_dir`.
///
/// With `strip` set (e.g. `package` for npm tarballs) only entries under that
/// leading directory are extracted, with the prefix removed. Entries that
/// would escape `target_dir` are skipped. Returns the number of files written.
pub fn extract_tar_gz(bytes: &[u8], target_dir: &Path, strip: Option<&str>) -> Result<usize> {
    fs::create_dir_all(target_dir)?;
    let mut archive = Archive::new(GzDecoder::new(bytes));
    let strip = strip.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty() && *s != ".");

    let mut written = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let raw = entry.path()?.into_owned();

        let Some(rel) = relative_entry_path(&raw, strip) else {
            continue;
        };
        let target_path = target_dir.join(&rel);

        let kind = entry.header().entry_type();
        if kind.is_dir() {
            fs::create_dir_all(&target_path)?;
        } else if kind.is_file() {
            if let Some(parent) = target_path.parent() {
                fs::create_dir_all(parent)?;
            }
            entry.unpack(&target_path)?;
            written += 1;
        } else {
            debug!(entry = ?raw, "skipping non-regular archive entry");
        }
    }

    Ok(written)
}

fn relative_entry_path(raw: &Path, strip: Option<&str>) -> Option<PathBuf> {
    let mut parts: Vec<&str> = Vec::new();
    for component in raw.components() {
        match component {
            Component::Normal(s) => parts.push(s.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if let Some(prefix) = strip {
        let prefix_parts: Vec<&str> = prefix.split('/').collect();
        if !parts.starts_with(&prefix_parts) {
            return None;
        }
        parts.drain(..prefix_parts.len());
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.iter().collect())
}

/// Write a single-file asset, optionally marking it executable.
pub fn write_file(bytes: &[u8], target: &Path, executable: bool) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, bytes)?;
    if executable {
        make_executable(target)?;
    }
    Ok(())
}

#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Recursively copy `source` into `target`, creating directories as needed.
/// Returns the number of files copied.
pub fn copy_dir_recursive(source: &Path, target: &Path) -> Result<usize> {
    if !source.is_dir() {
        return Err(DevwatchError::AcquisitionError(format!(
            "source directory not found: {}",
            source.display()
        )));
    }
    fs::create_dir_all(target)?;

    let mut copied = 0;
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|e| DevwatchError::IoError(e.into()))?;
        let Ok(rel) = entry.path().strip_prefix(source) else {
            continue;
        };
        let to = target.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&to)?;
        } else {
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &to)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Move every top-level entry of `staging` into `target`, replacing entries
/// of the same name, then remove `staging`.
pub fn replace_from_staging(staging: &Path, target: &Path) -> Result<()> {
    fs::create_dir_all(target)?;
    for entry in fs::read_dir(staging)? {
        let entry = entry?;
        let to = target.join(entry.file_name());
        if to.is_dir() {
            fs::remove_dir_all(&to)?;
        } else if to.exists() {
            fs::remove_file(&to)?;
        }
        fs::rename(entry.path(), &to)?;
    }
    fs::remove_dir_all(staging)?;
    Ok(())
}
