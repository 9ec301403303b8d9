// src/watch/hash.rs

//! Content hashing used to drop "touched but unchanged" events.

use std::collections::HashMap;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last seen content hash per file.
#[derive(Debug, Default)]
pub struct ContentHashCache {
    hashes: HashMap<PathBuf, String>,
}

impl ContentHashCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current content of `path` and report whether it differs
    /// from what was seen last time.
    ///
    /// Unknown files count as changed. A file that vanished counts as changed
    /// once and is forgotten. Unreadable files are reported as changed.
    pub fn observe(&mut self, path: &Path) -> bool {
        match compute_file_hash(path) {
            Ok(hash) => {
                let changed = self.hashes.get(path) != Some(&hash);
                if !changed {
                    debug!("content unchanged for {:?}", path);
                }
                self.hashes.insert(path.to_path_buf(), hash);
                changed
            }
            Err(err) => {
                let missing = err
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|e| e.kind() == ErrorKind::NotFound);
                if missing {
                    self.hashes.remove(path);
                } else {
                    debug!(error = %err, "hashing failed for {:?}", path);
                }
                true
            }
        }
    }

    pub fn invalidate(&mut self, path: &Path) {
        if self.hashes.remove(path).is_some() {
            debug!("invalidated hash cache for {:?}", path);
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
