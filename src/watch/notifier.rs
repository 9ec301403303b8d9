// src/watch/notifier.rs

//! Reload-notification hooks fired after a debounced burst.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::errors::Result;

/// Files that changed in one debounce window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadBatch {
    /// Paths relative to the project root, forward slashes, sorted.
    pub files: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ReloadBatch {
    pub fn new(mut files: Vec<String>) -> Self {
        files.sort();
        files.dedup();
        Self {
            files,
            timestamp: Utc::now(),
        }
    }
}

pub type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Consumer of reload batches (browser push, signal file, ...).
pub trait ReloadHook: Send + Sync {
    fn name(&self) -> &str;

    fn notify<'a>(&'a self, batch: &'a ReloadBatch) -> HookFuture<'a>;
}

/// In-process fan-out; subscribers get every batch sent after they subscribed.
#[derive(Debug, Clone)]
pub struct BroadcastHook {
    tx: broadcast::Sender<ReloadBatch>,
}

impl BroadcastHook {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadBatch> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastHook {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ReloadHook for BroadcastHook {
    fn name(&self) -> &str {
        "broadcast"
    }

    fn notify<'a>(&'a self, batch: &'a ReloadBatch) -> HookFuture<'a> {
        Box::pin(async move {
            // No subscribers is fine.
            let receivers = self.tx.send(batch.clone()).unwrap_or(0);
            debug!(receivers, "reload batch broadcast");
            Ok(())
        })
    }
}

#[derive(Serialize)]
struct SignalFileBody<'a> {
    version: u64,
    files: &'a [String],
    timestamp: i64,
}

/// Writes `{ "version": n, "files": [...], "timestamp": t }` for an external
/// push server to poll. `version` increases by one per batch.
#[derive(Debug)]
pub struct SignalFileHook {
    path: PathBuf,
    version: AtomicU64,
}

impl SignalFileHook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            version: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ReloadHook for SignalFileHook {
    fn name(&self) -> &str {
        "signal_file"
    }

    fn notify<'a>(&'a self, batch: &'a ReloadBatch) -> HookFuture<'a> {
        Box::pin(async move {
            let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
            let body = SignalFileBody {
                version,
                files: &batch.files,
                timestamp: batch.timestamp.timestamp_millis(),
            };
            let json = serde_json::to_vec_pretty(&body)?;

            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            // Write-then-rename so readers never see a partial file.
            let tmp = self.path.with_extension("json.tmp");
            tokio::fs::write(&tmp, json).await?;
            tokio::fs::rename(&tmp, &self.path).await?;
            debug!(path = ?self.path, version, "signal file written");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_file_version_increments() {
        let dir = tempfile::tempdir().unwrap();
        let hook = SignalFileHook::new(dir.path().join("var/reload.json"));

        hook.notify(&ReloadBatch::new(vec!["b.js".into(), "a.css".into()]))
            .await
            .unwrap();
        hook.notify(&ReloadBatch::new(vec!["a.css".into()])).await.unwrap();

        let body: serde_json::Value =
            serde_json::from_slice(&std::fs::read(hook.path()).unwrap()).unwrap();
        assert_eq!(body["version"], 2);
        assert_eq!(body["files"], serde_json::json!(["a.css"]));
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let hook = BroadcastHook::default();
        let mut rx = hook.subscribe();
        hook.notify(&ReloadBatch::new(vec!["x".into(), "x".into()]))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().files, vec!["x".to_string()]);
    }
}
