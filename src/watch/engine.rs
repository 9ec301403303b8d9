// src/watch/engine.rs

//! Pure decision core of the hot-reload watcher.
//!
//! The engine is fed change paths with explicit instants and answers which
//! reload batches and transformations are due. The IO shell in
//! `hot_reload.rs` owns the notify watcher, the clock and the side effects.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::watch::debounce::{Debouncer, KeyedDebouncer};
use crate::watch::hash::ContentHashCache;
use crate::watch::notifier::ReloadBatch;
use crate::watch::path_filter::PathFilter;
use crate::watch::path_utils::relative_str;
use crate::watch::transform::FileTransformationRule;

/// A transformation that became due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformJob {
    pub rule_index: usize,
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAction {
    Reload(ReloadBatch),
    Transform(TransformJob),
}

pub struct ReloadEngine {
    root: PathBuf,
    extensions: HashSet<String>,
    filter: PathFilter,
    rules: Vec<FileTransformationRule>,
    base: Debouncer,
    pending: BTreeSet<String>,
    transforms: KeyedDebouncer<(usize, PathBuf)>,
    hashes: Option<ContentHashCache>,
}

impl ReloadEngine {
    /// `extensions` are compared case-insensitively, without the dot.
    pub fn new(
        root: impl Into<PathBuf>,
        extensions: &[String],
        filter: PathFilter,
        rules: Vec<FileTransformationRule>,
        debounce: Duration,
    ) -> Self {
        Self {
            root: root.into(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            filter,
            rules,
            base: Debouncer::new(debounce),
            pending: BTreeSet::new(),
            transforms: KeyedDebouncer::new(),
            hashes: None,
        }
    }

    /// Skip changes whose content hash did not move.
    pub fn with_content_hash(mut self, enabled: bool) -> Self {
        self.hashes = enabled.then(ContentHashCache::new);
        self
    }

    pub fn rules(&self) -> &[FileTransformationRule] {
        &self.rules
    }

    fn rel(&self, path: &Path) -> String {
        relative_str(&self.root, path)
            .unwrap_or_else(|| path.to_string_lossy().replace('\\', "/"))
    }

    /// Whether `path` passes the filter and extension allow-list (or is the
    /// input of some transformation rule).
    pub fn is_relevant(&self, path: &Path) -> bool {
        let rel = self.rel(path);
        if self.filter.should_ignore_path(&rel) {
            return false;
        }
        let ext_ok = Path::new(&rel)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&e.to_lowercase()));
        ext_ok || self.rules.iter().any(|r| r.matches(&rel))
    }

    /// Register one change. Returns false if it was discarded.
    pub fn on_change(&mut self, path: &Path, now: Instant) -> bool {
        if !self.is_relevant(path) {
            trace!("ignoring change {:?}", path);
            return false;
        }
        if let Some(hashes) = self.hashes.as_mut() {
            if !hashes.observe(path) {
                return false;
            }
        }

        let rel = self.rel(path);
        let mut reload = true;
        let mut matched_any = false;
        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.matches(&rel) {
                matched_any = true;
                reload &= !rule.exclude_from_reload();
                self.transforms
                    .touch((idx, path.to_path_buf()), now, rule.debounce_delay());
            }
        }
        if !matched_any {
            reload = true;
        }

        if reload {
            self.pending.insert(rel);
            self.base.touch(now);
        }
        true
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.base.deadline(), self.transforms.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn has_pending(&self) -> bool {
        self.next_deadline().is_some()
    }

    /// Everything due at `now`: transformations first (sorted), then the
    /// reload batch so consumers see derived outputs.
    pub fn due(&mut self, now: Instant) -> Vec<EngineAction> {
        let mut jobs: Vec<TransformJob> = self
            .transforms
            .take_due(now)
            .into_iter()
            .map(|(rule_index, input)| TransformJob {
                output: self.rules[rule_index].output_for(&input),
                rule_index,
                input,
            })
            .collect();
        jobs.sort_by(|a, b| (a.rule_index, &a.input).cmp(&(b.rule_index, &b.input)));

        let mut actions: Vec<EngineAction> = jobs.into_iter().map(EngineAction::Transform).collect();
        if self.base.fire_if_due(now) {
            let files = std::mem::take(&mut self.pending).into_iter().collect();
            actions.push(EngineAction::Reload(ReloadBatch::new(files)));
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(rules: Vec<FileTransformationRule>) -> ReloadEngine {
        ReloadEngine::new(
            "/proj",
            &["php".to_string(), "css".to_string(), "JS".to_string()],
            PathFilter::create_default(),
            rules,
            Duration::from_millis(100),
        )
    }

    fn reloads(actions: &[EngineAction]) -> Vec<&ReloadBatch> {
        actions
            .iter()
            .filter_map(|a| match a {
                EngineAction::Reload(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn burst_produces_single_reload_after_window() {
        let mut e = engine(vec![]);
        let t0 = Instant::now();

        for i in 0..25u64 {
            let now = t0 + Duration::from_millis(i * 10);
            assert!(e.on_change(Path::new(&format!("/proj/src/f{}.php", i % 3)), now));
            assert!(e.due(now).is_empty());
        }

        let quiet = t0 + Duration::from_millis(240 + 100);
        let actions = e.due(quiet);
        let batches = reloads(&actions);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].files, vec!["src/f0.php", "src/f1.php", "src/f2.php"]);
        assert!(e.due(quiet + Duration::from_secs(1)).is_empty());
        assert!(!e.has_pending());
    }

    #[test]
    fn irrelevant_changes_have_no_effect() {
        let mut e = engine(vec![]);
        let now = Instant::now();

        assert!(!e.on_change(Path::new("/proj/README.md"), now));
        assert!(!e.on_change(Path::new("/proj/node_modules/x/a.js"), now));
        assert!(!e.on_change(Path::new("/proj/src/photo.png"), now));
        assert!(e.on_change(Path::new("/proj/src/App.JS"), now));
        assert!(e.next_deadline().is_some());
    }

    #[test]
    fn transformation_has_independent_deadline_and_still_reloads() {
        let rule = FileTransformationRule::new("*.tailwind.css", "{path}/{name}.css")
            .unwrap()
            .with_debounce(Duration::from_millis(300));
        let mut e = engine(vec![rule]);
        let t0 = Instant::now();

        e.on_change(Path::new("/proj/assets/app.tailwind.css"), t0);

        let at_base = e.due(t0 + Duration::from_millis(100));
        assert_eq!(reloads(&at_base).len(), 1);
        assert!(e.has_pending());

        let at_rule = e.due(t0 + Duration::from_millis(300));
        assert_eq!(
            at_rule,
            vec![EngineAction::Transform(TransformJob {
                rule_index: 0,
                input: PathBuf::from("/proj/assets/app.tailwind.css"),
                output: PathBuf::from("/proj/assets/app.css"),
            })]
        );
    }

    #[test]
    fn excluded_rule_skips_generic_reload() {
        let rule = FileTransformationRule::new("*.ts", "{path}/{name}.js")
            .unwrap()
            .excluded_from_reload(true)
            .with_debounce(Duration::from_millis(50));
        let mut e = engine(vec![rule]);
        let t0 = Instant::now();

        assert!(e.on_change(Path::new("/proj/src/main.ts"), t0));
        let actions = e.due(t0 + Duration::from_secs(1));
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], EngineAction::Transform(_)));
    }
}
