// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Deciding which paths matter (`path_filter`, extension allow-list).
//! - Coalescing bursts into reload batches and transformations (`engine`,
//!   `debounce`, `transform`).
//! - Wiring up a cross-platform filesystem watcher (`notify`) and the reload
//!   hooks (`hot_reload`, `notifier`).

pub mod debounce;
pub mod engine;
pub mod hash;
pub mod hot_reload;
pub mod notifier;
pub mod path_filter;
pub mod path_utils;
pub mod transform;

pub use engine::{EngineAction, ReloadEngine, TransformJob};
pub use hot_reload::{HotReloadProvider, HotReloadService, HotReloadSettings};
pub use notifier::{BroadcastHook, ReloadBatch, ReloadHook, SignalFileHook};
pub use path_filter::PathFilter;
pub use transform::FileTransformationRule;
