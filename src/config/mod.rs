// src/config/mod.rs

//! Configuration loading and validation for devwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`, `options.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod options;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigFile, ProjectSection, RawConfigFile, ServiceConfig, ServiceFlags};
pub use options::ProviderOptions;
