// src/binary/mod.rs

//! Acquisition of external executables and npm asset packages.
//!
//! - [`manager`]: `BinaryAssetManager`, one versioned target directory.
//! - [`tailwind`] / [`generic_npm`]: providers producing managers.
//! - [`registry`]: name -> provider lookup.
//! - [`install`]: the install routine.

pub mod extract;
pub mod generic_npm;
pub mod install;
pub mod manager;
pub mod manifest;
pub mod package;
pub mod platform;
pub mod registry;
pub mod source;
pub mod tailwind;

pub use generic_npm::GenericNpmBinaryProvider;
pub use install::{InstallPlan, install_binaries};
pub use manager::{AssetEntry, AssetSpec, BinaryAssetManager};
pub use manifest::VersionManifest;
pub use package::{PackageSpec, package_dir};
pub use platform::Platform;
pub use registry::{BinaryProvider, BinaryRegistry};
pub use source::{AssetSource, HttpSource, Release, ReleaseAsset, RemoteSource};
pub use tailwind::TailwindBinary;
