// src/builtin/mod.rs

//! Providers registered by default.

pub mod binaries;
pub mod command;
pub mod tailwind;

use std::sync::Arc;

use crate::provider::{Provider, ProviderRegistry};
use crate::watch::HotReloadProvider;

pub use binaries::BinariesProvider;
pub use command::CommandProvider;
pub use tailwind::TailwindProvider;

pub fn default_providers() -> Vec<Arc<dyn Provider>> {
    vec![
        Arc::new(BinariesProvider),
        Arc::new(TailwindProvider),
        Arc::new(HotReloadProvider::new()),
        Arc::new(CommandProvider),
    ]
}

pub fn default_registry() -> ProviderRegistry {
    ProviderRegistry::new(default_providers())
}
