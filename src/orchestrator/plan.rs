// src/orchestrator/plan.rs

//! Dry-run rendering of the resolved start order.

use std::fmt::Write as _;

use crate::errors::Result;
use crate::provider::{ProviderRegistry, ResolvedService, ServiceEntry};

/// Resolve `entries` and render the order without running anything.
pub fn plan(registry: &ProviderRegistry, entries: &[ServiceEntry]) -> Result<String> {
    let ordered = registry.ordered_providers(entries)?;
    Ok(render_plan(&ordered))
}

pub fn render_plan(ordered: &[ResolvedService]) -> String {
    if ordered.is_empty() {
        return "No services configured.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Start order:");
    for (idx, svc) in ordered.iter().enumerate() {
        let mode = if svc.flags.is_long_running() { "watch" } else { "init" };
        let _ = write!(
            out,
            "  {}. {} (provider: {}, order: {}, mode: {mode}",
            idx + 1,
            svc.id,
            svc.provider_name(),
            svc.provider.service_order(),
        );
        let deps = svc.provider.dependencies();
        if !deps.is_empty() {
            let _ = write!(out, ", after: {}", deps.join(", "));
        }
        if svc.implicit {
            out.push_str(", implicit");
        }
        out.push_str(")\n");
    }
    out
}
