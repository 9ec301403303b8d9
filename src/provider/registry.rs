// src/provider/registry.rs

//! Name -> provider lookup and dependency-aware start ordering.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::{ConfigFile, ProviderOptions, ServiceFlags};
use crate::errors::{DevwatchError, Result};
use crate::provider::Provider;

/// A requested service, as read from configuration.
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    pub id: String,
    pub provider: String,
    pub flags: ServiceFlags,
    pub options: ProviderOptions,
}

impl ServiceEntry {
    pub fn new(id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            flags: ServiceFlags::default(),
            options: ProviderOptions::default(),
        }
    }

    pub fn with_flags(mut self, flags: ServiceFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_options(mut self, options: ProviderOptions) -> Self {
        self.options = options;
        self
    }

    /// Entries for every enabled service in `config`.
    pub fn from_config(config: &ConfigFile) -> Vec<ServiceEntry> {
        config
            .enabled_services()
            .map(|(id, svc)| ServiceEntry {
                id: id.clone(),
                provider: svc.provider.clone(),
                flags: svc.flags,
                options: svc.options.clone(),
            })
            .collect()
    }
}

/// A service entry bound to its provider, in start order.
#[derive(Clone)]
pub struct ResolvedService {
    pub id: String,
    pub provider: Arc<dyn Provider>,
    pub flags: ServiceFlags,
    pub options: ProviderOptions,
    /// Pulled in as a dependency without being configured.
    pub implicit: bool,
}

impl ResolvedService {
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}

impl std::fmt::Debug for ResolvedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedService")
            .field("id", &self.id)
            .field("provider", &self.provider.name())
            .field("flags", &self.flags)
            .field("implicit", &self.implicit)
            .finish()
    }
}

/// Providers registered at construction, keyed by name.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Later providers replace earlier ones with the same name.
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();
        Self { providers }
    }

    pub fn has(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| DevwatchError::ProviderNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Resolve `entries` into a start order.
    ///
    /// - every entry's provider must be registered (`ProviderNotFound`);
    /// - a dependency is satisfied by any requested entry using that
    ///   provider; failing that, a registered provider is pulled in as an
    ///   implicit init-only service; otherwise it is a `ConfigError`;
    /// - dependencies always start first, ties break on `service_order`
    ///   then service id;
    /// - cycles are reported as `DependencyCycle`.
    pub fn ordered_providers(&self, entries: &[ServiceEntry]) -> Result<Vec<ResolvedService>> {
        let mut services: Vec<ResolvedService> = Vec::with_capacity(entries.len());
        for entry in entries {
            services.push(ResolvedService {
                id: entry.id.clone(),
                provider: self.get(&entry.provider)?,
                flags: entry.flags,
                options: entry.options.clone(),
                implicit: false,
            });
        }

        // Dependency edges (dep index -> dependent index), pulling in
        // implicit services as we go. `services` may grow while iterating.
        let mut edges: Vec<(usize, usize)> = Vec::new();
        let mut i = 0;
        while i < services.len() {
            let dependent = services[i].id.clone();
            for dep in services[i].provider.dependencies() {
                let providers_of_dep: Vec<usize> = services
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.provider.name() == dep)
                    .map(|(idx, _)| idx)
                    .collect();

                if !providers_of_dep.is_empty() {
                    edges.extend(providers_of_dep.into_iter().map(|d| (d, i)));
                    continue;
                }

                if !self.has(&dep) {
                    return Err(DevwatchError::ConfigError(format!(
                        "service '{}' (provider '{}') depends on unknown provider '{}'",
                        dependent,
                        services[i].provider.name(),
                        dep
                    )));
                }

                if services.iter().any(|s| s.id == dep) {
                    return Err(DevwatchError::ConfigError(format!(
                        "service id '{dep}' shadows the provider '{dep}' required by service '{dependent}'"
                    )));
                }

                debug!(service = %dependent, dependency = %dep, "adding implicit dependency service");
                services.push(ResolvedService {
                    id: dep.clone(),
                    provider: self.get(&dep)?,
                    flags: ServiceFlags {
                        dev: Some(false),
                        init: true,
                    },
                    options: ProviderOptions::default(),
                    implicit: true,
                });
                edges.push((services.len() - 1, i));
            }
            i += 1;
        }

        let order = order_indices(&services, &edges)?;
        let mut slots: Vec<Option<ResolvedService>> = services.into_iter().map(Some).collect();
        Ok(order.into_iter().filter_map(|idx| slots[idx].take()).collect())
    }
}

/// Kahn's algorithm over the index graph with a `(order, id)` min-heap.
fn order_indices(services: &[ResolvedService], edges: &[(usize, usize)]) -> Result<Vec<usize>> {
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for idx in 0..services.len() {
        graph.add_node(idx);
    }
    for &(from, to) in edges {
        if from == to {
            return Err(DevwatchError::DependencyCycle(format!(
                "service '{}' depends on its own provider",
                services[from].id
            )));
        }
        graph.add_edge(from, to, ());
    }

    let mut in_degree: HashMap<usize, usize> = graph
        .nodes()
        .map(|n| (n, graph.neighbors_directed(n, Direction::Incoming).count()))
        .collect();

    let key = |idx: usize| Reverse((services[idx].provider.service_order(), services[idx].id.clone(), idx));

    let mut ready: BinaryHeap<_> = in_degree
        .iter()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(&n, _)| key(n))
        .collect();

    let mut order = Vec::with_capacity(services.len());
    while let Some(Reverse((_, _, idx))) = ready.pop() {
        order.push(idx);
        for next in graph.neighbors_directed(idx, Direction::Outgoing) {
            if let Some(deg) = in_degree.get_mut(&next) {
                *deg -= 1;
                if *deg == 0 {
                    ready.push(key(next));
                }
            }
        }
    }

    if order.len() < services.len() {
        let culprit = match toposort(&graph, None) {
            Err(cycle) => services[cycle.node_id()].id.clone(),
            Ok(_) => "<unknown>".to_string(),
        };
        return Err(DevwatchError::DependencyCycle(format!(
            "cycle detected in service dependencies involving service '{culprit}'"
        )));
    }

    Ok(order)
}
