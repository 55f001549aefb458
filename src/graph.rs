//! Installed-package dependency graph
//!
//! Nodes are installed distributions keyed by normalized name. An edge
//! `a -> b` exists when `a` declares a requirement on `b`, `b` is installed,
//! and the requirement's marker (if any) holds for the target interpreter.
//! Requirements that can't be parsed or that point at packages which aren't
//! installed are kept as diagnostics instead of edges.

use crate::metadata::Distribution;
use crate::normalize::normalize_name;
use crate::pep508::{MarkerEvaluator, Requirement};
use std::collections::{BTreeMap, BTreeSet};

/// Build tools filtered from `roots` unless explicitly requested
pub const BUILD_TOOLS: [&str; 3] = ["pip", "setuptools", "wheel"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistNode {
    /// Normalized name
    pub name: String,
    pub version: String,
    /// Normalized names of installed packages this one requires
    pub dependencies: BTreeSet<String>,
}

impl DistNode {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: normalize_name(name),
            version: version.to_string(),
            dependencies: BTreeSet::new(),
        }
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.dependencies
            .extend(deps.into_iter().map(|d| normalize_name(d.as_ref())));
        self
    }
}

/// A requirement naming a package that isn't installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDep {
    pub from_package: String,
    pub requirement: String,
}

/// A requirement string that isn't valid PEP 508
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparseableReq {
    pub from_package: String,
    pub requirement: String,
}

/// In-memory dependency graph for one environment
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub nodes: BTreeMap<String, DistNode>,
    /// Normalized names referenced but not installed
    pub missing_deps: BTreeSet<String>,
    /// Every unresolved requirement occurrence, in discovery order
    pub missing_deps_detailed: Vec<MissingDep>,
    /// Raw requirement strings that failed to parse
    pub unparseable_reqs: Vec<String>,
    pub unparseable_reqs_detailed: Vec<UnparseableReq>,
}

impl DependencyGraph {
    /// Insert a node, replacing any existing node with the same name
    pub fn insert(&mut self, node: DistNode) {
        self.nodes.insert(node.name.clone(), node);
    }

    /// Look up a node by any spelling of its name
    pub fn get(&self, package: &str) -> Option<&DistNode> {
        self.nodes.get(&normalize_name(package))
    }

    /// All edges as `(from, to)` pairs, ordered by source then target
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.values().flat_map(|node| {
            node.dependencies
                .iter()
                .map(move |dep| (node.name.as_str(), dep.as_str()))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.dependencies.len()).sum()
    }
}

/// Build the dependency graph from installed distributions.
///
/// Two passes: every distribution becomes a node first, so requirements can
/// resolve against packages that appear later in `dists`. If a name occurs
/// twice the last distribution wins.
pub fn build_graph<E: MarkerEvaluator + ?Sized>(
    dists: &[Distribution],
    evaluator: &E,
) -> DependencyGraph {
    let mut graph = DependencyGraph::default();

    for dist in dists {
        graph.insert(DistNode::new(&dist.name, &dist.version));
    }

    for dist in dists {
        let source = normalize_name(&dist.name);
        let mut edges = BTreeSet::new();

        for raw in &dist.requires {
            let req = match Requirement::parse(raw) {
                Ok(req) => req,
                Err(e) => {
                    tracing::debug!("Unparseable requirement in {}: {}", source, e);
                    graph.unparseable_reqs.push(raw.clone());
                    graph.unparseable_reqs_detailed.push(UnparseableReq {
                        from_package: source.clone(),
                        requirement: raw.clone(),
                    });
                    continue;
                }
            };

            if let Some(marker) = &req.marker
                && !evaluator.evaluate(marker)
            {
                continue;
            }

            // Extras are dropped: `requests[security]` is an edge to `requests`
            let target = normalize_name(&req.name);
            if !graph.nodes.contains_key(&target) {
                graph.missing_deps.insert(target);
                graph.missing_deps_detailed.push(MissingDep {
                    from_package: source.clone(),
                    requirement: raw.clone(),
                });
                continue;
            }

            edges.insert(target);
        }

        if let Some(node) = graph.nodes.get_mut(&source) {
            node.dependencies.extend(edges);
        }
    }

    tracing::debug!(
        "Built graph: {} nodes, {} edges, {} missing, {} unparseable",
        graph.nodes.len(),
        graph.edge_count(),
        graph.missing_deps.len(),
        graph.unparseable_reqs.len()
    );

    graph
}

/// Get a node by package name (normalizes the name)
pub fn get_node<'a>(graph: &'a DependencyGraph, package: &str) -> Option<&'a DistNode> {
    graph.get(package)
}

/// Packages nothing else depends on, sorted by name.
///
/// With `include_build_tools == false`, `pip`/`setuptools`/`wheel` are left
/// out, but only when they are roots themselves.
pub fn compute_roots(graph: &DependencyGraph, include_build_tools: bool) -> Vec<&DistNode> {
    let mut in_degree: BTreeMap<&str, usize> =
        graph.nodes.keys().map(|name| (name.as_str(), 0)).collect();

    for node in graph.nodes.values() {
        for dep in &node.dependencies {
            if let Some(degree) = in_degree.get_mut(dep.as_str()) {
                *degree += 1;
            }
        }
    }

    // BTreeMap iteration keeps the result sorted by name
    in_degree
        .into_iter()
        .filter(|(_, degree)| *degree == 0)
        .filter(|(name, _)| include_build_tools || !BUILD_TOOLS.contains(name))
        .filter_map(|(name, _)| graph.nodes.get(name))
        .collect()
}
