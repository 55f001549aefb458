//! Graph health summary for the `doctor` command

use crate::graph::{DependencyGraph, MissingDep, UnparseableReq};

/// Counts describing how well the environment's metadata parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStats<'a> {
    pub distributions: usize,
    pub nodes: usize,
    pub edges: usize,
    pub missing_requirements: usize,
    pub unparseable_requirements: usize,
    pub missing: &'a [MissingDep],
    pub unparseable: &'a [UnparseableReq],
}

impl GraphStats<'_> {
    pub fn has_problems(&self) -> bool {
        self.missing_requirements > 0 || self.unparseable_requirements > 0
    }
}

/// Summarize a built graph. Purely derived from `graph`.
pub fn summarize(graph: &DependencyGraph) -> GraphStats<'_> {
    GraphStats {
        distributions: graph.nodes.len(),
        nodes: graph.nodes.len(),
        edges: graph.edge_count(),
        missing_requirements: graph.missing_deps_detailed.len(),
        unparseable_requirements: graph.unparseable_reqs_detailed.len(),
        missing: &graph.missing_deps_detailed,
        unparseable: &graph.unparseable_reqs_detailed,
    }
}
