//! Dependency path search
//!
//! Answers "why is X installed" by listing paths from root packages down to
//! X. Each queued item carries its whole path so far: cycles are avoided per
//! path rather than with a global visited set, which keeps every result a
//! simple path while still letting one node appear on several routes.

use crate::graph::{DependencyGraph, compute_roots};
use crate::normalize::normalize_name;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

pub const DEFAULT_MAX_PATHS: usize = 5;
pub const DEFAULT_MAX_DEPTH: usize = 25;

pub const NO_ROOTS_WARNING: &str =
    "No root packages found (possibly cyclic dependencies). Searching from all packages.";

/// Limits for [`find_paths`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum paths to return (ignored when `all_paths` is set)
    pub max_paths: usize,
    /// Longest path to follow, counted in nodes
    pub max_depth: usize,
    pub all_paths: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_paths: DEFAULT_MAX_PATHS,
            max_depth: DEFAULT_MAX_DEPTH,
            all_paths: false,
        }
    }
}

/// Result of a path search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSearch {
    /// Paths from a root to the target, shortest first
    pub paths: Vec<Vec<String>>,
    pub warnings: Vec<String>,
}

/// Find dependency paths from root packages to `target`.
///
/// Breadth-first from every root (every node if the graph has no roots).
/// A path ends at the first occurrence of the target along it. Paths longer
/// than `max_depth` are abandoned. Results are stably sorted by length and,
/// unless `all_paths` is set, truncated to `max_paths`.
pub fn find_paths(graph: &DependencyGraph, target: &str, options: SearchOptions) -> PathSearch {
    let target_normalized = normalize_name(target);

    if !graph.nodes.contains_key(&target_normalized) {
        return PathSearch {
            paths: Vec::new(),
            warnings: vec![format!("Package '{}' not found in environment", target)],
        };
    }

    let mut warnings = Vec::new();

    // Build tools can legitimately be where a path starts
    let mut starts: Vec<&str> = compute_roots(graph, true)
        .into_iter()
        .map(|node| node.name.as_str())
        .collect();
    if starts.is_empty() {
        warnings.push(NO_ROOTS_WARNING.to_string());
        starts = graph.nodes.keys().map(String::as_str).collect();
    }

    let limit = if options.all_paths {
        None
    } else {
        Some(options.max_paths)
    };
    let reached_limit = |found: usize| limit.is_some_and(|max| found >= max);

    let mut paths: Vec<Vec<String>> = Vec::new();

    for start in starts {
        if reached_limit(paths.len()) {
            break;
        }

        let mut queue: VecDeque<Vec<&str>> = VecDeque::new();
        queue.push_back(vec![start]);

        while let Some(path) = queue.pop_front() {
            if reached_limit(paths.len()) {
                break;
            }

            if path.len() > options.max_depth {
                continue;
            }

            let Some(&current) = path.last() else {
                continue;
            };

            if current == target_normalized {
                paths.push(path.iter().map(|s| s.to_string()).collect());
                continue;
            }

            let Some(node) = graph.nodes.get(current) else {
                continue;
            };

            for dep in &node.dependencies {
                if !path.contains(&dep.as_str()) {
                    let mut next = path.clone();
                    next.push(dep.as_str());
                    queue.push_back(next);
                }
            }
        }
    }

    // Shorter paths are more direct explanations; ties keep discovery order
    paths.sort_by_key(|p| p.len());
    if let Some(max) = limit {
        paths.truncate(max);
    }

    tracing::debug!(
        "Found {} path(s) to {} ({} warning(s))",
        paths.len(),
        target_normalized,
        warnings.len()
    );

    PathSearch { paths, warnings }
}

/// Distinct root packages that lead to `target`, sorted.
///
/// Same start set as [`find_paths`] (every node when the graph has no roots),
/// but only asks which starts reach the target within `max_depth` nodes. A
/// single reverse BFS from the target gives each node's shortest distance;
/// shortest paths are always simple, so this matches enumerating all paths.
pub fn find_diverse_roots(
    graph: &DependencyGraph,
    target: &str,
    max_depth: usize,
) -> BTreeSet<String> {
    let target_normalized = normalize_name(target);
    let Some(target_node) = graph.nodes.get(&target_normalized) else {
        return BTreeSet::new();
    };
    if max_depth == 0 {
        return BTreeSet::new();
    }

    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for node in graph.nodes.values() {
        for dep in &node.dependencies {
            dependents
                .entry(dep.as_str())
                .or_default()
                .push(node.name.as_str());
        }
    }

    // Path length in nodes from each reached package down to the target
    let mut length: BTreeMap<&str, usize> = BTreeMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    length.insert(target_node.name.as_str(), 1);
    queue.push_back(target_node.name.as_str());

    while let Some(current) = queue.pop_front() {
        let next_length = length[current] + 1;
        if next_length > max_depth {
            continue;
        }
        for &parent in dependents.get(current).into_iter().flatten() {
            if !length.contains_key(parent) {
                length.insert(parent, next_length);
                queue.push_back(parent);
            }
        }
    }

    let roots = compute_roots(graph, true);
    let starts: Vec<&str> = if roots.is_empty() {
        graph.nodes.keys().map(String::as_str).collect()
    } else {
        roots.into_iter().map(|node| node.name.as_str()).collect()
    };

    starts
        .into_iter()
        .filter(|start| length.contains_key(start))
        .map(str::to_string)
        .collect()
}
