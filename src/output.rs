//! Output formatting for JSON and text modes
//!
//! Provides types for structured output that can be serialized to JSON
//! for machine-readable output, or displayed as text for human consumption.
//!
//! In JSON mode stdout carries only the payload; warnings and errors always
//! go to stderr.

use crate::doctor::GraphStats;
use crate::explain::PathSearch;
use crate::graph::{DependencyGraph, DistNode};
use crate::interpreter::InterpreterInfo;
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write as _;

/// Version of every JSON payload's layout
pub const SCHEMA_VERSION: u32 = 1;

/// Styling options for human-readable output
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    pub use_colors: bool,
    pub include_versions: bool,
}

impl OutputConfig {
    fn bold(&self, text: &str) -> String {
        if self.use_colors {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Interpreter the graph was built from
#[derive(Debug, Serialize)]
pub struct EnvironmentInfo {
    pub python: String,
    pub python_version: String,
}

impl EnvironmentInfo {
    pub fn from_interpreter(info: &InterpreterInfo) -> Self {
        Self {
            python: info.executable.display().to_string(),
            python_version: info.python_version.clone(),
        }
    }
}

/// A package in JSON output; `version` is omitted with `--no-versions`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PackageRef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PackageRef {
    pub fn new(node: &DistNode, include_version: bool) -> Self {
        Self {
            name: node.name.clone(),
            version: include_version.then(|| node.version.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PathOutput {
    pub nodes: Vec<PackageRef>,
}

/// Result of `why`
#[derive(Debug, Serialize)]
pub struct WhyOutput {
    pub schema_version: u32,
    pub environment: EnvironmentInfo,
    pub target: PackageRef,
    pub warnings: Vec<String>,
    pub paths: Vec<PathOutput>,
}

impl WhyOutput {
    pub fn new(
        environment: EnvironmentInfo,
        graph: &DependencyGraph,
        target: &DistNode,
        search: &PathSearch,
        include_versions: bool,
    ) -> Self {
        let paths = search
            .paths
            .iter()
            .map(|path| PathOutput {
                nodes: path
                    .iter()
                    .filter_map(|name| graph.nodes.get(name))
                    .map(|node| PackageRef::new(node, include_versions))
                    .collect(),
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION,
            environment,
            target: PackageRef::new(target, true),
            warnings: search.warnings.clone(),
            paths,
        }
    }
}

/// Result of `why --roots-only`
#[derive(Debug, Serialize)]
pub struct WhyRootsOutput {
    pub schema_version: u32,
    pub target: PackageRef,
    pub roots: Vec<String>,
}

/// Result of `roots`
#[derive(Debug, Serialize)]
pub struct RootsOutput {
    pub schema_version: u32,
    pub roots: Vec<PackageRef>,
}

impl RootsOutput {
    pub fn new(roots: &[&DistNode], include_versions: bool) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            roots: roots
                .iter()
                .map(|node| PackageRef::new(node, include_versions))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EdgeOutput {
    pub from: String,
    pub to: String,
}

/// Result of `graph --format json`
#[derive(Debug, Serialize)]
pub struct GraphOutput {
    pub schema_version: u32,
    pub environment: EnvironmentInfo,
    pub nodes: Vec<PackageRef>,
    pub edges: Vec<EdgeOutput>,
    pub warnings: Vec<String>,
}

impl GraphOutput {
    pub fn new(environment: EnvironmentInfo, graph: &DependencyGraph) -> Self {
        let warnings = graph
            .missing_deps
            .iter()
            .chain(graph.unparseable_reqs.iter())
            .cloned()
            .collect();

        Self {
            schema_version: SCHEMA_VERSION,
            environment,
            nodes: graph
                .nodes
                .values()
                .map(|node| PackageRef::new(node, true))
                .collect(),
            edges: graph
                .edges()
                .map(|(from, to)| EdgeOutput {
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
            warnings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsOutput {
    pub distributions: usize,
    pub nodes: usize,
    pub edges: usize,
    pub missing_requirements: usize,
    pub unparseable_requirements: usize,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProblemOutput {
    pub from: String,
    pub requirement: String,
}

#[derive(Debug, Serialize)]
pub struct ProblemsOutput {
    pub missing_requirements: Vec<ProblemOutput>,
    pub unparseable_requirements: Vec<ProblemOutput>,
}

/// Result of `doctor`
#[derive(Debug, Serialize)]
pub struct DoctorOutput {
    pub schema_version: u32,
    pub environment: EnvironmentInfo,
    pub stats: StatsOutput,
    pub problems: ProblemsOutput,
}

impl DoctorOutput {
    pub fn new(environment: EnvironmentInfo, stats: &GraphStats<'_>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            environment,
            stats: StatsOutput {
                distributions: stats.distributions,
                nodes: stats.nodes,
                edges: stats.edges,
                missing_requirements: stats.missing_requirements,
                unparseable_requirements: stats.unparseable_requirements,
            },
            problems: ProblemsOutput {
                missing_requirements: stats
                    .missing
                    .iter()
                    .map(|m| ProblemOutput {
                        from: m.from_package.clone(),
                        requirement: m.requirement.clone(),
                    })
                    .collect(),
                unparseable_requirements: stats
                    .unparseable
                    .iter()
                    .map(|u| ProblemOutput {
                        from: u.from_package.clone(),
                        requirement: u.requirement.clone(),
                    })
                    .collect(),
            },
        }
    }
}

/// Print JSON output to stdout
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Colors stay on unless `--no-color`, config `color: false` or `NO_COLOR` turns them off
pub fn colors_enabled(no_color_flag: bool, config_color: bool, no_color_env: bool) -> bool {
    !no_color_flag && config_color && !no_color_env
}

/// Print a warning to stderr
pub fn warning(message: &str, use_colors: bool) {
    let line = format!("Warning: {}", message);
    if use_colors {
        eprintln!("{}", line.yellow());
    } else {
        eprintln!("{}", line);
    }
}

/// Print an error to stderr
pub fn error(message: &str, use_colors: bool) {
    let line = format!("Error: {}", message);
    if use_colors {
        eprintln!("{}", line.red());
    } else {
        eprintln!("{}", line);
    }
}

fn node_label(node: &DistNode, include_version: bool) -> String {
    if include_version {
        format!("{} ({})", node.name, node.version)
    } else {
        node.name.clone()
    }
}

/// Human-readable `why` output
pub fn render_paths(
    graph: &DependencyGraph,
    package: &str,
    search: &PathSearch,
    config: &OutputConfig,
) -> String {
    let mut out = String::new();

    if search.paths.is_empty() {
        let _ = writeln!(out, "No dependency paths found to '{}'.", package);
        return out;
    }

    let _ = writeln!(
        out,
        "Found {} path(s) to '{}':\n",
        search.paths.len(),
        package
    );

    for (i, path) in search.paths.iter().enumerate() {
        let _ = writeln!(out, "{}", config.bold(&format!("Path {}:", i + 1)));
        for (depth, name) in path.iter().enumerate() {
            if let Some(node) = graph.nodes.get(name) {
                let _ = writeln!(
                    out,
                    "{}{}",
                    "  ".repeat(depth),
                    node_label(node, config.include_versions)
                );
            }
        }
        out.push('\n');
    }

    out
}

/// Human-readable `roots` output
pub fn render_roots(roots: &[&DistNode], config: &OutputConfig) -> String {
    if roots.is_empty() {
        return "No root packages found.\n".to_string();
    }
    roots
        .iter()
        .map(|node| format!("{}\n", node_label(node, config.include_versions)))
        .collect()
}

/// Graphviz DOT rendering of the whole graph
pub fn render_dot(graph: &DependencyGraph) -> String {
    let mut out = String::new();
    out.push_str("digraph \"dependency-graph\" {\n");
    out.push_str("  rankdir=LR;\n");
    out.push_str("  node [shape=box, style=filled, fillcolor=\"#ffffff\"];\n");

    for node in graph.nodes.values() {
        let name = escape_dot(&node.name);
        let _ = writeln!(
            out,
            "  \"{}\" [label=\"{}\\n{}\"];",
            name,
            name,
            escape_dot(&node.version)
        );
    }
    for (from, to) in graph.edges() {
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\";",
            escape_dot(from),
            escape_dot(to)
        );
    }

    out.push_str("}\n");
    out
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// One `from -> to` line per edge
pub fn render_edges(graph: &DependencyGraph) -> String {
    graph
        .edges()
        .map(|(from, to)| format!("{} -> {}\n", from, to))
        .collect()
}

/// Human-readable `doctor` output
pub fn render_doctor(stats: &GraphStats<'_>, config: &OutputConfig) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", config.bold("Environment Diagnostics"));
    let _ = writeln!(out, "{}\n", "=".repeat("Environment Diagnostics".len()));

    let _ = writeln!(out, "{}", config.bold("Statistics:"));
    let _ = writeln!(out, "  Distributions: {}", stats.distributions);
    let _ = writeln!(out, "  Nodes: {}", stats.nodes);
    let _ = writeln!(out, "  Dependency edges: {}", stats.edges);
    let _ = writeln!(out, "  Missing requirements: {}", stats.missing_requirements);
    let _ = writeln!(
        out,
        "  Unparseable requirements: {}",
        stats.unparseable_requirements
    );

    if !stats.has_problems() {
        let _ = writeln!(out, "\nNo problems detected.");
        return out;
    }

    if !stats.missing.is_empty() {
        let _ = writeln!(out, "\n{}", config.bold("Missing Requirements:"));
        for missing in stats.missing {
            let _ = writeln!(
                out,
                "  {} requires {}",
                missing.from_package, missing.requirement
            );
        }
    }

    if !stats.unparseable.is_empty() {
        let _ = writeln!(out, "\n{}", config.bold("Unparseable Requirements:"));
        for bad in stats.unparseable {
            let _ = writeln!(out, "  {}: {}", bad.from_package, bad.requirement);
        }
    }

    out
}
