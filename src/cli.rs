use clap::{Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Explain why a Python package is installed
#[derive(Parser, Debug)]
#[command(name = "py-dep-why")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Python interpreter whose environment to inspect
    #[arg(long, global = true, value_name = "PATH")]
    pub python: Option<PathBuf>,

    /// Virtual environment to inspect
    #[arg(long, global = true, value_name = "DIR")]
    pub venv: Option<PathBuf>,

    /// Emit JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log diagnostics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show dependency paths from root packages to PACKAGE
    Why {
        /// Installed package to explain
        package: String,

        /// Maximum number of paths to show
        #[arg(long, value_name = "N")]
        max_paths: Option<usize>,

        /// Maximum path length, in packages
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,

        /// Show all paths (overrides --max-paths)
        #[arg(long)]
        all_paths: bool,

        /// Hide package versions
        #[arg(long)]
        no_versions: bool,

        /// Only list the root packages that lead to PACKAGE
        #[arg(long)]
        roots_only: bool,
    },
    /// List packages nothing else depends on
    Roots {
        /// Include pip, setuptools and wheel
        #[arg(long)]
        include_build_tools: bool,

        /// Hide package versions
        #[arg(long)]
        no_versions: bool,
    },
    /// Export the whole dependency graph
    Graph {
        /// Output format: json, dot or edges
        #[arg(long, default_value = "json")]
        format: GraphFormat,
    },
    /// Report missing and unparseable requirements
    Doctor,
}

/// Export formats for the `graph` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Json,
    Dot,
    Edges,
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphFormat::Json => write!(f, "json"),
            GraphFormat::Dot => write!(f, "dot"),
            GraphFormat::Edges => write!(f, "edges"),
        }
    }
}

impl FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(GraphFormat::Json),
            "dot" | "graphviz" => Ok(GraphFormat::Dot),
            "edges" => Ok(GraphFormat::Edges),
            _ => Err(format!(
                "Unknown format '{}'. Supported: json, dot, edges",
                s
            )),
        }
    }
}

/// Options shared by every command, resolved once from flags and config
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub python: PathBuf,
    pub json: bool,
    pub use_colors: bool,
    pub verbose: bool,
    pub max_paths: usize,
    pub max_depth: usize,
}
