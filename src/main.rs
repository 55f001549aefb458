use clap::Parser;
use py_dep_why::cli::{Cli, Command, GlobalOptions, GraphFormat};
use py_dep_why::config::Config;
use py_dep_why::doctor::summarize;
use py_dep_why::error::CliError;
use py_dep_why::explain::{SearchOptions, find_diverse_roots, find_paths};
use py_dep_why::graph::{DependencyGraph, build_graph, compute_roots, get_node};
use py_dep_why::interpreter::{InterpreterInfo, TargetEnvError, probe, resolve_target_python};
use py_dep_why::metadata::scan_paths;
use py_dep_why::output::{
    self, DoctorOutput, EnvironmentInfo, GraphOutput, OutputConfig, PackageRef, RootsOutput,
    SCHEMA_VERSION, WhyOutput, WhyRootsOutput,
};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are reported through the error path too
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_logging(cli.verbose);

    let no_color_env = std::env::var_os("NO_COLOR").is_some();
    let mut use_colors = output::colors_enabled(cli.no_color, true, no_color_env);

    let result = match load_config(&cli) {
        Ok(config) => {
            use_colors = output::colors_enabled(cli.no_color, config.color_enabled(), no_color_env);
            if !use_colors {
                colored::control::set_override(false);
            }
            run(cli, config, use_colors)
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        output::error(&e.to_string(), use_colors);
        std::process::exit(e.exit_code());
    }
}

/// Reject conflicting interpreter flags before touching the config file
fn load_config(cli: &Cli) -> Result<Config, CliError> {
    if cli.python.is_some() && cli.venv.is_some() {
        return Err(TargetEnvError::InvalidUsage.into());
    }
    Ok(Config::load()?)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "py_dep_why=debug"
    } else {
        "py_dep_why=warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Everything a command needs: resolved options plus the built graph
struct Session {
    opts: GlobalOptions,
    info: InterpreterInfo,
    graph: DependencyGraph,
}

impl Session {
    fn environment(&self) -> EnvironmentInfo {
        EnvironmentInfo::from_interpreter(&self.info)
    }

    fn output_config(&self, no_versions: bool) -> OutputConfig {
        OutputConfig {
            use_colors: self.opts.use_colors,
            include_versions: !no_versions,
        }
    }
}

fn run(cli: Cli, config: Config, use_colors: bool) -> Result<(), CliError> {
    let python = resolve_target_python(
        cli.python.as_deref(),
        cli.venv.as_deref(),
        config.python.as_deref(),
    )?;

    let opts = GlobalOptions {
        python,
        json: cli.json,
        use_colors,
        verbose: cli.verbose,
        max_paths: config.max_paths(),
        max_depth: config.max_depth(),
    };

    if opts.verbose {
        eprintln!("Target Python: {}", opts.python.display());
    }

    let info = probe(&opts.python)?;
    let search_paths = info.search_paths();
    tracing::debug!(
        "Python {} with {} search path(s)",
        info.python_version,
        search_paths.len()
    );

    let dists = scan_paths(&search_paths);
    let graph = build_graph(&dists, &info.markers);
    tracing::debug!(
        "Built graph: {} nodes, {} edges from {} distributions",
        graph.nodes.len(),
        graph.edge_count(),
        dists.len()
    );

    let session = Session { opts, info, graph };

    match cli.command {
        Command::Why {
            package,
            max_paths,
            max_depth,
            all_paths,
            no_versions,
            roots_only,
        } => {
            let options = SearchOptions {
                max_paths: max_paths.unwrap_or(session.opts.max_paths),
                max_depth: max_depth.unwrap_or(session.opts.max_depth),
                all_paths,
            };
            if roots_only {
                run_why_roots(&session, &package, options.max_depth)
            } else {
                run_why(&session, &package, options, no_versions)
            }
        }
        Command::Roots {
            include_build_tools,
            no_versions,
        } => run_roots(&session, include_build_tools, no_versions),
        Command::Graph { format } => run_graph(&session, format),
        Command::Doctor => run_doctor(&session),
    }
}

fn write_stdout(text: &str) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn run_why(
    session: &Session,
    package: &str,
    options: SearchOptions,
    no_versions: bool,
) -> Result<(), CliError> {
    let target = get_node(&session.graph, package)
        .ok_or_else(|| CliError::NotInstalled(package.to_string()))?;

    let search = find_paths(&session.graph, package, options);
    tracing::debug!("Found {} path(s) to {}", search.paths.len(), target.name);

    if session.opts.json {
        let result = WhyOutput::new(
            session.environment(),
            &session.graph,
            target,
            &search,
            !no_versions,
        );
        output::print_json(&result);
        return Ok(());
    }

    for warning in &search.warnings {
        output::warning(warning, session.opts.use_colors);
    }

    let config = session.output_config(no_versions);
    write_stdout(&output::render_paths(
        &session.graph,
        package,
        &search,
        &config,
    ))
}

fn run_why_roots(session: &Session, package: &str, max_depth: usize) -> Result<(), CliError> {
    let target = get_node(&session.graph, package)
        .ok_or_else(|| CliError::NotInstalled(package.to_string()))?;

    let roots = find_diverse_roots(&session.graph, package, max_depth);

    if session.opts.json {
        let result = WhyRootsOutput {
            schema_version: SCHEMA_VERSION,
            target: PackageRef::new(target, true),
            roots: roots.into_iter().collect(),
        };
        output::print_json(&result);
        return Ok(());
    }

    if roots.is_empty() {
        return write_stdout(&format!("No root packages lead to '{}'.\n", package));
    }

    let text: String = roots.iter().map(|root| format!("{}\n", root)).collect();
    write_stdout(&text)
}

fn run_roots(
    session: &Session,
    include_build_tools: bool,
    no_versions: bool,
) -> Result<(), CliError> {
    let roots = compute_roots(&session.graph, include_build_tools);

    if session.opts.json {
        output::print_json(&RootsOutput::new(&roots, !no_versions));
        return Ok(());
    }

    let config = session.output_config(no_versions);
    write_stdout(&output::render_roots(&roots, &config))
}

fn run_graph(session: &Session, format: GraphFormat) -> Result<(), CliError> {
    // --json always wins over --format
    let format = if session.opts.json {
        GraphFormat::Json
    } else {
        format
    };

    match format {
        GraphFormat::Json => {
            output::print_json(&GraphOutput::new(session.environment(), &session.graph));
            Ok(())
        }
        GraphFormat::Dot => write_stdout(&output::render_dot(&session.graph)),
        GraphFormat::Edges => write_stdout(&output::render_edges(&session.graph)),
    }
}

fn run_doctor(session: &Session) -> Result<(), CliError> {
    let stats = summarize(&session.graph);

    if session.opts.json {
        output::print_json(&DoctorOutput::new(session.environment(), &stats));
        return Ok(());
    }

    let config = session.output_config(false);
    write_stdout(&output::render_doctor(&stats, &config))
}
