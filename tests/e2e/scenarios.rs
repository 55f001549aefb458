use super::harness::{
    TestContext, TestEnv, install_dist, parse_json, write_executable, write_fake_python,
    write_file,
};

pub struct Scenario {
    pub name: &'static str,
    pub run: fn(&TestContext) -> Result<(), String>,
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "help_output",
            run: scenario_help,
        },
        Scenario {
            name: "version_output",
            run: scenario_version,
        },
        Scenario {
            name: "no_args_error",
            run: scenario_no_args,
        },
        Scenario {
            name: "unknown_option",
            run: scenario_unknown_option,
        },
        Scenario {
            name: "unknown_graph_format",
            run: scenario_unknown_graph_format,
        },
        Scenario {
            name: "python_and_venv_conflict",
            run: scenario_python_and_venv,
        },
        Scenario {
            name: "missing_interpreter",
            run: scenario_missing_interpreter,
        },
        Scenario {
            name: "non_executable_interpreter",
            run: scenario_non_executable_interpreter,
        },
        Scenario {
            name: "failing_interpreter",
            run: scenario_failing_interpreter,
        },
        Scenario {
            name: "why_not_installed",
            run: scenario_why_not_installed,
        },
        Scenario {
            name: "why_human_output",
            run: scenario_why_human,
        },
        Scenario {
            name: "why_json_output",
            run: scenario_why_json,
        },
        Scenario {
            name: "why_no_versions",
            run: scenario_why_no_versions,
        },
        Scenario {
            name: "why_limits",
            run: scenario_why_limits,
        },
        Scenario {
            name: "why_roots_only",
            run: scenario_why_roots_only,
        },
        Scenario {
            name: "why_normalized_name",
            run: scenario_why_normalized_name,
        },
        Scenario {
            name: "why_root_package",
            run: scenario_why_root_package,
        },
        Scenario {
            name: "roots_human_output",
            run: scenario_roots_human,
        },
        Scenario {
            name: "roots_json_output",
            run: scenario_roots_json,
        },
        Scenario {
            name: "graph_json_output",
            run: scenario_graph_json,
        },
        Scenario {
            name: "graph_dot_output",
            run: scenario_graph_dot,
        },
        Scenario {
            name: "graph_edges_output",
            run: scenario_graph_edges,
        },
        Scenario {
            name: "doctor_human_output",
            run: scenario_doctor_human,
        },
        Scenario {
            name: "doctor_json_output",
            run: scenario_doctor_json,
        },
        Scenario {
            name: "doctor_clean_environment",
            run: scenario_doctor_clean,
        },
        Scenario {
            name: "venv_flag",
            run: scenario_venv,
        },
        Scenario {
            name: "config_file_defaults",
            run: scenario_config_defaults,
        },
        Scenario {
            name: "config_file_invalid",
            run: scenario_config_invalid,
        },
        Scenario {
            name: "config_disables_error_color",
            run: scenario_config_disables_error_color,
        },
        Scenario {
            name: "verbose_reports_interpreter",
            run: scenario_verbose,
        },
    ]
}

/// Populate the environment's site-packages:
///
/// ```text
/// myapp -> requests -> {urllib3, idna, certifi, charset-normalizer}
/// myapp -> click
/// tool -> urllib3, missing-pkg (absent), one unparseable requirement
/// legacy-pkg (egg-info) -> idna
/// pip (build tool root)
/// ```
fn installed_env(ctx: &TestContext, name: &str) -> Result<TestEnv, String> {
    let env = ctx.create_env(name)?;
    let sp = &env.site_packages;

    install_dist(
        sp,
        "myapp",
        "1.0.0",
        &[
            "requests>=2.0",
            "click",
            "pytest; extra == \"dev\"",
            "pywin32; sys_platform == \"win32\"",
        ],
    )?;
    install_dist(
        sp,
        "requests",
        "2.31.0",
        &[
            "urllib3<3,>=1.21.1",
            "idna>=2.5",
            "certifi>=2017.4.17",
            "charset-normalizer<4,>=2",
        ],
    )?;
    install_dist(sp, "urllib3", "2.2.1", &[])?;
    install_dist(sp, "idna", "3.6", &[])?;
    install_dist(sp, "Charset-Normalizer", "3.3.2", &[])?;
    install_dist(
        sp,
        "click",
        "8.1.7",
        &["colorama; platform_system == \"Windows\""],
    )?;
    install_dist(
        sp,
        "tool",
        "0.1.0",
        &[
            "urllib3",
            "missing-pkg>=1.0",
            "this is not a valid requirement string!!!",
        ],
    )?;
    install_dist(sp, "pip", "24.0", &[])?;

    write_file(
        &sp.join("certifi-2024.2.2-py3.11.egg-info").join("PKG-INFO"),
        "Metadata-Version: 1.1\nName: certifi\nVersion: 2024.2.2\n",
    )?;
    let legacy = sp.join("legacy_pkg-0.5-py3.11.egg-info");
    write_file(
        &legacy.join("PKG-INFO"),
        "Metadata-Version: 1.1\nName: legacy-pkg\nVersion: 0.5\n",
    )?;
    write_file(
        &legacy.join("requires.txt"),
        "idna\n\n[socks]\npysocks\n\n[:sys_platform == \"win32\"]\npywin32\n",
    )?;

    Ok(env)
}

fn scenario_help(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("help")?;
    let output = ctx.run_raw(&env, &["--help"])?;
    output.assert_success()?;
    output.assert_stdout_contains("why")?;
    output.assert_stdout_contains("doctor")?;
    Ok(())
}

fn scenario_version(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("version")?;
    let output = ctx.run_raw(&env, &["--version"])?;
    output.assert_success()?;
    output.assert_stdout_contains("py-dep-why")?;
    Ok(())
}

fn scenario_no_args(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("no-args")?;
    let output = ctx.run_raw(&env, &[])?;
    output.assert_status(1)?;
    Ok(())
}

fn scenario_unknown_option(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("unknown-option")?;
    let output = ctx.run_raw(&env, &["roots", "--bogus"])?;
    output.assert_status(1)?;
    output.assert_stderr_contains("--bogus")?;
    Ok(())
}

fn scenario_unknown_graph_format(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("unknown-format")?;
    let output = ctx.run(&env, &["graph", "--format", "yaml"])?;
    output.assert_status(1)?;
    output.assert_stderr_contains("Unknown format")?;
    Ok(())
}

fn scenario_python_and_venv(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("python-and-venv")?;
    let venv = env.root.to_string_lossy().to_string();
    let output = ctx.run(&env, &["--venv", &venv, "roots"])?;
    output.assert_status(2)?;
    output.assert_stderr_contains("Cannot specify both --python and --venv")?;
    Ok(())
}

fn scenario_missing_interpreter(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("missing-interpreter")?;
    let missing = env.root.join("no-such-python");
    let missing = missing.to_string_lossy().to_string();
    let output = ctx.run_raw(&env, &["--python", &missing, "roots"])?;
    output.assert_status(4)?;
    output.assert_stderr_contains("not found")?;
    Ok(())
}

fn scenario_non_executable_interpreter(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("non-executable")?;
    let plain = env.root.join("python-text");
    write_file(&plain, "not a program")?;
    let plain = plain.to_string_lossy().to_string();
    let output = ctx.run_raw(&env, &["--python", &plain, "roots"])?;
    output.assert_status(4)?;
    output.assert_stderr_contains("not executable")?;
    Ok(())
}

fn scenario_failing_interpreter(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("failing-interpreter")?;
    let broken = env.root.join("broken-python");
    write_executable(&broken, "#!/bin/sh\necho boom >&2\nexit 1\n")?;
    let broken = broken.to_string_lossy().to_string();
    let output = ctx.run_raw(&env, &["--python", &broken, "doctor"])?;
    output.assert_status(4)?;
    output.assert_stderr_contains("boom")?;
    Ok(())
}

fn scenario_why_not_installed(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "why-not-installed")?;
    let output = ctx.run(&env, &["why", "nonexistent-package"])?;
    output.assert_status(3)?;
    output.assert_stderr_contains(
        "Package 'nonexistent-package' is not installed in this environment.",
    )?;
    if !output.stdout.is_empty() {
        return Err(format!("Expected empty stdout, got: {}", output.stdout));
    }
    Ok(())
}

fn scenario_why_human(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "why-human")?;
    let output = ctx.run(&env, &["why", "urllib3"])?;
    output.assert_success()?;
    output.assert_stdout_contains("Found 2 path(s) to 'urllib3':")?;
    output.assert_stdout_contains("Path 1:\ntool (0.1.0)\n  urllib3 (2.2.1)\n")?;
    output.assert_stdout_contains(
        "Path 2:\nmyapp (1.0.0)\n  requests (2.31.0)\n    urllib3 (2.2.1)\n",
    )?;
    Ok(())
}

fn scenario_why_json(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "why-json")?;
    let output = ctx.run(&env, &["--json", "why", "urllib3"])?;
    output.assert_success()?;

    let json = parse_json(&output.stdout)?;
    if json["schema_version"] != 1 {
        return Err(format!("Unexpected schema_version: {}", json["schema_version"]));
    }
    if json["environment"]["python_version"] != "3.11.4" {
        return Err(format!("Unexpected environment: {}", json["environment"]));
    }
    if json["target"] != serde_json::json!({"name": "urllib3", "version": "2.2.1"}) {
        return Err(format!("Unexpected target: {}", json["target"]));
    }
    let paths = json["paths"]
        .as_array()
        .ok_or_else(|| "paths is not an array".to_string())?;
    if paths.len() != 2 {
        return Err(format!("Expected 2 paths, got {}", paths.len()));
    }
    if paths[0]["nodes"][0] != serde_json::json!({"name": "tool", "version": "0.1.0"}) {
        return Err(format!("Unexpected first path: {}", paths[0]));
    }
    Ok(())
}

fn scenario_why_no_versions(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "why-no-versions")?;
    let output = ctx.run(&env, &["--json", "why", "urllib3", "--no-versions"])?;
    output.assert_success()?;
    let json = parse_json(&output.stdout)?;
    if json["paths"][0]["nodes"] != serde_json::json!([{"name": "tool"}, {"name": "urllib3"}]) {
        return Err(format!("Unexpected nodes: {}", json["paths"][0]["nodes"]));
    }

    let output = ctx.run(&env, &["why", "urllib3", "--no-versions"])?;
    output.assert_success()?;
    output.assert_stdout_contains("Path 1:\ntool\n  urllib3\n")?;
    output.assert_stdout_not_contains("(2.2.1)")?;
    Ok(())
}

fn scenario_why_limits(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "why-limits")?;

    let output = ctx.run(&env, &["why", "urllib3", "--max-paths", "1"])?;
    output.assert_success()?;
    output.assert_stdout_contains("Found 1 path(s) to 'urllib3':")?;
    // Roots are searched in name order, so myapp's route is found first
    output.assert_stdout_contains("myapp (1.0.0)")?;
    output.assert_stdout_not_contains("tool (0.1.0)")?;

    let output = ctx.run(&env, &["why", "urllib3", "--max-depth", "2"])?;
    output.assert_success()?;
    output.assert_stdout_contains("Found 1 path(s) to 'urllib3':")?;
    output.assert_stdout_not_contains("myapp")?;

    let output = ctx.run(&env, &["why", "urllib3", "--max-paths", "1", "--all-paths"])?;
    output.assert_success()?;
    output.assert_stdout_contains("Found 2 path(s) to 'urllib3':")?;
    Ok(())
}

fn scenario_why_roots_only(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "why-roots-only")?;
    let output = ctx.run(&env, &["why", "urllib3", "--roots-only"])?;
    output.assert_success()?;
    if output.stdout != "myapp\ntool\n" {
        return Err(format!("Unexpected roots: {:?}", output.stdout));
    }

    let output = ctx.run(&env, &["--json", "why", "idna", "--roots-only"])?;
    output.assert_success()?;
    let json = parse_json(&output.stdout)?;
    if json["roots"] != serde_json::json!(["legacy-pkg", "myapp"]) {
        return Err(format!("Unexpected roots: {}", json["roots"]));
    }
    Ok(())
}

fn scenario_why_normalized_name(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "why-normalized")?;
    let output = ctx.run(&env, &["--json", "why", "Charset_Normalizer"])?;
    output.assert_success()?;
    let json = parse_json(&output.stdout)?;
    if json["target"]["name"] != "charset-normalizer" {
        return Err(format!("Unexpected target: {}", json["target"]));
    }
    let last = &json["paths"][0]["nodes"][2];
    if last["name"] != "charset-normalizer" {
        return Err(format!("Unexpected path end: {}", last));
    }
    Ok(())
}

fn scenario_why_root_package(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "why-root")?;
    let output = ctx.run(&env, &["why", "myapp"])?;
    output.assert_success()?;
    output.assert_stdout_contains("Found 1 path(s) to 'myapp':")?;
    output.assert_stdout_contains("Path 1:\nmyapp (1.0.0)\n")?;
    Ok(())
}

fn scenario_roots_human(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "roots-human")?;
    let output = ctx.run(&env, &["roots"])?;
    output.assert_success()?;
    if output.stdout != "legacy-pkg (0.5)\nmyapp (1.0.0)\ntool (0.1.0)\n" {
        return Err(format!("Unexpected roots: {:?}", output.stdout));
    }

    let output = ctx.run(&env, &["roots", "--include-build-tools", "--no-versions"])?;
    output.assert_success()?;
    if output.stdout != "legacy-pkg\nmyapp\npip\ntool\n" {
        return Err(format!("Unexpected roots: {:?}", output.stdout));
    }
    Ok(())
}

fn scenario_roots_json(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "roots-json")?;
    let output = ctx.run(&env, &["--json", "roots", "--no-versions"])?;
    output.assert_success()?;
    let json = parse_json(&output.stdout)?;
    let expected = serde_json::json!({
        "schema_version": 1,
        "roots": [{"name": "legacy-pkg"}, {"name": "myapp"}, {"name": "tool"}]
    });
    if json != expected {
        return Err(format!("Unexpected roots payload: {}", json));
    }
    Ok(())
}

fn scenario_graph_json(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "graph-json")?;
    // --json overrides an explicit --format
    let output = ctx.run(&env, &["--json", "graph", "--format", "dot"])?;
    output.assert_success()?;
    let json = parse_json(&output.stdout)?;

    let nodes = json["nodes"]
        .as_array()
        .ok_or_else(|| "nodes is not an array".to_string())?;
    if nodes.len() != 10 {
        return Err(format!("Expected 10 nodes, got {}", nodes.len()));
    }
    let edges = json["edges"]
        .as_array()
        .ok_or_else(|| "edges is not an array".to_string())?;
    if edges.len() != 8 {
        return Err(format!("Expected 8 edges, got {}", edges.len()));
    }
    if !edges.contains(&serde_json::json!({"from": "requests", "to": "urllib3"})) {
        return Err(format!("Missing requests -> urllib3 edge: {}", json["edges"]));
    }
    let warnings = json["warnings"].to_string();
    if !warnings.contains("missing-pkg") {
        return Err(format!("Expected missing-pkg warning: {}", warnings));
    }
    Ok(())
}

fn scenario_graph_dot(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "graph-dot")?;
    let output = ctx.run(&env, &["graph", "--format", "dot"])?;
    output.assert_success()?;
    output.assert_stdout_contains("digraph \"dependency-graph\" {")?;
    output.assert_stdout_contains("rankdir=LR;")?;
    output.assert_stdout_contains("\"requests\" [label=\"requests\\n2.31.0\"];")?;
    output.assert_stdout_contains("\"myapp\" -> \"requests\";")?;
    Ok(())
}

fn scenario_graph_edges(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "graph-edges")?;
    let output = ctx.run(&env, &["graph", "--format", "edges"])?;
    output.assert_success()?;
    output.assert_stdout_contains("legacy-pkg -> idna\n")?;
    output.assert_stdout_contains("requests -> charset-normalizer\n")?;
    // Marker- and extra-gated requirements produce no edges
    output.assert_stdout_not_contains("pytest")?;
    output.assert_stdout_not_contains("pywin32")?;
    output.assert_stdout_not_contains("colorama")?;
    output.assert_stdout_not_contains("pysocks")?;
    if output.stdout.lines().count() != 8 {
        return Err(format!("Expected 8 edges:\n{}", output.stdout));
    }
    Ok(())
}

fn scenario_doctor_human(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "doctor-human")?;
    let output = ctx.run(&env, &["doctor"])?;
    output.assert_success()?;
    output.assert_stdout_contains("Environment Diagnostics")?;
    output.assert_stdout_contains("Distributions: 10")?;
    output.assert_stdout_contains("Dependency edges: 8")?;
    output.assert_stdout_contains("Missing requirements: 1")?;
    output.assert_stdout_contains("Unparseable requirements: 1")?;
    output.assert_stdout_contains("Missing Requirements:\n  tool requires missing-pkg>=1.0\n")?;
    output.assert_stdout_contains(
        "Unparseable Requirements:\n  tool: this is not a valid requirement string!!!\n",
    )?;
    Ok(())
}

fn scenario_doctor_json(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "doctor-json")?;
    let output = ctx.run(&env, &["--json", "doctor"])?;
    output.assert_success()?;
    let json = parse_json(&output.stdout)?;

    let expected_stats = serde_json::json!({
        "distributions": 10,
        "nodes": 10,
        "edges": 8,
        "missing_requirements": 1,
        "unparseable_requirements": 1
    });
    if json["stats"] != expected_stats {
        return Err(format!("Unexpected stats: {}", json["stats"]));
    }
    if json["problems"]["missing_requirements"]
        != serde_json::json!([{"from": "tool", "requirement": "missing-pkg>=1.0"}])
    {
        return Err(format!("Unexpected problems: {}", json["problems"]));
    }
    Ok(())
}

fn scenario_doctor_clean(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("doctor-clean")?;
    install_dist(&env.site_packages, "solo", "1.0", &[])?;
    let output = ctx.run(&env, &["doctor"])?;
    output.assert_success()?;
    output.assert_stdout_contains("Distributions: 1")?;
    output.assert_stdout_contains("No problems detected.")?;
    Ok(())
}

fn scenario_venv(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "venv")?;
    let venv = env.root.join("venv");
    write_fake_python(&venv.join("bin").join("python"), &env.site_packages)?;
    let venv = venv.to_string_lossy().to_string();

    let output = ctx.run_raw(&env, &["--venv", &venv, "roots", "--no-versions"])?;
    output.assert_success()?;
    output.assert_stdout_contains("myapp\n")?;
    Ok(())
}

fn scenario_config_defaults(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "config-defaults")?;
    let config = serde_json::json!({
        "python": env.python,
        "max_paths": 1,
        "color": false
    });
    write_file(
        &env.xdg_config.join("py-dep-why").join("config.json"),
        &config.to_string(),
    )?;

    let output = ctx.run_raw(&env, &["why", "urllib3"])?;
    output.assert_success()?;
    output.assert_stdout_contains("Found 1 path(s) to 'urllib3':")?;

    // Flags beat the config file
    let output = ctx.run_raw(&env, &["why", "urllib3", "--max-paths", "5"])?;
    output.assert_success()?;
    output.assert_stdout_contains("Found 2 path(s) to 'urllib3':")?;
    Ok(())
}

fn scenario_config_invalid(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "config-invalid")?;
    write_file(
        &env.xdg_config.join("py-dep-why").join("config.json"),
        "{ not json",
    )?;
    let output = ctx.run(&env, &["roots"])?;
    output.assert_status(1)?;
    output.assert_stderr_contains("Failed to parse config file")?;
    Ok(())
}

fn scenario_verbose(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "verbose")?;
    let output = ctx.run(&env, &["--verbose", "--json", "roots"])?;
    output.assert_success()?;
    output.assert_stderr_contains("Target Python:")?;
    // Diagnostics never leak into the JSON payload
    parse_json(&output.stdout)?;
    Ok(())
}

fn scenario_config_disables_error_color(ctx: &TestContext) -> Result<(), String> {
    let env = installed_env(ctx, "config-color")?;
    let python = env.python.to_string_lossy().to_string();

    let output = ctx.run_colored(&env, &["--python", &python, "why", "nonexistent"])?;
    output.assert_status(3)?;
    output.assert_stderr_contains("\x1b[")?;

    write_file(
        &env.xdg_config.join("py-dep-why").join("config.json"),
        &serde_json::json!({ "color": false }).to_string(),
    )?;
    let output = ctx.run_colored(&env, &["--python", &python, "why", "nonexistent"])?;
    output.assert_status(3)?;
    output.assert_stderr_contains("is not installed in this environment.")?;
    if output.stderr.contains('\x1b') {
        return Err(format!("Expected uncolored stderr, got: {:?}", output.stderr));
    }
    Ok(())
}
