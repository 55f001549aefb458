use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone)]
pub struct TestContext {
    pub bin_path: PathBuf,
    pub tmp_root: PathBuf,
}

/// A throwaway home directory plus a fake Python environment.
///
/// `python` is a shell script that prints a canned probe payload, so the
/// binary sees `site_packages` as the interpreter's only `sys.path` entry.
pub struct TestEnv {
    pub root: PathBuf,
    pub home: PathBuf,
    pub xdg_config: PathBuf,
    pub site_packages: PathBuf,
    pub python: PathBuf,
}

pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestContext {
    pub fn new() -> Result<Self, String> {
        let bin_path = if let Some(path) = std::env::var_os("CARGO_BIN_EXE_py-dep-why") {
            PathBuf::from(path)
        } else {
            let manifest_dir = std::env::var_os("CARGO_MANIFEST_DIR")
                .map(PathBuf::from)
                .ok_or_else(|| "CARGO_MANIFEST_DIR not set".to_string())?;
            manifest_dir.join("target").join("debug").join("py-dep-why")
        };

        let tmp_root = std::env::temp_dir().join("py-dep-why-e2e");
        fs::create_dir_all(&tmp_root).map_err(|e| format!("Failed to create temp root: {}", e))?;

        Ok(Self { bin_path, tmp_root })
    }

    pub fn create_env(&self, name: &str) -> Result<TestEnv, String> {
        let dir = self.unique_temp_dir(name)?;
        let home = dir.join("home");
        let xdg_config = home.join(".config");
        let site_packages = dir.join("lib").join("site-packages");
        ensure_dir(&xdg_config)?;
        ensure_dir(&site_packages)?;

        let python = dir.join("bin").join("python");
        write_fake_python(&python, &site_packages)?;

        Ok(TestEnv {
            root: dir,
            home,
            xdg_config,
            site_packages,
            python,
        })
    }

    fn unique_temp_dir(&self, name: &str) -> Result<PathBuf, String> {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| e.to_string())?
            .as_nanos();
        let dir = self
            .tmp_root
            .join(format!("{}-{}-{}", name, nanos, counter));
        fs::create_dir_all(&dir).map_err(|e| format!("Failed to create temp dir: {}", e))?;
        Ok(dir)
    }

    /// Run the binary with no interpreter flags
    pub fn run_raw(&self, env: &TestEnv, args: &[&str]) -> Result<CommandOutput, String> {
        let mut command = self.command(env, args);
        command.env("NO_COLOR", "1");
        Self::output(command)
    }

    /// Run with colors forced on, as if attached to a terminal
    pub fn run_colored(&self, env: &TestEnv, args: &[&str]) -> Result<CommandOutput, String> {
        let mut command = self.command(env, args);
        command.env_remove("NO_COLOR").env("CLICOLOR_FORCE", "1");
        Self::output(command)
    }

    fn command(&self, env: &TestEnv, args: &[&str]) -> Command {
        if std::env::var("PY_DEP_WHY_E2E_LOG").is_ok() {
            eprintln!("command: {:?} (cwd: {})", args, env.root.display());
        }
        let mut command = Command::new(&self.bin_path);
        command
            .args(args)
            .current_dir(&env.root)
            .env("HOME", &env.home)
            .env("XDG_CONFIG_HOME", &env.xdg_config)
            .env_remove("VIRTUAL_ENV")
            .env_remove("RUST_LOG");
        command
    }

    fn output(mut command: Command) -> Result<CommandOutput, String> {
        let output = command
            .output()
            .map_err(|e| format!("Failed to run command: {}", e))?;
        Ok(CommandOutput::from_output(output))
    }

    /// Run the binary against the environment's fake interpreter
    pub fn run(&self, env: &TestEnv, args: &[&str]) -> Result<CommandOutput, String> {
        let python = env.python.to_string_lossy().to_string();
        let mut full_args = vec!["--python", python.as_str()];
        full_args.extend_from_slice(args);
        self.run_raw(env, &full_args)
    }
}

impl CommandOutput {
    pub fn from_output(output: Output) -> Self {
        let status = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Self {
            status,
            stdout,
            stderr,
        }
    }

    pub fn assert_success(&self) -> Result<(), String> {
        self.assert_status(0)
    }

    pub fn assert_status(&self, expected: i32) -> Result<(), String> {
        if self.status == expected {
            Ok(())
        } else {
            Err(format!(
                "Expected exit {}, got exit {}.\nstdout: {}\nstderr: {}",
                expected, self.status, self.stdout, self.stderr
            ))
        }
    }

    pub fn assert_stdout_contains(&self, needle: &str) -> Result<(), String> {
        if self.stdout.contains(needle) {
            Ok(())
        } else {
            Err(format!(
                "Expected stdout to contain '{}'.\nstdout: {}",
                needle, self.stdout
            ))
        }
    }

    pub fn assert_stdout_not_contains(&self, needle: &str) -> Result<(), String> {
        if !self.stdout.contains(needle) {
            Ok(())
        } else {
            Err(format!(
                "Expected stdout to not contain '{}'.\nstdout: {}",
                needle, self.stdout
            ))
        }
    }

    pub fn assert_stderr_contains(&self, needle: &str) -> Result<(), String> {
        if self.stderr.contains(needle) {
            Ok(())
        } else {
            Err(format!(
                "Expected stderr to contain '{}'.\nstderr: {}",
                needle, self.stderr
            ))
        }
    }
}

/// Write a `python` stand-in that answers the probe with fixed JSON
pub fn write_fake_python(path: &Path, site_packages: &Path) -> Result<(), String> {
    let payload = serde_json::json!({
        "executable": path,
        "python_version": "3.11.4",
        "sys_path": [site_packages],
        "markers": {
            "implementation_name": "cpython",
            "implementation_version": "3.11.4",
            "os_name": "posix",
            "platform_machine": "x86_64",
            "platform_python_implementation": "CPython",
            "platform_release": "6.1.0",
            "platform_system": "Linux",
            "platform_version": "#1 SMP",
            "python_full_version": "3.11.4",
            "python_version": "3.11",
            "sys_platform": "linux"
        }
    });
    let payload_path = path.with_file_name("probe.json");
    write_file(&payload_path, &payload.to_string())?;

    let script = format!("#!/bin/sh\ncat '{}'\n", payload_path.display());
    write_executable(path, &script)
}

/// Write a shell script and mark it executable
pub fn write_executable(path: &Path, content: &str) -> Result<(), String> {
    use std::os::unix::fs::PermissionsExt;

    write_file(path, content)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| format!("Failed to chmod {}: {}", path.display(), e))
}

/// Install a `.dist-info` distribution into `site_packages`
pub fn install_dist(
    site_packages: &Path,
    name: &str,
    version: &str,
    requires: &[&str],
) -> Result<(), String> {
    let dir_name = format!("{}-{}.dist-info", name.replace('-', "_"), version);
    let mut metadata = format!("Metadata-Version: 2.1\nName: {}\nVersion: {}\n", name, version);
    for req in requires {
        metadata.push_str(&format!("Requires-Dist: {}\n", req));
    }
    metadata.push_str("\nLong description.\nRequires-Dist: ignored-after-body\n");
    write_file(&site_packages.join(dir_name).join("METADATA"), &metadata)
}

pub fn write_file(path: &Path, content: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create parent dirs: {}", e))?;
    }
    fs::write(path, content).map_err(|e| format!("Failed to write file: {}", e))
}

pub fn ensure_dir(path: &Path) -> Result<(), String> {
    fs::create_dir_all(path).map_err(|e| format!("Failed to create dir: {}", e))
}

pub fn parse_json(output: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(output).map_err(|e| format!("Invalid JSON output: {}", e))
}
