//! Target interpreter resolution
//!
//! Decides which Python environment to inspect and asks that interpreter,
//! once, for everything the graph needs: its `sys.path` (where installed
//! distributions live) and its PEP 508 marker environment.
//!
//! Resolution order:
//! 1. `--python PATH`
//! 2. `--venv DIR` (`DIR/bin/python`, `DIR\Scripts\python.exe` on Windows)
//! 3. `python` from the config file
//! 4. `$VIRTUAL_ENV`
//! 5. `python3` / `python` on `PATH`

use crate::pep508::MarkerEnvironment;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TargetEnvError {
    #[error("Cannot specify both --python and --venv. Choose one.")]
    InvalidUsage,

    #[error("Target Python interpreter not found: {0}")]
    NotFound(PathBuf),

    #[error("Target Python interpreter is not executable: {0}")]
    NotExecutable(PathBuf),

    #[error("No Python interpreter found. Use --python or --venv.")]
    NoInterpreter,

    #[error("Failed to run {path}: {source}")]
    Exec {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to inspect {path}: {details}")]
    Probe { path: PathBuf, details: String },
}

impl TargetEnvError {
    pub fn exit_code(&self) -> i32 {
        match self {
            TargetEnvError::InvalidUsage => 2,
            _ => 4,
        }
    }
}

/// What the target interpreter reported about itself
#[derive(Debug, Clone, Deserialize)]
pub struct InterpreterInfo {
    pub executable: PathBuf,
    pub python_version: String,
    #[serde(default)]
    pub sys_path: Vec<PathBuf>,
    pub markers: MarkerEnvironment,
}

impl InterpreterInfo {
    /// `sys.path` entries that are worth scanning for metadata
    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.sys_path
            .iter()
            .filter(|p| !p.as_os_str().is_empty())
            .filter(|p| p.is_dir())
            .cloned()
            .collect()
    }
}

const PROBE_SCRIPT: &str = r#"
import json, os, platform, sys

def fmt(info):
    version = "{0.major}.{0.minor}.{0.micro}".format(info)
    if info.releaselevel != "final":
        version += info.releaselevel[0] + str(info.serial)
    return version

print(json.dumps({
    "executable": sys.executable,
    "python_version": "%d.%d.%d" % sys.version_info[:3],
    "sys_path": [p for p in sys.path if p],
    "markers": {
        "implementation_name": sys.implementation.name,
        "implementation_version": fmt(sys.implementation.version),
        "os_name": os.name,
        "platform_machine": platform.machine(),
        "platform_python_implementation": platform.python_implementation(),
        "platform_release": platform.release(),
        "platform_system": platform.system(),
        "platform_version": platform.version(),
        "python_full_version": platform.python_version(),
        "python_version": ".".join(platform.python_version_tuple()[:2]),
        "sys_platform": sys.platform,
    },
}))
"#;

/// Resolve the interpreter to inspect.
///
/// `configured` is the interpreter from the config file, used only when
/// neither `--python` nor `--venv` was given.
pub fn resolve_target_python(
    python: Option<&Path>,
    venv: Option<&Path>,
    configured: Option<&Path>,
) -> Result<PathBuf, TargetEnvError> {
    if python.is_some() && venv.is_some() {
        return Err(TargetEnvError::InvalidUsage);
    }

    let target = if let Some(python) = python {
        absolute(python)
    } else if let Some(venv) = venv {
        venv_python(&absolute(venv))
    } else if let Some(configured) = configured {
        absolute(configured)
    } else {
        return default_python().ok_or(TargetEnvError::NoInterpreter);
    };

    validate(&target)?;
    Ok(target)
}

/// Run the interpreter once and collect its paths and marker environment
pub fn probe(python: &Path) -> Result<InterpreterInfo, TargetEnvError> {
    tracing::debug!("Probing interpreter {}", python.display());

    let output = Command::new(python)
        .arg("-c")
        .arg(PROBE_SCRIPT)
        .output()
        .map_err(|source| TargetEnvError::Exec {
            path: python.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TargetEnvError::Probe {
            path: python.to_path_buf(),
            details: format!("exited with {}: {}", output.status, stderr.trim()),
        });
    }

    parse_probe_output(python, &output.stdout)
}

fn parse_probe_output(python: &Path, stdout: &[u8]) -> Result<InterpreterInfo, TargetEnvError> {
    serde_json::from_slice(stdout).map_err(|e| TargetEnvError::Probe {
        path: python.to_path_buf(),
        details: format!("unexpected output ({})", e),
    })
}

/// Make a path absolute without resolving symlinks: a venv's `bin/python` is
/// usually a symlink and only behaves as the venv when invoked through it
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn venv_python(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    }
}

fn default_python() -> Option<PathBuf> {
    if let Some(venv) = std::env::var_os("VIRTUAL_ENV") {
        let candidate = venv_python(Path::new(&venv));
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    let path_var = std::env::var_os("PATH")?;
    let names: &[&str] = if cfg!(windows) {
        &["python.exe", "python3.exe"]
    } else {
        &["python3", "python"]
    };

    names.iter().find_map(|name| {
        std::env::split_paths(&path_var)
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    })
}

fn validate(target: &Path) -> Result<(), TargetEnvError> {
    if !target.exists() {
        return Err(TargetEnvError::NotFound(target.to_path_buf()));
    }
    if !is_executable(target) {
        return Err(TargetEnvError::NotExecutable(target.to_path_buf()));
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
