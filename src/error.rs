//! Command failures and their process exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | unexpected error, bad arguments, unknown graph format |
//! | 2 | `--python` and `--venv` given together |
//! | 3 | `why` target is not installed |
//! | 4 | target interpreter missing, not executable, or failed to run |

use crate::config::ConfigError;
use crate::interpreter::TargetEnvError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    TargetEnv(#[from] TargetEnvError),

    #[error("Package '{0}' is not installed in this environment.")]
    NotInstalled(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::TargetEnv(e) => e.exit_code(),
            CliError::NotInstalled(_) => 3,
            CliError::Config(_) | CliError::Output(_) => 1,
        }
    }
}
