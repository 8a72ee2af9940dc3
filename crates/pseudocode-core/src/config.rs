//! Run configuration loaded from `pseudocode.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the configuration file looked up next to a program.
pub const CONFIG_FILE_NAME: &str = "pseudocode.toml";

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Configuration file structure for pseudocode.toml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub limits: Limits,
    pub random: RandomConfig,
    pub files: FilesConfig,
}

/// Execution governors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Limits {
    /// Statements executed in one run
    pub max_statements: u64,
    /// Iterations of any single FOR, WHILE or REPEAT loop
    pub max_loop_iterations: u64,
    /// Nested procedure and function calls. The default fits a 2 MiB thread
    /// stack; raise it only when the interpreter runs on a larger one.
    pub max_call_depth: usize,
    /// Output lines kept in the log; older lines are dropped
    pub max_output_lines: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_statements: 100_000,
            max_loop_iterations: 10_000,
            max_call_depth: 50,
            max_output_lines: 1_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RandomConfig {
    /// Seed for RANDOM; entropy-seeded when absent
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Root of the directory-backed file store, relative to the config file
    pub directory: Option<PathBuf>,
}

impl Config {
    /// Parse configuration text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let (Some(directory), Some(parent)) = (&config.files.directory, path.parent()) {
            if directory.is_relative() {
                config.files.directory = Some(parent.join(directory));
            }
        }
        Ok(config)
    }

    /// Load `pseudocode.toml` from `directory`, or the defaults when there
    /// is none.
    pub fn discover(directory: &Path) -> Result<Self, ConfigError> {
        let path = directory.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// The configuration `init` writes for a new project.
    pub fn template() -> String {
        r#"# Pseudocode run configuration

[limits]
max_statements = 100000
max_loop_iterations = 10000
max_call_depth = 50
max_output_lines = 1000

[random]
# seed = 7

[files]
# directory = "data"
"#
        .to_string()
    }
}
