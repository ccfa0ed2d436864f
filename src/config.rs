use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::interp::{AssignmentScope, InterpreterOptions};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "sift.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{}: could not read file: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("{}: invalid configuration: {source}", path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatorKind {
    #[default]
    Direct,
    Dispatch,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
    pub dispatch: DispatchConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub evaluator: EvaluatorKind,
    pub assignment: AssignmentScope,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    pub cache: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { cache: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub filter: Option<String>,
}

impl Config {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&content, path)
    }

    /// `explicit` if given (it must exist), else `sift.toml` in `dir` if present, else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() { Self::load(&candidate) } else { Ok(Self::default()) }
    }

    pub fn interpreter_options(&self) -> InterpreterOptions {
        InterpreterOptions { assignment: self.run.assignment, dispatch_cache: self.dispatch.cache }
    }
}
