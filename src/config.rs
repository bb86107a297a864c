//! On-disk configuration (TOML).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::{DuplicatePolicy, MatchConfig, DEFAULT_THRESHOLD};
use crate::error::{MatchError, Result};

/// Looked up in the working directory when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "facematch.toml";

/// Which nearest-neighbor backend the engine builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexKind {
    #[default]
    KdTree,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub threshold: f32,
    pub duplicate_policy: DuplicatePolicy,
    pub dimension: Option<usize>,
    pub index: IndexKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./facematch-data"),
            threshold: DEFAULT_THRESHOLD,
            duplicate_policy: DuplicatePolicy::Reject,
            dimension: None,
            index: IndexKind::KdTree,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.match_config().validate()
    }

    /// The subset of settings the engine consumes.
    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            threshold: self.threshold,
            duplicate_policy: self.duplicate_policy,
            dimension: self.dimension,
        }
    }
}

/// Load configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] if present.
///
/// Without an explicit path a missing file yields the defaults; an explicit
/// path that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => {
            if !path.exists() {
                return Err(MatchError::Config(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
            path
        }
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };

    let raw = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&raw)
        .map_err(|e| MatchError::Config(format!("parsing {}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}
