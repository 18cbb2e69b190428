//! Configuration file parsing for `intcode.toml`.
//!
//! Searches current directory then ancestors, falling back to
//! `~/.config/intcode/intcode.toml` if no project-level file is found.

use intcode_vm::VmConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const FILE_NAME: &str = "intcode.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid toml in '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct IntcodeConfig {
    /// Engine defaults for `intcode run`.
    #[serde(default)]
    pub vm: VmConfig,
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkSection {
    /// Number of nodes; addresses run from 0 to `size - 1`.
    pub size: usize,
    /// Give up after this many polling rounds.
    pub max_rounds: Option<u64>,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            size: 50,
            max_rounds: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogSection {
    /// `tracing` filter directives, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl IntcodeConfig {
    /// Load config from `intcode.toml`, searching current dir then parents.
    /// Returns `Default` when no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self::load_with_path()?
            .map(|(_path, cfg)| cfg)
            .unwrap_or_default())
    }

    /// Load config and return the path to the config file that was found.
    pub fn load_with_path() -> Result<Option<(PathBuf, Self)>, ConfigError> {
        match find_config_file() {
            Some(path) => {
                let cfg = Self::load_from(&path)?;
                Ok(Some((path, cfg)))
            }
            None => Ok(None),
        }
    }

    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a TOML string directly.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Generate a default `intcode.toml` template.
    pub fn default_template() -> &'static str {
        r#"# Intcode configuration

# Engine defaults for `intcode run`
[vm]
# Suspend after every output instruction
yield_on_output = false
# "blocking" faults on empty input, "non-blocking" delivers -1
input_mode = "blocking"
# Maximum instructions per run
# instruction_limit = 100000000

[network]
size = 50
# max_rounds = 100000

[log]
# RUST_LOG takes precedence when set
filter = "warn"
"#
    }
}

fn find_config_file() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let config_path = dir.join(FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    // Try global config
    let global = dirs_or_home()?
        .join(".config")
        .join("intcode")
        .join(FILE_NAME);
    global.exists().then_some(global)
}

fn dirs_or_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
