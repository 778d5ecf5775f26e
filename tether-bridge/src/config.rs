//! Bridge configuration.
//!
//! Read from `$TETHER_CONFIG`, or `config.json` in the platform config
//! directory. A missing file is not an error; every field has a default.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tether_core::DispatchOptions;
use tether_core::renderer::DEFAULT_MAX_OUTPUT_BYTES;
use tether_net::BodyEncoding;
use tether_script::ModuleCommand;
use thiserror::Error;

pub const CONFIG_ENV: &str = "TETHER_CONFIG";
pub const INTERPRETER_ENV: &str = "TETHER_INTERPRETER";

pub const DEFAULT_BOOT_TEXT: &str = "Tether bridge ready.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// External interpreter. `None` runs the built-in loopback module.
    pub interpreter: Option<ModuleCommand>,
    /// First message posted to the interpreter.
    pub boot_text: String,
    pub readline_timeout_ms: Option<u64>,
    pub network_timeout_ms: Option<u64>,
    pub max_output_bytes: usize,
    pub body_encoding: BodyEncoding,
    /// Log here instead of stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            interpreter: None,
            boot_text: DEFAULT_BOOT_TEXT.to_string(),
            readline_timeout_ms: None,
            network_timeout_ms: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            body_encoding: BodyEncoding::default(),
            log_file: None,
        }
    }
}

impl BridgeConfig {
    /// Resolve the config path, load it and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let mut config = match config_path(lookup) {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env(lookup);
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let body = match std::fs::read_to_string(path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&body).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let body = serde_json::to_string_pretty(self).map_err(|e| write_err(e.into()))?;
        std::fs::write(path, body).map_err(write_err)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(program) = lookup(INTERPRETER_ENV).filter(|p| !p.is_empty()) {
            match &mut self.interpreter {
                Some(cmd) => cmd.program = program,
                None => self.interpreter = Some(ModuleCommand::new(program)),
            }
        }
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            readline_timeout: self.readline_timeout_ms.map(Duration::from_millis),
            network_timeout: self.network_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// `$TETHER_CONFIG` if set, else `<config dir>/config.json`.
pub fn config_path(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(path) = lookup(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    ProjectDirs::from("", "", "tether").map(|dirs| dirs.config_dir().join("config.json"))
}
