//! User configuration.
//!
//! Stored as TOML under the platform data directory:
//!
//! ```text
//! <data_dir>/techtrain-railway/config.toml
//! ```
//!
//! Keys are camelCase so files written by the editor extension load as-is.

use std::fs;
use std::path::{Path, PathBuf};

use rail_api::{HttpGatewayOptions, DEFAULT_API_ENDPOINT, DEFAULT_API_ENDPOINT_V3};
use rail_runner::CommandEngineOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Directory under the data dir.
pub const CONFIG_DIR_NAME: &str = "techtrain-railway";

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Harness invoked when the config names none.
pub const DEFAULT_HARNESS_PROGRAM: &str = "unity-test-harness";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config error: no data directory on this platform")]
    NoDataDir,

    #[error("Config error: failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error: failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error: invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_auth_cookie_name: Option<String>,
}

/// How to launch the local test harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Defaults to the project directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_file: Option<PathBuf>,
}

fn default_program() -> String {
    DEFAULT_HARNESS_PROGRAM.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            working_dir: None,
            results_file: None,
        }
    }
}

impl EngineConfig {
    /// Engine options for a project rooted at `project`.
    pub fn options(&self, project: &Path) -> CommandEngineOptions {
        let working_dir = match &self.working_dir {
            Some(dir) if dir.is_relative() => project.join(dir),
            Some(dir) => dir.clone(),
            None => project.to_path_buf(),
        };

        let mut options = CommandEngineOptions::new(&self.program)
            .args(self.args.clone())
            .working_dir(working_dir);
        if let Some(results_file) = &self.results_file {
            options = options.results_file(results_file);
        }
        options
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint_v3: Option<String>,
    /// Whether the account can open paid stations.
    #[serde(default)]
    pub paid_plan: bool,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn endpoint(&self) -> &str {
        self.api_endpoint.as_deref().unwrap_or(DEFAULT_API_ENDPOINT)
    }

    pub fn endpoint_v3(&self) -> &str {
        self.api_endpoint_v3
            .as_deref()
            .unwrap_or(DEFAULT_API_ENDPOINT_V3)
    }

    pub fn gateway_options(&self) -> HttpGatewayOptions {
        let options = HttpGatewayOptions::new().endpoint_v3(self.endpoint_v3());
        match &self.auth.api_token {
            Some(token) if !token.is_empty() => options.token(token),
            _ => options,
        }
    }
}

/// Loads, edits and persists [`AppConfig`].
#[derive(Debug)]
pub struct ConfigManager {
    path: PathBuf,
    config: AppConfig,
}

impl ConfigManager {
    /// `<data_dir>/techtrain-railway/config.toml`.
    pub fn default_path() -> ConfigResult<PathBuf> {
        let base = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Open the config at `path`, writing defaults if the file is missing.
    pub fn open(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let config = Self::load_or_create(&path)?;
        Ok(Self { path, config })
    }

    pub fn open_default() -> ConfigResult<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> ConfigResult<()> {
        Self::write(&self.path, &self.config)
    }

    /// Replace the config with defaults and save.
    pub fn reset(&mut self) -> ConfigResult<()> {
        self.config = AppConfig::default();
        self.save()?;
        info!("Config reset: {:?}", self.path);
        Ok(())
    }

    pub fn reload(&mut self) -> ConfigResult<()> {
        self.config = Self::load_or_create(&self.path)?;
        Ok(())
    }

    pub fn set_api_token(&mut self, token: impl Into<String>) -> ConfigResult<()> {
        self.config.auth.api_token = Some(token.into());
        self.save()
    }

    fn load_or_create(path: &Path) -> ConfigResult<AppConfig> {
        if !path.exists() {
            let config = AppConfig::default();
            Self::write(path, &config)?;
            info!("Created default config at {:?}", path);
            return Ok(config);
        }

        debug!("Loading config from {:?}", path);
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write(path: &Path, config: &AppConfig) -> ConfigResult<()> {
        let content = toml::to_string_pretty(config)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, content).map_err(write_err)
    }
}
