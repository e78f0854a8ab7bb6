//! Wiring shared by the subcommands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rail_api::HttpGateway;
use rail_core::{RailwayManager, RailwaySession};
use rail_manifest::ManifestStore;
use rail_runner::{CommandEngine, FileKvStore, RunStateRepository, TestCoordinator};
use tracing::debug;

use crate::config::ConfigManager;

/// State directory relative to the project root.
pub const STATE_DIR: &str = ".techtrain/state";

/// Key-value store file inside [`STATE_DIR`].
pub const STATE_FILE: &str = "prefs.json";

pub struct AppContext {
    pub config: ConfigManager,
    pub project: PathBuf,
}

impl AppContext {
    pub fn load(config_path: Option<&Path>, project: &Path) -> Result<Self> {
        let config = match config_path {
            Some(path) => ConfigManager::open(path)?,
            None => ConfigManager::open_default()?,
        };
        debug!("Using config {:?}", config.path());

        Ok(Self {
            config,
            project: project.to_path_buf(),
        })
    }

    pub fn state_path(&self) -> PathBuf {
        self.project.join(STATE_DIR).join(STATE_FILE)
    }

    pub fn state_store(&self) -> Result<Arc<FileKvStore>> {
        let path = self.state_path();
        let store = FileKvStore::open(&path)
            .with_context(|| format!("Failed to open state store {:?}", path))?;
        Ok(Arc::new(store))
    }

    /// Direct access to the run record, without an engine.
    pub fn run_state(&self) -> Result<RunStateRepository> {
        Ok(RunStateRepository::new(self.state_store()?))
    }

    pub fn manager(&self) -> Result<RailwayManager> {
        let config = self.config.config();
        let gateway = HttpGateway::new(config.gateway_options())
            .context("Failed to create API client")?;

        Ok(RailwayManager::new(
            Arc::new(gateway),
            ManifestStore::for_project(&self.project),
            config.paid_plan,
        ))
    }

    pub fn coordinator(&self) -> Result<TestCoordinator> {
        let options = self.config.config().engine.options(&self.project);
        debug!("Test harness: {} {:?}", options.program, options.args);
        let engine = Arc::new(CommandEngine::new(options));
        Ok(TestCoordinator::new(engine, self.state_store()?))
    }

    /// Manager and coordinator, with the railway loaded.
    pub async fn session(&self) -> Result<RailwaySession> {
        let mut manager = self.manager()?;
        manager.initialize().await?;
        Ok(RailwaySession::new(manager, self.coordinator()?))
    }
}
