//! Test engine backed by an external harness process.
//!
//! The harness is invoked as
//!
//! ```text
//! <program> <args...> --test-platform PlayMode --category <name> --results <file>
//! ```
//!
//! and is expected to write its result tree as JSON to `<file>`. Whatever goes
//! wrong on the harness side (spawn failures aside) is reported back as a
//! failing leaf, never as an engine error.
//!
//! A run started by an earlier process is picked up again by polling
//! `<file>` until the harness has written it.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::engine::{RunCallbacks, TestEngine};
use crate::error::{RunnerError, RunnerResult};
use crate::filter::TestFilter;
use crate::results::ResultNode;

/// Default results file, relative to the working directory.
pub const DEFAULT_RESULTS_FILE: &str = ".techtrain/state/test-results.json";

/// How often a reattached run checks for its results file.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Options for the harness process.
#[derive(Debug, Clone)]
pub struct CommandEngineOptions {
    /// Harness executable
    pub program: String,
    /// Arguments placed before the filter arguments
    pub args: Vec<String>,
    /// Working directory (defaults to the current directory)
    pub working_dir: Option<PathBuf>,
    /// File the harness writes its result tree to
    pub results_file: PathBuf,
    /// Poll interval for runs started by an earlier process
    pub poll_interval: Duration,
}

impl CommandEngineOptions {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            results_file: PathBuf::from(DEFAULT_RESULTS_FILE),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn results_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_file = path.into();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Results file resolved against the working directory.
    pub fn results_path(&self) -> PathBuf {
        match &self.working_dir {
            Some(dir) if self.results_file.is_relative() => dir.join(&self.results_file),
            _ => self.results_file.clone(),
        }
    }

    /// Full argument list for a run.
    pub fn command_args(&self, filter: &TestFilter) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend(filter.to_args());
        args.push("--results".to_string());
        args.push(self.results_path().to_string_lossy().into_owned());
        args
    }
}

/// How the harness process ended.
#[derive(Debug, Clone)]
struct HarnessExit {
    success: bool,
    status: String,
    stderr: String,
}

impl From<Output> for HarnessExit {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs tests by spawning the configured harness.
pub struct CommandEngine {
    options: CommandEngineOptions,
    callbacks: RwLock<Vec<Arc<dyn RunCallbacks>>>,
    /// Bumped by every `execute`; a reattached watch stops once it changes.
    generation: Arc<AtomicU64>,
}

impl CommandEngine {
    pub fn new(options: CommandEngineOptions) -> Self {
        Self {
            options,
            callbacks: RwLock::new(Vec::new()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn options(&self) -> &CommandEngineOptions {
        &self.options
    }

    /// Turn a finished process into a result tree.
    async fn interpret(
        program: &str,
        exit: std::io::Result<HarnessExit>,
        results_path: &Path,
    ) -> ResultNode {
        let exit = match exit {
            Ok(exit) => exit,
            Err(e) => return ResultNode::failed(program, format!("harness did not finish: {}", e)),
        };

        match tokio::fs::read_to_string(results_path).await {
            Ok(content) => match serde_json::from_str::<ResultNode>(&content) {
                Ok(tree) => tree,
                Err(e) => ResultNode::failed(
                    program,
                    format!("unreadable results in {:?}: {}", results_path, e),
                ),
            },
            Err(e) => ResultNode::failed(
                program,
                format!(
                    "harness exited with {} without results ({}): {}",
                    exit.status,
                    e,
                    exit.stderr.trim()
                ),
            ),
        }
    }

    /// The result tree in `results_path`, once it is complete.
    async fn read_results(results_path: &Path) -> Option<ResultNode> {
        let content = tokio::fs::read_to_string(results_path).await.ok()?;
        match serde_json::from_str::<ResultNode>(&content) {
            Ok(tree) => Some(tree),
            Err(e) => {
                debug!("Results in {:?} not complete yet: {}", results_path, e);
                None
            }
        }
    }
}

#[async_trait]
impl TestEngine for CommandEngine {
    fn register_callbacks(&self, callbacks: Arc<dyn RunCallbacks>) {
        self.callbacks.write().push(callbacks);
    }

    async fn execute(&self, filter: TestFilter) -> RunnerResult<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let results_path = self.options.results_path();
        if let Some(parent) = results_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // A stale file from an earlier run must not be mistaken for this one.
        match tokio::fs::remove_file(&results_path).await {
            Ok(()) => debug!("Removed stale results {:?}", results_path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let args = self.options.command_args(&filter);
        let mut command = Command::new(&self.options.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.options.working_dir {
            command.current_dir(dir);
        }

        info!("Executing: {} {}", self.options.program, args.join(" "));
        let child = command.spawn().map_err(|e| {
            RunnerError::EngineUnavailable(format!("{}: {}", self.options.program, e))
        })?;

        let callbacks = self.callbacks.read().clone();
        for callback in &callbacks {
            callback.run_started(&filter);
        }

        let program = self.options.program.clone();
        tokio::spawn(async move {
            let exit = child.wait_with_output().await.map(HarnessExit::from);
            if let Ok(exit) = &exit {
                if !exit.success {
                    warn!("Test harness exited with {}", exit.status);
                }
            }
            let tree = Self::interpret(&program, exit, &results_path).await;
            for callback in &callbacks {
                callback.run_finished(tree.clone());
            }
        });

        Ok(())
    }

    fn reattach(&self) {
        let results_path = self.options.results_path();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                "No async runtime; not watching {:?} for an earlier run",
                results_path
            );
            return;
        };

        let interval = self.options.poll_interval;
        let generation = self.generation.clone();
        let watched = generation.load(Ordering::SeqCst);
        let callbacks = self.callbacks.read().clone();
        info!("Watching {:?} for the results of an earlier run", results_path);

        runtime.spawn(async move {
            loop {
                if generation.load(Ordering::SeqCst) != watched {
                    debug!("Stopped watching {:?}: a new run started", results_path);
                    return;
                }
                if let Some(tree) = Self::read_results(&results_path).await {
                    info!("Picked up results of an earlier run from {:?}", results_path);
                    for callback in &callbacks {
                        callback.run_finished(tree.clone());
                    }
                    return;
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    fn name(&self) -> &str {
        &self.options.program
    }
}
