//! A single build pass.
//!
//! A pass is one process lifetime: take the global lock, load and assemble
//! the root, then either finish one compile job or wait for a source change.
//! Either way the pass exits and the supervisor starts a fresh one, so every
//! pass sees the project from scratch and no stale in-memory state survives
//! an edit.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use camber_broker::BrokerClient;
use camber_compile::{trigger_compile, Compiler, Outcome};
use camber_node::{NodeRegistry, Workspace};
use camber_vcs::Repo;
use serde_json::json;
use tracing::{debug, error, info};

use crate::error::BuildError;
use crate::state::BuildState;
use crate::watcher::Watcher;

/// How a pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// One mesh was compiled; restart to pick up the next stale one.
    Compiled(PathBuf),
    /// Everything was fresh; a watched file changed afterwards.
    Clean(PathBuf),
    /// The pass failed; the error was reported and the tree rolled back.
    Failed,
}

/// Runs one build pass over a project.
pub struct Builder {
    registry: NodeRegistry,
    source: PathBuf,
    workspace: Workspace,
    broker: BrokerClient,
    compiler: Compiler,
    repo: Option<Repo>,
    poll_interval: Duration,
    state: BuildState,
}

impl Builder {
    /// A builder for the node registered under `source`.
    pub fn new(
        registry: NodeRegistry,
        source: impl Into<PathBuf>,
        workspace: Workspace,
        broker: BrokerClient,
    ) -> Self {
        Self {
            registry,
            source: source.into(),
            workspace,
            broker,
            compiler: Compiler::default(),
            repo: None,
            poll_interval: Duration::from_millis(200),
            state: BuildState::Idle,
        }
    }

    /// Uses a specific compiler command.
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Enables working-tree rollback on failure.
    pub fn with_repo(mut self, repo: Repo) -> Self {
        self.repo = Some(repo);
        self
    }

    /// Overrides the watcher poll interval.
    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll_interval = poll;
        self
    }

    /// The current pass state.
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Runs the pass to completion.
    ///
    /// Holds the broker's global lock from before loading until the compile
    /// walk finishes, so viewers and tools never observe a half-built tree.
    /// Consumes the builder: a new pass means a new `Builder`.
    pub async fn run_pass(mut self) -> Result<PassOutcome, BuildError> {
        let mut lock = self.broker.lock("builder").await?;
        lock.acquire().await?;

        self.transition(BuildState::Loading)?;
        let mut node = match self.registry.load(&self.source, &self.workspace) {
            Ok(node) => node,
            Err(e) => return self.fail(e.to_string()).await,
        };

        self.transition(BuildState::Assembling)?;
        if let Err(e) = node.assemble(None) {
            return self.fail(e.to_string()).await;
        }

        self.transition(BuildState::Watching)?;
        let watcher = Watcher::new(node.files().iter().cloned(), self.poll_interval);
        debug!(files = watcher.len(), "watching");

        self.transition(BuildState::Compiling)?;
        match trigger_compile(&mut node, &self.compiler) {
            Ok(Outcome::Pending(job)) => {
                let artifact = job.artifact().to_path_buf();
                info!(artifact = %artifact.display(), pid = job.pid(), "building");
                tokio::task::spawn_blocking(move || job.wait()).await??;
                lock.release().await?;
                self.transition(BuildState::Exited)?;
                Ok(PassOutcome::Compiled(artifact))
            }
            Ok(Outcome::Ready) => {
                self.transition(BuildState::Watching)?;
                lock.release().await?;
                info!("all meshes fresh, waiting for changes");
                let changed = watcher.changed().await;
                info!(path = %changed.display(), "changed, reloading");
                self.transition(BuildState::Exited)?;
                Ok(PassOutcome::Clean(changed))
            }
            Err(e) => self.fail(e.to_string()).await,
        }
    }

    /// The failure path: report, roll back, exit.
    ///
    /// The lock connection drops with the pass, so the broker fail-opens it
    /// for the next holder.
    async fn fail(mut self, message: String) -> Result<PassOutcome, BuildError> {
        error!(error = %message, "build pass failed");
        self.transition(BuildState::RollingBack)?;

        let mut store = self.broker.store().await?;
        store
            .put_json(
                "build_error",
                &json!({ "error": message, "tstamp": next_tstamp() }),
            )
            .await?;

        if let Some(repo) = &self.repo {
            repo.discard_all_changes()?;
        }

        self.transition(BuildState::Exited)?;
        Ok(PassOutcome::Failed)
    }

    fn transition(&mut self, next: BuildState) -> Result<(), BuildError> {
        if !self.state.can_transition(next) {
            return Err(BuildError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = %self.state, to = %next, "pass state");
        self.state = next;
        Ok(())
    }
}

static LAST_TSTAMP: Mutex<f64> = Mutex::new(0.0);

/// A strictly increasing unix timestamp for failure reports, so readers can
/// tell a new failure from a re-read of the previous one.
fn next_tstamp() -> f64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    let mut last = LAST_TSTAMP.lock().unwrap();
    *last = if now > *last { now } else { *last + 1e-6 };
    *last
}
