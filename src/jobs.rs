//! Job loading and execution.
//!
//! A job is anything with a single `execute(context)` entry point. Loaders turn
//! the job path produced by `ConfigArgs` into a runnable job:
//! - `ProcessJobLoader` runs the job file as a child process
//! - `JobRegistry` maps job paths to in-process implementations

use crate::config::ConfigArgs;
use crate::error::{PkitError, Result};
use crate::logging::Printer;
use anyhow::{Context, bail};
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Environment variable carrying the job name to child processes.
pub const JOB_NAME_ENV: &str = "PKIT_JOB_NAME";

/// Everything a job sees while it runs.
pub struct JobContext<'a> {
    pub args: &'a ConfigArgs,
    pub printer: &'a Printer,
}

/// A runnable job.
pub trait Job {
    fn execute(&self, ctx: &JobContext<'_>) -> anyhow::Result<()>;
}

/// Turns a resolved job path into a runnable job.
pub trait JobLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn Job>>;
}

/// A job backed by a closure.
pub struct FnJob<F>(pub F);

impl<F> Job for FnJob<F>
where
    F: Fn(&JobContext<'_>) -> anyhow::Result<()>,
{
    fn execute(&self, ctx: &JobContext<'_>) -> anyhow::Result<()> {
        (self.0)(ctx)
    }
}

/// Runs job files as child processes.
///
/// The child receives the `ConfigArgs` payload as JSON on stdin:
/// `{job, job_path, environment, config, args: {group: {args, kwargs}}}`.
#[derive(Debug, Clone, Default)]
pub struct ProcessJobLoader {
    runner: Option<String>,
}

impl ProcessJobLoader {
    /// Run job files with `runner` (e.g. `python3`).
    pub fn new(runner: impl Into<String>) -> Self {
        Self {
            runner: Some(runner.into()),
        }
    }

    /// Execute job files directly.
    pub fn direct() -> Self {
        Self { runner: None }
    }
}

impl JobLoader for ProcessJobLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn Job>> {
        if !path.is_file() {
            return Err(PkitError::module_import(path, "job file not found"));
        }
        Ok(Box::new(ProcessJob {
            path: path.to_path_buf(),
            runner: self.runner.clone(),
        }))
    }
}

/// A job file run as a child process.
#[derive(Debug, Clone)]
pub struct ProcessJob {
    path: PathBuf,
    runner: Option<String>,
}

impl ProcessJob {
    fn command(&self) -> Command {
        match self.runner {
            Some(ref runner) => {
                let mut cmd = Command::new(runner);
                cmd.arg(&self.path);
                cmd
            }
            None => Command::new(&self.path),
        }
    }
}

impl Job for ProcessJob {
    fn execute(&self, ctx: &JobContext<'_>) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(&ctx.args.payload())?;

        let mut cmd = self.command();
        cmd.current_dir(ctx.args.handler().project_root())
            .env(JOB_NAME_ENV, ctx.args.name())
            .stdin(Stdio::piped());
        debug!(path = %self.path.display(), runner = ?self.runner, "Spawning job process");

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to start job {}", self.path.display()))?;

        // stdin is closed when it goes out of scope, before waiting.
        let written = match child.stdin.take() {
            Some(mut stdin) => match stdin.write_all(&payload) {
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!(path = %self.path.display(), "Job exited without reading its payload");
                    Ok(())
                }
                other => other,
            },
            None => Ok(()),
        };
        let status = child.wait().context("Failed to wait for job process")?;
        written.context("Failed to write job payload")?;
        if !status.success() {
            bail!("job {} exited with {}", self.path.display(), status);
        }
        Ok(())
    }
}

type JobFactory = Box<dyn Fn() -> Box<dyn Job>>;

/// In-process jobs keyed by job path.
#[derive(Default)]
pub struct JobRegistry {
    jobs: HashMap<PathBuf, JobFactory>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job for `path`, replacing any previous registration.
    pub fn register<F>(&mut self, path: impl Into<PathBuf>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Job> + 'static,
    {
        self.jobs.insert(path.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.jobs.contains_key(path)
    }
}

impl JobLoader for JobRegistry {
    fn load(&self, path: &Path) -> Result<Box<dyn Job>> {
        self.jobs
            .get(path)
            .map(|factory| factory())
            .ok_or_else(|| PkitError::module_import(path, "no job registered for path"))
    }
}
