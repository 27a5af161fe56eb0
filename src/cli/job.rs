//! Job command: resolve a job by name and run it.

use crate::config::{ConfigArgs, HandlerOptions, ProjectDescriptor};
use crate::error::{ErrorCode, PkitError};
use crate::jobs::{JobContext, ProcessJobLoader};
use crate::logging::Printer;
use crate::paths::locate_project_root_from_cwd;
use clap::Args;
use serde_json::{Map, Number, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Arguments for the job command.
#[derive(Args, Debug)]
pub struct JobArgs {
    /// Job name (dotted or slashed path under the args folder)
    pub job: String,

    /// Environment to run the job in (default: the descriptor's environment variable)
    #[arg(short, long)]
    pub env: Option<String>,

    /// Configuration override, may be repeated
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Resolve the job without executing it
    #[arg(long)]
    pub dry_run: bool,
}

/// Returned once a job failure has been reported through the printer.
#[derive(Debug, thiserror::Error)]
#[error("job {job} failed")]
pub struct JobFailed {
    pub job: String,
}

/// True if `err` was already shown to the user by the printer.
pub fn already_reported(err: &anyhow::Error) -> bool {
    err.is::<JobFailed>()
}

/// Run the job command.
///
/// Setup errors (no project, bad descriptor, log file in use) are returned
/// as-is. Once the printer has started, failures are reported through it and
/// returned as `JobFailed`.
pub fn run_job(args: &JobArgs) -> anyhow::Result<()> {
    let root = locate_project_root_from_cwd()?;
    let descriptor = ProjectDescriptor::load(&root)?;
    let environment = args
        .env
        .clone()
        .or_else(|| descriptor.environment_from_process());

    let mut printer = Printer::new()
        .with_header_parts(&["pkit", "job", &args.job])
        .with_log_name_part(args.job.as_str());
    if let Some(dir) = descriptor.resolved_log_dir(&root) {
        printer = printer.with_log_dir(dir);
    }
    printer.start("start")?;
    if let Some(ref env) = environment {
        printer.message(&format!("Setting environment: {env}"));
    }

    match execute(args, root, &descriptor, environment, &printer) {
        Ok(()) => {
            printer.stop("Job completed successfully!");
            Ok(())
        }
        Err(e) => {
            let code = e.downcast_ref::<PkitError>().map(PkitError::code);
            debug!(job = %args.job, error_code = ?code, "Job failed");
            printer.fail(failure_message(code), &e);
            Err(JobFailed {
                job: args.job.clone(),
            }
            .into())
        }
    }
}

fn failure_message(code: Option<ErrorCode>) -> &'static str {
    match code {
        Some(ErrorCode::FileNotFound) => "Job configuration not found",
        Some(ErrorCode::ModuleImportFailure) => "Failed to load job",
        Some(ErrorCode::ConfigurationConflict) => "Configuration conflict",
        Some(_) => "Job setup failed",
        None => "Job execution failed",
    }
}

fn execute(
    args: &JobArgs,
    root: PathBuf,
    descriptor: &ProjectDescriptor,
    environment: Option<String>,
    printer: &Printer,
) -> anyhow::Result<()> {
    let overrides = parse_overrides(&args.set)?;
    let options = HandlerOptions::new()
        .with_project_root(root)
        .with_environment(environment);

    printer.message(&format!("Starting job: {}", args.job));
    let config_args = ConfigArgs::new(&args.job, options, Some(overrides))?;
    let groups: Vec<&str> = config_args.groups().keys().map(String::as_str).collect();
    printer.details(
        "Resolved job",
        &[
            ("args_file", display(config_args.args_path())),
            ("job_file", display(config_args.job_path())),
            ("groups", groups.join(", ")),
        ],
    );

    let loader = ProcessJobLoader::new(descriptor.job_runner());
    let job = config_args.load_job(&loader)?;
    if args.dry_run {
        printer.message("Dry run: job not executed");
        return Ok(());
    }

    let ctx = JobContext {
        args: &config_args,
        printer,
    };
    job.execute(&ctx)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Parse `KEY=VALUE` pairs into a mapping.
pub fn parse_overrides(pairs: &[String]) -> Result<Map<String, Value>, PkitError> {
    let mut overrides = Map::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            PkitError::invalid_argument(format!("expected KEY=VALUE, got '{pair}'"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(PkitError::invalid_argument(format!("empty key in '{pair}'")));
        }
        overrides.insert(key.to_string(), parse_value(value));
    }
    Ok(overrides)
}

/// Integer, float, comma-separated list of those, or plain string.
pub fn parse_value(value: &str) -> Value {
    if value.contains(',') {
        return Value::Array(
            value
                .split(',')
                .filter(|v| !v.is_empty())
                .map(parse_scalar)
                .collect(),
        );
    }
    parse_scalar(value)
}

fn parse_scalar(value: &str) -> Value {
    if let Ok(n) = value.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = value.parse::<f64>()
        && let Some(n) = Number::from_f64(f)
    {
        return Value::Number(n);
    }
    Value::String(value.to_string())
}
