//! Integration tests for job argument resolution and in-process job execution.

use project_kit::config::{ConfigArgs, ConfigHandler, HandlerOptions, ProjectDescriptor};
use project_kit::error::ErrorCode;
use project_kit::jobs::{FnJob, Job, JobContext, JobRegistry};
use project_kit::logging::Printer;
use serde_json::{Map, Value, json};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use tempfile::TempDir;

/// Helper to create a project root with the default descriptor and the given files.
fn create_project(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let yaml = ProjectDescriptor::default().to_yaml().unwrap();
    fs::write(ProjectDescriptor::file_path(temp.path()), yaml).unwrap();
    for (rel, content) in files {
        let path = temp.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    temp
}

fn options(root: &Path, env: Option<&str>) -> HandlerOptions {
    HandlerOptions::new()
        .with_project_root(root)
        .with_environment(env.map(str::to_string))
}

/// Argument file exercising every reserved section.
fn etl_args_yaml() -> &'static str {
    r#"
config:
  batch_size: 500
  target: warehouse
env:
  prod:
    batch_size: 5000
  dev:
    batch_size: 5
extract:
  args: [SOURCE_TABLE, 10]
  kwargs:
    target: target
load: [1, 2]
report:
  verbose: true
"#
}

#[test]
fn dotted_name_resolves_args_and_job_files() {
    let project = create_project(&[("config/args/etl/load.yaml", "main: [1]\n")]);

    let args = ConfigArgs::new("etl.load", options(project.path(), None), None).unwrap();

    assert_eq!(args.args_path(), project.path().join("config/args/etl/load.yaml"));
    assert_eq!(args.job_path(), project.path().join("jobs/etl/load.py"));
    assert_eq!(args.name(), "etl.load");

    let slashed = ConfigArgs::new("etl/load.yaml", options(project.path(), None), None).unwrap();
    assert_eq!(slashed.args_path(), args.args_path());
    assert_eq!(slashed.job_path(), args.job_path());
}

#[test]
fn job_field_overrides_job_path() {
    let project = create_project(&[(
        "config/args/nightly.yaml",
        "job: etl.runner\nmain: []\n",
    )]);

    let args = ConfigArgs::new("nightly", options(project.path(), None), None).unwrap();

    assert_eq!(args.job_path(), project.path().join("jobs/etl/runner.py"));
    assert!(args.group("job").is_none());
}

#[test]
fn sections_merge_in_order() {
    let project = create_project(&[
        ("config/config.yaml", "SOURCE_TABLE: events\nbatch_size: 1\n"),
        ("config/args/etl.yaml", etl_args_yaml()),
    ]);

    let base = ConfigArgs::new("etl", options(project.path(), None), None).unwrap();
    assert_eq!(base.handler().get("batch_size"), Some(json!(500)));

    let prod = ConfigArgs::new("etl", options(project.path(), Some("prod")), None).unwrap();
    assert_eq!(prod.handler().get("batch_size"), Some(json!(5000)));

    let mut overrides = Map::new();
    overrides.insert("batch_size".to_string(), json!(7));
    let overridden =
        ConfigArgs::new("etl", options(project.path(), Some("prod")), Some(overrides)).unwrap();
    assert_eq!(overridden.handler().get("batch_size"), Some(json!(7)));
    assert_eq!(overridden.handler().get("target"), Some(json!("warehouse")));
}

#[test]
fn groups_are_substituted_from_config() {
    let project = create_project(&[
        ("config/config.yaml", "SOURCE_TABLE: events\n"),
        ("config/args/etl.yaml", etl_args_yaml()),
    ]);

    let args = ConfigArgs::new("etl", options(project.path(), None), None).unwrap();

    let names: Vec<&str> = args.groups().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["extract", "load", "report"]);

    let extract = args.require_group("extract").unwrap();
    assert_eq!(extract.args, vec![json!("events"), json!(10)]);
    assert_eq!(extract.kwarg("target"), Some(&json!("warehouse")));

    let load = args.group("load").unwrap();
    assert_eq!(load.args, vec![json!(1), json!(2)]);
    assert!(load.kwargs.is_empty());

    let report = args.group("report").unwrap();
    assert!(report.args.is_empty());
    assert_eq!(report.kwarg("verbose"), Some(&json!(true)));

    assert_eq!(
        args.require_group("missing").unwrap_err().code(),
        ErrorCode::KeyNotFound
    );
}

#[test]
fn missing_args_file_is_file_not_found() {
    let project = create_project(&[]);

    let err = ConfigArgs::new("does.not.exist", options(project.path(), None), None).unwrap_err();
    assert_eq!(err.code(), ErrorCode::FileNotFound);
}

#[test]
fn env_section_must_be_mapping() {
    let project = create_project(&[("config/args/bad.yaml", "env: [prod]\n")]);

    let err = ConfigArgs::new("bad", options(project.path(), Some("prod")), None).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
}

#[test]
fn existing_handler_is_reused() {
    let project = create_project(&[("config/args/etl.yaml", etl_args_yaml())]);
    let mut handler = ConfigHandler::with_options(options(project.path(), Some("dev"))).unwrap();
    handler.set("SOURCE_TABLE", json!("clicks")).unwrap();

    let args = ConfigArgs::with_handler("etl", handler, None).unwrap();

    assert_eq!(args.handler().get("batch_size"), Some(json!(5)));
    assert_eq!(args.group("extract").unwrap().args[0], json!("clicks"));
}

#[test]
fn payload_carries_config_and_groups() {
    let project = create_project(&[
        ("config/config.yaml", "SOURCE_TABLE: events\n"),
        ("config/args/etl.yaml", etl_args_yaml()),
    ]);
    let args = ConfigArgs::new("etl", options(project.path(), Some("prod")), None).unwrap();

    let payload = args.payload();

    assert_eq!(payload["job"], json!("etl"));
    assert_eq!(payload["environment"], json!("prod"));
    assert_eq!(payload["config"]["batch_size"], json!(5000));
    assert_eq!(payload["args"]["extract"]["args"][0], json!("events"));
    assert_eq!(payload["args"]["load"]["kwargs"], json!({}));
}

#[test]
fn registered_job_runs_with_resolved_args() {
    let project = create_project(&[
        ("config/config.yaml", "SOURCE_TABLE: events\n"),
        ("config/args/etl.yaml", etl_args_yaml()),
    ]);
    let args = ConfigArgs::new("etl", options(project.path(), None), None).unwrap();

    let seen: Rc<RefCell<Vec<Value>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let mut registry = JobRegistry::new();
    registry.register(args.job_path(), move || -> Box<dyn Job> {
        let sink = Rc::clone(&sink);
        Box::new(FnJob(move |ctx: &JobContext<'_>| -> anyhow::Result<()> {
            let extract = ctx.args.require_group("extract")?;
            sink.borrow_mut().push(extract.args[0].clone());
            sink.borrow_mut().push(json!(ctx.args.name()));
            Ok(())
        }))
    });

    let job = args.load_job(&registry).unwrap();
    let printer = Printer::new().silent(true);
    let ctx = JobContext {
        args: &args,
        printer: &printer,
    };
    job.execute(&ctx).unwrap();

    assert_eq!(*seen.borrow(), vec![json!("events"), json!("etl")]);
}

#[test]
fn unregistered_job_fails_to_load() {
    let project = create_project(&[("config/args/etl.yaml", "main: []\n")]);
    let args = ConfigArgs::new("etl", options(project.path(), None), None).unwrap();

    let err = args.load_job(&JobRegistry::new()).err().unwrap();
    assert_eq!(err.code(), ErrorCode::ModuleImportFailure);
}
