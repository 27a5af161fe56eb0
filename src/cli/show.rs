//! Config command: print the merged configuration.

use crate::config::{ConfigHandler, HandlerOptions, ProjectDescriptor};
use crate::paths::locate_project_root_from_cwd;
use clap::Args;
use serde_json::Value;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Print only this key, resolved the way jobs see it
    pub key: Option<String>,

    /// Environment to resolve (default: the descriptor's environment variable)
    #[arg(short, long)]
    pub env: Option<String>,
}

/// Render the requested configuration as YAML.
pub fn render(handler: &ConfigHandler, key: Option<&str>) -> anyhow::Result<String> {
    let value = match key {
        Some(key) => handler.require(key)?,
        None => Value::Object(handler.effective()),
    };
    Ok(serde_yaml::to_string(&value)?)
}

/// Run the config command from the current directory.
pub fn run_show(args: &ShowArgs) -> anyhow::Result<()> {
    let root = locate_project_root_from_cwd()?;
    let descriptor = ProjectDescriptor::load(&root)?;
    let environment = args
        .env
        .clone()
        .or_else(|| descriptor.environment_from_process());

    let handler = ConfigHandler::with_options(
        HandlerOptions::new()
            .with_project_root(root)
            .with_environment(environment),
    )?;
    print!("{}", render(&handler, args.key.as_deref())?);
    Ok(())
}
