//! Init command: write a `.pkit` descriptor into the current directory.

use crate::config::ProjectDescriptor;
use crate::error::{PkitError, Result};
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the init command.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Log directory for job runs
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Main package name (folder holding the constants document)
    #[arg(short, long)]
    pub package: Option<String>,

    /// Overwrite an existing .pkit file
    #[arg(short, long)]
    pub force: bool,
}

/// Write the default descriptor, with CLI overrides, into `dir`.
pub fn write_descriptor(dir: &Path, args: &InitArgs) -> Result<(PathBuf, ProjectDescriptor)> {
    let path = ProjectDescriptor::file_path(dir);
    if path.exists() && !args.force {
        return Err(PkitError::DescriptorExists(path));
    }

    let descriptor = ProjectDescriptor {
        log_dir: args.log_dir.clone(),
        constants_package_name: args.package.clone(),
        ..Default::default()
    };
    std::fs::write(&path, descriptor.to_yaml()?).map_err(|e| PkitError::io(&path, e))?;
    Ok((path, descriptor))
}

/// Run the init command in the current directory.
pub fn run_init(args: &InitArgs) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let (path, descriptor) = write_descriptor(&cwd, args)?;

    println!("pkit: project initialized ({})", path.display());
    print!("{}", descriptor.to_yaml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(force: bool) -> InitArgs {
        InitArgs {
            log_dir: Some("logs".into()),
            package: Some("mypkg".into()),
            force,
        }
    }

    #[test]
    fn test_writes_loadable_descriptor() {
        let temp = TempDir::new().unwrap();
        let (path, written) = write_descriptor(temp.path(), &args(false)).unwrap();
        assert!(path.is_file());

        let loaded = ProjectDescriptor::load(temp.path()).unwrap();
        assert_eq!(loaded, written);
        assert_eq!(loaded.constants_package_name.as_deref(), Some("mypkg"));
    }

    #[test]
    fn test_refuses_overwrite_without_force() {
        let temp = TempDir::new().unwrap();
        write_descriptor(temp.path(), &args(false)).unwrap();

        let err = write_descriptor(temp.path(), &args(false)).unwrap_err();
        assert!(matches!(err, PkitError::DescriptorExists(_)));

        assert!(write_descriptor(temp.path(), &args(true)).is_ok());
    }
}
