//! Installing project files into the staging root.
//!
//! The packager does not care how files get installed, only that an
//! [`Installer`] populates an [`InstallLayout`] synchronously. PND packages
//! use a flattened layout: libraries, scripts and data all land at the root
//! of the tree instead of under host-standard subpaths.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::artifact::filesystem::copy_path;
use crate::config::InstallSpec;
use crate::process::Cmd;

/// Destination directories for each install category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub root: PathBuf,
    pub lib_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl InstallLayout {
    /// Every category installs to `root` itself.
    pub fn flattened(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            lib_dir: root.to_path_buf(),
            scripts_dir: root.to_path_buf(),
            data_dir: root.to_path_buf(),
        }
    }
}

/// Anything that can populate a staging root.
pub trait Installer {
    /// Name for logging.
    fn name(&self) -> &str;

    fn install(&self, layout: &InstallLayout) -> Result<()>;
}

/// Build the installer described by the config.
pub fn installer_for(spec: &InstallSpec) -> Box<dyn Installer> {
    match spec {
        InstallSpec::Nothing => Box::new(TreeInstaller::default()),
        InstallSpec::Command { command, workdir } => {
            Box::new(CommandInstaller::new(command.clone(), workdir.clone()))
        }
        InstallSpec::Tree {
            libs,
            scripts,
            data,
        } => Box::new(TreeInstaller {
            libs: libs.clone(),
            scripts: scripts.clone(),
            data: data.clone(),
        }),
    }
}

/// Copies source files or directories into their category directory.
///
/// `src/hello` with a flattened layout ends up at `<root>/hello`.
#[derive(Debug, Clone, Default)]
pub struct TreeInstaller {
    pub libs: Vec<PathBuf>,
    pub scripts: Vec<PathBuf>,
    pub data: Vec<PathBuf>,
}

impl Installer for TreeInstaller {
    fn name(&self) -> &str {
        "tree"
    }

    fn install(&self, layout: &InstallLayout) -> Result<()> {
        let categories = [
            ("libs", &self.libs, &layout.lib_dir),
            ("scripts", &self.scripts, &layout.scripts_dir),
            ("data", &self.data, &layout.data_dir),
        ];

        for (category, sources, dest_dir) in categories {
            for src in sources {
                let Some(file_name) = src.file_name() else {
                    bail!("{} source '{}' has no file name", category, src.display());
                };
                if !src.exists() {
                    bail!("{} source not found: {}", category, src.display());
                }
                let dst = dest_dir.join(file_name);
                info!("Installing {} -> {}", src.display(), dst.display());
                copy_path(src, &dst)
                    .with_context(|| format!("installing {} '{}'", category, src.display()))?;
            }
        }
        Ok(())
    }
}

/// Runs a shell command that installs into the layout.
///
/// The command sees the destinations as `PND_INSTALL_ROOT`,
/// `PND_INSTALL_LIB`, `PND_INSTALL_SCRIPTS` and `PND_INSTALL_DATA`.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    command: String,
    workdir: PathBuf,
}

impl CommandInstaller {
    pub fn new(command: String, workdir: PathBuf) -> Self {
        Self { command, workdir }
    }
}

impl Installer for CommandInstaller {
    fn name(&self) -> &str {
        "command"
    }

    fn install(&self, layout: &InstallLayout) -> Result<()> {
        info!("Running install command: {}", self.command);
        Cmd::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(&self.workdir)
            .env("PND_INSTALL_ROOT", &layout.root)
            .env("PND_INSTALL_LIB", &layout.lib_dir)
            .env("PND_INSTALL_SCRIPTS", &layout.scripts_dir)
            .env("PND_INSTALL_DATA", &layout.data_dir)
            .error_msg(format!("install command failed: {}", self.command))
            .run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn flattened_layout_points_everything_at_root() {
        let layout = InstallLayout::flattened(Path::new("/tmp/build_pnd"));
        assert_eq!(layout.lib_dir, layout.root);
        assert_eq!(layout.scripts_dir, layout.root);
        assert_eq!(layout.data_dir, layout.root);
    }

    #[test]
    fn tree_installer_flattens_categories() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        fs::create_dir_all(project.join("src/hello")).unwrap();
        fs::write(project.join("src/hello/__init__.py"), "").unwrap();
        fs::create_dir_all(project.join("scripts")).unwrap();
        fs::write(project.join("scripts/run.sh"), "#!/bin/sh\n").unwrap();
        fs::create_dir_all(project.join("assets")).unwrap();
        fs::write(project.join("assets/icon.png"), "png").unwrap();

        let staging = temp.path().join("build_pnd");
        let installer = TreeInstaller {
            libs: vec![project.join("src/hello")],
            scripts: vec![project.join("scripts/run.sh")],
            data: vec![project.join("assets/icon.png")],
        };
        installer
            .install(&InstallLayout::flattened(&staging))
            .unwrap();

        assert!(staging.join("hello/__init__.py").is_file());
        assert!(staging.join("run.sh").is_file());
        assert!(staging.join("icon.png").is_file());
    }

    #[test]
    fn tree_installer_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let installer = TreeInstaller {
            data: vec![temp.path().join("nope.png")],
            ..Default::default()
        };
        let err = installer
            .install(&InstallLayout::flattened(temp.path()))
            .unwrap_err();
        assert!(err.to_string().contains("data source not found"));
    }

    #[test]
    fn command_installer_sees_layout() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("build_pnd");
        fs::create_dir_all(&staging).unwrap();

        let installer = CommandInstaller::new(
            "echo payload > \"$PND_INSTALL_DATA/data.txt\"".to_string(),
            temp.path().to_path_buf(),
        );
        installer
            .install(&InstallLayout::flattened(&staging))
            .unwrap();

        assert_eq!(
            fs::read_to_string(staging.join("data.txt")).unwrap(),
            "payload\n"
        );
    }

    #[test]
    fn command_installer_failure_propagates() {
        let temp = TempDir::new().unwrap();
        let installer = CommandInstaller::new("exit 7".to_string(), temp.path().to_path_buf());
        assert!(installer
            .install(&InstallLayout::flattened(temp.path()))
            .is_err());
    }
}
