//! Staging directory orchestration.
//!
//! Populates the staging directory as if it were the filesystem root of the
//! package, then puts the manifest in place. A failure in either step
//! aborts the build; partial staging is never packaged.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::BuildConfig;
use crate::generate::ManifestGenerator;
use crate::install::{InstallLayout, Installer};
use crate::manifest::{self, ResolvedManifest};

/// A populated staging directory with its manifest.
#[derive(Debug, Clone)]
pub struct StagedTree {
    pub staging_dir: PathBuf,
    pub manifest: ResolvedManifest,
}

/// Remove a previous staging directory.
///
/// An already-absent directory is fine; anything else (permissions, a file
/// in the way) is fatal.
pub fn clean_staging(staging_dir: &Path) -> Result<()> {
    match fs::remove_dir_all(staging_dir) {
        Ok(()) => {
            info!("Removed previous staging directory {}", staging_dir.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| {
            format!(
                "removing staging directory '{}'",
                staging_dir.display()
            )
        }),
    }
}

/// Install into the staging root and resolve the manifest.
pub fn stage(
    config: &BuildConfig,
    installer: &dyn Installer,
    generator: &dyn ManifestGenerator,
) -> Result<StagedTree> {
    let staging_dir = &config.staging_dir;

    if config.clean {
        clean_staging(staging_dir)?;
    }
    fs::create_dir_all(staging_dir)
        .with_context(|| format!("creating staging directory '{}'", staging_dir.display()))?;

    info!(
        "Installing into {} with {} installer",
        staging_dir.display(),
        installer.name()
    );
    installer
        .install(&InstallLayout::flattened(staging_dir))
        .with_context(|| format!("installing into '{}'", staging_dir.display()))?;

    let manifest = manifest::resolve(config.manifest_path.as_deref(), staging_dir, generator)?;

    Ok(StagedTree {
        staging_dir: staging_dir.clone(),
        manifest,
    })
}
