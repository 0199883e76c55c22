//! End-to-end PND build.
//!
//! ```text
//! stage (clean, install, PXML)
//!     ↓
//! validate icon / info
//!     ↓
//! compute dist/<name>.pnd
//!     ↓
//! image → <name>.pnd.work            (or directory copy → <name>.pnd, done)
//!     ↓
//! append PXML [+ icon] to .work
//!     ↓
//! atomic move .work → <name>.pnd, register
//! ```
//!
//! The work file keeps a failed build from leaving a half-written package
//! under the final name.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::artifact::filesystem::{atomic_move, remove_path};
use crate::artifact::{trailer, ImageBuilder, ImageOutcome};
use crate::assets;
use crate::config::{BuildConfig, DistMetadata};
use crate::generate::ManifestGenerator;
use crate::install::Installer;
use crate::output::{self, DistFiles, COMMAND_NAME};
use crate::staging;

/// Summary of a finished build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Final package path (file or directory).
    pub output: PathBuf,
    pub outcome: ImageOutcome,
    pub app_id: Option<String>,
    /// Icon appended to the trailer, relative to the staging root.
    pub icon: Option<String>,
    pub info: Option<String>,
    /// SHA-256 of the package file; `None` for directory copies.
    pub sha256: Option<String>,
}

/// Run the whole packaging pipeline.
///
/// The artifact is registered in `registry` only when the build succeeds.
pub fn build_package(
    config: &BuildConfig,
    metadata: &DistMetadata,
    installer: &dyn Installer,
    generator: &dyn ManifestGenerator,
    registry: &mut DistFiles,
) -> Result<BuildReport> {
    config.validate()?;

    info!("=== Building PND ===");
    let staged = staging::stage(config, installer, generator)?;
    log_staging_summary(&staged.staging_dir);

    let manifest = &staged.manifest.manifest;
    let assets = assets::validate(
        &staged.staging_dir,
        manifest.icon.as_deref(),
        manifest.info.as_deref(),
    );

    let output = output::compute_output_path(
        config.output_name.as_deref(),
        manifest.app_id.as_deref(),
        &metadata.fallback_base(),
        &config.dist_dir,
    )?;

    let builder = ImageBuilder::new(config.tools.clone(), config.strict_tool_status);
    let work = work_path(&output);
    let outcome = match builder.build(&staged.staging_dir, &work, config.format) {
        Ok(outcome) => outcome,
        Err(e) => {
            let _ = remove_path(&work);
            return Err(e);
        }
    };

    let (outcome, sha256) = match outcome {
        ImageOutcome::Directory { path } => {
            remove_path(&output)?;
            atomic_move_dir(&path, &output)?;
            (ImageOutcome::Directory { path: output.clone() }, None)
        }
        ImageOutcome::Image { path, strategy } => {
            let icon = assets.icon_path(&staged.staging_dir);
            if let Err(e) = trailer::append(&path, &staged.manifest.path, icon.as_deref()) {
                let _ = remove_path(&path);
                return Err(e);
            }
            remove_path(&output)?;
            atomic_move(&path, &output)?;
            let digest = sha256_file(&output)?;
            (
                ImageOutcome::Image {
                    path: output.clone(),
                    strategy,
                },
                Some(digest),
            )
        }
    };

    registry.register(COMMAND_NAME, &output);

    info!("=== PND Build Complete ===");
    info!("  Output: {}", output.display());
    if let Some(digest) = &sha256 {
        info!("  SHA256: {}", digest);
    } else {
        warn!(
            "  {} is a directory copy; no PXML or icon was appended",
            output.display()
        );
    }

    Ok(BuildReport {
        output,
        outcome,
        app_id: manifest.app_id.clone(),
        icon: assets.icon,
        info: assets.info,
        sha256,
    })
}

fn work_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("package"));
    name.push(".work");
    output.with_file_name(name)
}

fn atomic_move_dir(src: &Path, dst: &Path) -> Result<()> {
    std::fs::rename(src, dst)
        .with_context(|| format!("moving '{}' to '{}'", src.display(), dst.display()))
}

fn log_staging_summary(staging_dir: &Path) {
    let (files, bytes) = WalkDir::new(staging_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .fold((0u64, 0u64), |(n, size), e| {
            (n + 1, size + e.metadata().map(|m| m.len()).unwrap_or(0))
        });
    info!(
        "Staged {} files ({} KB) in {}",
        files,
        bytes / 1024,
        staging_dir.display()
    );
}

fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to hash {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_path_sits_next_to_output() {
        assert_eq!(
            work_path(Path::new("dist/app.pnd")),
            PathBuf::from("dist/app.pnd.work")
        );
    }
}
