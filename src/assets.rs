//! Validation of auxiliary assets named by the PXML.
//!
//! A missing icon or info file degrades the package but never stops the
//! build: the asset is dropped with a warning.

use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Icon and info paths that exist inside the staging directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedAssets {
    /// Relative icon path, `None` when absent or missing.
    pub icon: Option<String>,
    /// Relative info path, `None` when absent or missing.
    pub info: Option<String>,
}

impl ValidatedAssets {
    /// Absolute icon path inside `staging_dir`.
    pub fn icon_path(&self, staging_dir: &Path) -> Option<PathBuf> {
        self.icon.as_ref().map(|rel| staging_dir.join(rel))
    }
}

/// Check that `icon` and `info` exist under `staging_dir`.
pub fn validate(staging_dir: &Path, icon: Option<&str>, info: Option<&str>) -> ValidatedAssets {
    ValidatedAssets {
        icon: check(
            staging_dir,
            icon,
            "icon",
            "No icon will be shown for this package.",
        ),
        info: check(
            staging_dir,
            info,
            "info file",
            "Opening the help file will fail.",
        ),
    }
}

fn check(staging_dir: &Path, rel: Option<&str>, what: &str, consequence: &str) -> Option<String> {
    let rel = rel.filter(|r| !r.is_empty())?;

    if !is_contained(rel) {
        warn!(
            "PXML {} '{}' points outside the package. {}",
            what, rel, consequence
        );
        return None;
    }

    let path = staging_dir.join(rel);
    if path.is_file() {
        Some(rel.to_string())
    } else {
        warn!(
            "PXML {} '{}' not found in {}. {}",
            what,
            rel,
            staging_dir.display(),
            consequence
        );
        None
    }
}

fn is_contained(rel: &str) -> bool {
    Path::new(rel)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
