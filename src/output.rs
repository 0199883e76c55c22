//! Output naming and the distribution's output-file registry.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::is_plain_file_name;

/// Registry category for packages produced by this tool.
pub const COMMAND_NAME: &str = "bdist_pnd";
/// File name of the persisted registry inside the dist directory.
pub const REGISTRY_FILENAME: &str = ".dist-files.json";
/// Extension given to derived package names.
pub const PND_EXTENSION: &str = "pnd";

/// Pick the package file name and make sure `dist_dir` exists.
///
/// Priority: `explicit_name` (verbatim) > `<app_id>.pnd` > `<fallback_base>.pnd`.
/// The chosen name must be a plain file name so the package lands in
/// `dist_dir` itself.
pub fn compute_output_path(
    explicit_name: Option<&str>,
    app_id: Option<&str>,
    fallback_base: &str,
    dist_dir: &Path,
) -> Result<PathBuf> {
    let name = match (explicit_name, app_id) {
        (Some(name), _) if !name.is_empty() => name.to_string(),
        (_, Some(id)) if !id.is_empty() => format!("{id}.{PND_EXTENSION}"),
        _ => format!("{fallback_base}.{PND_EXTENSION}"),
    };

    if !is_plain_file_name(&name) {
        bail!(
            "package name '{}' would be written outside '{}'",
            name,
            dist_dir.display()
        );
    }

    fs::create_dir_all(dist_dir)
        .with_context(|| format!("creating output directory '{}'", dist_dir.display()))?;

    Ok(dist_dir.join(name))
}

/// One produced artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistFile {
    pub command: String,
    pub path: PathBuf,
}

/// Artifacts produced during a build invocation, read by publish steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistFiles {
    files: Vec<DistFile>,
}

impl DistFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an artifact. The same `(command, path)` is only kept once.
    pub fn register(&mut self, command: &str, path: &Path) {
        self.files
            .retain(|f| !(f.command == command && f.path == path));
        self.files.push(DistFile {
            command: command.to_string(),
            path: path.to_path_buf(),
        });
    }

    pub fn files(&self) -> &[DistFile] {
        &self.files
    }

    /// Entries for one command.
    pub fn for_command<'a>(&'a self, command: &'a str) -> impl Iterator<Item = &'a DistFile> + 'a {
        self.files.iter().filter(move |f| f.command == command)
    }

    /// Path of the persisted registry in `dist_dir`.
    pub fn registry_path(dist_dir: &Path) -> PathBuf {
        dist_dir.join(REGISTRY_FILENAME)
    }

    /// Load a persisted registry; a missing file is an empty registry.
    pub fn load(dist_dir: &Path) -> Result<Self> {
        let path = Self::registry_path(dist_dir);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let bytes =
            fs::read(&path).with_context(|| format!("reading registry '{}'", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing registry '{}'", path.display()))
    }

    /// Persist the registry into `dist_dir`.
    pub fn save(&self, dist_dir: &Path) -> Result<()> {
        fs::create_dir_all(dist_dir)
            .with_context(|| format!("creating output directory '{}'", dist_dir.display()))?;
        let path = Self::registry_path(dist_dir);
        let json = serde_json::to_vec_pretty(self).context("serializing output registry")?;
        fs::write(&path, json).with_context(|| format!("writing registry '{}'", path.display()))
    }
}
