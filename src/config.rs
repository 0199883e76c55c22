//! Build configuration: `pnd.toml` plus command-line overrides.
//!
//! Validation happens here, before any side effect. A bad `format` or a
//! missing explicit PXML never reaches the staging directory.
//!
//! ```toml
//! [metadata]
//! name = "Hello World"
//! version = "1.0"
//!
//! [bdist_pnd]
//! format = "auto"
//! build_dir = "build_pnd"
//! clean = true
//!
//! [install]
//! libs = ["src/hello"]
//! scripts = ["scripts/run.sh"]
//! data = ["assets/icon.png"]
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::artifact::ImageFormat;
use crate::error::ConfigError;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "pnd.toml";
/// Default staging directory name.
pub const DEFAULT_BUILD_DIR: &str = "build_pnd";
/// Default output directory for finished packages.
pub const DEFAULT_DIST_DIR: &str = "dist";
/// Distribution name used when the metadata does not set one.
pub const UNKNOWN_NAME: &str = "UNKNOWN";

/// Program names for the external image tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub mksquashfs: PathBuf,
    pub mkisofs: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            mksquashfs: PathBuf::from("mksquashfs"),
            mkisofs: PathBuf::from("mkisofs"),
        }
    }
}

/// Everything the pipeline needs to produce one package.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub format: ImageFormat,
    /// User-supplied PXML. `None` means the generator writes one.
    pub manifest_path: Option<PathBuf>,
    /// Explicit package file name, used verbatim.
    pub output_name: Option<String>,
    pub staging_dir: PathBuf,
    pub dist_dir: PathBuf,
    /// Remove the staging directory before installing.
    pub clean: bool,
    /// Treat a non-zero exit from an image tool as fatal.
    pub strict_tool_status: bool,
    pub tools: ToolPaths,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            format: ImageFormat::Auto,
            manifest_path: None,
            output_name: None,
            staging_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            dist_dir: PathBuf::from(DEFAULT_DIST_DIR),
            clean: false,
            strict_tool_status: true,
            tools: ToolPaths::default(),
        }
    }
}

impl BuildConfig {
    /// Check invariants that must hold before the build starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.manifest_path {
            if !path.is_file() {
                return Err(ConfigError::MissingManifest { path: path.clone() });
            }
        }
        if let Some(name) = &self.output_name {
            if !is_plain_file_name(name) {
                return Err(ConfigError::InvalidOutputName { name: name.clone() });
            }
        }
        Ok(())
    }
}

/// Host distribution metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistMetadata {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub author: Option<String>,
    /// Executable started by the launcher, relative to the package root.
    pub exec: Option<String>,
    /// Icon path written into a generated PXML, relative to the package root.
    pub icon: Option<String>,
}

impl Default for DistMetadata {
    fn default() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            version: "0.0.0".to_string(),
            description: None,
            author: None,
            exec: None,
            icon: None,
        }
    }
}

impl DistMetadata {
    /// Base name for the package when neither an explicit name nor an
    /// application id is available.
    pub fn fallback_base(&self) -> String {
        self.name.replace(' ', "-")
    }
}

/// How the staging directory gets populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSpec {
    /// Nothing to install; the staging tree is used as-is.
    Nothing,
    /// Run a shell command that installs into the staging root.
    Command { command: String, workdir: PathBuf },
    /// Copy source paths per category.
    Tree {
        libs: Vec<PathBuf>,
        scripts: Vec<PathBuf>,
        data: Vec<PathBuf>,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub format: Option<ImageFormat>,
    pub pxml: Option<PathBuf>,
    pub pndname: Option<String>,
    pub build_dir: Option<PathBuf>,
    pub dist_dir: Option<PathBuf>,
    pub clean: bool,
    pub lenient_tools: bool,
}

/// Fully resolved project configuration.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub build: BuildConfig,
    pub metadata: DistMetadata,
    pub install: InstallSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PndToml {
    #[serde(default)]
    metadata: MetadataToml,
    #[serde(default)]
    bdist_pnd: BdistPndToml,
    #[serde(default)]
    install: InstallToml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MetadataToml {
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    author: Option<String>,
    exec: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BdistPndToml {
    format: Option<String>,
    pxml: Option<String>,
    pndname: Option<String>,
    build_dir: Option<String>,
    dist_dir: Option<String>,
    clean: Option<bool>,
    strict_tool_status: Option<bool>,
    mksquashfs: Option<String>,
    mkisofs: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstallToml {
    command: Option<String>,
    #[serde(default)]
    libs: Vec<String>,
    #[serde(default)]
    scripts: Vec<String>,
    #[serde(default)]
    data: Vec<String>,
}

impl ProjectConfig {
    /// Load configuration from `path`, or from `pnd.toml` in the working
    /// directory when it exists, then apply `overrides`.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.is_file().then_some(default)
            }
        };

        match path {
            Some(path) => {
                let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                let base_dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or(Path::new("."))
                    .to_path_buf();
                Self::from_toml_str(&text, &path, &base_dir, overrides)
            }
            None => Self::from_toml_str("", Path::new("<defaults>"), Path::new("."), overrides),
        }
    }

    /// Parse config text. Relative paths resolve against `base_dir`.
    pub fn from_toml_str(
        text: &str,
        source: &Path,
        base_dir: &Path,
        overrides: Overrides,
    ) -> Result<Self, ConfigError> {
        let parsed: PndToml = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;

        let section = parsed.bdist_pnd;
        let defaults = BuildConfig::default();

        let format = match overrides.format {
            Some(format) => format,
            None => match section.format.as_deref() {
                Some(raw) => raw.parse::<ImageFormat>()?,
                None => defaults.format,
            },
        };

        let manifest_path = overrides
            .pxml
            .or_else(|| section.pxml.map(|p| resolve_path(base_dir, &p)));

        let build = BuildConfig {
            format,
            manifest_path,
            output_name: overrides.pndname.or(section.pndname),
            staging_dir: overrides
                .build_dir
                .or_else(|| section.build_dir.map(|p| resolve_path(base_dir, &p)))
                .unwrap_or_else(|| resolve_path(base_dir, DEFAULT_BUILD_DIR)),
            dist_dir: overrides
                .dist_dir
                .or_else(|| section.dist_dir.map(|p| resolve_path(base_dir, &p)))
                .unwrap_or_else(|| resolve_path(base_dir, DEFAULT_DIST_DIR)),
            clean: overrides.clean || section.clean.unwrap_or(false),
            strict_tool_status: !overrides.lenient_tools
                && section.strict_tool_status.unwrap_or(true),
            tools: ToolPaths {
                mksquashfs: section
                    .mksquashfs
                    .map(PathBuf::from)
                    .unwrap_or(defaults.tools.mksquashfs),
                mkisofs: section
                    .mkisofs
                    .map(PathBuf::from)
                    .unwrap_or(defaults.tools.mkisofs),
            },
        };
        build.validate()?;

        let meta = parsed.metadata;
        let fallback = DistMetadata::default();
        let metadata = DistMetadata {
            name: meta.name.unwrap_or(fallback.name),
            version: meta.version.unwrap_or(fallback.version),
            description: meta.description,
            author: meta.author,
            exec: meta.exec,
            icon: meta.icon,
        };

        let install = parse_install(parsed.install, base_dir)?;

        Ok(Self {
            build,
            metadata,
            install,
        })
    }
}

fn parse_install(install: InstallToml, base_dir: &Path) -> Result<InstallSpec, ConfigError> {
    let has_tree = !install.libs.is_empty() || !install.scripts.is_empty() || !install.data.is_empty();
    match (install.command, has_tree) {
        (Some(_), true) => Err(ConfigError::ConflictingInstall),
        (Some(command), false) => Ok(InstallSpec::Command {
            command,
            workdir: base_dir.to_path_buf(),
        }),
        (None, true) => {
            let resolve_all = |paths: Vec<String>| {
                paths
                    .iter()
                    .map(|p| resolve_path(base_dir, p))
                    .collect::<Vec<_>>()
            };
            Ok(InstallSpec::Tree {
                libs: resolve_all(install.libs),
                scripts: resolve_all(install.scripts),
                data: resolve_all(install.data),
            })
        }
        (None, false) => Ok(InstallSpec::Nothing),
    }
}

/// Exactly one normal path component: no separators, `.`, `..` or root.
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() || base_dir == Path::new(".") {
        candidate.to_path_buf()
    } else {
        base_dir.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(text: &str, overrides: Overrides) -> Result<ProjectConfig, ConfigError> {
        ProjectConfig::from_toml_str(text, Path::new("pnd.toml"), Path::new("."), overrides)
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("", Overrides::default()).unwrap();
        assert_eq!(config.build.format, ImageFormat::Auto);
        assert_eq!(config.build.staging_dir, PathBuf::from("build_pnd"));
        assert_eq!(config.build.dist_dir, PathBuf::from("dist"));
        assert!(!config.build.clean);
        assert!(config.build.strict_tool_status);
        assert_eq!(config.metadata.name, "UNKNOWN");
        assert_eq!(config.install, InstallSpec::Nothing);
    }

    #[test]
    fn invalid_format_is_rejected() {
        let err = parse("[bdist_pnd]\nformat = \"zip\"\n", Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat { value } if value == "zip"));
    }

    #[test]
    fn missing_pxml_is_rejected() {
        let err = parse(
            "[bdist_pnd]\npxml = \"definitely/missing/PXML.xml\"\n",
            Overrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingManifest { .. }));
    }

    #[test]
    fn overrides_win_over_file() {
        let text = "[bdist_pnd]\nformat = \"isofs\"\npndname = \"file.pnd\"\n";
        let overrides = Overrides {
            format: Some(ImageFormat::None),
            pndname: Some("cli.pnd".to_string()),
            clean: true,
            lenient_tools: true,
            ..Default::default()
        };
        let config = parse(text, overrides).unwrap();
        assert_eq!(config.build.format, ImageFormat::None);
        assert_eq!(config.build.output_name.as_deref(), Some("cli.pnd"));
        assert!(config.build.clean);
        assert!(!config.build.strict_tool_status);
    }

    #[test]
    fn output_name_must_stay_in_dist_dir() {
        for bad in ["/tmp/elsewhere.pnd", "../up.pnd", "sub/dir.pnd", "..", "."] {
            let overrides = Overrides {
                pndname: Some(bad.to_string()),
                ..Default::default()
            };
            let err = parse("", overrides).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidOutputName { name } if name == bad),
                "{bad}: {err}"
            );
        }

        let overrides = Overrides {
            pndname: Some("my game.pnd".to_string()),
            ..Default::default()
        };
        assert!(parse("", overrides).is_ok());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse("[bdist_pnd]\ncompression = \"xz\"\n", Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn install_command_and_tree_conflict() {
        let text = "[install]\ncommand = \"make install\"\nlibs = [\"src\"]\n";
        let err = parse(text, Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingInstall));
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let temp = TempDir::new().unwrap();
        let pxml = temp.path().join("PXML.xml");
        fs::write(&pxml, "<PXML/>").unwrap();
        let config_path = temp.path().join("pnd.toml");
        fs::write(
            &config_path,
            "[bdist_pnd]\npxml = \"PXML.xml\"\nbuild_dir = \"stage\"\n\n[install]\ndata = [\"assets\"]\n",
        )
        .unwrap();

        let config = ProjectConfig::load(Some(config_path.as_path()), Overrides::default()).unwrap();
        assert_eq!(config.build.manifest_path, Some(pxml));
        assert_eq!(config.build.staging_dir, temp.path().join("stage"));
        assert_eq!(
            config.install,
            InstallSpec::Tree {
                libs: vec![],
                scripts: vec![],
                data: vec![temp.path().join("assets")],
            }
        );
    }

    #[test]
    fn fallback_base_replaces_spaces() {
        let metadata = DistMetadata {
            name: "Hello Pandora World".to_string(),
            ..Default::default()
        };
        assert_eq!(metadata.fallback_base(), "Hello-Pandora-World");
    }
}
