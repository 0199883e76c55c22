//! Builder for PND application packages.
//!
//! A PND is a filesystem image of an application's files with its XML
//! manifest (`PXML.xml`) and an optional icon appended as trailing bytes.
//! This crate stages the files, resolves the manifest, builds the image with
//! external tools and writes the trailer.
//!
//! - **Staging** - Clean, install and manifest resolution
//! - **Artifact builders** - squashfs / ISO wrappers, directory fallback, trailer
//! - **Output** - Package naming and the output registry
//! - **Preflight checks** - Host tool discovery before builds
//!
//! # Architecture
//!
//! ```text
//! pnd.toml + CLI ──> config::ProjectConfig
//!                         │
//! install::Installer ─────┤
//! generate::ManifestGenerator
//!                         ▼
//!                 pipeline::build_package
//!                         │
//!     staging ─> assets ─> output ─> artifact ─> artifact::trailer
//!                         │
//!                         ▼
//!              dist/<id>.pnd + dist/.dist-files.json
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use pnd_builder::{build_package, installer_for, DistFiles, MetadataGenerator, ProjectConfig};
//!
//! let project = ProjectConfig::load(None, Default::default())?;
//! let installer = installer_for(&project.install);
//! let generator = MetadataGenerator::new(project.metadata.clone());
//! let mut registry = DistFiles::load(&project.build.dist_dir)?;
//!
//! let report = build_package(
//!     &project.build,
//!     &project.metadata,
//!     installer.as_ref(),
//!     &generator,
//!     &mut registry,
//! )?;
//! registry.save(&project.build.dist_dir)?;
//! println!("{}", report.output.display());
//! ```

pub mod artifact;
pub mod assets;
pub mod config;
pub mod error;
pub mod generate;
pub mod install;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod staging;

pub use artifact::{ImageBuilder, ImageFormat, ImageOutcome, ImageStrategy};
pub use config::{BuildConfig, DistMetadata, InstallSpec, Overrides, ProjectConfig, ToolPaths};
pub use error::{ConfigError, ManifestError};
pub use generate::{ManifestGenerator, MetadataGenerator};
pub use install::{installer_for, InstallLayout, Installer};
pub use manifest::{Manifest, ResolvedManifest};
pub use output::{compute_output_path, DistFile, DistFiles};
pub use pipeline::{build_package, BuildReport};
