//! PXML manifest resolution.
//!
//! The manifest always ends up at `<staging>/PXML.xml`: either copied from a
//! user-supplied file or written there by a [`ManifestGenerator`]. Only the
//! handful of attributes the packager needs are read:
//!
//! ```xml
//! <PXML xmlns="http://openpandora.org/namespaces/PXML">
//!   <application id="hello" appdata="hello-data">
//!     <icon src="icon.png"/>
//!     <info name="Help" type="text/html" src="docs/index.html"/>
//!   </application>
//! </PXML>
//! ```
//!
//! Namespaces are ignored when matching element names.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ManifestError;
use crate::generate::ManifestGenerator;

/// File name of the manifest inside the staging directory.
pub const PXML_FILENAME: &str = "PXML.xml";

/// The parts of a PXML document the packager uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// `appdata`, else `id`, else `None`.
    pub app_id: Option<String>,
    /// `<icon src>` relative to the staging root.
    pub icon: Option<String>,
    /// `<info src>` relative to the staging root.
    pub info: Option<String>,
}

impl Manifest {
    /// Parse PXML text. `origin` is only used in error messages.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ManifestError> {
        let doc = roxmltree::Document::parse(text).map_err(|e| ManifestError::Malformed {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

        let application = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "application")
            .ok_or_else(|| ManifestError::MissingApplication {
                path: origin.to_path_buf(),
            })?;

        let app_id = non_empty(application.attribute("appdata"))
            .or_else(|| non_empty(application.attribute("id")));

        let child_src = |name: &str| {
            application
                .children()
                .find(|n| n.is_element() && n.tag_name().name() == name)
                .and_then(|n| non_empty(n.attribute("src")))
        };

        Ok(Self {
            app_id,
            icon: child_src("icon"),
            info: child_src("info"),
        })
    }

    /// Read and parse a PXML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading PXML '{}'", path.display()))?;
        Ok(Self::parse(&text, path)?)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `fs::copy` onto itself truncates the source before reading it.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// A manifest that has been placed in the staging directory and parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedManifest {
    /// Absolute path of `<staging>/PXML.xml`.
    pub path: PathBuf,
    pub manifest: Manifest,
}

/// Place the manifest in `staging_dir` and parse it.
///
/// With `supplied`, its bytes are copied verbatim. Without it, `generator`
/// writes a fresh manifest, overwriting any stale one.
pub fn resolve(
    supplied: Option<&Path>,
    staging_dir: &Path,
    generator: &dyn ManifestGenerator,
) -> Result<ResolvedManifest> {
    let target = staging_dir.join(PXML_FILENAME);

    match supplied {
        Some(src) if is_same_file(src, &target) => {
            info!("Using PXML already in place at {}", target.display());
        }
        Some(src) => {
            info!("Copying PXML from {}", src.display());
            fs::copy(src, &target).with_context(|| {
                format!("copying PXML '{}' to '{}'", src.display(), target.display())
            })?;
        }
        None => {
            info!("Generating PXML with {}", generator.name());
            generator
                .generate(&target, true)
                .with_context(|| format!("generating PXML at '{}'", target.display()))?;
        }
    }

    let path = fs::canonicalize(&target)
        .with_context(|| format!("resolving PXML path '{}'", target.display()))?;
    let manifest = Manifest::from_file(&path)?;
    debug!(?manifest, "parsed PXML");

    Ok(ResolvedManifest { path, manifest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistMetadata;
    use crate::generate::MetadataGenerator;
    use tempfile::TempDir;

    fn parse(text: &str) -> Result<Manifest, ManifestError> {
        Manifest::parse(text, Path::new("PXML.xml"))
    }

    #[test]
    fn appdata_preferred_over_id() {
        let m = parse(r#"<PXML><application id="baz" appdata="bar"/></PXML>"#).unwrap();
        assert_eq!(m.app_id.as_deref(), Some("bar"));
    }

    #[test]
    fn empty_appdata_falls_back_to_id() {
        let m = parse(r#"<PXML><application id="baz" appdata=""/></PXML>"#).unwrap();
        assert_eq!(m.app_id.as_deref(), Some("baz"));
    }

    #[test]
    fn no_identifier_is_none() {
        let m = parse("<PXML><application/></PXML>").unwrap();
        assert_eq!(m, Manifest::default());
    }

    #[test]
    fn icon_and_info_sources_are_read() {
        let m = parse(
            r#"<PXML xmlns="http://openpandora.org/namespaces/PXML">
                 <application id="hello">
                   <title lang="en_US">Hello</title>
                   <icon src="icon.png"/>
                   <info name="Help" type="text/html" src="docs/index.html"/>
                 </application>
               </PXML>"#,
        )
        .unwrap();
        assert_eq!(m.app_id.as_deref(), Some("hello"));
        assert_eq!(m.icon.as_deref(), Some("icon.png"));
        assert_eq!(m.info.as_deref(), Some("docs/index.html"));
    }

    #[test]
    fn missing_application_is_an_error() {
        let err = parse("<PXML><package id=\"x\"/></PXML>").unwrap_err();
        assert!(matches!(err, ManifestError::MissingApplication { .. }));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = parse("<PXML><application id=\"x\"></PXML>").unwrap_err();
        assert!(matches!(err, ManifestError::Malformed { .. }));
    }

    #[test]
    fn resolve_copies_supplied_manifest_verbatim() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("build_pnd");
        fs::create_dir_all(&staging).unwrap();
        let src = temp.path().join("my.xml");
        let text = "<PXML>\n  <application appdata=\"bar\"><icon src=\"i.png\"/></application>\n</PXML>\n";
        fs::write(&src, text).unwrap();

        let generator = MetadataGenerator::new(DistMetadata::default());
        let resolved = resolve(Some(src.as_path()), &staging, &generator).unwrap();

        assert!(resolved.path.is_absolute());
        assert_eq!(fs::read_to_string(&resolved.path).unwrap(), text);
        assert_eq!(resolved.manifest.app_id.as_deref(), Some("bar"));
        assert_eq!(resolved.manifest.icon.as_deref(), Some("i.png"));
    }

    #[test]
    fn resolve_generates_over_stale_manifest() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("build_pnd");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join(PXML_FILENAME), "stale, not xml").unwrap();

        let generator = MetadataGenerator::new(DistMetadata {
            name: "Hello World".to_string(),
            ..Default::default()
        });
        let resolved = resolve(None, &staging, &generator).unwrap();

        assert_eq!(resolved.manifest.app_id.as_deref(), Some("Hello-World"));
    }

    #[test]
    fn resolve_keeps_manifest_already_in_staging() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("build_pnd");
        fs::create_dir_all(&staging).unwrap();
        let in_place = staging.join(PXML_FILENAME);
        let text = "<PXML><application id=\"bar\"/></PXML>";
        fs::write(&in_place, text).unwrap();

        let generator = MetadataGenerator::new(DistMetadata::default());
        let resolved = resolve(Some(in_place.as_path()), &staging, &generator).unwrap();

        assert_eq!(fs::read_to_string(&in_place).unwrap(), text);
        assert_eq!(resolved.manifest.app_id.as_deref(), Some("bar"));
    }

    #[test]
    fn resolve_keeps_manifest_reached_through_relative_segments() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("build_pnd");
        fs::create_dir_all(&staging).unwrap();
        let text = "<PXML><application appdata=\"baz\"/></PXML>";
        fs::write(staging.join(PXML_FILENAME), text).unwrap();
        let roundabout = staging.join("..").join("build_pnd").join(PXML_FILENAME);

        let generator = MetadataGenerator::new(DistMetadata::default());
        let resolved = resolve(Some(roundabout.as_path()), &staging, &generator).unwrap();

        assert_eq!(fs::read_to_string(staging.join(PXML_FILENAME)).unwrap(), text);
        assert_eq!(resolved.manifest.app_id.as_deref(), Some("baz"));
    }
}
