//! PXML generation when the user does not supply a manifest.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::config::DistMetadata;

/// PXML namespace written into generated manifests.
pub const PXML_NAMESPACE: &str = "http://openpandora.org/namespaces/PXML";

/// Anything that can write a well-formed PXML file.
pub trait ManifestGenerator {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Write a manifest to `output`.
    ///
    /// Without `force`, an existing file at `output` is an error.
    fn generate(&self, output: &Path, force: bool) -> Result<()>;
}

/// Renders a minimal PXML from distribution metadata.
#[derive(Debug, Clone)]
pub struct MetadataGenerator {
    metadata: DistMetadata,
}

impl MetadataGenerator {
    pub fn new(metadata: DistMetadata) -> Self {
        Self { metadata }
    }

    /// The PXML document as text.
    pub fn render(&self) -> String {
        let meta = &self.metadata;
        let id = escape(&meta.fallback_base());
        let (major, minor, release, build) = split_version(&meta.version);

        let mut lines = vec![
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>".to_string(),
            format!("<PXML xmlns=\"{PXML_NAMESPACE}\">"),
            format!("  <application id=\"{id}\" appdata=\"{id}\">"),
        ];
        if let Some(exec) = &meta.exec {
            lines.push(format!("    <exec command=\"{}\"/>", escape(exec)));
        }
        lines.push(format!(
            "    <title lang=\"en_US\">{}</title>",
            escape(&meta.name)
        ));
        if let Some(description) = &meta.description {
            lines.push(format!(
                "    <description lang=\"en_US\">{}</description>",
                escape(description)
            ));
        }
        if let Some(author) = &meta.author {
            lines.push(format!("    <author name=\"{}\"/>", escape(author)));
        }
        lines.push(format!(
            "    <version major=\"{major}\" minor=\"{minor}\" release=\"{release}\" build=\"{build}\"/>"
        ));
        if let Some(icon) = &meta.icon {
            lines.push(format!("    <icon src=\"{}\"/>", escape(icon)));
        }
        lines.push("  </application>".to_string());
        lines.push("</PXML>".to_string());

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

impl ManifestGenerator for MetadataGenerator {
    fn name(&self) -> &str {
        "metadata"
    }

    fn generate(&self, output: &Path, force: bool) -> Result<()> {
        if output.exists() && !force {
            bail!(
                "'{}' already exists; refusing to overwrite without force",
                output.display()
            );
        }
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating '{}'", parent.display()))?;
        }
        fs::write(output, self.render())
            .with_context(|| format!("writing PXML '{}'", output.display()))?;
        Ok(())
    }
}

fn split_version(version: &str) -> (u32, u32, u32, u32) {
    let mut parts = version
        .split('.')
        .map(|p| p.trim().parse::<u32>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
