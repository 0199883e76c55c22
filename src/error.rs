//! Typed errors for the two failure classes callers match on.
//!
//! Everything else flows through `anyhow::Result` with context attached at
//! the failing I/O step.

use std::path::PathBuf;
use thiserror::Error;

/// Problems detected while building a [`crate::config::BuildConfig`].
///
/// These are always raised before the staging directory is touched.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `format` was not one of squashfs, isofs, none or auto.
    #[error("{value} is not a valid package format. Use squashfs, isofs, none, or auto")]
    InvalidFormat { value: String },

    /// An explicit PXML file was given but does not exist.
    #[error("PXML file {} does not exist", path.display())]
    MissingManifest { path: PathBuf },

    /// The config file could not be read.
    #[error("reading config file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this tool.
    #[error("parsing config file '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// An explicit package name that is not a plain file name.
    #[error("package name '{name}' must be a plain file name inside the output directory")]
    InvalidOutputName { name: String },

    /// `[install]` mixes a command with per-category source lists.
    #[error("[install] accepts either `command` or `libs`/`scripts`/`data`, not both")]
    ConflictingInstall,
}

/// Problems with the PXML manifest once it sits in the staging directory.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The document is not well-formed XML.
    #[error("malformed PXML '{}': {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    /// The document has no `application` element.
    #[error("PXML '{}' has no <application> element", path.display())]
    MissingApplication { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_format_names_the_choices() {
        let err = ConfigError::InvalidFormat {
            value: "zip".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("zip is not a valid package format"));
        assert!(msg.contains("squashfs, isofs, none, or auto"));
    }

    #[test]
    fn missing_manifest_names_the_path() {
        let err = ConfigError::MissingManifest {
            path: PathBuf::from("nope/PXML.xml"),
        };
        assert_eq!(err.to_string(), "PXML file nope/PXML.xml does not exist");
    }

    #[test]
    fn invalid_output_name_quotes_the_name() {
        let err = ConfigError::InvalidOutputName {
            name: "../up.pnd".to_string(),
        };
        assert!(err.to_string().starts_with("package name '../up.pnd'"));
    }
}
