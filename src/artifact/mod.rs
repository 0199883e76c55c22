//! Image builders for PND packages.
//!
//! - [`filesystem`] - Directory copying and atomic moves
//! - [`squashfs`] - `mksquashfs` invocation
//! - [`iso`] - `mkisofs` invocation
//! - [`trailer`] - Appending and locating the PXML/icon trailer
//!
//! [`ImageBuilder`] picks a strategy from an [`ImageFormat`]. `auto` walks the
//! chain squashfs → isofs → raw copy and only moves on when a tool cannot be
//! launched at all; a tool that starts and then fails is not "absent".

pub mod filesystem;
pub mod iso;
pub mod squashfs;
pub mod trailer;

use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::ToolPaths;
use crate::error::ConfigError;
use crate::process::Cmd;
use filesystem::copy_dir_recursive;

/// Package format requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Squashfs,
    Isofs,
    /// Copy the staging directory verbatim.
    None,
    /// Try squashfs, then isofs, then fall back to a copy.
    Auto,
}

impl ImageFormat {
    /// Strategies to attempt, in order.
    pub fn strategies(self) -> &'static [ImageStrategy] {
        match self {
            ImageFormat::Squashfs => &[ImageStrategy::Squashfs],
            ImageFormat::Isofs => &[ImageStrategy::Isofs],
            ImageFormat::None => &[ImageStrategy::RawCopy],
            ImageFormat::Auto => &[
                ImageStrategy::Squashfs,
                ImageStrategy::Isofs,
                ImageStrategy::RawCopy,
            ],
        }
    }
}

impl FromStr for ImageFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "squashfs" => Ok(ImageFormat::Squashfs),
            "isofs" => Ok(ImageFormat::Isofs),
            "none" => Ok(ImageFormat::None),
            "auto" => Ok(ImageFormat::Auto),
            other => Err(ConfigError::InvalidFormat {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Squashfs => write!(f, "squashfs"),
            ImageFormat::Isofs => write!(f, "isofs"),
            ImageFormat::None => write!(f, "none"),
            ImageFormat::Auto => write!(f, "auto"),
        }
    }
}

/// A single concrete way of turning the staging tree into an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStrategy {
    Squashfs,
    Isofs,
    RawCopy,
}

impl fmt::Display for ImageStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageStrategy::Squashfs => write!(f, "squashfs"),
            ImageStrategy::Isofs => write!(f, "isofs"),
            ImageStrategy::RawCopy => write!(f, "directory copy"),
        }
    }
}

/// What the image builder produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// A single image file; the trailer goes on the end of it.
    Image {
        path: PathBuf,
        strategy: ImageStrategy,
    },
    /// A verbatim copy of the staging tree. Nothing gets appended.
    Directory { path: PathBuf },
}

impl ImageOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ImageOutcome::Image { path, .. } => path,
            ImageOutcome::Directory { path } => path,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ImageOutcome::Image { .. })
    }
}

/// Result of trying one tool-backed strategy.
enum Attempt {
    Built,
    ToolMissing(io::Error),
}

/// Runs the external image tools.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    tools: ToolPaths,
    strict_status: bool,
}

impl ImageBuilder {
    pub fn new(tools: ToolPaths, strict_status: bool) -> Self {
        Self {
            tools,
            strict_status,
        }
    }

    /// Turn `staging_dir` into an artifact at `output`.
    ///
    /// Any stale file or directory at `output` is removed first.
    pub fn build(
        &self,
        staging_dir: &Path,
        output: &Path,
        format: ImageFormat,
    ) -> Result<ImageOutcome> {
        if !staging_dir.is_dir() {
            bail!(
                "staging directory '{}' does not exist; nothing to package",
                staging_dir.display()
            );
        }
        filesystem::remove_path(output)?;
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory '{}'", parent.display()))?;
        }

        let strategies = format.strategies();
        for (idx, strategy) in strategies.iter().enumerate() {
            let cmd = match strategy {
                ImageStrategy::Squashfs => {
                    squashfs::command(&self.tools.mksquashfs, staging_dir, output)
                }
                ImageStrategy::Isofs => iso::command(&self.tools.mkisofs, staging_dir, output),
                ImageStrategy::RawCopy => {
                    info!(
                        "Copying {} to {}",
                        staging_dir.display(),
                        output.display()
                    );
                    copy_dir_recursive(staging_dir, output)?;
                    return Ok(ImageOutcome::Directory {
                        path: output.to_path_buf(),
                    });
                }
            };

            match self.attempt(&cmd)? {
                Attempt::Built => {
                    return Ok(ImageOutcome::Image {
                        path: output.to_path_buf(),
                        strategy: *strategy,
                    })
                }
                Attempt::ToolMissing(err) => {
                    let program = cmd.program().to_string_lossy().into_owned();
                    match strategies.get(idx + 1) {
                        Some(next) => {
                            warn!("{} not found ({}). Trying {}.", program, err, next);
                        }
                        None => bail!(
                            "{} not found ({}); install it or choose another format",
                            program,
                            err
                        ),
                    }
                }
            }
        }

        unreachable!("every format ends in a terminal strategy or bails")
    }

    fn attempt(&self, cmd: &Cmd) -> Result<Attempt> {
        debug!("running {}", cmd.display());
        match cmd.launch() {
            Ok(status) => {
                self.check_status(cmd, status)?;
                Ok(Attempt::Built)
            }
            Err(err) => Ok(Attempt::ToolMissing(err)),
        }
    }

    fn check_status(&self, cmd: &Cmd, status: ExitStatus) -> Result<()> {
        if status.success() {
            return Ok(());
        }
        if self.strict_status {
            bail!("'{}' failed with {}", cmd.display(), status);
        }
        warn!(
            "'{}' exited with {}; continuing because strict tool status is off",
            cmd.display(),
            status
        );
        Ok(())
    }
}
