//! Preflight checks for the image tools.
//!
//! Reports which of `mksquashfs` / `mkisofs` can be found before a build
//! runs, and what `--format auto` would end up producing on this host.
//!
//! # Example
//!
//! ```rust
//! use pnd_builder::config::ToolPaths;
//! use pnd_builder::preflight::{auto_strategy, check_image_tools};
//!
//! let checks = check_image_tools(&ToolPaths::default());
//! for check in &checks {
//!     println!("{}", check);
//! }
//! println!("auto would use {}", auto_strategy(&checks));
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::artifact::ImageStrategy;
use crate::config::ToolPaths;

/// Whether one tool resolves on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCheck {
    pub strategy: ImageStrategy,
    /// Program as configured.
    pub program: PathBuf,
    /// Where it resolved, `None` when missing.
    pub resolved: Option<PathBuf>,
    /// Distribution package usually providing it.
    pub package: &'static str,
}

impl ToolCheck {
    pub fn found(&self) -> bool {
        self.resolved.is_some()
    }
}

impl fmt::Display for ToolCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resolved {
            Some(path) => write!(
                f,
                "  [OK]      {:<10} {}",
                self.strategy.to_string(),
                path.display()
            ),
            None => write!(
                f,
                "  [MISSING] {:<10} {} (install: {})",
                self.strategy.to_string(),
                self.program.display(),
                self.package
            ),
        }
    }
}

/// Check if a program resolves, either as a path or through `PATH`.
pub fn command_exists(program: &Path) -> bool {
    which::which(program).is_ok()
}

/// Check every image tool, in the order `auto` tries them.
pub fn check_image_tools(tools: &ToolPaths) -> Vec<ToolCheck> {
    [
        (ImageStrategy::Squashfs, &tools.mksquashfs, "squashfs-tools"),
        (ImageStrategy::Isofs, &tools.mkisofs, "genisoimage"),
    ]
    .into_iter()
    .map(|(strategy, program, package)| ToolCheck {
        strategy,
        program: program.clone(),
        resolved: which::which(program).ok(),
        package,
    })
    .collect()
}

/// Strategy `auto` would pick given these checks.
pub fn auto_strategy(checks: &[ToolCheck]) -> ImageStrategy {
    checks
        .iter()
        .find(|c| c.found())
        .map(|c| c.strategy)
        .unwrap_or(ImageStrategy::RawCopy)
}
