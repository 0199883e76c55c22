//! Squashfs image builder.
//!
//! Wraps `mksquashfs`. The argument form matches the platform's reference
//! `pnd_make.sh`:
//!
//! ```text
//! mksquashfs <staging> <output> -nopad -no-recovery -noappend
//! ```
//!
//! The PXML trailer starts right where the image ends.

use std::path::Path;

use crate::process::Cmd;

/// Flags passed after the source and destination.
pub const SQUASHFS_FLAGS: &[&str] = &["-nopad", "-no-recovery", "-noappend"];

/// Build the `mksquashfs` invocation for `source_dir` → `output`.
pub fn command(program: &Path, source_dir: &Path, output: &Path) -> Cmd {
    Cmd::new(program)
        .arg_path(source_dir)
        .arg_path(output)
        .args(SQUASHFS_FLAGS)
}
