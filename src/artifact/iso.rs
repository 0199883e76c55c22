//! ISO9660 image builder.
//!
//! Wraps `mkisofs` with the two-argument form `-o<output> <staging>`.

use std::ffi::OsString;
use std::path::Path;

use crate::process::Cmd;

/// Build the `mkisofs` invocation for `source_dir` → `output`.
pub fn command(program: &Path, source_dir: &Path, output: &Path) -> Cmd {
    let mut out_flag = OsString::from("-o");
    out_flag.push(output.as_os_str());
    Cmd::new(program).arg(out_flag).arg_path(source_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_glued_to_flag() {
        let cmd = command(
            Path::new("mkisofs"),
            Path::new("build_pnd"),
            Path::new("dist/app.pnd"),
        );
        assert_eq!(cmd.display(), "mkisofs -odist/app.pnd build_pnd");
        assert_eq!(cmd.arg_list().len(), 2);
    }
}
