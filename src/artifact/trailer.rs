//! PND trailer handling.
//!
//! A finished package is laid out as:
//!
//! ```text
//! <filesystem image bytes><PXML bytes>[<icon bytes>]
//! ```
//!
//! The order is a contract with the platform's package loader. The image
//! itself is not self-delimiting inside the package, so readers locate the
//! PXML by scanning backwards from the end of the file.

use anyhow::{bail, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

const PXML_OPEN: &[u8] = b"<PXML";
const PXML_CLOSE: &[u8] = b"</PXML>";
const INITIAL_SCAN_WINDOW: u64 = 64 * 1024;

/// Append the manifest and, if given, the icon to `output`.
///
/// The files are opened and closed within this call. A missing `output` is
/// created, so a tolerated tool failure that wrote nothing still yields a
/// package holding only the trailer. A failure leaves the package invalid
/// and is reported with the I/O cause.
pub fn append(output: &Path, manifest: &Path, icon: Option<&Path>) -> Result<()> {
    let mut pnd = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output)
        .with_context(|| format!("opening '{}' for append", output.display()))?;

    append_file(&mut pnd, manifest)
        .with_context(|| format!("appending PXML '{}' to '{}'", manifest.display(), output.display()))?;

    if let Some(icon) = icon {
        append_file(&mut pnd, icon)
            .with_context(|| format!("appending icon '{}' to '{}'", icon.display(), output.display()))?;
    }

    pnd.flush()
        .with_context(|| format!("flushing '{}'", output.display()))?;
    Ok(())
}

fn append_file(pnd: &mut File, src: &Path) -> io::Result<u64> {
    let mut reader = File::open(src)?;
    io::copy(&mut reader, pnd)
}

/// Extract the PXML document embedded in a finished package.
///
/// Returns the bytes from the last `<PXML` up to and including the matching
/// `</PXML>`. Any XML declaration before the root element is not included.
pub fn read_manifest(package: &Path) -> Result<String> {
    let meta = fs::metadata(package)
        .with_context(|| format!("reading metadata of '{}'", package.display()))?;
    if !meta.is_file() {
        bail!(
            "'{}' is not a package file (directory-copy packages carry no trailer)",
            package.display()
        );
    }
    let len = meta.len();
    let mut file =
        File::open(package).with_context(|| format!("opening '{}'", package.display()))?;

    let mut window = INITIAL_SCAN_WINDOW.min(len);
    loop {
        let start = len - window;
        let mut buf = Vec::with_capacity(window as usize);
        file.seek(SeekFrom::Start(start))?;
        (&mut file).take(window).read_to_end(&mut buf)?;

        if let Some(span) = find_pxml(&buf) {
            return String::from_utf8(buf[span.0..span.1].to_vec())
                .with_context(|| format!("PXML in '{}' is not valid UTF-8", package.display()));
        }
        if window == len {
            bail!("no PXML trailer found in '{}'", package.display());
        }
        window = (window * 2).min(len);
    }
}

fn find_pxml(buf: &[u8]) -> Option<(usize, usize)> {
    let close = rfind(buf, PXML_CLOSE)?;
    let open = rfind(&buf[..close], PXML_OPEN)?;
    Some((open, close + PXML_CLOSE.len()))
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| &haystack[i..i + needle.len()] == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PXML: &str = "<?xml version=\"1.0\"?>\n<PXML><application id=\"demo\"/></PXML>\n";

    #[test]
    fn appends_manifest_then_icon() {
        let temp = TempDir::new().unwrap();
        let pnd = temp.path().join("app.pnd");
        let pxml = temp.path().join("PXML.xml");
        let icon = temp.path().join("icon.png");
        fs::write(&pnd, b"IMAGE").unwrap();
        fs::write(&pxml, PXML).unwrap();
        fs::write(&icon, b"\x89PNG-bytes").unwrap();

        append(&pnd, &pxml, Some(icon.as_path())).unwrap();

        let mut expected = b"IMAGE".to_vec();
        expected.extend_from_slice(PXML.as_bytes());
        expected.extend_from_slice(b"\x89PNG-bytes");
        assert_eq!(fs::read(&pnd).unwrap(), expected);
    }

    #[test]
    fn appends_manifest_only_without_icon() {
        let temp = TempDir::new().unwrap();
        let pnd = temp.path().join("app.pnd");
        let pxml = temp.path().join("PXML.xml");
        fs::write(&pnd, b"IMAGE").unwrap();
        fs::write(&pxml, PXML).unwrap();

        append(&pnd, &pxml, None).unwrap();

        assert_eq!(fs::read(&pnd).unwrap(), format!("IMAGE{PXML}").into_bytes());
    }

    #[test]
    fn append_fails_when_icon_missing() {
        let temp = TempDir::new().unwrap();
        let pnd = temp.path().join("app.pnd");
        let pxml = temp.path().join("PXML.xml");
        fs::write(&pnd, b"IMAGE").unwrap();
        fs::write(&pxml, PXML).unwrap();

        let gone = temp.path().join("gone.png");
        let err = append(&pnd, &pxml, Some(gone.as_path())).unwrap_err();
        assert!(format!("{err:#}").contains("appending icon"));
    }

    #[test]
    fn append_creates_missing_package() {
        let temp = TempDir::new().unwrap();
        let pxml = temp.path().join("PXML.xml");
        fs::write(&pxml, PXML).unwrap();
        let pnd = temp.path().join("missing.pnd");

        append(&pnd, &pxml, None).unwrap();

        assert_eq!(fs::read_to_string(&pnd).unwrap(), PXML);
    }

    #[test]
    fn append_fails_when_package_dir_missing() {
        let temp = TempDir::new().unwrap();
        let pxml = temp.path().join("PXML.xml");
        fs::write(&pxml, PXML).unwrap();

        let err = append(&temp.path().join("no/such/dir/app.pnd"), &pxml, None).unwrap_err();
        assert!(format!("{err:#}").contains("for append"));
    }

    #[test]
    fn reads_manifest_back_past_icon_bytes() {
        let temp = TempDir::new().unwrap();
        let pnd = temp.path().join("app.pnd");
        let mut bytes = vec![0u8; 200 * 1024];
        bytes.extend_from_slice(PXML.as_bytes());
        bytes.extend(std::iter::repeat(0xAB).take(100 * 1024));
        fs::write(&pnd, bytes).unwrap();

        let found = read_manifest(&pnd).unwrap();
        assert_eq!(found, "<PXML><application id=\"demo\"/></PXML>");
    }

    #[test]
    fn read_manifest_without_trailer_fails() {
        let temp = TempDir::new().unwrap();
        let pnd = temp.path().join("app.pnd");
        fs::write(&pnd, b"just an image").unwrap();

        let err = read_manifest(&pnd).unwrap_err();
        assert!(err.to_string().contains("no PXML trailer"));
    }
}
