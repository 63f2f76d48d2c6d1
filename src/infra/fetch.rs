// ============================================================
// Layer 6 — Archive Fetcher
// ============================================================
// Makes sure the dataset archive exists locally.
//
//   archive present  → nothing to do
//   archive missing  → download from the configured URL into
//                      `<archive>.part`, then rename into place
//   no URL given     → error
//
// The rename means an interrupted download never leaves a
// truncated archive behind under the real name.
//
// Reference: ureq crate documentation

use std::{
    fs::{self, File},
    io::{copy, Read},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};

/// Download `url` to `archive` unless the file already exists.
/// Returns true if a download happened.
pub fn ensure_archive(archive: &Path, url: Option<&str>) -> Result<bool> {
    if archive.exists() {
        tracing::debug!("Archive already present at '{}'", archive.display());
        return Ok(false);
    }

    let Some(url) = url else {
        bail!(
            "Archive '{}' not found and no --archive-url was given",
            archive.display()
        );
    };

    if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }

    tracing::info!("Downloading {} → '{}'", url, archive.display());
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("Failed to download {url}"))?;

    if response.status() != 200 {
        bail!("Download of {} failed with status {}", url, response.status());
    }

    let bytes = write_through_partial(&mut response.into_reader(), archive)?;

    tracing::info!("Downloaded {} bytes", bytes);
    Ok(true)
}

/// Stream `reader` into `<archive>.part`, then rename it to `archive`.
/// On a failed write the partial file is removed.
fn write_through_partial<R: Read>(reader: &mut R, archive: &Path) -> Result<u64> {
    let partial = partial_path(archive);
    let mut file = File::create(&partial)
        .with_context(|| format!("Cannot create '{}'", partial.display()))?;
    let copied = copy(reader, &mut file);
    drop(file);

    let bytes = match copied {
        Ok(bytes) => bytes,
        Err(err) => {
            if let Err(cleanup) = fs::remove_file(&partial) {
                tracing::warn!("Cannot remove '{}': {}", partial.display(), cleanup);
            }
            return Err(err).with_context(|| format!("Failed while writing '{}'", partial.display()));
        }
    };

    fs::rename(&partial, archive)
        .with_context(|| format!("Cannot move download into '{}'", archive.display()))?;
    Ok(bytes)
}

/// `<archive>.part`, next to the archive.
fn partial_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_archive_is_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cifar.npz");
        fs::write(&path, b"already here").unwrap();

        // No URL needed when the file exists
        assert!(!ensure_archive(&path, None).unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"already here");
    }

    #[test]
    fn test_partial_file_keeps_archive_extension() {
        let partial = partial_path(Path::new("data/cifar10.npz"));
        assert_eq!(partial, PathBuf::from("data/cifar10.npz.part"));
    }

    /// Yields a few bytes, then fails like a dropped connection.
    struct BrokenReader {
        sent: bool,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"PK\x03\x04");
            Ok(4)
        }
    }

    #[test]
    fn test_completed_write_lands_under_archive_name() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("cifar10.npz");
        let bytes = write_through_partial(&mut &b"npz bytes"[..], &archive).unwrap();

        assert_eq!(bytes, 9);
        assert_eq!(fs::read(&archive).unwrap(), b"npz bytes");
        assert!(!partial_path(&archive).exists());
    }

    #[test]
    fn test_failed_write_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("cifar10.npz");
        assert!(write_through_partial(&mut BrokenReader { sent: false }, &archive).is_err());

        assert!(!archive.exists());
        assert!(!partial_path(&archive).exists());
    }

    #[test]
    fn test_missing_archive_without_url_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_archive(&dir.path().join("missing.npz"), None).unwrap_err();
        assert!(err.to_string().contains("--archive-url"));
    }
}
