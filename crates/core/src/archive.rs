//! Archive naming and extraction.
//!
//! Two container formats are understood: gzip-compressed tarballs and zip
//! files. The format is always chosen by the caller (from the variant being
//! installed or from the URL's file name), never sniffed from content.

use flate2::read::GzDecoder;
use reqwest::Url;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tar::Archive;
use tracing::{debug, trace};

use crate::{Error, Result};

/// Supported archive container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball (`.tar.gz`, `.tgz`)
    TarGz,
    /// Zip container (`.zip`)
    Zip,
}

/// Recognised compound extensions, longest first so `.tar.gz` wins over `.gz`.
const EXTENSIONS: &[(&str, ArchiveFormat)] = &[
    (".tar.gz", ArchiveFormat::TarGz),
    (".tgz", ArchiveFormat::TarGz),
    (".zip", ArchiveFormat::Zip),
];

impl ArchiveFormat {
    /// Determine the format from a file name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedArchive`] for any other extension.
    pub fn from_file_name(name: &str) -> Result<Self> {
        split_extension(name)
            .map(|(_, format)| format)
            .ok_or_else(|| Error::unsupported_archive(name))
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TarGz => write!(f, "tar.gz"),
            Self::Zip => write!(f, "zip"),
        }
    }
}

fn split_extension(name: &str) -> Option<(&str, ArchiveFormat)> {
    let lower = name.to_ascii_lowercase();
    EXTENSIONS.iter().find_map(|(ext, format)| {
        lower
            .ends_with(ext)
            .then(|| (&name[..name.len() - ext.len()], *format))
    })
}

/// Last non-empty path segment of a URL, ignoring query and fragment.
///
/// # Errors
///
/// Returns [`Error::Configuration`] when the URL cannot be parsed and
/// [`Error::UnsupportedArchive`] when it has no file name.
pub fn url_file_name(url: &str) -> Result<String> {
    let parsed =
        Url::parse(url).map_err(|e| Error::configuration(format!("Invalid URL '{url}': {e}")))?;

    parsed
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(String::from)
        .ok_or_else(|| Error::unsupported_archive(url))
}

/// Name of the directory an archive unpacks into, derived from its URL.
///
/// `https://example.org/foo-1.2.3.tar.gz` gives `foo-1.2.3`; `.tgz` and
/// `.zip` are stripped the same way.
///
/// # Errors
///
/// Fails with [`Error::UnsupportedArchive`] for any other extension or when
/// stripping the extension leaves nothing.
pub fn infer_archive_root_name(url: &str) -> Result<String> {
    let file_name = url_file_name(url)?;
    match split_extension(&file_name) {
        Some((stem, _)) if !stem.is_empty() && stem != "." && stem != ".." => Ok(stem.to_string()),
        _ => Err(Error::unsupported_archive(file_name)),
    }
}

/// Unpack `archive` into `dest`.
///
/// # Errors
///
/// Returns [`Error::Extraction`] when the archive is corrupt or not of the
/// given format, and [`Error::Io`] when files cannot be written.
pub fn extract(archive: &Path, format: ArchiveFormat, dest: &Path) -> Result<()> {
    debug!(?archive, ?dest, %format, "Extracting archive");
    std::fs::create_dir_all(dest).map_err(|e| Error::io(e, dest, "create"))?;

    match format {
        ArchiveFormat::TarGz => extract_tar_gz(archive, dest),
        ArchiveFormat::Zip => extract_zip(archive, dest),
    }
}

fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| Error::io(e, archive_path, "open"))?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut archive = Archive::new(decoder);
    archive.set_preserve_permissions(true);

    // tar::Archive::unpack refuses entries escaping `dest`
    archive
        .unpack(dest)
        .map_err(|e| Error::extraction(archive_path, e))
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| Error::io(e, archive_path, "open"))?;
    let mut archive =
        zip::ZipArchive::new(BufReader::new(file)).map_err(|e| Error::extraction(archive_path, e))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::extraction(archive_path, e))?;

        let Some(relative) = entry.enclosed_name() else {
            trace!(name = entry.name(), "Skipping zip entry with unsafe path");
            continue;
        };
        let outpath = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(|e| Error::io(e, &outpath, "create"))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create"))?;
        }
        let mut out = File::create(&outpath).map_err(|e| Error::io(e, &outpath, "create"))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| Error::extraction(archive_path, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))
                .map_err(|e| Error::io(e, &outpath, "set permissions"))?;
        }
    }

    Ok(())
}
