//! The fetch-and-install procedure.
//!
//! One run walks a fixed sequence of stages:
//!
//! ```text
//! started → downloaded → extracted → relocated → patched
//!         → (tooling-fetched → libraries-renamed) → done
//! ```
//!
//! Any failure stops the run and is reported as [`Error::Aborted`] carrying
//! the last stage that completed. All intermediate files live in a scratch
//! directory which is removed on every exit path, successful or not.

use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, instrument};

use crate::archive::{self, ArchiveFormat};
use crate::config::Config;
use crate::download::Downloader;
use crate::pkgconfig;
use crate::staticlib;
use crate::{Error, Result};

/// Prefix for scratch directory names.
const SCRATCH_PREFIX: &str = "vendorfetch-";

/// Subdirectory of the scratch space archives are unpacked into.
const EXTRACT_DIR: &str = "extracted";

/// Stages of an install, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstallStage {
    /// Scratch space created
    Started,
    /// Archive written to scratch
    Downloaded,
    /// Archive unpacked in scratch
    Extracted,
    /// Destination replaced with the extracted tree
    Relocated,
    /// `.pc` prefixes rewritten
    Patched,
    /// Auxiliary tool archives installed into `bin/`
    ToolingFetched,
    /// Static libraries renamed for MSVC
    LibrariesRenamed,
    /// Finished
    Done,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Started => "started",
            Self::Downloaded => "downloaded",
            Self::Extracted => "extracted",
            Self::Relocated => "relocated",
            Self::Patched => "patched",
            Self::ToolingFetched => "tooling-fetched",
            Self::LibrariesRenamed => "libraries-renamed",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Which part of the extracted archive becomes the destination's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLayout {
    /// The archive's own top-level directory, named after the URL's file
    /// name with its extension stripped
    ArchiveRoot,
    /// A fixed directory inside the archive, e.g. `pango-x64`
    Subdirectory(String),
}

/// An auxiliary executable shipped in its own archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    /// Archive URL
    pub url: String,
    /// Archive format
    pub format: ArchiveFormat,
    /// Path of the executable inside the extracted archive
    pub executable: String,
    /// Additional file names the executable is copied to
    pub aliases: Vec<String>,
}

/// Steps run after the bundle is relocated and patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostInstall {
    /// Install a tool executable into `<destination>/bin`
    Tool(ToolRequest),
    /// Rename `<destination>/lib/lib<name>.a` to `<name>.lib`
    RenameStaticLibraries,
}

/// Everything needed for one install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Bundle archive URL
    pub url: String,
    /// Bundle archive format
    pub format: ArchiveFormat,
    /// Where the payload sits inside the archive
    pub layout: SourceLayout,
    /// Install location; replaced wholesale
    pub destination: PathBuf,
    /// Rewrite `lib/pkgconfig/*.pc` prefixes to the destination
    pub patch_pkgconfig: bool,
    /// Steps after patching
    pub post_install: Vec<PostInstall>,
}

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Install location
    pub destination: PathBuf,
    /// Scratch directory used for the run; already removed
    pub scratch_dir: PathBuf,
    /// Last stage reached
    pub stage: InstallStage,
    /// Top-level entries moved into the destination
    pub entries_moved: usize,
    /// `.pc` files whose prefix was rewritten
    pub patched_pc_files: Vec<PathBuf>,
    /// Installed tool executables and their aliases
    pub installed_tools: Vec<PathBuf>,
    /// `(from, to)` static library renames
    pub renamed_libraries: Vec<(PathBuf, PathBuf)>,
}

impl InstallReport {
    fn new(destination: PathBuf, scratch_dir: PathBuf) -> Self {
        Self {
            destination,
            scratch_dir,
            stage: InstallStage::Started,
            entries_moved: 0,
            patched_pc_files: Vec::new(),
            installed_tools: Vec::new(),
            renamed_libraries: Vec::new(),
        }
    }

    fn advance(&mut self, stage: InstallStage) {
        debug!(from = %self.stage, to = %stage, "Install stage");
        self.stage = stage;
    }
}

/// Runs installs with a shared downloader and scratch location.
#[derive(Debug, Clone)]
pub struct Installer {
    downloader: Downloader,
    scratch_root: Option<PathBuf>,
}

impl Installer {
    /// Create an installer; scratch space goes under `scratch_root`, or the
    /// system temp directory when `None`.
    #[must_use]
    pub fn new(downloader: Downloader, scratch_root: Option<PathBuf>) -> Self {
        Self {
            downloader,
            scratch_root,
        }
    }

    /// Create an installer from loaded configuration.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Downloader::new(&config.download)?,
            config.scratch_root.clone(),
        ))
    }

    fn scratch(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        match &self.scratch_root {
            Some(root) => builder
                .tempdir_in(root)
                .map_err(|e| Error::io(e, root, "create scratch directory")),
            None => builder
                .tempdir()
                .map_err(|e| Error::io_no_path(e, "create scratch directory")),
        }
    }

    /// Download and unpack `url` inside `scratch`, returning the unpack root.
    fn fetch_into(
        &self,
        scratch: &Path,
        url: &str,
        format: ArchiveFormat,
        mut report: Option<&mut InstallReport>,
    ) -> Result<PathBuf> {
        let archive_path = scratch.join(archive::url_file_name(url)?);
        self.downloader.download(url, &archive_path)?;
        if let Some(report) = report.as_deref_mut() {
            report.advance(InstallStage::Downloaded);
        }

        let extract_dir = scratch.join(EXTRACT_DIR);
        archive::extract(&archive_path, format, &extract_dir)?;
        std::fs::remove_file(&archive_path)
            .map_err(|e| Error::io(e, &archive_path, "remove"))?;
        if let Some(report) = report {
            report.advance(InstallStage::Extracted);
        }

        info!(?extract_dir, "Completed extracting");
        Ok(extract_dir)
    }

    /// Download, extract and relocate a bundle, then run its post-install steps.
    ///
    /// The destination is cleared only once the archive has been extracted
    /// and its payload located, so a failed download or a corrupt archive
    /// leaves a previous install in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Aborted`] wrapping the failing step's error.
    #[instrument(
        name = "install",
        skip(self, request),
        fields(url = %request.url, destination = %request.destination.display())
    )]
    pub fn fetch_and_install(&self, request: &InstallRequest) -> Result<InstallReport> {
        let scratch = self.scratch()?;
        let mut report =
            InstallReport::new(request.destination.clone(), scratch.path().to_path_buf());
        debug!(scratch = ?scratch.path(), "Created scratch directory");

        // `scratch` is dropped (and removed) on the error path too
        self.run(request, scratch.path(), &mut report)
            .map_err(|e| Error::aborted(report.stage, e))?;

        scratch
            .close()
            .map_err(|e| Error::io(e, &report.scratch_dir, "remove scratch directory"))?;
        report.advance(InstallStage::Done);
        info!(destination = ?report.destination, "Install complete");
        Ok(report)
    }

    fn run(
        &self,
        request: &InstallRequest,
        scratch: &Path,
        report: &mut InstallReport,
    ) -> Result<()> {
        let extract_dir =
            self.fetch_into(scratch, &request.url, request.format, Some(&mut *report))?;

        let source = match &request.layout {
            SourceLayout::ArchiveRoot => {
                extract_dir.join(archive::infer_archive_root_name(&request.url)?)
            }
            SourceLayout::Subdirectory(name) => extract_dir.join(name),
        };
        if !source.is_dir() {
            return Err(Error::MissingSource { path: source });
        }

        reset_destination(&request.destination, scratch)?;
        info!(from = ?source, to = ?request.destination, "Moving files");
        report.entries_moved = move_contents(&source, &request.destination)?;
        report.advance(InstallStage::Relocated);

        if request.patch_pkgconfig {
            report.patched_pc_files = pkgconfig::patch_pc_files(&request.destination)?;
        }
        report.advance(InstallStage::Patched);

        for step in &request.post_install {
            match step {
                PostInstall::Tool(tool) => {
                    let bin_dir = request.destination.join("bin");
                    let installed = self.install_tool(tool, &bin_dir)?;
                    report.installed_tools.extend(installed);
                    report.advance(InstallStage::ToolingFetched);
                }
                PostInstall::RenameStaticLibraries => {
                    let lib_dir = request.destination.join("lib");
                    let renamed = staticlib::rename_static_libraries(&lib_dir)?;
                    report.renamed_libraries.extend(renamed);
                    report.advance(InstallStage::LibrariesRenamed);
                }
            }
        }

        Ok(())
    }

    /// Fetch a tool archive and place its executable (plus aliases) in `bin_dir`.
    ///
    /// Returns the installed paths, executable first.
    ///
    /// # Errors
    ///
    /// [`Error::MissingSource`] when the executable is not in the archive,
    /// otherwise download, extraction and I/O errors.
    #[instrument(skip(self, tool), fields(url = %tool.url))]
    pub fn install_tool(&self, tool: &ToolRequest, bin_dir: &Path) -> Result<Vec<PathBuf>> {
        info!(executable = %tool.executable, "Getting tool");
        let scratch = self.scratch()?;
        let extract_dir = self.fetch_into(scratch.path(), &tool.url, tool.format, None)?;

        let executable = extract_dir.join(&tool.executable);
        let file_name = match executable.file_name() {
            Some(name) if executable.is_file() => name.to_owned(),
            _ => return Err(Error::MissingSource { path: executable }),
        };

        std::fs::create_dir_all(bin_dir).map_err(|e| Error::io(e, bin_dir, "create"))?;
        let target = bin_dir.join(&file_name);
        if target.exists() {
            std::fs::remove_file(&target).map_err(|e| Error::io(e, &target, "remove"))?;
        }
        move_path(&executable, &target)?;

        let mut installed = vec![target.clone()];
        for alias in &tool.aliases {
            // Copying onto the executable itself would truncate it
            if std::ffi::OsStr::new(alias).eq_ignore_ascii_case(&file_name) {
                continue;
            }
            let alias_path = bin_dir.join(alias);
            debug!(from = ?target, to = ?alias_path, "Aliasing tool");
            std::fs::copy(&target, &alias_path).map_err(|e| Error::io(e, &alias_path, "copy"))?;
            installed.push(alias_path);
        }

        let scratch_path = scratch.path().to_path_buf();
        scratch
            .close()
            .map_err(|e| Error::io(e, scratch_path, "remove scratch directory"))?;
        Ok(installed)
    }
}

/// Remove `destination` if present and recreate it empty.
///
/// An existing directory is only removed when doing so cannot take the
/// working directory or the scratch space with it.
fn reset_destination(destination: &Path, scratch: &Path) -> Result<()> {
    if destination.as_os_str().is_empty() {
        return Err(refuse_destination(destination));
    }

    match std::fs::symlink_metadata(destination) {
        Ok(meta) if meta.is_dir() => {
            ensure_removable(destination, scratch)?;
            info!(?destination, "Destination already exists, clearing it");
            std::fs::remove_dir_all(destination)
                .map_err(|e| Error::io(e, destination, "remove"))?;
        }
        Ok(_) => {
            info!(?destination, "Destination is a file, removing it");
            std::fs::remove_file(destination).map_err(|e| Error::io(e, destination, "remove"))?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io(e, destination, "stat")),
    }

    std::fs::create_dir_all(destination).map_err(|e| Error::io(e, destination, "create"))
}

/// Refuse directories that are a filesystem root or enclose the working
/// directory or `scratch`.
fn ensure_removable(destination: &Path, scratch: &Path) -> Result<()> {
    let resolved = destination
        .canonicalize()
        .map_err(|e| Error::io(e, destination, "resolve"))?;
    let scratch = scratch
        .canonicalize()
        .map_err(|e| Error::io(e, scratch, "resolve"))?;
    let cwd = std::env::current_dir().and_then(|dir| dir.canonicalize()).ok();

    if is_protected(&resolved, cwd.as_deref(), &scratch) {
        return Err(refuse_destination(destination));
    }
    Ok(())
}

fn is_protected(resolved: &Path, cwd: Option<&Path>, scratch: &Path) -> bool {
    resolved.parent().is_none()
        || cwd.is_some_and(|cwd| cwd.starts_with(resolved))
        || scratch.starts_with(resolved)
}

fn refuse_destination(destination: &Path) -> Error {
    Error::configuration(format!(
        "Refusing to clear destination '{}'",
        destination.display()
    ))
}

/// Move every entry of `source` into `destination`; returns the entry count.
fn move_contents(source: &Path, destination: &Path) -> Result<usize> {
    let mut entries = std::fs::read_dir(source)
        .map_err(|e| Error::io(e, source, "read"))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::io(e, source, "read"))?;
    entries.sort();

    for entry in &entries {
        let Some(name) = entry.file_name() else {
            continue;
        };
        let target = destination.join(name);
        debug!(from = ?entry, to = ?target, "Moving");
        move_path(entry, &target)?;
    }
    Ok(entries.len())
}

/// Rename, falling back to copy-and-delete across filesystems.
fn move_path(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }

    debug!(?from, ?to, "Rename failed, copying instead");
    copy_tree(from, to)?;
    if from.is_dir() {
        std::fs::remove_dir_all(from).map_err(|e| Error::io(e, from, "remove"))
    } else {
        std::fs::remove_file(from).map_err(|e| Error::io(e, from, "remove"))
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| Error::io(e.into(), from, "walk"))?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = if relative.as_os_str().is_empty() {
            to.to_path_buf()
        } else {
            to.join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| Error::io(e, &target, "create"))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| Error::io(e, &target, "copy"))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let link = std::fs::read_link(from).map_err(|e| Error::io(e, from, "read link"))?;
    std::os::unix::fs::symlink(link, to).map_err(|e| Error::io(e, to, "symlink"))
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| Error::io(e, to, "copy"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stage_order_and_display() {
        assert!(InstallStage::Started < InstallStage::Downloaded);
        assert!(InstallStage::Patched < InstallStage::ToolingFetched);
        assert!(InstallStage::LibrariesRenamed < InstallStage::Done);
        assert_eq!(InstallStage::ToolingFetched.to_string(), "tooling-fetched");
    }

    #[test]
    fn test_reset_destination_replaces_contents() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("vendor");
        std::fs::create_dir_all(dest.join("stale/nested")).unwrap();
        std::fs::write(dest.join("stale/nested/old.txt"), b"old").unwrap();

        reset_destination(&dest, &scratch_in(&temp)).unwrap();

        assert!(dest.is_dir());
        assert_eq!(std::fs::read_dir(&dest).unwrap().count(), 0);
    }

    #[test]
    fn test_reset_destination_replaces_file() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("vendor");
        std::fs::write(&dest, b"file").unwrap();

        reset_destination(&dest, &scratch_in(&temp)).unwrap();
        assert!(dest.is_dir());
    }

    fn scratch_in(temp: &TempDir) -> PathBuf {
        let scratch = temp.path().join("scratch");
        std::fs::create_dir_all(&scratch).unwrap();
        scratch
    }

    #[test]
    fn test_reset_destination_refuses_root() {
        let temp = TempDir::new().unwrap();
        let scratch = scratch_in(&temp);
        assert!(matches!(
            reset_destination(Path::new("/"), &scratch),
            Err(Error::Configuration { .. })
        ));
        assert!(reset_destination(Path::new(""), &scratch).is_err());
    }

    #[test]
    fn test_reset_destination_refuses_working_directory() {
        let temp = TempDir::new().unwrap();
        let scratch = scratch_in(&temp);
        let cwd = std::env::current_dir().unwrap();
        let marker = cwd.join("Cargo.toml");

        for destination in [Path::new("."), Path::new(".."), cwd.as_path()] {
            assert!(matches!(
                reset_destination(destination, &scratch),
                Err(Error::Configuration { .. })
            ));
        }
        assert!(marker.is_file());
    }

    #[test]
    fn test_reset_destination_refuses_scratch_parent() {
        let temp = TempDir::new().unwrap();
        let scratch = scratch_in(&temp);
        std::fs::write(temp.path().join("keep.txt"), b"keep").unwrap();

        let result = reset_destination(temp.path(), &scratch);

        assert!(matches!(result, Err(Error::Configuration { .. })));
        assert!(temp.path().join("keep.txt").is_file());
        assert!(scratch.is_dir());
    }

    #[test]
    fn test_is_protected() {
        let cwd = Path::new("/home/user/project");
        let scratch = Path::new("/tmp/vendorfetch-abc");

        assert!(is_protected(Path::new("/"), Some(cwd), scratch));
        assert!(is_protected(Path::new("/home/user"), Some(cwd), scratch));
        assert!(is_protected(cwd, Some(cwd), scratch));
        assert!(is_protected(Path::new("/tmp"), Some(cwd), scratch));
        assert!(!is_protected(Path::new("/home/user/project/out"), Some(cwd), scratch));
        assert!(!is_protected(Path::new("/opt/vendor"), None, scratch));
    }

    #[test]
    fn test_move_contents() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        std::fs::create_dir_all(source.join("lib/pkgconfig")).unwrap();
        std::fs::write(source.join("lib/pkgconfig/a.pc"), b"prefix=/x\n").unwrap();
        std::fs::write(source.join("README"), b"r").unwrap();
        let dest = temp.path().join("dest");
        std::fs::create_dir(&dest).unwrap();

        let moved = move_contents(&source, &dest).unwrap();

        assert_eq!(moved, 2);
        assert!(dest.join("lib/pkgconfig/a.pc").is_file());
        assert!(dest.join("README").is_file());
        assert_eq!(std::fs::read_dir(&source).unwrap().count(), 0);
    }

    #[test]
    fn test_copy_tree_then_remove() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("tree");
        std::fs::create_dir_all(source.join("a/b")).unwrap();
        std::fs::write(source.join("a/b/c.txt"), b"c").unwrap();
        let dest = temp.path().join("copy");

        copy_tree(&source, &dest).unwrap();

        assert_eq!(std::fs::read(dest.join("a/b/c.txt")).unwrap(), b"c");
        assert!(source.join("a/b/c.txt").exists());
    }
}
