//! Static library renaming for MSVC-style linkers.
//!
//! Meson builds with MSVC still emit `libcairo.a`, while setuptools and the
//! MSVC linker look for `cairo.lib`.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::{Error, Result};

#[allow(clippy::expect_used)]
static LIB_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^lib(?P<name>\S+)\.a$").expect("valid library pattern"));

/// `lib<name>.a` becomes `<name>.lib`.
///
/// # Errors
///
/// Returns [`Error::LibraryName`] for any name not of that shape.
pub fn msvc_library_name(file_name: &str) -> Result<String> {
    LIB_NAME
        .captures(file_name)
        .and_then(|caps| caps.name("name"))
        .map(|name| format!("{}.lib", name.as_str()))
        .ok_or_else(|| Error::LibraryName {
            file_name: file_name.to_string(),
        })
}

/// Rename every `*.a` directly inside `lib_dir` to its MSVC name.
///
/// All names are validated before anything is renamed, so a single
/// non-conforming file aborts the pass with the directory untouched.
/// Returns the `(from, to)` pairs in sorted order.
///
/// # Errors
///
/// [`Error::LibraryName`] for a non-conforming name, [`Error::Io`] when the
/// directory cannot be listed or a rename fails.
pub fn rename_static_libraries(lib_dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let entries = std::fs::read_dir(lib_dir).map_err(|e| Error::io(e, lib_dir, "read"))?;

    let mut archives = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(e, lib_dir, "read"))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "a") {
            archives.push(path);
        }
    }
    archives.sort();

    let plan = archives
        .into_iter()
        .map(|from| {
            let file_name = from
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let to = lib_dir.join(msvc_library_name(&file_name)?);
            Ok((from, to))
        })
        .collect::<Result<Vec<_>>>()?;

    info!(dir = ?lib_dir, count = plan.len(), "Renaming static libraries");
    for (from, to) in &plan {
        debug!(?from, ?to, "Renaming");
        std::fs::rename(from, to).map_err(|e| Error::io(e, from, "rename"))?;
    }

    Ok(plan)
}
