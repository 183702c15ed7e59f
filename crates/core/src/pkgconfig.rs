//! Relocation of pkg-config `.pc` files.
//!
//! Prebuilt bundles ship `.pc` files whose `prefix=` points at the machine
//! they were built on. After relocation the first `prefix=` line is rewritten
//! to the install destination; every other byte is left alone.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::{Error, Result};

#[allow(clippy::expect_used)]
static PREFIX_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^prefix=(.*)$").expect("valid prefix pattern"));

/// Directory holding `.pc` files, relative to an install destination.
pub const PKGCONFIG_DIR: &str = "lib/pkgconfig";

/// Rewrite the first `prefix=` line to point at `new_prefix`.
///
/// `lines` are the file's lines with their terminators attached (as produced
/// by [`str::split_inclusive`]); the rewritten line keeps its original
/// terminator, so joining the result reproduces the input byte-for-byte
/// except for that one line.
#[must_use]
pub fn rewrite_prefix(lines: &[&str], new_prefix: &str) -> Vec<String> {
    let mut replaced = false;
    lines
        .iter()
        .map(|line| {
            if replaced {
                return (*line).to_string();
            }
            let (content, terminator) = split_terminator(line);
            if PREFIX_LINE.is_match(content) {
                replaced = true;
                format!("prefix={new_prefix}{terminator}")
            } else {
                (*line).to_string()
            }
        })
        .collect()
}

fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

/// Render a path with `/` separators, as pkg-config expects on every host.
#[must_use]
pub fn posix_path(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    if cfg!(windows) {
        rendered.replace('\\', "/")
    } else {
        rendered.into_owned()
    }
}

/// Patch one `.pc` file in place. Returns whether a prefix line was found.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read as UTF-8 or written back.
pub fn patch_file(path: &Path, new_prefix: &str) -> Result<bool> {
    let original = std::fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))?;
    let lines: Vec<&str> = original.split_inclusive('\n').collect();
    let patched = rewrite_prefix(&lines, new_prefix).concat();

    if patched == original {
        let has_prefix = lines
            .iter()
            .any(|line| PREFIX_LINE.is_match(split_terminator(line).0));
        return Ok(has_prefix);
    }

    std::fs::write(path, patched).map_err(|e| Error::io(e, path, "write"))?;
    Ok(true)
}

/// Point every `<destination>/lib/pkgconfig/*.pc` at `destination`.
///
/// Returns the files that carried a prefix line, in sorted order. A missing
/// pkgconfig directory is not an error; there is simply nothing to patch.
///
/// # Errors
///
/// Returns [`Error::Io`] when a file cannot be patched.
pub fn patch_pc_files(destination: &Path) -> Result<Vec<PathBuf>> {
    let new_prefix = posix_path(destination);
    let pc_dir = destination.join(PKGCONFIG_DIR);
    let pattern = format!(
        "{}/*.pc",
        glob::Pattern::escape(&pc_dir.to_string_lossy())
    );

    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| Error::configuration(format!("Invalid pkgconfig pattern: {e}")))?
        .filter_map(std::result::Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    info!(dir = ?pc_dir, count = files.len(), %new_prefix, "Fixing .pc files");

    let mut patched = Vec::with_capacity(files.len());
    for file in files {
        if patch_file(&file, &new_prefix)? {
            debug!(?file, "Rewrote prefix");
            patched.push(file);
        } else {
            debug!(?file, "No prefix line, left unchanged");
        }
    }
    Ok(patched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CAIRO_PC: &str = "prefix=/home/runner/build/cairo\n\
exec_prefix=${prefix}\n\
libdir=${prefix}/lib\n\
includedir=${prefix}/include\n\
\n\
Name: cairo\n\
Version: 1.18.0\n\
Libs: -L${libdir} -lcairo\n";

    #[test]
    fn test_rewrite_prefix_only_touches_prefix_line() {
        let lines: Vec<&str> = CAIRO_PC.split_inclusive('\n').collect();
        let out = rewrite_prefix(&lines, "C:/cibw/vendor");

        assert_eq!(out[0], "prefix=C:/cibw/vendor\n");
        assert_eq!(&out[1..], &lines[1..]);
    }

    #[test]
    fn test_rewrite_prefix_first_match_only() {
        let lines = ["Name: x\n", "prefix=/a\n", "prefix=/b\n"];
        let out = rewrite_prefix(&lines, "/new");
        assert_eq!(out, vec!["Name: x\n", "prefix=/new\n", "prefix=/b\n"]);
    }

    #[test]
    fn test_rewrite_prefix_keeps_crlf_and_missing_newline() {
        let out = rewrite_prefix(&["prefix=/old\r\n", "Name: y"], "/new");
        assert_eq!(out, vec!["prefix=/new\r\n", "Name: y"]);

        let out = rewrite_prefix(&["prefix=/old"], "/new");
        assert_eq!(out, vec!["prefix=/new"]);
    }

    #[test]
    fn test_rewrite_prefix_ignores_similar_keys() {
        let lines = ["exec_prefix=/old\n", " prefix=/indented\n"];
        let out = rewrite_prefix(&lines, "/new");
        assert_eq!(out, lines);
    }

    #[test]
    fn test_posix_path() {
        assert_eq!(posix_path(Path::new("/opt/vendor")), "/opt/vendor");
        #[cfg(windows)]
        assert_eq!(posix_path(Path::new(r"C:\cibw\vendor")), "C:/cibw/vendor");
    }

    #[test]
    fn test_patch_pc_files() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("vendor");
        let pc_dir = dest.join(PKGCONFIG_DIR);
        std::fs::create_dir_all(&pc_dir).unwrap();
        std::fs::write(pc_dir.join("cairo.pc"), CAIRO_PC).unwrap();
        std::fs::write(pc_dir.join("plain.pc"), "Name: plain\n").unwrap();
        std::fs::write(pc_dir.join("notes.txt"), "prefix=/untouched\n").unwrap();

        let patched = patch_pc_files(&dest).unwrap();

        assert_eq!(patched, vec![pc_dir.join("cairo.pc")]);
        let cairo = std::fs::read_to_string(pc_dir.join("cairo.pc")).unwrap();
        let expected = CAIRO_PC.replacen(
            "prefix=/home/runner/build/cairo",
            &format!("prefix={}", posix_path(&dest)),
            1,
        );
        assert_eq!(cairo, expected);
        assert_eq!(
            std::fs::read_to_string(pc_dir.join("plain.pc")).unwrap(),
            "Name: plain\n"
        );
        assert_eq!(
            std::fs::read_to_string(pc_dir.join("notes.txt")).unwrap(),
            "prefix=/untouched\n"
        );
    }

    #[test]
    fn test_patch_pc_files_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().to_path_buf();
        let pc_dir = dest.join(PKGCONFIG_DIR);
        std::fs::create_dir_all(&pc_dir).unwrap();
        std::fs::write(pc_dir.join("pango.pc"), CAIRO_PC).unwrap();

        let first = patch_pc_files(&dest).unwrap();
        let after_first = std::fs::read(pc_dir.join("pango.pc")).unwrap();
        let second = patch_pc_files(&dest).unwrap();
        let after_second = std::fs::read(pc_dir.join("pango.pc")).unwrap();

        assert_eq!(first, second);
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_patch_pc_files_without_pkgconfig_dir() {
        let temp = TempDir::new().unwrap();
        assert!(patch_pc_files(temp.path()).unwrap().is_empty());
    }
}
