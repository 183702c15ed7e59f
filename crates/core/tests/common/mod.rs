//! Archive fixtures shared by the integration tests.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::Url;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write a gzip tarball holding `files` to `path`.
pub fn write_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).unwrap();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, &content[..]).unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap();
}

/// Write a zip archive holding `files` to `path`.
pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

/// `file://` URL for a local path.
pub fn file_url(path: &Path) -> String {
    Url::from_file_path(path).unwrap().to_string()
}

/// Every file under `root` with its contents, relative paths sorted.
pub fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<_> = walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            (
                e.path().strip_prefix(root).unwrap().to_path_buf(),
                std::fs::read(e.path()).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}

/// Number of entries directly inside `dir`.
pub fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

pub const PANGO_PC: &[u8] = b"prefix=/home/runner/pango\nlibdir=${prefix}/lib\nName: pango\n";
