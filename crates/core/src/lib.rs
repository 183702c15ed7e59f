//! Fetch, extract and relocate prebuilt library bundles.
//!
//! This crate implements the procedure behind the `vendorfetch` CLI:
//! - Download an archive (streaming, with timeouts) into scratch space
//! - Unpack gzip tarballs or zip files
//! - Replace a destination directory with the archive's payload
//! - Point pkg-config `.pc` files at the new location
//! - Optionally install a helper tool and rename static libraries for MSVC
//!
//! # Example
//!
//! ```ignore
//! use vendorfetch_core::{Config, Installer, bundle};
//!
//! let config = Config::load(None)?;
//! let installer = Installer::from_config(&config)?;
//! let report = bundle::install_macos_bundle(&installer, &config.macos, "arm64")?;
//! println!("installed into {}", report.destination.display());
//! ```

#![warn(missing_docs)]

pub mod archive;
pub mod bundle;
pub mod config;
pub mod download;
mod error;
pub mod install;
pub mod pkgconfig;
pub mod platform;
pub mod staticlib;

pub use archive::{ArchiveFormat, infer_archive_root_name};
pub use config::{Config, DownloadConfig, MacosConfig, WindowsConfig};
pub use download::Downloader;
pub use error::{Error, Result};
pub use install::{
    InstallReport, InstallRequest, InstallStage, Installer, PostInstall, SourceLayout, ToolRequest,
};
pub use platform::WordSize;
