//! Error types for fetch and install operations

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use crate::install::InstallStage;
use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for fetch and install operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Transport failure while downloading
    #[error("Failed to download {url}: {message}")]
    #[diagnostic(
        code(vendorfetch::download),
        help("Check network connectivity and that the release URL exists")
    )]
    Download {
        /// The URL being downloaded
        url: String,
        /// Error message from the transport
        message: String,
    },

    /// Server answered with a non-success status
    #[error("Failed to download {url} (HTTP {status})")]
    #[diagnostic(code(vendorfetch::http_status))]
    HttpStatus {
        /// The URL being downloaded
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The URL or file name does not name a supported archive
    #[error("Unsupported archive '{name}': expected .tar.gz, .tgz or .zip")]
    #[diagnostic(code(vendorfetch::unsupported_archive))]
    UnsupportedArchive {
        /// Offending URL or file name
        name: String,
    },

    /// The archive could not be read or unpacked
    #[error("Failed to extract {}: {message}", archive.display())]
    #[diagnostic(
        code(vendorfetch::extraction),
        help("The download may be truncated or not an archive of the expected format")
    )]
    Extraction {
        /// Archive being extracted
        archive: PathBuf,
        /// Error message from the archive reader
        message: String,
    },

    /// An expected path was not present after extraction
    #[error("Expected {} to exist after extraction", path.display())]
    #[diagnostic(
        code(vendorfetch::missing_source),
        help("The archive layout does not match the expected top-level directory")
    )]
    MissingSource {
        /// Path that was expected
        path: PathBuf,
    },

    /// A static library does not follow the `lib<name>.a` convention
    #[error("Static library '{file_name}' does not match lib<name>.a")]
    #[diagnostic(code(vendorfetch::library_name))]
    LibraryName {
        /// File name that failed to match
        file_name: String,
    },

    /// A platform tag that cannot be used in a URL or path
    #[error("Invalid platform tag '{tag}'")]
    #[diagnostic(
        code(vendorfetch::platform),
        help("Use a plain architecture tag such as arm64 or x86_64")
    )]
    InvalidPlatform {
        /// The rejected tag
        tag: String,
    },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    #[diagnostic(code(vendorfetch::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// I/O error with the operation and path that failed
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(vendorfetch::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "rename", "remove")
        operation: String,
    },

    /// An install step failed; carries the stage reached before the failure
    #[error("Install aborted after stage '{stage}'")]
    #[diagnostic(code(vendorfetch::aborted))]
    Aborted {
        /// Last stage completed before the failure
        stage: InstallStage,
        /// The failure itself
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a download error
    #[must_use]
    pub fn download(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Download {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an unsupported archive error
    #[must_use]
    pub fn unsupported_archive(name: impl Into<String>) -> Self {
        Self::UnsupportedArchive { name: name.into() }
    }

    /// Create an extraction error
    #[must_use]
    pub fn extraction(archive: impl AsRef<Path>, message: impl ToString) -> Self {
        Self::Extraction {
            archive: archive.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Wrap a failure with the stage the install had reached
    #[must_use]
    pub fn aborted(stage: InstallStage, source: Self) -> Self {
        Self::Aborted {
            stage,
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through [`Error::Aborted`]
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Aborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type for fetch and install operations
pub type Result<T> = std::result::Result<T, Error>;
