//! Command dispatch: apply flag overrides to the loaded configuration and
//! run the matching install variant.

use std::path::PathBuf;
use tracing::{info, instrument};
use vendorfetch_core::{Config, InstallReport, Installer, WordSize, bundle};

/// A parsed subcommand with defaults resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Fetch {
        url: String,
        folder: PathBuf,
    },
    Windows {
        version: Option<String>,
        destination: Option<PathBuf>,
        word_size: WordSize,
    },
    Macos {
        platform: String,
        version: Option<String>,
        destination: Option<PathBuf>,
    },
}

impl Command {
    /// Fold this command's overrides into `config`.
    pub fn apply_overrides(&self, config: &mut Config) {
        match self {
            Self::Fetch { .. } => {}
            Self::Windows {
                version,
                destination,
                ..
            } => {
                if let Some(version) = version {
                    config.windows.version.clone_from(version);
                }
                if let Some(destination) = destination {
                    config.windows.destination.clone_from(destination);
                }
            }
            Self::Macos {
                version,
                destination,
                ..
            } => {
                if let Some(version) = version {
                    config.macos.version.clone_from(version);
                }
                if let Some(destination) = destination {
                    config.macos.destination.clone_from(destination);
                }
            }
        }
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Windows { .. } => "windows",
            Self::Macos { .. } => "macos",
        }
    }
}

/// Run `command` against `config` (overrides already applied).
///
/// # Errors
///
/// Propagates configuration and install failures as diagnostics.
#[instrument(skip_all, fields(command = command.name()))]
pub fn execute(command: &Command, config: &Config) -> miette::Result<InstallReport> {
    config.validate()?;
    let installer = Installer::from_config(config)?;

    let report = match command {
        Command::Fetch { url, folder } => bundle::install_generic(&installer, url, folder)?,
        Command::Windows { word_size, .. } => {
            bundle::install_windows_bundle(&installer, &config.windows, *word_size)?
        }
        Command::Macos { platform, .. } => {
            bundle::install_macos_bundle(&installer, &config.macos, platform)?
        }
    };

    log_summary(&report);
    Ok(report)
}

fn log_summary(report: &InstallReport) {
    info!(
        destination = %report.destination.display(),
        entries = report.entries_moved,
        pc_files = report.patched_pc_files.len(),
        tools = report.installed_tools.len(),
        libraries = report.renamed_libraries.len(),
        "Installed bundle"
    );
}
