use crate::commands::Command;
use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vendorfetch_core::WordSize;

#[derive(Parser, Debug)]
#[command(name = "vendorfetch")]
#[command(about = "Download prebuilt library bundles and relocate them for a build toolchain")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "info",
        env = "VENDORFETCH_LOG_LEVEL",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Log line format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,

    #[arg(long, global = true, help = "Output logs in JSON format")]
    pub json: bool,

    #[arg(
        short = 'c',
        long,
        global = true,
        help = "Path to a TOML configuration file",
        env = "VENDORFETCH_CONFIG"
    )]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// `--json` wins over `--log-format`.
    pub const fn tracing_format(&self) -> TracingFormat {
        if self.json {
            TracingFormat::Json
        } else {
            self.log_format
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Fetch a tarball and move its top-level directory's contents into FOLDER")]
    Fetch {
        #[arg(help = "URL of a .tar.gz, .tgz or .zip archive")]
        url: String,
        #[arg(help = "Destination directory, replaced on every run")]
        folder: PathBuf,
    },
    #[command(about = "Install the Windows Pango/Cairo bundle with pkg-config")]
    Windows {
        #[arg(long, help = "Bundle release version (e.g. 1.54.0-v1)")]
        version: Option<String>,
        #[arg(long, help = "Destination directory")]
        destination: Option<PathBuf>,
        #[arg(
            long,
            help = "Target word size: 32/x86 or 64/x64 (defaults to this build's)"
        )]
        word_size: Option<WordSize>,
    },
    #[command(about = "Install the macOS Pango/Cairo bundle")]
    Macos {
        #[arg(help = "Platform tag of the bundle (e.g. arm64, x86_64)")]
        platform: String,
        #[arg(long, help = "Bundle release version (e.g. 1.54.0-v3)")]
        version: Option<String>,
        #[arg(long, help = "Destination directory")]
        destination: Option<PathBuf>,
    },
}

impl From<Commands> for Command {
    fn from(cmd: Commands) -> Self {
        match cmd {
            Commands::Fetch { url, folder } => Self::Fetch { url, folder },
            Commands::Windows {
                version,
                destination,
                word_size,
            } => Self::Windows {
                version,
                destination,
                word_size: word_size.unwrap_or_else(WordSize::current),
            },
            Commands::Macos {
                platform,
                version,
                destination,
            } => Self::Macos {
                platform,
                version,
                destination,
            },
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
