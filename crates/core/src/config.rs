//! Configuration with documented defaults.
//!
//! Every value that used to be a literal in the install procedure (bundle
//! versions, release URLs, destinations, timeouts) lives here. A TOML file
//! may override any subset of keys:
//!
//! ```toml
//! scratch_root = "/var/tmp"
//!
//! [download]
//! timeout_secs = 120
//!
//! [macos]
//! version = "1.54.0-v3"
//! destination = "~/pangobuild"
//! ```

use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Release page hosting the prebuilt bundles.
pub const DEFAULT_RELEASE_BASE_URL: &str =
    "https://github.com/naveen521kk/pango-build/releases/download";

/// Default Windows bundle version.
pub const DEFAULT_WINDOWS_VERSION: &str = "1.54.0-v1";

/// Default macOS bundle version.
pub const DEFAULT_MACOS_VERSION: &str = "1.54.0-v3";

/// Default Windows install location.
pub const DEFAULT_WINDOWS_DESTINATION: &str = r"C:\cibw\vendor";

/// Default macOS install location, relative to the home directory.
pub const DEFAULT_MACOS_DESTINATION: &str = "~/pangobuild";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP client settings
    pub download: DownloadConfig,
    /// Directory scratch space is created in; the system temp dir when unset
    pub scratch_root: Option<PathBuf>,
    /// Windows bundle settings
    pub windows: WindowsConfig,
    /// macOS bundle settings
    pub macos: MacosConfig,
}

impl Config {
    /// Load configuration from an optional TOML file.
    ///
    /// Keys missing from the file keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and
    /// [`Error::Configuration`] when it does not parse or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let text =
                    std::fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))?;
                Self::from_toml(&text).map_err(|e| match e {
                    Error::Configuration { message } => {
                        Error::configuration(format!("{}: {message}", path.display()))
                    }
                    other => other,
                })?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] on malformed TOML.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::configuration(e.to_string()))
    }

    /// Check values that would only fail later, mid-install.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.download.connect_timeout_secs == 0 || self.download.timeout_secs == 0 {
            return Err(Error::configuration("download timeouts must be positive"));
        }
        validate_release(
            "windows",
            &self.windows.version,
            &self.windows.release_base_url,
        )?;
        validate_release("macos", &self.macos.version, &self.macos.release_base_url)?;
        if self.windows.tool_aliases.iter().any(|a| a.contains(['/', '\\'])) {
            return Err(Error::configuration(
                "windows.tool_aliases must be plain file names",
            ));
        }
        let executable_name = Path::new(&self.windows.tool_executable)
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase());
        if self
            .windows
            .tool_aliases
            .iter()
            .any(|a| executable_name.as_deref() == Some(a.to_lowercase().as_str()))
        {
            return Err(Error::configuration(
                "windows.tool_aliases must differ from the tool executable's name",
            ));
        }
        Ok(())
    }
}

fn validate_release(section: &str, version: &str, base_url: &str) -> Result<()> {
    if version.trim().is_empty() {
        return Err(Error::configuration(format!(
            "{section}.version must not be empty"
        )));
    }
    Url::parse(base_url).map_err(|e| {
        Error::configuration(format!(
            "{section}.release_base_url '{base_url}' is not a URL: {e}"
        ))
    })?;
    Ok(())
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// User agent sent with every request
    pub user_agent: String,
    /// Seconds allowed to establish a connection
    pub connect_timeout_secs: u64,
    /// Seconds allowed for a whole request, body included
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("vendorfetch/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout_secs: 30,
            timeout_secs: 600,
        }
    }
}

/// Windows bundle settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WindowsConfig {
    /// Bundle release version, without the leading `v`
    pub version: String,
    /// Base URL releases are published under
    pub release_base_url: String,
    /// Install location
    pub destination: PathBuf,
    /// Asset holding the pkg-config implementation
    pub tool_asset: String,
    /// Executable path inside the tool asset
    pub tool_executable: String,
    /// Extra names the tool executable is copied to in `bin/`
    pub tool_aliases: Vec<String>,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_WINDOWS_VERSION.to_string(),
            release_base_url: DEFAULT_RELEASE_BASE_URL.to_string(),
            destination: PathBuf::from(DEFAULT_WINDOWS_DESTINATION),
            tool_asset: "pkgconf.zip".to_string(),
            tool_executable: "pkgconf/bin/pkgconf.exe".to_string(),
            tool_aliases: vec!["pkg-config.exe".to_string()],
        }
    }
}

impl WindowsConfig {
    /// Download URL of a release asset.
    #[must_use]
    pub fn asset_url(&self, asset: &str) -> String {
        release_asset_url(&self.release_base_url, &self.version, asset)
    }

    /// File name of the bundle for a platform tag.
    #[must_use]
    pub fn bundle_asset(&self, platform: &str) -> String {
        format!("pango-v{}-{platform}.zip", self.version)
    }
}

/// macOS bundle settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MacosConfig {
    /// Bundle release version, without the leading `v`
    pub version: String,
    /// Base URL releases are published under
    pub release_base_url: String,
    /// Install location; a leading `~` is the home directory
    pub destination: PathBuf,
}

impl Default for MacosConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_MACOS_VERSION.to_string(),
            release_base_url: DEFAULT_RELEASE_BASE_URL.to_string(),
            destination: PathBuf::from(DEFAULT_MACOS_DESTINATION),
        }
    }
}

impl MacosConfig {
    /// Download URL of a release asset.
    #[must_use]
    pub fn asset_url(&self, asset: &str) -> String {
        release_asset_url(&self.release_base_url, &self.version, asset)
    }

    /// File name of the bundle for a platform tag.
    #[must_use]
    pub fn bundle_asset(&self, platform: &str) -> String {
        format!("pango-v{}-mac-{platform}.zip", self.version)
    }
}

/// `<base>/v<version>/<asset>`
#[must_use]
pub fn release_asset_url(base_url: &str, version: &str, asset: &str) -> String {
    format!("{}/v{version}/{asset}", base_url.trim_end_matches('/'))
}

/// Expand a leading `~` to the current user's home directory.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if the home directory is unknown.
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home = dirs::home_dir()
        .ok_or_else(|| Error::configuration("Could not determine home directory"))?;
    Ok(home.join(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.windows.version, "1.54.0-v1");
        assert_eq!(config.macos.version, "1.54.0-v3");
        assert_eq!(
            config.windows.destination,
            PathBuf::from(r"C:\cibw\vendor")
        );
        assert_eq!(config.download.connect_timeout_secs, 30);
        assert!(config.scratch_root.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_asset_urls() {
        let config = Config::default();
        assert_eq!(
            config.windows.asset_url(&config.windows.bundle_asset("x64")),
            "https://github.com/naveen521kk/pango-build/releases/download/v1.54.0-v1/pango-v1.54.0-v1-x64.zip"
        );
        assert_eq!(
            config.macos.asset_url(&config.macos.bundle_asset("arm64")),
            "https://github.com/naveen521kk/pango-build/releases/download/v1.54.0-v3/pango-v1.54.0-v3-mac-arm64.zip"
        );
        assert_eq!(
            config.windows.asset_url(&config.windows.tool_asset),
            "https://github.com/naveen521kk/pango-build/releases/download/v1.54.0-v1/pkgconf.zip"
        );
    }

    #[test]
    fn test_release_asset_url_trims_trailing_slash() {
        assert_eq!(
            release_asset_url("https://example.org/dl/", "2.0", "a.zip"),
            "https://example.org/dl/v2.0/a.zip"
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
scratch_root = "/var/tmp"

[download]
timeout_secs = 5

[macos]
version = "9.9.9"
"#,
        )
        .unwrap();

        assert_eq!(config.scratch_root, Some(PathBuf::from("/var/tmp")));
        assert_eq!(config.download.timeout_secs, 5);
        assert_eq!(config.download.connect_timeout_secs, 30);
        assert_eq!(config.macos.version, "9.9.9");
        assert_eq!(config.macos.destination, PathBuf::from("~/pangobuild"));
        assert_eq!(config.windows, WindowsConfig::default());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Config::from_toml("[download\ntimeout_secs = 1"),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.download.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.macos.release_base_url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("macos.release_base_url"));
    }

    #[test]
    fn test_validate_rejects_alias_shadowing_executable() {
        let config = Config::from_toml("[windows]\ntool_aliases = [\"PKGCONF.exe\"]\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(Error::Configuration { message }) if message.contains("tool_aliases")
        ));

        let config = Config::from_toml("[windows]\ntool_aliases = [\"pkg-config.exe\"]\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("vendorfetch.toml");
        std::fs::write(&path, "[windows]\nversion = \"2.0.0\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.windows.version, "2.0.0");

        assert_eq!(Config::load(None).unwrap(), Config::default());
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("broken.toml");
        std::fs::write(&path, "download = 3").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_expand_home() {
        let plain = Path::new("/opt/vendor");
        assert_eq!(expand_home(plain).unwrap(), plain);

        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home(Path::new("~/pangobuild")).unwrap(),
                home.join("pangobuild")
            );
        }
    }
}
