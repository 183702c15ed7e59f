//! The three install variants: a generic tarball, and the Windows and macOS
//! Pango/Cairo bundles.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::archive::{ArchiveFormat, url_file_name};
use crate::config::{MacosConfig, WindowsConfig, expand_home};
use crate::install::{
    InstallReport, InstallRequest, Installer, PostInstall, SourceLayout, ToolRequest,
};
use crate::platform::{WordSize, validate_platform_tag};
use crate::{Error, Result};

/// Request for the generic variant: unpack `url` and move its top-level
/// directory's contents to `folder`.
///
/// The format follows the URL's extension; anything but `.tar.gz`, `.tgz`
/// or `.zip` is rejected.
///
/// # Errors
///
/// Returns [`Error::UnsupportedArchive`] for an unrecognised URL.
pub fn generic_request(url: &str, folder: &Path) -> Result<InstallRequest> {
    let format = ArchiveFormat::from_file_name(&url_file_name(url)?)?;
    Ok(InstallRequest {
        url: url.to_string(),
        format,
        layout: SourceLayout::ArchiveRoot,
        destination: folder.to_path_buf(),
        patch_pkgconfig: false,
        post_install: Vec::new(),
    })
}

/// Request for the Windows bundle matching `word_size`.
///
/// # Errors
///
/// Fails when the destination cannot be resolved.
pub fn windows_request(config: &WindowsConfig, word_size: WordSize) -> Result<InstallRequest> {
    let tag = word_size.windows_tag();
    let tool = ToolRequest {
        url: config.asset_url(&config.tool_asset),
        format: ArchiveFormat::from_file_name(&config.tool_asset)?,
        executable: config.tool_executable.clone(),
        aliases: config.tool_aliases.clone(),
    };

    Ok(InstallRequest {
        url: config.asset_url(&config.bundle_asset(tag)),
        format: ArchiveFormat::Zip,
        layout: SourceLayout::Subdirectory(format!("pango-{tag}")),
        destination: resolve_destination(&config.destination)?,
        patch_pkgconfig: true,
        post_install: vec![PostInstall::Tool(tool), PostInstall::RenameStaticLibraries],
    })
}

/// Request for the macOS bundle for `platform` (e.g. `arm64`).
///
/// # Errors
///
/// [`Error::InvalidPlatform`] for an unusable tag; fails when the
/// destination cannot be resolved.
pub fn macos_request(config: &MacosConfig, platform: &str) -> Result<InstallRequest> {
    let platform = validate_platform_tag(platform)?;

    Ok(InstallRequest {
        url: config.asset_url(&config.bundle_asset(platform)),
        format: ArchiveFormat::Zip,
        layout: SourceLayout::Subdirectory(format!("mac-pango-{platform}")),
        destination: resolve_destination(&config.destination)?,
        patch_pkgconfig: true,
        post_install: Vec::new(),
    })
}

/// Install the generic variant.
///
/// # Errors
///
/// See [`Installer::fetch_and_install`].
pub fn install_generic(installer: &Installer, url: &str, folder: &Path) -> Result<InstallReport> {
    installer.fetch_and_install(&generic_request(url, folder)?)
}

/// Install the Windows Pango/Cairo bundle, pkg-config tool included.
///
/// # Errors
///
/// See [`Installer::fetch_and_install`].
pub fn install_windows_bundle(
    installer: &Installer,
    config: &WindowsConfig,
    word_size: WordSize,
) -> Result<InstallReport> {
    info!(
        %word_size,
        platform = word_size.windows_tag(),
        "Downloading Pango and Cairo binaries for Windows"
    );
    installer.fetch_and_install(&windows_request(config, word_size)?)
}

/// Install the macOS Pango/Cairo bundle.
///
/// # Errors
///
/// See [`Installer::fetch_and_install`].
pub fn install_macos_bundle(
    installer: &Installer,
    config: &MacosConfig,
    platform: &str,
) -> Result<InstallReport> {
    info!(%platform, "Downloading Pango and Cairo binaries for macOS");
    installer.fetch_and_install(&macos_request(config, platform)?)
}

/// `~` expanded and made absolute, since the path ends up in `.pc` files.
fn resolve_destination(destination: &Path) -> Result<PathBuf> {
    let expanded = expand_home(destination)?;
    std::path::absolute(&expanded).map_err(|e| Error::io(e, &expanded, "resolve"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_request() {
        let request =
            generic_request("https://example.org/foo-1.2.3.tar.gz", Path::new("./out")).unwrap();
        assert_eq!(request.format, ArchiveFormat::TarGz);
        assert_eq!(request.layout, SourceLayout::ArchiveRoot);
        assert_eq!(request.destination, PathBuf::from("./out"));
        assert!(!request.patch_pkgconfig);
        assert!(request.post_install.is_empty());
    }

    #[test]
    fn test_generic_request_rejects_unknown_extension() {
        assert!(matches!(
            generic_request("https://example.org/foo.rar", Path::new("out")),
            Err(Error::UnsupportedArchive { .. })
        ));
    }

    #[test]
    fn test_windows_request() {
        let config = WindowsConfig {
            destination: PathBuf::from("/opt/cibw/vendor"),
            ..WindowsConfig::default()
        };
        let request = windows_request(&config, WordSize::Bits32).unwrap();

        assert_eq!(
            request.url,
            "https://github.com/naveen521kk/pango-build/releases/download/v1.54.0-v1/pango-v1.54.0-v1-x86.zip"
        );
        assert_eq!(
            request.layout,
            SourceLayout::Subdirectory("pango-x86".to_string())
        );
        assert!(request.patch_pkgconfig);
        assert_eq!(
            request.post_install,
            vec![
                PostInstall::Tool(ToolRequest {
                    url: "https://github.com/naveen521kk/pango-build/releases/download/v1.54.0-v1/pkgconf.zip".to_string(),
                    format: ArchiveFormat::Zip,
                    executable: "pkgconf/bin/pkgconf.exe".to_string(),
                    aliases: vec!["pkg-config.exe".to_string()],
                }),
                PostInstall::RenameStaticLibraries,
            ]
        );
    }

    #[test]
    fn test_macos_request() {
        let config = MacosConfig {
            destination: PathBuf::from("/opt/pangobuild"),
            ..MacosConfig::default()
        };
        let request = macos_request(&config, "arm64").unwrap();

        assert_eq!(
            request.url,
            "https://github.com/naveen521kk/pango-build/releases/download/v1.54.0-v3/pango-v1.54.0-v3-mac-arm64.zip"
        );
        assert_eq!(
            request.layout,
            SourceLayout::Subdirectory("mac-pango-arm64".to_string())
        );
        assert!(request.destination.ends_with("opt/pangobuild"));
        assert!(request.post_install.is_empty());
    }

    #[test]
    fn test_macos_request_rejects_path_like_platform() {
        assert!(matches!(
            macos_request(&MacosConfig::default(), "../x"),
            Err(Error::InvalidPlatform { .. })
        ));
    }

    #[test]
    fn test_resolve_destination_is_absolute() {
        let resolved = resolve_destination(Path::new("relative/out")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("relative/out"));
    }
}
