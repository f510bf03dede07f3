//! Product version extraction from the root manifest.

use crate::error::XtaskError;
use serde::Deserialize;
use std::path::Path;

/// Used whenever the manifest version cannot be read; packaging never aborts
/// over a version problem.
pub const FALLBACK_VERSION: &str = "0.0.0";

#[derive(Deserialize)]
struct Manifest {
    package: Option<Section>,
    workspace: Option<WorkspaceSection>,
}

#[derive(Deserialize)]
struct WorkspaceSection {
    package: Option<Section>,
}

#[derive(Deserialize)]
struct Section {
    version: Option<String>,
}

pub fn read_version(manifest_path: &Path) -> Result<String, XtaskError> {
    let missing = || XtaskError::VersionParse {
        manifest: manifest_path.to_path_buf(),
    };
    let text = std::fs::read_to_string(manifest_path).map_err(|_| missing())?;
    let manifest: Manifest = toml::from_str(&text).map_err(|_| missing())?;

    manifest
        .package
        .and_then(|p| p.version)
        .or_else(|| {
            manifest
                .workspace
                .and_then(|w| w.package)
                .and_then(|p| p.version)
        })
        .ok_or_else(missing)
}

/// Reads the version, degrading to `FALLBACK_VERSION` with a warning.
pub fn version_or_fallback(manifest_path: &Path) -> String {
    match read_version(manifest_path) {
        Ok(version) => version,
        Err(err) => {
            eprintln!("warning: {err}; using v{FALLBACK_VERSION}");
            FALLBACK_VERSION.to_string()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    fn manifest_with(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), content).unwrap();
        dir
    }

    #[test]
    fn reads_a_package_version() {
        let dir = manifest_with("[package]\nname = \"treeward\"\nversion = \"1.2.3\"\n");
        assert_eq!(read_version(&dir.path().join("Cargo.toml")).unwrap(), "1.2.3");
    }

    #[test]
    fn falls_back_to_the_workspace_version() {
        let dir = manifest_with("[workspace]\nmembers = []\n\n[workspace.package]\nversion = \"2.0.1\"\n");
        assert_eq!(read_version(&dir.path().join("Cargo.toml")).unwrap(), "2.0.1");
    }

    #[test]
    fn missing_version_degrades_to_fallback() {
        let dir = manifest_with("[package]\nname = \"treeward\"\n");
        assert_eq!(
            version_or_fallback(&dir.path().join("Cargo.toml")),
            FALLBACK_VERSION
        );
    }

    #[test]
    fn malformed_manifest_degrades_to_fallback() {
        let dir = manifest_with("not toml at all [[[");
        assert_eq!(
            version_or_fallback(&dir.path().join("Cargo.toml")),
            FALLBACK_VERSION
        );
    }

    #[test]
    fn missing_file_degrades_to_fallback() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            version_or_fallback(&dir.path().join("Cargo.toml")),
            FALLBACK_VERSION
        );
    }
}
