use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Product identity; used for binary names and the archive prefix.
pub const PRODUCT: &str = "treeward";

pub const BACKEND_BIN: &str = if cfg!(windows) { "treeward.exe" } else { "treeward" };

pub const DESKTOP_BIN: &str = if cfg!(windows) {
    "treeward-desktop.exe"
} else {
    "treeward-desktop"
};

pub fn repo_root() -> Result<PathBuf> {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask is expected at <repo>/xtask")
}

pub fn webui_dir(root: &Path) -> PathBuf {
    root.join("webui")
}

/// Trunk writes the built asset tree here (see `webui/Trunk.toml`).
pub fn ui_out_dir(root: &Path) -> PathBuf {
    root.join("ui")
}

pub fn desktop_dir(root: &Path) -> PathBuf {
    root.join("desktop").join("src-tauri")
}

pub fn dist_dir(root: &Path) -> PathBuf {
    root.join("dist")
}

pub fn release_backend_path(root: &Path) -> PathBuf {
    root.join("target").join("release").join(BACKEND_BIN)
}

pub fn desktop_binary_path(root: &Path) -> PathBuf {
    desktop_dir(root)
        .join("target-tauri")
        .join("release")
        .join(DESKTOP_BIN)
}

/// Platform tag embedded in the archive name, e.g. `windows-x64`.
pub fn platform_tag() -> String {
    let arch = match std::env::consts::ARCH {
        "x86_64" => "x64",
        other => other,
    };
    format!("{}-{}", std::env::consts::OS, arch)
}
