//! Staging: turns scattered build outputs into an ordered list of
//! (source, archive path) pairs. Pure planning, no archive I/O, so the
//! layout is unit-testable; the write phase lives in `archive`.

use crate::error::XtaskError;
use crate::util::repo::{BACKEND_BIN, DESKTOP_BIN};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Top-level directory name the asset tree keeps inside the archive.
pub const UI_DIR_NAME: &str = "ui";

pub const README_NAME: &str = "README-PORTABLE.txt";

pub const LAUNCHER_NAME: &str = if cfg!(windows) {
    "RUN-Treeward.cmd"
} else {
    "run-treeward.sh"
};

pub const DESKTOP_LAUNCHER_NAME: &str = if cfg!(windows) {
    "RUN-Desktop.cmd"
} else {
    "run-desktop.sh"
};

/// Root-level metadata files included automatically when present.
const AUTO_METADATA: [&str; 3] = ["LICENSE", "LICENSE.txt", "README.md"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Copied from disk at write time.
    File(PathBuf),
    /// Synthesized content, generated at staging time; never fails.
    Inline(Vec<u8>),
}

/// One file destined for the archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedArtifact {
    pub source: ArtifactSource,
    /// Archive-relative destination, always `/`-separated.
    pub dest: String,
    pub executable: bool,
}

impl StagedArtifact {
    fn file(source: &Path, dest: impl Into<String>, executable: bool) -> Self {
        Self {
            source: ArtifactSource::File(source.to_path_buf()),
            dest: dest.into(),
            executable,
        }
    }

    fn inline(content: String, dest: impl Into<String>, executable: bool) -> Self {
        Self {
            source: ArtifactSource::Inline(content.into_bytes()),
            dest: dest.into(),
            executable,
        }
    }
}

pub struct StageInputs {
    pub backend: PathBuf,
    pub desktop: Option<PathBuf>,
    pub ui_dir: PathBuf,
    pub extras: Vec<PathBuf>,
    pub root: PathBuf,
}

/// Resolves the full archive layout.
///
/// Order is deterministic: primary binary, desktop binary (if on disk), asset
/// tree (depth-first, lexical), synthesized launcher/readme, caller extras,
/// auto-discovered metadata. A missing asset tree degrades to a binary-only
/// package; a missing backend binary is the one hard error here.
pub fn plan(inputs: &StageInputs) -> Result<Vec<StagedArtifact>> {
    if !inputs.backend.is_file() {
        return Err(XtaskError::Packaging(format!(
            "backend binary not found at {}",
            inputs.backend.display()
        ))
        .into());
    }

    let mut artifacts = vec![StagedArtifact::file(&inputs.backend, BACKEND_BIN, true)];

    let desktop_staged = match &inputs.desktop {
        Some(path) if path.is_file() => {
            artifacts.push(StagedArtifact::file(path, DESKTOP_BIN, true));
            true
        }
        _ => false,
    };

    if inputs.ui_dir.is_dir() {
        for entry in WalkDir::new(&inputs.ui_dir).sort_by_file_name() {
            let entry = entry.context("failed to walk the ui directory")?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&inputs.ui_dir)
                .context("ui file outside the ui directory")?;
            let dest = format!(
                "{UI_DIR_NAME}/{}",
                rel.to_string_lossy().replace('\\', "/")
            );
            artifacts.push(StagedArtifact::file(entry.path(), dest, false));
        }
    } else {
        eprintln!(
            "warning: {} missing, producing a binary-only package",
            inputs.ui_dir.display()
        );
    }

    artifacts.push(StagedArtifact::inline(
        launcher_script(),
        LAUNCHER_NAME,
        true,
    ));
    if desktop_staged {
        artifacts.push(StagedArtifact::inline(
            desktop_launcher_script(),
            DESKTOP_LAUNCHER_NAME,
            true,
        ));
    }
    artifacts.push(StagedArtifact::inline(
        portable_readme(desktop_staged),
        README_NAME,
        false,
    ));

    for extra in &inputs.extras {
        // Non-existent entries are silently skipped.
        if extra.is_file() {
            let name = extra
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !name.is_empty() {
                artifacts.push(StagedArtifact::file(extra, name, false));
            }
        }
    }

    for name in AUTO_METADATA {
        let path = inputs.root.join(name);
        if path.is_file() {
            artifacts.push(StagedArtifact::file(&path, name, false));
        }
    }

    Ok(artifacts)
}

/// OS-native launcher referencing the staged backend name. Starts the server
/// and points a browser at it.
fn launcher_script() -> String {
    if cfg!(windows) {
        [
            "@echo off",
            "setlocal",
            ":: Start the backend and open the web UI",
            &format!("start \"\" \"%~dp0{BACKEND_BIN}\""),
            "timeout /t 1 >nul",
            "start \"\" http://127.0.0.1:8080/",
        ]
        .join("\r\n")
            + "\r\n"
    } else {
        format!(
            "#!/bin/sh\n\
             HERE=\"$(cd \"$(dirname \"$0\")\" && pwd)\"\n\
             \"$HERE/{BACKEND_BIN}\" &\n\
             sleep 1\n\
             if command -v xdg-open >/dev/null 2>&1; then xdg-open http://127.0.0.1:8080/; \
             elif command -v open >/dev/null 2>&1; then open http://127.0.0.1:8080/; fi\n\
             wait\n"
        )
    }
}

fn desktop_launcher_script() -> String {
    if cfg!(windows) {
        [
            "@echo off",
            "setlocal",
            ":: Start the desktop shell",
            &format!("start \"\" \"%~dp0{DESKTOP_BIN}\""),
        ]
        .join("\r\n")
            + "\r\n"
    } else {
        format!(
            "#!/bin/sh\n\
             HERE=\"$(cd \"$(dirname \"$0\")\" && pwd)\"\n\
             exec \"$HERE/{DESKTOP_BIN}\"\n"
        )
    }
}

fn portable_readme(desktop_staged: bool) -> String {
    let mut text = format!(
        "Treeward - Portable Build\n\n\
         Start: {LAUNCHER_NAME} (opens a browser) or run {BACKEND_BIN} directly.\n\
         Web UI: http://127.0.0.1:8080/\n\n"
    );
    if desktop_staged {
        text.push_str(&format!(
            "Desktop shell: {DESKTOP_BIN} or {DESKTOP_LAUNCHER_NAME}.\n\n"
        ));
    }
    text.push_str(
        "Database: ./data/treeward.db (created on first start).\n\
         Configuration (optional): treeward.toml next to the binary.\n",
    );
    text
}
