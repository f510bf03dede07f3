//! Detection and on-demand installation of external tooling.
//!
//! The step registry consults a `ToolProbe` at resolution time; the probe
//! never runs as part of step execution. Checks are advisory and repeatable;
//! installation happens only when the caller opted into it.

use crate::error::XtaskError;
use std::collections::BTreeSet;
use std::process::Command;

/// Target the web UI is compiled for.
pub const WASM_TARGET: &str = "wasm32-unknown-unknown";

/// Capability queries against the local toolchain. Tests substitute a fake so
/// resolution can be exercised without any external tools installed.
pub trait ToolProbe {
    /// Whether `tool` can be found on the PATH.
    fn available(&self, tool: &str) -> bool;

    /// Toolchain targets reported as installed; empty when that cannot be
    /// determined (e.g. no rustup).
    fn installed_targets(&self) -> BTreeSet<String>;

    fn install_target(&self, target: &str) -> Result<(), XtaskError>;

    fn install_tool(&self, tool: &str) -> Result<(), XtaskError>;
}

/// Probe backed by the real PATH and rustup.
pub struct SystemProbe;

impl ToolProbe for SystemProbe {
    fn available(&self, tool: &str) -> bool {
        which::which(tool).is_ok()
    }

    fn installed_targets(&self) -> BTreeSet<String> {
        let Ok(output) = Command::new("rustup")
            .args(["target", "list", "--installed"])
            .output()
        else {
            return BTreeSet::new();
        };
        if !output.status.success() {
            return BTreeSet::new();
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    fn install_target(&self, target: &str) -> Result<(), XtaskError> {
        println!("Installing rust target: {target} ...");
        run_installer(
            Command::new("rustup").args(["target", "add", target]),
            &format!("rustup target {target}"),
        )
    }

    fn install_tool(&self, tool: &str) -> Result<(), XtaskError> {
        println!("Installing {tool} (cargo install {tool} --locked) ...");
        run_installer(
            Command::new("cargo").args(["install", tool, "--locked"]),
            tool,
        )
    }
}

fn run_installer(cmd: &mut Command, tool: &str) -> Result<(), XtaskError> {
    let status = cmd.status().map_err(|err| XtaskError::Provisioning {
        tool: tool.to_string(),
        reason: err.to_string(),
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(XtaskError::Provisioning {
            tool: tool.to_string(),
            reason: format!("installer exited with {status}"),
        })
    }
}

/// Makes sure the wasm target is present. Returns whether the UI build can
/// run; absence without `ensure_deps` degrades to a warning.
pub fn ensure_wasm_target(probe: &dyn ToolProbe, ensure_deps: bool) -> bool {
    if probe.installed_targets().contains(WASM_TARGET) {
        return true;
    }
    if !ensure_deps {
        eprintln!(
            "warning: {WASM_TARGET} is not installed. The UI build will fail. \
             Re-run with --ensure-deps or use --skip-ui."
        );
        return false;
    }
    match probe.install_target(WASM_TARGET) {
        Ok(()) => true,
        Err(err) => {
            eprintln!("warning: {err}");
            false
        }
    }
}

/// Same contract as `ensure_wasm_target`, for the `trunk` bundler.
pub fn ensure_trunk(probe: &dyn ToolProbe, ensure_deps: bool) -> bool {
    if probe.available("trunk") {
        return true;
    }
    if !ensure_deps {
        eprintln!(
            "warning: `trunk` is not installed. The UI build will fail. \
             Re-run with --ensure-deps or use --skip-ui."
        );
        return false;
    }
    match probe.install_tool("trunk") {
        Ok(()) => true,
        Err(err) => {
            eprintln!("warning: {err}");
            false
        }
    }
}

#[cfg(test)]
pub mod fake {
    use super::{ToolProbe, XtaskError};
    use std::collections::BTreeSet;

    /// Probe with a fixed answer set; `installable` controls whether install
    /// requests succeed (and get added to the answer set conceptually).
    pub struct FakeProbe {
        pub tools: BTreeSet<String>,
        pub targets: BTreeSet<String>,
        pub installable: bool,
    }

    impl FakeProbe {
        pub fn with_everything() -> Self {
            Self {
                tools: ["cargo", "rustc", "trunk"]
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                targets: [super::WASM_TARGET].iter().map(ToString::to_string).collect(),
                installable: true,
            }
        }

        pub fn bare() -> Self {
            Self {
                tools: ["cargo", "rustc"].iter().map(ToString::to_string).collect(),
                targets: BTreeSet::new(),
                installable: false,
            }
        }
    }

    impl ToolProbe for FakeProbe {
        fn available(&self, tool: &str) -> bool {
            self.tools.contains(tool)
        }

        fn installed_targets(&self) -> BTreeSet<String> {
            self.targets.clone()
        }

        fn install_target(&self, target: &str) -> Result<(), XtaskError> {
            if self.installable {
                Ok(())
            } else {
                Err(XtaskError::Provisioning {
                    tool: target.to_string(),
                    reason: "installs disabled in this test".to_string(),
                })
            }
        }

        fn install_tool(&self, tool: &str) -> Result<(), XtaskError> {
            if self.installable {
                Ok(())
            } else {
                Err(XtaskError::Provisioning {
                    tool: tool.to_string(),
                    reason: "installs disabled in this test".to_string(),
                })
            }
        }
    }
}
