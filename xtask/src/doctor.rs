use crate::probe::{SystemProbe, ToolProbe, WASM_TARGET};
use anyhow::{bail, Result};
use std::path::Path;

pub fn run() -> Result<()> {
    let root = crate::util::repo::repo_root()?;
    let probe = SystemProbe;
    run_with(&probe, &root)
}

/// Reports what the pipeline expects to find locally. Only the core toolchain
/// is a hard requirement; everything else degrades to a warning because the
/// corresponding stage can be skipped or auto-provisioned.
fn run_with(probe: &dyn ToolProbe, root: &Path) -> Result<()> {
    let mut ok = true;

    for tool in ["cargo", "rustc"] {
        if probe.available(tool) {
            eprintln!("[OK] {tool}");
        } else {
            eprintln!("[FAIL] missing `{tool}` in PATH");
            ok = false;
        }
    }

    if probe.available("trunk") {
        eprintln!("[OK] trunk");
    } else {
        eprintln!("[WARN] `trunk` not installed (needed for the web UI build)");
    }

    if probe.installed_targets().contains(WASM_TARGET) {
        eprintln!("[OK] {WASM_TARGET}");
    } else {
        eprintln!("[WARN] target {WASM_TARGET} not installed");
    }

    for dir in [
        crate::util::repo::webui_dir(root),
        crate::util::repo::desktop_dir(root),
    ] {
        if dir.is_dir() {
            eprintln!("[OK] {}", dir.display());
        } else {
            eprintln!("[WARN] missing directory: {}", dir.display());
        }
    }

    if !ok {
        bail!("doctor checks failed");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::probe::fake::FakeProbe;
    use std::collections::BTreeSet;

    #[test]
    fn passes_with_the_core_toolchain_only() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_with(&FakeProbe::bare(), dir.path()).is_ok());
    }

    #[test]
    fn fails_without_cargo() {
        let dir = tempfile::tempdir().unwrap();
        let probe = FakeProbe {
            tools: BTreeSet::new(),
            targets: BTreeSet::new(),
            installable: false,
        };
        assert!(run_with(&probe, dir.path()).is_err());
    }
}
