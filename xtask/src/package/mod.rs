//! Portable release packaging: build the web UI, the backend, optionally the
//! desktop shell, then stage and archive everything under `dist/`.
//!
//! Builds go through the same pipeline engine as the verification gate; a
//! failing build step here is promoted to a packaging error because there is
//! nothing to stage without it.

pub mod archive;
pub mod stage;
pub mod version;

use crate::cli::PackageArgs;
use crate::error::XtaskError;
use crate::pipeline::{self, EnvSnapshot, FailurePolicy, ProcessRunner, Step};
use crate::probe::{self, SystemProbe, ToolProbe};
use crate::util::repo;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Delimiter-separated list of additional files to embed in the archive.
pub const EXTRA_FILES_ENV: &str = "TREEWARD_EXTRA_FILES";

pub fn run(args: &PackageArgs) -> Result<PathBuf> {
    let root = repo::repo_root()?;
    let probe = SystemProbe;

    println!("Treeward portable packager\n");
    let version = version::version_or_fallback(&root.join("Cargo.toml"));
    println!("Detected version: v{version}");

    crate::verify::ensure_base_tools(&probe)?;
    ensure_ui_prereqs(&probe, &root)?;

    let env = EnvSnapshot::capture()
        .with_defaults(&[("CARGO_TERM_COLOR", "always"), ("RUST_BACKTRACE", "1")]);

    build_webui(&root, &env)?;
    let backend = build_backend(&root, &env)?;
    let desktop = if args.include_desktop {
        match build_desktop(&root, &env) {
            Ok(path) => path,
            Err(err) => {
                eprintln!("warning: desktop build failed: {err:#}");
                None
            }
        }
    } else {
        None
    };

    let inputs = stage::StageInputs {
        backend,
        desktop,
        ui_dir: repo::ui_out_dir(&root),
        extras: extra_files_from_env(&root),
        root: root.clone(),
    };
    let plan = stage::plan(&inputs)?;

    let name = archive::archive_name(&version, &repo::platform_tag(), &chrono::Local::now());
    let path = archive::write(&plan, &repo::dist_dir(&root), &name)?;

    println!("\nCreated: {}", path.display());
    Ok(path)
}

/// Packaging provisions UI tooling unconditionally; a release archive without
/// the asset tree is only acceptable when there is no webui sub-project.
fn ensure_ui_prereqs(probe: &dyn ToolProbe, root: &Path) -> Result<()> {
    if !repo::webui_dir(root).is_dir() {
        return Ok(());
    }
    if !probe::ensure_wasm_target(probe, true) || !probe::ensure_trunk(probe, true) {
        return Err(XtaskError::Provisioning {
            tool: "web UI toolchain".to_string(),
            reason: "wasm target or trunk could not be installed".to_string(),
        }
        .into());
    }
    Ok(())
}

/// Runs one build step through the engine; non-zero exit becomes a packaging
/// error because nothing downstream can be staged.
fn run_build_step(step: Step, env: &EnvSnapshot) -> Result<()> {
    let name = step.name.clone();
    let mut runner = ProcessRunner { quiet: false };
    let results = pipeline::execute(&[step], FailurePolicy::FailFast, env, &mut runner)?;
    match results.last() {
        Some(result) if result.succeeded => Ok(()),
        Some(result) => Err(XtaskError::Packaging(format!(
            "step `{}` failed with exit code {}",
            result.name, result.exit_code
        ))
        .into()),
        None => Err(XtaskError::Packaging(format!("step `{name}` was not attempted")).into()),
    }
}

fn build_webui(root: &Path, env: &EnvSnapshot) -> Result<()> {
    let webui = repo::webui_dir(root);
    if !webui.is_dir() {
        println!("skip: {} does not exist, nothing to build for the UI", webui.display());
        return Ok(());
    }
    run_build_step(
        Step::command("webui trunk build --release", "trunk", &["build", "--release"], &webui),
        env,
    )?;
    let index = repo::ui_out_dir(root).join("index.html");
    if !index.is_file() {
        return Err(XtaskError::Packaging(format!(
            "UI build did not produce {}",
            index.display()
        ))
        .into());
    }
    Ok(())
}

fn build_backend(root: &Path, env: &EnvSnapshot) -> Result<PathBuf> {
    run_build_step(
        Step::command("build --release", "cargo", &["build", "--release"], root),
        env,
    )?;
    let exe = repo::release_backend_path(root);
    if !exe.is_file() {
        return Err(XtaskError::Packaging(format!(
            "backend binary not found at {}",
            exe.display()
        ))
        .into());
    }
    Ok(exe)
}

fn build_desktop(root: &Path, env: &EnvSnapshot) -> Result<Option<PathBuf>> {
    let desktop = repo::desktop_dir(root);
    if !desktop.is_dir() {
        println!("skip: {} does not exist, desktop not available", desktop.display());
        return Ok(None);
    }
    if !cfg!(windows) {
        println!("skip: the desktop build is only supported on Windows");
        return Ok(None);
    }
    let target_dir = desktop.join("target-tauri");
    run_build_step(
        Step::command(
            "desktop cargo build --release -j 1",
            "cargo",
            &["build", "--release", "-j", "1"],
            &desktop,
        )
        .env("CARGO_TARGET_DIR", &target_dir.to_string_lossy()),
        env,
    )?;
    let exe = repo::desktop_binary_path(root);
    if !exe.is_file() {
        return Err(XtaskError::Packaging(format!(
            "desktop binary not found at {}",
            exe.display()
        ))
        .into());
    }
    Ok(Some(exe))
}

/// Resolves the extra-file list from the environment; relative entries are
/// taken relative to the repo root and non-existent ones are skipped later
/// during staging.
fn extra_files_from_env(root: &Path) -> Vec<PathBuf> {
    let Ok(raw) = std::env::var(EXTRA_FILES_ENV) else {
        return Vec::new();
    };
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let path = PathBuf::from(entry);
            if path.is_absolute() {
                path
            } else {
                root.join(path)
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // One test so the env-var mutation cannot race a parallel test.
    #[test]
    fn extra_files_come_from_the_environment() {
        let root = Path::new("/repo");

        std::env::remove_var(EXTRA_FILES_ENV);
        assert!(extra_files_from_env(root).is_empty());

        std::env::set_var(EXTRA_FILES_ENV, "README.md; /abs/LICENSE ;;");
        let extras = extra_files_from_env(root);
        std::env::remove_var(EXTRA_FILES_ENV);

        assert_eq!(
            extras,
            vec![PathBuf::from("/repo/README.md"), PathBuf::from("/abs/LICENSE")]
        );
    }
}
