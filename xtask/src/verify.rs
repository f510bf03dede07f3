//! The CI-equivalent verification gate.
//!
//! Resolves the configured subset of the canonical step list against the
//! tool probe, runs it through the pipeline engine, and reports a verdict:
//! exit 0 when every attempted step passed, 1 on any failure, 2 when the
//! core toolchain is missing entirely.

use crate::cli::VerifyArgs;
use crate::error::XtaskError;
use crate::pipeline::{self, EnvSnapshot, FailurePolicy, ProcessRunner, Step};
use crate::probe::{self, SystemProbe, ToolProbe};
use anyhow::Result;
use std::path::Path;
use std::process::ExitCode;

/// Resolved run configuration; sole input to step resolution.
pub struct VerifyConfig {
    pub lints: bool,
    pub tests: bool,
    pub build: bool,
    pub ui: bool,
    pub desktop: bool,
    pub bench: bool,
    /// Benches only compile-check on the platform the desktop tooling
    /// targets, mirroring the CI matrix.
    pub bench_platform: bool,
    pub ensure_deps: bool,
    pub keep_going: bool,
    pub quiet: bool,
    pub json: bool,
}

impl From<&VerifyArgs> for VerifyConfig {
    fn from(args: &VerifyArgs) -> Self {
        Self {
            lints: !args.skip_lints,
            tests: !args.skip_tests,
            build: !args.skip_build,
            ui: !args.skip_ui,
            desktop: !args.skip_desktop,
            bench: !args.skip_bench,
            bench_platform: cfg!(windows),
            ensure_deps: args.ensure_deps,
            keep_going: args.keep_going,
            quiet: args.quiet,
            json: args.json,
        }
    }
}

pub fn run(args: &VerifyArgs) -> Result<ExitCode> {
    let config = VerifyConfig::from(args);
    let probe = SystemProbe;
    let root = crate::util::repo::repo_root()?;

    ensure_base_tools(&probe)?;

    let steps = resolve_steps(&config, &probe, &root);
    let env = EnvSnapshot::capture()
        .with_defaults(&[("CARGO_TERM_COLOR", "always"), ("RUST_BACKTRACE", "1")]);
    let policy = if config.keep_going {
        FailurePolicy::KeepGoing
    } else {
        FailurePolicy::FailFast
    };

    let mut runner = ProcessRunner { quiet: config.quiet };
    let results = pipeline::execute(&steps, policy, &env, &mut runner)?;

    let summary = crate::report::summarize(&results);
    if config.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", summary.text);
    }

    Ok(if summary.all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// The whole pipeline is pointless without cargo/rustc; detected before any
/// step runs and mapped to the distinct exit code 2.
pub fn ensure_base_tools(probe: &dyn ToolProbe) -> Result<(), XtaskError> {
    if probe.available("cargo") && probe.available("rustc") {
        Ok(())
    } else {
        Err(XtaskError::Environment(
            "cargo/rustc not found in PATH".to_string(),
        ))
    }
}

/// Resolves the ordered list of steps to attempt this run.
///
/// Toggled-off stages are removed entirely (they produce no result). A stage
/// whose prerequisite tooling is unavailable and not installable resolves to
/// a synthetic failing step so the report shows it. Missing sub-project
/// directories are warned about and dropped, matching how CI treats them.
pub fn resolve_steps(config: &VerifyConfig, probe: &dyn ToolProbe, root: &Path) -> Vec<Step> {
    let mut steps = Vec::new();

    if config.lints {
        steps.push(Step::command("fmt --check", "cargo", &["fmt", "--", "--check"], root));
        steps.push(Step::command(
            "clippy -D warnings",
            "cargo",
            &["clippy", "--", "-D", "warnings"],
            root,
        ));
    }

    if config.tests {
        steps.push(Step::command("test", "cargo", &["test", "--verbose"], root));
        steps.push(Step::command(
            "test --all-features",
            "cargo",
            &["test", "--all-features", "--verbose"],
            root,
        ));
    }

    if config.build {
        steps.push(Step::command(
            "build --release",
            "cargo",
            &["build", "--release", "--verbose"],
            root,
        ));
    }

    if config.ui {
        let webui = crate::util::repo::webui_dir(root);
        if webui.is_dir() {
            let ok_target = probe::ensure_wasm_target(probe, config.ensure_deps);
            let ok_trunk = probe::ensure_trunk(probe, config.ensure_deps);
            if ok_target && ok_trunk {
                steps.push(Step::command(
                    "webui trunk build --release",
                    "trunk",
                    &["build", "--release"],
                    &webui,
                ));
            } else {
                steps.push(Step::unavailable("webui trunk build --release"));
            }
        } else {
            eprintln!("warning: {} not found, skipping UI build", webui.display());
        }
    }

    if config.desktop {
        let desktop = crate::util::repo::desktop_dir(root);
        if desktop.is_dir() {
            // Separate target dir and -j 1 avoid file-lock collisions with
            // the main workspace build on Windows.
            let target_dir = desktop.join("target-tauri");
            steps.push(
                Step::command(
                    "desktop cargo build --release -j 1",
                    "cargo",
                    &["build", "--release", "-j", "1"],
                    &desktop,
                )
                .env("CARGO_TARGET_DIR", &target_dir.to_string_lossy()),
            );
        } else {
            eprintln!(
                "warning: {} not found, skipping desktop build",
                desktop.display()
            );
        }
    }

    if config.bench && config.bench_platform {
        steps.push(Step::command(
            "bench --no-run",
            "cargo",
            &["bench", "--no-run"],
            root,
        ));
    }

    steps
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::StepKind;
    use crate::probe::fake::FakeProbe;

    fn all_off() -> VerifyConfig {
        VerifyConfig {
            lints: false,
            tests: false,
            build: false,
            ui: false,
            desktop: false,
            bench: false,
            bench_platform: false,
            ensure_deps: false,
            keep_going: false,
            quiet: true,
            json: false,
        }
    }

    fn names(steps: &[Step]) -> Vec<&str> {
        steps.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn every_stage_disabled_resolves_to_no_steps() {
        let probe = FakeProbe::with_everything();
        let dir = tempfile::tempdir().unwrap();
        let steps = resolve_steps(&all_off(), &probe, dir.path());
        assert!(steps.is_empty());
    }

    #[test]
    fn canonical_order_is_preserved() {
        let probe = FakeProbe::with_everything();
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("webui")).unwrap();
        std::fs::create_dir_all(dir.path().join("desktop/src-tauri")).unwrap();

        let config = VerifyConfig {
            lints: true,
            tests: true,
            build: true,
            ui: true,
            desktop: true,
            bench: true,
            bench_platform: true,
            ..all_off()
        };
        let steps = resolve_steps(&config, &probe, dir.path());
        assert_eq!(
            names(&steps),
            vec![
                "fmt --check",
                "clippy -D warnings",
                "test",
                "test --all-features",
                "build --release",
                "webui trunk build --release",
                "desktop cargo build --release -j 1",
                "bench --no-run",
            ]
        );
    }

    #[test]
    fn missing_ui_tooling_resolves_to_synthetic_failure() {
        let probe = FakeProbe::bare();
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("webui")).unwrap();

        let config = VerifyConfig { ui: true, ..all_off() };
        let steps = resolve_steps(&config, &probe, dir.path());
        assert_eq!(names(&steps), vec!["webui trunk build --release"]);
        assert!(matches!(steps[0].kind, StepKind::Unavailable));
    }

    #[test]
    fn installable_ui_tooling_resolves_to_a_real_step() {
        let mut probe = FakeProbe::bare();
        probe.installable = true;
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("webui")).unwrap();

        let config = VerifyConfig {
            ui: true,
            ensure_deps: true,
            ..all_off()
        };
        let steps = resolve_steps(&config, &probe, dir.path());
        assert!(matches!(steps[0].kind, StepKind::Command { .. }));
    }

    #[test]
    fn missing_webui_directory_drops_the_stage_silently() {
        let probe = FakeProbe::with_everything();
        let dir = tempfile::tempdir().unwrap();
        let config = VerifyConfig { ui: true, ..all_off() };
        assert!(resolve_steps(&config, &probe, dir.path()).is_empty());
    }

    #[test]
    fn desktop_step_redirects_its_target_dir() {
        let probe = FakeProbe::with_everything();
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("desktop/src-tauri")).unwrap();

        let config = VerifyConfig { desktop: true, ..all_off() };
        let steps = resolve_steps(&config, &probe, dir.path());
        let StepKind::Command { env_overrides, .. } = &steps[0].kind else {
            panic!("expected a command step");
        };
        assert!(env_overrides["CARGO_TARGET_DIR"].contains("target-tauri"));
    }

    #[test]
    fn bench_stage_is_platform_gated() {
        let probe = FakeProbe::with_everything();
        let dir = tempfile::tempdir().unwrap();
        let config = VerifyConfig {
            bench: true,
            bench_platform: false,
            ..all_off()
        };
        assert!(resolve_steps(&config, &probe, dir.path()).is_empty());
    }

    #[test]
    fn missing_core_toolchain_is_an_environment_error() {
        let probe = FakeProbe {
            tools: std::collections::BTreeSet::new(),
            targets: std::collections::BTreeSet::new(),
            installable: false,
        };
        let err = ensure_base_tools(&probe).unwrap_err();
        assert!(matches!(err, XtaskError::Environment(_)));
    }
}
