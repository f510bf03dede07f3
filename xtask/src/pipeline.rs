//! Sequential step execution for the verification and packaging tasks.
//!
//! Steps are resolved up front into an ordered list, executed one at a time,
//! and every attempt is recorded as a `StepResult`. Whether a failure stops
//! the run is a `FailurePolicy` decision made after each result, not control
//! flow via errors.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// Exit code recorded for a step whose prerequisite tooling was missing.
pub const UNAVAILABLE_EXIT_CODE: i32 = 1;

/// Exit code recorded when a step's command could not be spawned at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// How the engine reacts to a failing step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure; later steps are never attempted.
    FailFast,
    /// Run every resolved step and report all outcomes at the end.
    KeepGoing,
}

/// What executing a step means.
#[derive(Clone, Debug)]
pub enum StepKind {
    /// Spawn an external command and wait for it to finish.
    Command {
        program: String,
        args: Vec<String>,
        cwd: PathBuf,
        env_overrides: BTreeMap<String, String>,
    },
    /// Prerequisite tooling was missing and could not be installed. The step
    /// fails immediately with a fixed exit code so its absence shows up in
    /// the summary instead of being silently dropped.
    Unavailable,
}

/// One unit of work. Immutable once the registry has resolved it.
#[derive(Clone, Debug)]
pub struct Step {
    pub name: String,
    pub kind: StepKind,
}

impl Step {
    pub fn command(name: &str, program: &str, args: &[&str], cwd: &Path) -> Self {
        Self {
            name: name.to_string(),
            kind: StepKind::Command {
                program: program.to_string(),
                args: args.iter().map(ToString::to_string).collect(),
                cwd: cwd.to_path_buf(),
                env_overrides: BTreeMap::new(),
            },
        }
    }

    pub fn unavailable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: StepKind::Unavailable,
        }
    }

    /// Adds an environment override; overrides win over the inherited snapshot.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        if let StepKind::Command {
            ref mut env_overrides,
            ..
        } = self.kind
        {
            env_overrides.insert(key.to_string(), value.to_string());
        }
        self
    }
}

/// Outcome of one attempted step.
#[derive(Clone, Debug, Serialize)]
pub struct StepResult {
    pub name: String,
    pub succeeded: bool,
    pub exit_code: i32,
    #[serde(rename = "duration_s", serialize_with = "duration_secs")]
    pub duration: Duration,
}

fn duration_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Immutable snapshot of the ambient environment, taken once per run so every
/// step sees the same inherited variables.
#[derive(Clone, Debug, Default)]
pub struct EnvSnapshot {
    vars: Vec<(OsString, OsString)>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    /// Layers defaults under the snapshot: ambient values win, a default only
    /// fills a hole.
    pub fn with_defaults(mut self, defaults: &[(&str, &str)]) -> Self {
        for (key, value) in defaults {
            let key_os = OsString::from(key);
            if !self.vars.iter().any(|(k, _)| k == &key_os) {
                self.vars.push((key_os, OsString::from(value)));
            }
        }
        self
    }

    fn apply(&self, cmd: &mut Command) {
        cmd.env_clear();
        for (key, value) in &self.vars {
            cmd.env(key, value);
        }
    }
}

/// Seam between the engine and the operating system, so pipelines can be
/// exercised in tests without spawning real processes.
pub trait StepRunner {
    fn run(&mut self, step: &Step, env: &EnvSnapshot) -> Result<i32>;
}

/// Runs steps as real child processes, blocking until each one terminates.
pub struct ProcessRunner {
    pub quiet: bool,
}

impl StepRunner for ProcessRunner {
    fn run(&mut self, step: &Step, env: &EnvSnapshot) -> Result<i32> {
        let StepKind::Command {
            program,
            args,
            cwd,
            env_overrides,
        } = &step.kind
        else {
            return Ok(UNAVAILABLE_EXIT_CODE);
        };

        if !self.quiet {
            println!("\n==> Running: {} {} (cwd={})", program, args.join(" "), cwd.display());
        }

        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(cwd);
        env.apply(&mut cmd);
        cmd.envs(env_overrides);

        match cmd.status() {
            Ok(status) => Ok(status.code().unwrap_or(-1)),
            Err(err) => {
                // An unspawnable command is a failed step, not a crashed run.
                eprintln!("warning: failed to spawn `{program}`: {err}");
                Ok(SPAWN_FAILURE_EXIT_CODE)
            }
        }
    }
}

/// Executes the resolved steps in order, recording one result per attempt.
/// Zero steps is a valid run and succeeds trivially.
pub fn execute(
    steps: &[Step],
    policy: FailurePolicy,
    env: &EnvSnapshot,
    runner: &mut dyn StepRunner,
) -> Result<Vec<StepResult>> {
    let mut results = Vec::with_capacity(steps.len());
    for step in steps {
        let start = Instant::now();
        let exit_code = match step.kind {
            StepKind::Unavailable => UNAVAILABLE_EXIT_CODE,
            StepKind::Command { .. } => runner.run(step, env)?,
        };
        let result = StepResult {
            name: step.name.clone(),
            succeeded: exit_code == 0,
            exit_code,
            duration: start.elapsed(),
        };
        let failed = !result.succeeded;
        results.push(result);
        if failed && policy == FailurePolicy::FailFast {
            break;
        }
    }
    Ok(results)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Scripted runner: returns the queued exit codes in order and records
    /// which steps it was asked to run.
    struct FakeRunner {
        exit_codes: Vec<i32>,
        invoked: Vec<String>,
    }

    impl FakeRunner {
        fn new(exit_codes: &[i32]) -> Self {
            Self {
                exit_codes: exit_codes.to_vec(),
                invoked: Vec::new(),
            }
        }
    }

    impl StepRunner for FakeRunner {
        fn run(&mut self, step: &Step, _env: &EnvSnapshot) -> Result<i32> {
            self.invoked.push(step.name.clone());
            Ok(self.exit_codes.remove(0))
        }
    }

    fn steps(names: &[&str]) -> Vec<Step> {
        names
            .iter()
            .map(|n| Step::command(n, "true", &[], Path::new(".")))
            .collect()
    }

    #[test]
    fn zero_steps_is_a_trivial_success() {
        let mut runner = FakeRunner::new(&[]);
        let results = execute(&[], FailurePolicy::FailFast, &EnvSnapshot::default(), &mut runner)
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn fail_fast_stops_after_first_failure() {
        let steps = steps(&["a", "b", "c"]);
        let mut runner = FakeRunner::new(&[0, 3, 0]);
        let results = execute(
            &steps,
            FailurePolicy::FailFast,
            &EnvSnapshot::default(),
            &mut runner,
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].name, "b");
        assert!(!results[1].succeeded);
        assert_eq!(results[1].exit_code, 3);
        assert_eq!(runner.invoked, vec!["a", "b"]);
    }

    #[test]
    fn keep_going_records_every_resolved_step() {
        let steps = steps(&["a", "b", "c"]);
        let mut runner = FakeRunner::new(&[1, 0, 2]);
        let results = execute(
            &steps,
            FailurePolicy::KeepGoing,
            &EnvSnapshot::default(),
            &mut runner,
        )
        .unwrap();

        assert_eq!(results.len(), 3);
        assert!(!results[0].succeeded);
        assert!(results[1].succeeded);
        assert!(!results[2].succeeded);
    }

    #[test]
    fn unavailable_step_fails_without_touching_the_runner() {
        let steps = vec![Step::unavailable("webui trunk build --release")];
        let mut runner = FakeRunner::new(&[]);
        let results = execute(
            &steps,
            FailurePolicy::KeepGoing,
            &EnvSnapshot::default(),
            &mut runner,
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        assert!(!results[0].succeeded);
        assert_eq!(results[0].exit_code, UNAVAILABLE_EXIT_CODE);
        assert!(runner.invoked.is_empty());
    }

    #[test]
    fn defaults_do_not_shadow_ambient_values() {
        let snapshot = EnvSnapshot {
            vars: vec![(OsString::from("RUST_BACKTRACE"), OsString::from("full"))],
        }
        .with_defaults(&[("RUST_BACKTRACE", "1"), ("CARGO_TERM_COLOR", "always")]);

        let backtrace: Vec<_> = snapshot
            .vars
            .iter()
            .filter(|(k, _)| k == "RUST_BACKTRACE")
            .collect();
        assert_eq!(backtrace.len(), 1);
        assert_eq!(backtrace[0].1, "full");
        assert!(snapshot.vars.iter().any(|(k, v)| k == "CARGO_TERM_COLOR" && v == "always"));
    }

    #[test]
    fn step_results_serialize_with_seconds() {
        let result = StepResult {
            name: "test".into(),
            succeeded: true,
            exit_code: 0,
            duration: Duration::from_millis(1500),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["name"], "test");
        assert!((json["duration_s"].as_f64().unwrap() - 1.5).abs() < 1e-9);
    }
}
