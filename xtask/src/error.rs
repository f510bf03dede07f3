use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy for the tooling.
///
/// A step returning non-zero is not represented here: step failures are data
/// (`StepResult`) and flow through the summary, never through `Err`.
#[derive(Debug, Error)]
pub enum XtaskError {
    /// Core toolchain absent. Fatal before any step runs; exit code 2.
    #[error("core toolchain missing: {0}. Install Rust via https://rustup.rs/")]
    Environment(String),

    /// Auto-install of a missing dependency failed. Degrades the dependent
    /// stage to a recorded failure rather than aborting the run.
    #[error("failed to provision `{tool}`: {reason}")]
    Provisioning { tool: String, reason: String },

    /// Product manifest had no usable version. Recovered locally with the
    /// fallback version, never fatal.
    #[error("no version field found in {}", manifest.display())]
    VersionParse { manifest: PathBuf },

    /// Packaging could not complete. Fatal to the packaging operation only.
    #[error("packaging failed: {0}")]
    Packaging(String),
}
