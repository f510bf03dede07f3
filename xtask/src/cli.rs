use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Treeward repo developer tasks (verification gate, portable packaging, dev launcher)")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Run the same verification gate as CI: fmt, clippy, tests, release
    /// build, web UI build, desktop build, bench compile-check.
    Verify(VerifyArgs),

    /// Build everything and assemble a portable release archive under `dist/`.
    Package(PackageArgs),

    /// Start the backend, wait for it to become healthy, then open the web UI.
    Dev(DevArgs),

    /// Check that the local toolchain matches what the pipeline expects.
    Doctor,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Skip `cargo fmt -- --check` and `cargo clippy -- -D warnings`.
    #[arg(long)]
    pub skip_lints: bool,

    /// Skip `cargo test` (default and all-features runs).
    #[arg(long)]
    pub skip_tests: bool,

    /// Skip `cargo build --release`.
    #[arg(long)]
    pub skip_build: bool,

    /// Skip the web UI build (Trunk).
    #[arg(long)]
    pub skip_ui: bool,

    /// Skip the desktop shell build.
    #[arg(long)]
    pub skip_desktop: bool,

    /// Skip `cargo bench --no-run` (Windows only).
    #[arg(long)]
    pub skip_bench: bool,

    /// Install a missing wasm target or `trunk` instead of failing the UI step.
    #[arg(long)]
    pub ensure_deps: bool,

    /// Keep running the remaining steps after a failure and report everything
    /// at the end.
    #[arg(long)]
    pub keep_going: bool,

    /// Do not echo the commands being run.
    #[arg(long)]
    pub quiet: bool,

    /// Print the step results as JSON instead of the plain summary.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct PackageArgs {
    /// Also build the desktop shell and embed it in the archive.
    #[arg(long)]
    pub include_desktop: bool,
}

#[derive(Args)]
pub struct DevArgs {
    /// Port the backend should listen on.
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Do not open a browser once the backend is ready.
    #[arg(long)]
    pub no_browser: bool,

    /// Use the release binary instead of the debug one.
    #[arg(long)]
    pub release: bool,
}
