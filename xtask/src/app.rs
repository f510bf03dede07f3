use anyhow::Result;
use std::process::ExitCode;

pub fn run(cli: crate::cli::Cli) -> Result<ExitCode> {
    match cli.cmd {
        crate::cli::Cmd::Verify(args) => crate::verify::run(&args),
        crate::cli::Cmd::Package(args) => {
            crate::package::run(&args)?;
            Ok(ExitCode::SUCCESS)
        }
        crate::cli::Cmd::Dev(args) => crate::dev::run(&args),
        crate::cli::Cmd::Doctor => {
            crate::doctor::run()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
