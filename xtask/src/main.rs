use clap::Parser;
use std::process::ExitCode;

mod app;
mod cli;
mod dev;
mod doctor;
mod error;
mod package;
mod pipeline;
mod probe;
mod report;
mod util;
mod verify;

fn main() -> ExitCode {
    let cli = crate::cli::Cli::parse();
    match crate::app::run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            match err.downcast_ref::<crate::error::XtaskError>() {
                Some(crate::error::XtaskError::Environment(_)) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
