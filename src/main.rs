use std::process::ExitCode;

use colored::Colorize;
use json_shape::cli::CommandLineInterface;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // stdout carries instances and schemas, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match CommandLineInterface::load().run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
