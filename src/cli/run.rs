//! CLI entry point
//!
//! `run()` parses arguments, resolves configuration, builds the tokio
//! runtime and prints every outcome itself. It returns only the exit code.

use clap::Parser;
use tracing::warn;

use super::args::Cli;
use super::report;
use crate::sandbox::{ExecutionSandbox, locate_tool};
use crate::utils::logging::init_tracing;
use crate::utils::paths::StoragePaths;
use crate::{Config, ExitCode, Orchestrator, RunOptions};

/// Parse `std::env::args` and run.
pub fn run() -> Result<(), ExitCode> {
    run_with(Cli::parse())
}

/// Run with already parsed arguments.
pub fn run_with(cli: Cli) -> Result<(), ExitCode> {
    // A subscriber may already be installed when embedded; not fatal.
    let _ = init_tracing(cli.debug);

    let prompt = cli.prompt_text();
    if prompt.is_empty() {
        eprintln!("✗ The prompt is empty");
        return Err(ExitCode::CLI_ARGS);
    }

    let config = match Config::discover(&cli.to_cli_args()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("✗ Configuration error: {err:#}");
            return Err(ExitCode::CLI_ARGS);
        }
    };

    if config.pipeline.execute && locate_tool(&config.sandbox.tool).is_none() {
        warn!(tool = %config.sandbox.tool, "Rendering tool not found on PATH; rendering will fail");
    }

    let orchestrator = match Orchestrator::from_config(&config) {
        Ok(orchestrator) => orchestrator,
        Err(err) => {
            eprint!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::PIPELINE_FAILURE);
        }
    };

    let result = rt.block_on(orchestrator.run(&prompt, RunOptions::from(&config.pipeline)));

    if cli.clean_temp {
        clean_temp(&config);
    }

    if cli.json {
        match report::json(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("✗ Failed to serialize result: {e}");
                return Err(ExitCode::PIPELINE_FAILURE);
            }
        }
    } else if result.success {
        print!("{}", report::human(&result));
    } else {
        eprint!("{}", report::human(&result));
    }

    if result.success {
        Ok(())
    } else {
        Err(result.exit_code())
    }
}

fn clean_temp(config: &Config) {
    let paths = StoragePaths::new(config.pipeline.storage_dir.clone());
    let outcome = ExecutionSandbox::new(paths, config.sandbox.clone())
        .and_then(|sandbox| sandbox.cleanup_temp());
    if let Err(e) = outcome {
        warn!(error = %e, "Could not clean working directory");
    }
}
