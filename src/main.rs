use std::{panic, process::ExitCode, sync::Mutex};

use anyhow::{Context, Error};
use clap::Parser;
use log::{error, info};

use osutils::files;
use raidplan::{
    cli::{Cli, Commands},
    commands, validation, FileLogger, MultiLogger,
};
use raidplan_api::error::{InternalError, RaidplanError, RaidplanResultExt};

fn run_raidplan(args: &Cli) -> Result<(), RaidplanError> {
    // Log version ASAP
    info!("Raidplan version: {}", raidplan::RAIDPLAN_VERSION);

    let res = panic::catch_unwind(|| match &args.command {
        Commands::Validate { config } => validation::validate_raid_config_file(config),
        Commands::Inventory { output } => commands::list_inventory(output.as_deref()),
        Commands::Resolve {
            config,
            inventory,
            output,
            error,
        } => {
            let res = commands::resolve(config, inventory.as_deref(), output.as_deref());

            // return error if requested
            if let (Some(error_path), Err(e)) = (error.as_ref(), &res) {
                match serde_yaml::to_string(e) {
                    Ok(rendered) => {
                        if let Err(e2) = files::write_file(error_path, 0o644, rendered.as_bytes())
                        {
                            error!("Failed to write error to file: {e2:?}");
                        }
                    }
                    Err(e2) => error!("Failed to serialize error: {e2}"),
                }
            }

            res
        }
    });

    match res {
        Err(e) => Err(RaidplanError::new(InternalError::Panic(format!("{e:?}")))),
        Ok(r) => r.message(format!("Failed to execute '{}' command", args.command)),
    }
}

fn setup_logging(args: &Cli) -> Result<(), Error> {
    let mut multilogger = MultiLogger::new()
        // Add regular env_logger to output to stderr
        .with_logger(Box::new(
            env_logger::builder()
                .format_timestamp(None)
                .filter_level(args.verbosity)
                .build(),
        ))
        // Command traces are only useful when debugging lsblk itself
        .with_global_filter("osutils::exe", args.verbosity.min(log::LevelFilter::Debug));

    // The log file records everything, stderr only what was asked for
    if let Some(log_file) = &args.log_file {
        multilogger.add_logger(FileLogger::new(log_file).into_logger());
    } else {
        multilogger = multilogger.with_max_level(args.verbosity);
    }

    multilogger.init().context("Logger already registered")
}

fn setup_tracing(args: &Cli) -> Result<(), Error> {
    use tracing_subscriber::fmt::format::FmtSpan;

    let Some(trace_file) = &args.trace_file else {
        return Ok(());
    };

    let file = files::create_file(trace_file).context("Failed to create trace file")?;
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(Mutex::new(file))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")
}

fn main() -> ExitCode {
    // Parse args
    let args = Cli::parse();

    // Initialize the loggers
    if let Err(e) = setup_logging(&args) {
        eprintln!("Failed to initialize logging: {e:?}");
        return ExitCode::from(1);
    }

    if let Err(e) = setup_tracing(&args) {
        error!("Failed to initialize tracing: {e:?}");
        return ExitCode::from(1);
    }

    if let Err(e) = run_raidplan(&args) {
        error!("Raidplan failed: {e:?}");
        return ExitCode::from(2);
    }

    ExitCode::SUCCESS
}
