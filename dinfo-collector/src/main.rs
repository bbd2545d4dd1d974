//! debug-info binary.
//!
//! Entry point for the `debug-info` command-line tool.

use std::process::ExitCode;

use clap::Parser;
use dinfo_clock::SystemClock;
use dinfo_collector::exit::{exit_code, reply_exit_code};
use dinfo_collector::{
    dispatch, BusReply, Cli, CliError, DebugInfo, FileLogger, Logger, StderrLogger,
};
use dinfo_exec::ShellRunner;
use dinfo_fs::RealFilesystem;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(reply) => {
            println!("{}", reply.message);
            ExitCode::from(reply_exit_code(reply.code))
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e) as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<BusReply, CliError> {
    let fs = RealFilesystem;
    let settings = cli.global.validated_settings()?;
    let catalog = cli.global.load_catalog(&fs)?;
    let logger = open_logger(cli);

    let mut session = DebugInfo::new(
        ShellRunner::new(),
        fs,
        SystemClock,
        logger,
        settings,
        catalog,
    );
    Ok(dispatch(&mut session, &cli.command))
}

/// File logger at `--log-file`, falling back to stderr.
fn open_logger(cli: &Cli) -> Box<dyn Logger> {
    let level = cli.global.log_level();
    match FileLogger::open(&cli.global.log_file, level) {
        Ok(logger) => Box::new(logger),
        Err(e) => {
            let logger = StderrLogger::new(level);
            logger.warn(&format!(
                "cannot open log file {}: {}",
                cli.global.log_file.display(),
                e
            ));
            Box::new(logger)
        }
    }
}
