//! `dotlink` binary entry point.
use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use dotlink::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbosity(), args.color());
    let log = Arc::new(logging::Logger::new());

    let handler_log = Arc::clone(&log);
    if let Err(e) = ctrlc::set_handler(move || {
        handler_log.error("Interrupted");
        std::process::exit(1);
    }) {
        log.debug(&format!("Failed to install interrupt handler: {e}"));
    }

    commands::run::run(&args, &log)
}
