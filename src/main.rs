//! romclient - Atari 2600 cartridge dumper
//!
//! Talks to the cartridge reader firmware over a serial port, dumps the
//! cartridge with the selected bank-switching scheme and saves it as a raw
//! `.a26` image that emulators such as Stella can load.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set log level based on verbosity
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Dump {
            port,
            output,
            bankswitch,
            timeout_ms,
            dump_timeout_ms,
        } => commands::dump::run_dump(
            port.as_deref(),
            &output,
            bankswitch,
            Duration::from_millis(timeout_ms),
            Duration::from_millis(dump_timeout_ms),
        ),
        Commands::ListPorts => commands::list_ports(),
        Commands::ListBankswitch => {
            commands::list_bankswitch();
            Ok(())
        }
    }
}
