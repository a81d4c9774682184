//! CLI argument parsing

use clap::{Parser, Subcommand};
use romclient_core::BankSwitch;
use std::path::PathBuf;

/// Parse a bank-switching scheme name
fn parse_bankswitch(s: &str) -> Result<BankSwitch, String> {
    BankSwitch::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = BankSwitch::ALL.iter().map(|bs| bs.name()).collect();
        format!(
            "Unknown bankswitching method: {} [available: {}]",
            s,
            names.join(", ")
        )
    })
}

#[derive(Parser)]
#[command(name = "romclient")]
#[command(author, version, about = "VCS ROM dumping utility", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dump the cartridge to a file
    Dump {
        /// Serial port of the cartridge reader, or "dummy" for a simulated
        /// reader. Auto-detected if not specified.
        #[arg(short, long)]
        port: Option<String>,

        /// Output file path
        #[arg(short, long, default_value = romclient_dump::DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Bankswitching method
        #[arg(short, long, default_value = "none", value_parser = parse_bankswitch)]
        bankswitch: BankSwitch,

        /// Serial read timeout in milliseconds
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,

        /// Time allowed for the whole dump in milliseconds
        #[arg(long, default_value_t = 30_000)]
        dump_timeout_ms: u64,
    },

    /// List available serial ports
    ListPorts,

    /// List bankswitching methods
    ListBankswitch,
}
