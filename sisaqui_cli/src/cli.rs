//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use sisaqui_core::Column;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "sisaqui", version, about = "Sartorius balance reader and capture ledger")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serial port (COM8, /dev/ttyUSB0); overrides serial.port
    #[arg(long, value_name = "PORT")]
    pub port: Option<String>,

    /// Ledger name inside ledger.dir; overrides ledger.name
    #[arg(long, value_name = "NAME")]
    pub ledger: Option<String>,

    /// Talk to an in-process simulated balance instead of a serial port
    #[arg(long, action = ArgAction::SetTrue)]
    pub sim: bool,

    /// Print results and logs as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides logging.level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List serial ports
    Ports,
    /// Ask the balance for one weight
    Read,
    /// Print live readings until Ctrl-C
    Monitor {
        /// Stop after this many readings
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
        count: Option<u64>,
    },
    /// Zero-reset the balance
    Tare,
    /// Store the current weight in the ledger
    #[command(
        long_about = "Store the current weight in the ledger.\n\nWith --column, capture once and exit. Without it, read single-letter commands from stdin:\n  a, b, g  capture into Padrao (A), Cliente (B) or Generico\n  t        tare\n  w        show the current weight\n  s        ledger summary\n  o        open the ledger\n  q        quit"
    )]
    Capture {
        /// Column to capture into: a, b or g
        #[arg(long, value_name = "COLUMN")]
        column: Option<Column>,
    },
    /// Per-column statistics from the ledger
    Summary,
    /// Open the ledger with the desktop's default program
    Open,
}
