use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum AcquisitionError {
    #[error("serial link error: {0}")]
    Serial(String),
    #[error("serial link fault: {0}")]
    SerialFault(String),
    #[error("timeout waiting for balance")]
    Timeout,
    #[error("no weight received from balance")]
    NoResponse,
    #[error("no stable reading yet")]
    NoReading,
    #[error("ledger {} is locked by another program", .0.display())]
    LedgerLocked(PathBuf),
    #[error("ledger error: {0}")]
    Ledger(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("poller stopped")]
    Stopped,
    #[error("io error: {0}")]
    Io(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing serial link")]
    MissingLink,
    #[error("missing ledger")]
    MissingLedger,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}
