use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("open serial port {port}: {reason}")]
    Open { port: String, reason: String },
    #[error("no serial ports found")]
    NoPorts,
    #[error("serial support not compiled in (enable the `hardware` feature)")]
    Unsupported,
    #[error("serial read timeout")]
    Timeout,
    #[error("serial: {0}")]
    Serial(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
