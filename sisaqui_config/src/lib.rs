#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the balance acquisition tool.
//!
//! - `Config` and its sections are deserialized from TOML; every section
//!   has defaults matching the Sartorius factory framing (1200 7O1).
//! - `Config::validate` rejects values the poller or ledger cannot use.
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParityCfg {
    None,
    #[default]
    Odd,
    Even,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialCfg {
    /// Device name (`COM8`, `/dev/ttyUSB0`). Absent means "pick the first port found".
    pub port: Option<String>,
    pub baud_rate: u32,
    /// 5..=8
    pub data_bits: u8,
    pub parity: ParityCfg,
    /// 1 or 2
    pub stop_bits: u8,
    /// Max wait for one response line
    pub read_timeout_ms: u64,
}

impl Default for SerialCfg {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 1200,
            data_bits: 7,
            parity: ParityCfg::Odd,
            stop_bits: 1,
            read_timeout_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollCfg {
    /// Pause between two print requests
    pub interval_ms: u64,
    /// Pause after an I/O failure before polling again
    pub error_backoff_ms: u64,
    /// Quiet time after a tare before the next print request
    pub tare_settle_ms: u64,
    /// One-shot request: number of read attempts
    pub request_attempts: u32,
    /// One-shot request: pause between attempts
    pub request_retry_ms: u64,
}

impl Default for PollCfg {
    fn default() -> Self {
        Self {
            interval_ms: 200,
            error_backoff_ms: 1000,
            tare_settle_ms: 500,
            request_attempts: 20,
            request_retry_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutCfg {
    /// Side-by-side A/B/Generic columns, rewritten on every capture
    #[default]
    Columns,
    /// One appended row per capture with a running ID
    Sequential,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LedgerCfg {
    pub dir: String,
    pub name: String,
    pub layout: LayoutCfg,
    /// Columns layout: blank separator row after this many data rows
    pub group_size: usize,
}

impl Default for LedgerCfg {
    fn default() -> Self {
        Self {
            dir: "dados coletados".to_string(),
            name: "ensaio_livre".to_string(),
            layout: LayoutCfg::Columns,
            group_size: 4,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub serial: SerialCfg,
    pub poll: PollCfg,
    pub ledger: LedgerCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file. Validation is left to the caller so CLI
/// overrides can be applied first.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration in {}: {}", path.display(), e))
}

const ONE_MINUTE_MS: u64 = 60 * 1000;
const MAX_REQUEST_ATTEMPTS: u32 = 1000;

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.baud_rate == 0 {
            eyre::bail!("serial.baud_rate must be > 0");
        }
        if !(5..=8).contains(&self.serial.data_bits) {
            eyre::bail!("serial.data_bits must be in [5, 8]");
        }
        if !matches!(self.serial.stop_bits, 1 | 2) {
            eyre::bail!("serial.stop_bits must be 1 or 2");
        }
        if self.serial.read_timeout_ms == 0 {
            eyre::bail!("serial.read_timeout_ms must be >= 1");
        }
        if self.serial.read_timeout_ms > ONE_MINUTE_MS {
            eyre::bail!("serial.read_timeout_ms is unreasonably large (>1min)");
        }
        if let Some(port) = &self.serial.port
            && port.trim().is_empty()
        {
            eyre::bail!("serial.port must not be blank (omit it to auto-select)");
        }

        // Poll
        if self.poll.interval_ms > ONE_MINUTE_MS {
            eyre::bail!("poll.interval_ms is unreasonably large (>1min)");
        }
        if self.poll.error_backoff_ms == 0 {
            eyre::bail!("poll.error_backoff_ms must be >= 1");
        }
        if self.poll.error_backoff_ms > ONE_MINUTE_MS {
            eyre::bail!("poll.error_backoff_ms is unreasonably large (>1min)");
        }
        if self.poll.tare_settle_ms > ONE_MINUTE_MS {
            eyre::bail!("poll.tare_settle_ms is unreasonably large (>1min)");
        }
        if self.poll.request_attempts == 0 {
            eyre::bail!("poll.request_attempts must be >= 1");
        }
        if self.poll.request_attempts > MAX_REQUEST_ATTEMPTS {
            eyre::bail!("poll.request_attempts must be <= {MAX_REQUEST_ATTEMPTS}");
        }
        if self.poll.request_retry_ms > ONE_MINUTE_MS {
            eyre::bail!("poll.request_retry_ms is unreasonably large (>1min)");
        }

        // Ledger
        if self.ledger.dir.trim().is_empty() {
            eyre::bail!("ledger.dir must not be empty");
        }
        if self.ledger.group_size == 0 {
            eyre::bail!("ledger.group_size must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
