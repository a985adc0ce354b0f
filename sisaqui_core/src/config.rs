//! Runtime settings consumed by the poller, the one-shot request and the ledger.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub error_backoff: Duration,
    pub tare_settle: Duration,
    pub read_timeout: Duration,
    pub request_attempts: u32,
    pub request_retry: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            error_backoff: Duration::from_secs(1),
            tare_settle: Duration::from_millis(500),
            read_timeout: Duration::from_millis(500),
            request_attempts: 20,
            request_retry: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Columns,
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    pub dir: PathBuf,
    pub name: String,
    pub layout: Layout,
    pub group_size: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("dados coletados"),
            name: "ensaio_livre".to_string(),
            layout: Layout::Columns,
            group_size: 4,
        }
    }
}
