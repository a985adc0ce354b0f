//! From conversions between `sisaqui_config` schemas and core runtime settings.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Layout, LedgerSettings, PollSettings};

/// Poll timings need the serial read timeout as well, so convert from the pair.
impl From<(&sisaqui_config::PollCfg, &sisaqui_config::SerialCfg)> for PollSettings {
    fn from((p, s): (&sisaqui_config::PollCfg, &sisaqui_config::SerialCfg)) -> Self {
        PollSettings {
            interval: Duration::from_millis(p.interval_ms),
            error_backoff: Duration::from_millis(p.error_backoff_ms),
            tare_settle: Duration::from_millis(p.tare_settle_ms),
            read_timeout: Duration::from_millis(s.read_timeout_ms),
            request_attempts: p.request_attempts,
            request_retry: Duration::from_millis(p.request_retry_ms),
        }
    }
}

impl From<sisaqui_config::LayoutCfg> for Layout {
    fn from(l: sisaqui_config::LayoutCfg) -> Self {
        match l {
            sisaqui_config::LayoutCfg::Columns => Layout::Columns,
            sisaqui_config::LayoutCfg::Sequential => Layout::Sequential,
        }
    }
}

impl From<&sisaqui_config::LedgerCfg> for LedgerSettings {
    fn from(l: &sisaqui_config::LedgerCfg) -> Self {
        LedgerSettings {
            dir: PathBuf::from(&l.dir),
            name: l.name.clone(),
            layout: l.layout.into(),
            group_size: l.group_size,
        }
    }
}
