//! Capture session: one poller plus the ledger it feeds.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use sisaqui_traits::SerialLine;
use sisaqui_traits::clock::{Clock, MonotonicClock};

use crate::config::PollSettings;
use crate::error::{AcquisitionError, BuildError, Result};
use crate::ledger::{Column, Ledger, LedgerRow};
use crate::poller::Poller;
use crate::reading::Reading;

/// What a capture stored.
#[derive(Debug, Clone)]
pub struct Capture {
    pub reading: Reading,
    pub row: LedgerRow,
    /// Captures into this column during the session, this one included
    pub session_count: usize,
}

pub struct SessionBuilder<L> {
    link: Option<L>,
    poll: PollSettings,
    ledger: Option<Ledger>,
    shutdown: Option<Arc<AtomicBool>>,
}

impl<L> Default for SessionBuilder<L> {
    fn default() -> Self {
        Self {
            link: None,
            poll: PollSettings::default(),
            ledger: None,
            shutdown: None,
        }
    }
}

impl<L: SerialLine + Send + 'static> SessionBuilder<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_link(mut self, link: L) -> Self {
        self.link = Some(link);
        self
    }

    pub fn with_poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn build(self) -> Result<Session> {
        self.build_with_clock(MonotonicClock::new())
    }

    pub fn build_with_clock<C: Clock + Send + Sync + 'static>(self, clock: C) -> Result<Session> {
        let link = self
            .link
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLink))?;
        let ledger = self
            .ledger
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLedger))?;
        if self.poll.read_timeout.is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "read timeout must be non-zero",
            )));
        }
        if ledger.ensure_exists()? {
            tracing::info!(path = %ledger.path().display(), "new ledger");
        }
        let shutdown = self.shutdown.unwrap_or_default();
        let poller = Poller::spawn_with_shutdown(link, self.poll, clock, shutdown);
        Ok(Session {
            poller,
            ledger,
            counts: [0; 3],
        })
    }
}

pub struct Session {
    poller: Poller,
    ledger: Ledger,
    counts: [usize; 3],
}

impl Session {
    pub fn builder<L: SerialLine + Send + 'static>() -> SessionBuilder<L> {
        SessionBuilder::new()
    }

    /// Store the cached reading under `column`.
    ///
    /// Fails with `NoReading` until the poller has seen one valid weight.
    pub fn capture(&mut self, column: Column) -> Result<Capture> {
        let Some(reading) = self.poller.latest() else {
            tracing::warn!(column = column.label(), "capture before first reading");
            return Err(AcquisitionError::NoReading.into());
        };
        let row = self.ledger.record(column, &reading)?;
        let slot = &mut self.counts[column.index()];
        *slot += 1;
        Ok(Capture {
            reading,
            row,
            session_count: *slot,
        })
    }

    pub fn tare(&self) -> Result<()> {
        self.poller.tare()
    }

    pub fn latest(&self) -> Option<Reading> {
        self.poller.latest()
    }

    pub fn count(&self, column: Column) -> usize {
        self.counts[column.index()]
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
