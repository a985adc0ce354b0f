//! Background balance polling.
//!
//! Spawns a thread that owns the `SerialLine`, sends the print command on a
//! fixed interval, caches the last valid reading and publishes events for
//! display listeners. Tare requests travel to the same thread over a
//! channel, so the port only ever has one exchange in flight.
//!
//! Each `Poller` spawns exactly one thread; dropping the `Poller` signals
//! shutdown and joins it.
use crossbeam_channel as xch;
use sisaqui_traits::SerialLine;
use sisaqui_traits::clock::Clock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::PollSettings;
use crate::error::{AcquisitionError, Result};
use crate::hw_error::map_hw_error;
use crate::protocol::{Command, WeightFrame, parse_frame};
use crate::reading::Reading;
use crate::status::PollEvent;

/// Listener queue depth; events beyond this are dropped until drained.
const EVENT_DEPTH: usize = 32;
/// Longest uninterrupted sleep, so shutdown is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

type LinkError = Box<dyn std::error::Error + Send + Sync>;

/// Result of one print/read exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Weight(WeightFrame),
    Unparsed(String),
    Silent,
}

/// One exchange: clear stale input, send print, read a single line.
pub fn poll_once<L: SerialLine + ?Sized>(
    link: &mut L,
    read_timeout: Duration,
) -> std::result::Result<PollOutcome, LinkError> {
    link.clear_input()?;
    link.send(&Command::Print.frame())?;
    Ok(match link.read_line(read_timeout)? {
        Some(line) => match parse_frame(&line) {
            Some(frame) => PollOutcome::Weight(frame),
            None => PollOutcome::Unparsed(line),
        },
        None => PollOutcome::Silent,
    })
}

/// Ask for a single weight without a background thread.
///
/// Clears the input, sends print, then reads up to `request_attempts` lines
/// spaced by `request_retry`. Fails with `NoResponse` when none parses.
///
/// Time spent blocked in `read_line` counts towards the spacing, so a
/// silent balance is given up on after `request_attempts * request_retry`.
pub fn request_weight<L: SerialLine + ?Sized, C: Clock>(
    link: &mut L,
    settings: &PollSettings,
    clock: &C,
) -> Result<Reading> {
    let to_report = |e: LinkError| eyre::Report::new(map_hw_error(&*e));
    link.clear_input().map_err(to_report)?;
    link.send(&Command::Print.frame()).map_err(to_report)?;
    for attempt in 1..=settings.request_attempts {
        let started = clock.now();
        if let Some(line) = link
            .read_line(settings.request_retry)
            .map_err(to_report)?
        {
            if let Some(frame) = parse_frame(&line) {
                tracing::debug!(attempt, grams = frame.grams, "weight received");
                return Ok(Reading::now(frame.grams));
            }
            tracing::debug!(attempt, line = %line, "ignoring non-weight line");
        }
        let spent = clock.now().saturating_duration_since(started);
        clock.sleep(settings.request_retry.saturating_sub(spent));
    }
    Err(AcquisitionError::NoResponse.into())
}

/// Send the tare command directly on a link the caller owns.
pub fn send_tare<L: SerialLine + ?Sized>(link: &mut L) -> Result<()> {
    link.send(&Command::Tare.frame())
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
    tracing::info!("tare sent");
    Ok(())
}

pub struct Poller {
    latest: Arc<Mutex<Option<Reading>>>,
    events: xch::Receiver<PollEvent>,
    commands: xch::Sender<Command>,
    last_ok: Arc<AtomicU64>,
    polls: Arc<AtomicU64>,
    epoch: Instant,
    /// Shutdown flag (lock-free check inside the loop)
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Poller {
    pub fn spawn<L, C>(link: L, settings: PollSettings, clock: C) -> Self
    where
        L: SerialLine + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        Self::spawn_with_shutdown(link, settings, clock, shutdown)
    }

    /// Like [`Poller::spawn`] but sharing an external shutdown flag (Ctrl-C).
    pub fn spawn_with_shutdown<L, C>(
        mut link: L,
        settings: PollSettings,
        clock: C,
        shutdown: Arc<AtomicBool>,
    ) -> Self
    where
        L: SerialLine + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (event_tx, event_rx) = xch::bounded(EVENT_DEPTH);
        let (cmd_tx, cmd_rx) = xch::unbounded::<Command>();
        let latest = Arc::new(Mutex::new(None));
        let last_ok = Arc::new(AtomicU64::new(0));
        let polls = Arc::new(AtomicU64::new(0));
        let epoch = clock.now();

        let w_shutdown = shutdown.clone();
        let w_latest = latest.clone();
        let w_last_ok = last_ok.clone();
        let w_polls = polls.clone();

        let join_handle = std::thread::spawn(move || {
            let emit = |ev: PollEvent| {
                // full queue means nobody is watching the display; drop it
                let _ = event_tx.try_send(ev);
            };
            let nap = |d: Duration| sleep_unless_shutdown(&clock, d, &w_shutdown);

            loop {
                if w_shutdown.load(Ordering::Relaxed) {
                    tracing::debug!("poller received shutdown signal");
                    break;
                }

                while let Ok(cmd) = cmd_rx.try_recv() {
                    match link.send(&cmd.frame()) {
                        Ok(()) => {
                            tracing::info!(?cmd, "command sent");
                            emit(PollEvent::TareSent);
                            nap(settings.tare_settle);
                        }
                        Err(e) => {
                            tracing::warn!(?cmd, error = %e, "command failed");
                            emit(PollEvent::Fault(e.to_string()));
                        }
                    }
                }

                w_polls.fetch_add(1, Ordering::Relaxed);
                match poll_once(&mut link, settings.read_timeout) {
                    Ok(PollOutcome::Weight(frame)) => {
                        let reading = Reading::now(frame.grams);
                        tracing::trace!(grams = frame.grams, "reading");
                        *w_latest.lock().unwrap_or_else(PoisonError::into_inner) =
                            Some(reading.clone());
                        w_last_ok.store(clock.ms_since(epoch), Ordering::Relaxed);
                        emit(PollEvent::Reading(reading));
                        nap(settings.interval);
                    }
                    Ok(PollOutcome::Unparsed(line)) => {
                        tracing::debug!(line = %line, "response without weight");
                        emit(PollEvent::Unparsed(line));
                        nap(settings.interval);
                    }
                    Ok(PollOutcome::Silent) => nap(settings.interval),
                    Err(e) => {
                        tracing::warn!(error = %e, "poll failed, backing off");
                        emit(PollEvent::Fault(e.to_string()));
                        nap(settings.error_backoff);
                    }
                }
            }
            tracing::trace!("poller thread exiting cleanly");
        });

        Self {
            latest,
            events: event_rx,
            commands: cmd_tx,
            last_ok,
            polls,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Last valid reading, if any arrived since the poller started.
    pub fn latest(&self) -> Option<Reading> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events(&self) -> &xch::Receiver<PollEvent> {
        &self.events
    }

    /// Queue a tare; the polling thread sends it before its next print.
    pub fn tare(&self) -> Result<()> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(AcquisitionError::Stopped.into());
        }
        self.commands
            .send(Command::Tare)
            .map_err(|_| eyre::Report::new(AcquisitionError::Stopped))
    }

    /// Block (real time) until a reading is cached or `timeout` passes.
    ///
    /// Waits on the event channel; events received meanwhile are consumed.
    /// The cache is rechecked on every wakeup because a full queue drops
    /// events the cache still holds.
    pub fn wait_for_reading(&self, timeout: Duration) -> Option<Reading> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if let Some(r) = self.latest() {
                return Some(r);
            }
            let slice = match deadline {
                Some(d) => {
                    let left = d.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return None;
                    }
                    left.min(SLEEP_SLICE)
                }
                None => SLEEP_SLICE,
            };
            match self.events.recv_timeout(slice) {
                Ok(PollEvent::Reading(r)) => return Some(r),
                Ok(_) | Err(xch::RecvTimeoutError::Timeout) => {}
                Err(xch::RecvTimeoutError::Disconnected) => return self.latest(),
            }
        }
    }

    /// Number of print requests issued so far.
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Milliseconds since the last valid reading, measured on a real clock.
    pub fn stalled_for_now(&self) -> u64 {
        let dur = Instant::now().saturating_duration_since(self.epoch);
        let now_ms = u64::try_from(dur.as_millis()).unwrap_or(u64::MAX);
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits between exchanges, after at most one read
        // timeout plus one sleep slice.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("poller thread joined"),
                Err(e) => tracing::warn!(?e, "poller thread panicked during shutdown"),
            }
        }
    }
}

fn sleep_unless_shutdown<C: Clock>(clock: &C, d: Duration, shutdown: &AtomicBool) {
    let mut left = d;
    while !left.is_zero() {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        let step = left.min(SLEEP_SLICE);
        clock.sleep(step);
        left = left.saturating_sub(step);
    }
}
