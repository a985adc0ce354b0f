//! In-process stand-in for a Sartorius balance.
//!
//! Answers the print command with a fixed-width weight line and honours the
//! tare command. State lives behind an `Arc<Mutex<_>>` so a [`SimHandle`]
//! can move the load while a poller thread owns the balance.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sisaqui_traits::SerialLine;
use tracing::trace;

use crate::error::HwError;

const PRINT: &[u8] = b"\x1bP";
const TARE: &[u8] = b"\x1bf4_";

#[derive(Debug, Default)]
struct SimState {
    gross_g: f64,
    tare_g: f64,
    /// Added to the gross load after every answered print
    drift_g: f64,
    silent: bool,
    fail_io: bool,
    outbox: VecDeque<String>,
    prints: u64,
    tares: u64,
}

pub struct SimulatedBalance {
    state: Arc<Mutex<SimState>>,
}

/// Remote control for a [`SimulatedBalance`] that has been moved elsewhere.
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedBalance {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBalance {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    /// Start with `grams` on the pan.
    pub fn with_load(grams: f64) -> Self {
        let sim = Self::new();
        sim.handle().set_load(grams);
        sim
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: self.state.clone(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        // a poisoned sim is still usable; the data is plain numbers
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl SimHandle {
    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn set_load(&self, grams: f64) {
        self.lock().gross_g = grams;
    }

    pub fn set_drift(&self, grams_per_print: f64) {
        self.lock().drift_g = grams_per_print;
    }

    /// Stop answering print requests (cable pulled, balance in menu).
    pub fn set_silent(&self, silent: bool) {
        self.lock().silent = silent;
    }

    /// Make every port operation fail with an I/O error.
    pub fn set_failing(&self, failing: bool) {
        self.lock().fail_io = failing;
    }

    /// Queue a raw line as if the balance had sent it unprompted.
    pub fn inject_line(&self, line: impl Into<String>) {
        self.lock().outbox.push_back(line.into());
    }

    pub fn net_load(&self) -> f64 {
        let s = self.lock();
        s.gross_g - s.tare_g
    }

    pub fn prints(&self) -> u64 {
        self.lock().prints
    }

    pub fn tares(&self) -> u64 {
        self.lock().tares
    }
}

/// Sartorius-style fixed-width weight line: sign, right-aligned value, unit.
pub fn format_weight_line(net_g: f64) -> String {
    let sign = if net_g < 0.0 { '-' } else { '+' };
    format!("{sign}{:>11.4} g  ", net_g.abs())
}

fn io_failure() -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(HwError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "simulated link failure",
    )))
}

impl SerialLine for SimulatedBalance {
    fn send(&mut self, frame: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut s = self.lock();
        if s.fail_io {
            return Err(io_failure());
        }
        if frame.starts_with(TARE) {
            s.tares += 1;
            s.tare_g = s.gross_g;
            trace!(tare_g = s.tare_g, "sim tare");
        } else if frame.starts_with(PRINT) {
            s.prints += 1;
            if !s.silent {
                let line = format_weight_line(s.gross_g - s.tare_g);
                s.outbox.push_back(line);
                s.gross_g += s.drift_g;
            }
        }
        Ok(())
    }

    fn read_line(
        &mut self,
        _timeout: Duration,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let mut s = self.lock();
        if s.fail_io {
            return Err(io_failure());
        }
        Ok(s.outbox.pop_front())
    }

    fn clear_input(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut s = self.lock();
        if s.fail_io {
            return Err(io_failure());
        }
        s.outbox.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(10);

    #[test]
    fn answers_print_with_fixed_width_line() {
        let mut sim = SimulatedBalance::with_load(100.25);
        sim.send(b"\x1bP\r\n").unwrap();
        let line = sim.read_line(T).unwrap().unwrap();
        assert_eq!(line, "+   100.2500 g  ");
        assert!(sim.read_line(T).unwrap().is_none());
    }

    #[test]
    fn tare_zeroes_net_load() {
        let mut sim = SimulatedBalance::with_load(42.5);
        let h = sim.handle();
        sim.send(b"\x1bf4_\r\n").unwrap();
        assert_eq!(h.net_load(), 0.0);
        h.set_load(40.0);
        sim.send(b"\x1bP\r\n").unwrap();
        assert_eq!(sim.read_line(T).unwrap().unwrap(), "-     2.5000 g  ");
        assert_eq!(h.tares(), 1);
        assert_eq!(h.prints(), 1);
    }

    #[test]
    fn silent_balance_never_answers() {
        let mut sim = SimulatedBalance::with_load(1.0);
        sim.handle().set_silent(true);
        sim.send(b"\x1bP\r\n").unwrap();
        assert!(sim.read_line(T).unwrap().is_none());
    }

    #[test]
    fn failing_link_errors() {
        let mut sim = SimulatedBalance::new();
        sim.handle().set_failing(true);
        assert!(sim.send(b"\x1bP\r\n").is_err());
        assert!(sim.read_line(T).is_err());
        assert!(sim.clear_input().is_err());
    }

    #[test]
    fn clear_input_drops_stale_lines() {
        let mut sim = SimulatedBalance::new();
        sim.handle().inject_line("stale");
        sim.clear_input().unwrap();
        assert!(sim.read_line(T).unwrap().is_none());
    }
}
