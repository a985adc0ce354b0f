//! Byte-stream to line assembly shared by the real and simulated links.

use std::time::{Duration, Instant};

/// Deadline `timeout` from now; `None` when it lies beyond what `Instant` can hold.
pub fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// A `None` deadline never expires.
pub fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// Accumulates raw bytes and hands out complete lines.
///
/// Non-ASCII bytes are dropped (the balance talks 7-bit; parity noise
/// shows up as high bytes). `\r` is stripped, `\n` terminates a line.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: String,
    ready: std::collections::VecDeque<String>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        for &b in bytes {
            match b {
                b'\n' => {
                    let line = std::mem::take(&mut self.buf);
                    self.ready.push_back(line);
                }
                b'\r' => {}
                b if b.is_ascii() => self.buf.push(char::from(b)),
                _ => {}
            }
        }
    }

    pub fn pop_line(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    /// Drop both the partial line and any complete lines not yet taken.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.ready.clear();
    }
}
