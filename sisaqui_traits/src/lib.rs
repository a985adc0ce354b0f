pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

/// Line-oriented link to a balance.
///
/// Implementations own the port; callers never share one across threads.
pub trait SerialLine {
    /// Write a complete command frame.
    fn send(&mut self, frame: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Read one line (terminator stripped). `Ok(None)` when nothing arrived
    /// before `timeout`.
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

    /// Discard anything buffered on the input side.
    fn clear_input(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: SerialLine + ?Sized> SerialLine for Box<T> {
    fn send(&mut self, frame: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).send(frame)
    }

    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_line(timeout)
    }

    fn clear_input(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).clear_input()
    }
}
