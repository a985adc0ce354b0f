//! Events published by the poller for display listeners.

use crate::reading::Reading;

#[derive(Debug, Clone)]
pub enum PollEvent {
    /// A weight line was parsed.
    Reading(Reading),
    /// The balance answered with a line that holds no weight.
    Unparsed(String),
    /// Tare frame written to the balance.
    TareSent,
    /// Link error; the poller backs off and keeps going.
    Fault(String),
}
