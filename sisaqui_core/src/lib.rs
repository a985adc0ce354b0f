#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Balance acquisition core (hardware-agnostic).
//!
//! All port traffic goes through `sisaqui_traits::SerialLine`.
//!
//! ## Architecture
//!
//! - **Protocol**: Sartorius print/tare frames and weight-line parsing (`protocol`)
//! - **Polling**: background thread caching the last valid reading (`poller`)
//! - **Ledger**: `;`-delimited CSV in columns or sequential layout (`ledger`)
//! - **Session**: poller + ledger, capture by column (`session`)

pub mod atomic;
pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod ledger;
pub mod mocks;
pub mod poller;
pub mod protocol;
pub mod reading;
pub mod session;
pub mod status;
pub mod util;

pub use config::{Layout, LedgerSettings, PollSettings};
pub use error::{AcquisitionError, BuildError};
pub use ledger::{Column, ColumnStats, Ledger, LedgerRow, LedgerSnapshot, ledger_path};
pub use poller::{PollOutcome, Poller, poll_once, request_weight, send_tare};
pub use protocol::{Command, WeightFrame, parse_frame, parse_weight};
pub use reading::Reading;
pub use session::{Capture, Session, SessionBuilder};
pub use status::PollEvent;
