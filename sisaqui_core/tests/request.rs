//! One-shot weight requests.

use sisaqui_core::error::AcquisitionError;
use sisaqui_core::mocks::{Scripted, ScriptedLine};
use sisaqui_core::{Command, PollSettings, request_weight, send_tare};
use sisaqui_traits::clock::ManualClock;
use std::time::Duration;

fn settings(attempts: u32) -> PollSettings {
    PollSettings {
        request_attempts: attempts,
        request_retry: Duration::from_millis(100),
        ..PollSettings::default()
    }
}

#[test]
fn skips_noise_until_a_weight_arrives() {
    let mut link = ScriptedLine::new([
        Scripted::Nothing,
        Scripted::Line("Stat".into()),
        Scripted::Line("+     7.1250 g  ".into()),
    ]);
    let clock = ManualClock::new();
    let r = request_weight(&mut link, &settings(20), &clock).unwrap();
    assert_eq!(r.grams, 7.125);
    assert_eq!(link.clears, 1);
    assert_eq!(link.sent, vec![Command::Print.frame()]);
    // two misses, each followed by one retry pause
    assert_eq!(clock.elapsed(), Duration::from_millis(200));
}

#[test]
fn gives_up_after_the_configured_attempts() {
    let mut link = ScriptedLine::default();
    let clock = ManualClock::new();
    let err = request_weight(&mut link, &settings(20), &clock).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AcquisitionError>(),
        Some(AcquisitionError::NoResponse)
    ));
    // instant misses are padded to the full 100 ms each
    assert_eq!(clock.elapsed(), Duration::from_secs(2));
}

#[test]
fn link_failure_is_typed() {
    let mut link = ScriptedLine::new([Scripted::Fail("port vanished".into())]);
    let err = request_weight(&mut link, &settings(3), &ManualClock::new()).unwrap_err();
    match err.downcast_ref::<AcquisitionError>() {
        Some(AcquisitionError::Serial(msg)) => assert!(msg.contains("port vanished")),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn read_timeouts_map_to_timeout() {
    let mut link = ScriptedLine::new([Scripted::Fail("read timeout".into())]);
    let err = request_weight(&mut link, &settings(3), &ManualClock::new()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AcquisitionError>(),
        Some(AcquisitionError::Timeout)
    ));
}

#[test]
fn tare_writes_the_zero_frame() {
    let mut link = ScriptedLine::default();
    send_tare(&mut link).unwrap();
    assert_eq!(link.sent, vec![b"\x1bf4_\r\n".to_vec()]);
}

/// Silent link that blocks for the full read timeout, like a real port.
struct BlockingLine {
    clock: ManualClock,
}

impl sisaqui_traits::SerialLine for BlockingLine {
    fn send(&mut self, _frame: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }

    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        self.clock.advance(timeout);
        Ok(None)
    }

    fn clear_input(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

#[test]
fn blocking_reads_count_towards_the_retry_spacing() {
    let clock = ManualClock::new();
    let mut link = BlockingLine {
        clock: clock.clone(),
    };
    let err = request_weight(&mut link, &settings(20), &clock).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AcquisitionError>(),
        Some(AcquisitionError::NoResponse)
    ));
    assert_eq!(clock.elapsed(), Duration::from_secs(2));
}
