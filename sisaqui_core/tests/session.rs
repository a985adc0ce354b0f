use sisaqui_core::config::Layout;
use sisaqui_core::error::{AcquisitionError, BuildError};
use sisaqui_core::{Column, Ledger, PollSettings, Session};
use sisaqui_hardware::SimulatedBalance;
use std::time::Duration;
use tempfile::tempdir;

fn fast() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(5),
        read_timeout: Duration::from_millis(20),
        tare_settle: Duration::from_millis(5),
        ..PollSettings::default()
    }
}

#[test]
fn builder_requires_link_and_ledger() {
    let dir = tempdir().unwrap();
    let err = match Session::builder::<SimulatedBalance>().build() {
        Err(e) => e,
        Ok(_) => panic!("should fail without a link"),
    };
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingLink)
    ));

    let err = match Session::builder().with_link(SimulatedBalance::new()).build() {
        Err(e) => e,
        Ok(_) => panic!("should fail without a ledger"),
    };
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingLedger)
    ));

    let err = match Session::builder()
        .with_link(SimulatedBalance::new())
        .with_ledger(Ledger::new(dir.path().join("x.csv"), Layout::Columns, 4))
        .with_poll(PollSettings {
            read_timeout: Duration::ZERO,
            ..PollSettings::default()
        })
        .build()
    {
        Err(e) => e,
        Ok(_) => panic!("zero read timeout should be rejected"),
    };
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[test]
fn capture_before_first_reading_is_refused() {
    let dir = tempdir().unwrap();
    let sim = SimulatedBalance::with_load(5.0);
    sim.handle().set_silent(true);
    let ledger = Ledger::new(dir.path().join("e.csv"), Layout::Columns, 4);
    let mut session = Session::builder()
        .with_link(sim)
        .with_ledger(ledger.clone())
        .with_poll(fast())
        .build()
        .unwrap();

    // build creates the ledger with headers only
    assert!(ledger.exists());
    let err = session.capture(Column::A).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AcquisitionError>(),
        Some(AcquisitionError::NoReading)
    ));
    assert_eq!(session.count(Column::A), 0);
    assert_eq!(ledger.load().unwrap().total(), 0);
}

#[test]
fn captures_land_in_their_columns() {
    let dir = tempdir().unwrap();
    let sim = SimulatedBalance::with_load(100.5);
    let handle = sim.handle();
    let ledger = Ledger::new(dir.path().join("e.csv"), Layout::Columns, 4);
    let mut session = Session::builder()
        .with_link(sim)
        .with_ledger(ledger)
        .with_poll(fast())
        .build()
        .unwrap();
    session
        .poller()
        .wait_for_reading(Duration::from_secs(2))
        .unwrap();

    let c1 = session.capture(Column::A).unwrap();
    assert_eq!(c1.row.weight, "100,5");
    assert_eq!(c1.session_count, 1);

    handle.set_load(99.75);
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while session.latest().map(|r| r.grams) != Some(99.75) {
        assert!(std::time::Instant::now() < deadline);
        std::thread::sleep(Duration::from_millis(5));
    }
    let c2 = session.capture(Column::B).unwrap();
    assert_eq!(c2.row.weight, "99,75");
    let c3 = session.capture(Column::A).unwrap();
    assert_eq!(c3.session_count, 2);

    let snap = session.ledger().load().unwrap();
    assert_eq!(snap.count(Column::A), 2);
    assert_eq!(snap.count(Column::B), 1);
    assert_eq!(session.count(Column::Generic), 0);
}
