//! Command bodies: link setup, readings, captures and ledger reports.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use serde_json::json;
use sisaqui_config::{Config, ParityCfg};
use sisaqui_core::error::{AcquisitionError, Result};
use sisaqui_core::ledger::{format_date, format_time};
use sisaqui_core::util::comma_fixed2;
use sisaqui_core::{
    Capture, Column, Ledger, LedgerSettings, PollEvent, PollSettings, Poller, Reading, Session,
    request_weight, send_tare,
};
use sisaqui_hardware::{HwError, Parity, SerialSettings, SimulatedBalance};
use sisaqui_traits::SerialLine;
use sisaqui_traits::clock::MonotonicClock;

use crate::cli::Commands;
use crate::error_fmt::humanize;
use crate::shell::open_in_shell;

/// Initial load of the `--sim` balance, in grams.
pub const SIM_WEIGHT_ENV: &str = "SISAQUI_SIM_WEIGHT";
/// Grams added to the `--sim` load after every answered print.
pub const SIM_DRIFT_ENV: &str = "SISAQUI_SIM_DRIFT";
/// Any value but `0` makes the `--sim` balance ignore print requests.
pub const SIM_SILENT_ENV: &str = "SISAQUI_SIM_SILENT";

const HELP: &str = "a/b/g capture | t tare | w weight | s summary | o open | q quit";

type Link = Box<dyn SerialLine + Send>;

/// Everything a command needs after config loading and CLI overrides.
pub struct Context {
    pub cfg: Config,
    pub poll: PollSettings,
    pub ledger: LedgerSettings,
    pub sim: bool,
    pub json: bool,
    pub shutdown: Arc<AtomicBool>,
}

impl Context {
    pub fn new(cfg: Config, sim: bool, json: bool, shutdown: Arc<AtomicBool>) -> Self {
        let poll: PollSettings = (&cfg.poll, &cfg.serial).into();
        let ledger: LedgerSettings = (&cfg.ledger).into();
        Self {
            cfg,
            poll,
            ledger,
            sim,
            json,
            shutdown,
        }
    }

    fn serial_settings(&self, port: String) -> SerialSettings {
        let s = &self.cfg.serial;
        SerialSettings {
            port,
            baud_rate: s.baud_rate,
            data_bits: s.data_bits,
            parity: match s.parity {
                ParityCfg::None => Parity::None,
                ParityCfg::Odd => Parity::Odd,
                ParityCfg::Even => Parity::Even,
            },
            stop_bits: s.stop_bits,
            read_timeout: self.poll.read_timeout,
        }
    }

    /// Configured port, else the first one the OS reports.
    fn resolve_port(&self) -> Result<String> {
        if let Some(port) = &self.cfg.serial.port {
            return Ok(port.clone());
        }
        let first = sisaqui_hardware::list_ports()?
            .into_iter()
            .next()
            .ok_or(HwError::NoPorts)?;
        tracing::info!(port = %first.name, "no port configured, using the first one found");
        Ok(first.name)
    }

    fn open_link(&self) -> Result<Link> {
        if self.sim {
            return Ok(Box::new(sim_balance()));
        }
        let settings = self.serial_settings(self.resolve_port()?);
        tracing::info!(
            port = %settings.port,
            baud = settings.baud_rate,
            data_bits = settings.data_bits,
            stop_bits = settings.stop_bits,
            "opening balance"
        );
        Ok(sisaqui_hardware::open(&settings)?)
    }

    fn stopped(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn emit(&self, value: serde_json::Value, text: impl FnOnce() -> String) {
        if self.json {
            println!("{value}");
        } else {
            println!("{}", text());
        }
    }
}

fn env_grams(key: &str) -> Option<f64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().replace(',', ".").parse::<f64>() {
        Ok(g) => Some(g),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring non-numeric simulation setting");
            None
        }
    }
}

fn sim_balance() -> SimulatedBalance {
    let sim = SimulatedBalance::with_load(env_grams(SIM_WEIGHT_ENV).unwrap_or(0.0));
    if let Some(drift) = env_grams(SIM_DRIFT_ENV) {
        sim.handle().set_drift(drift);
    }
    if std::env::var(SIM_SILENT_ENV).is_ok_and(|v| v.trim() != "0") {
        sim.handle().set_silent(true);
    }
    sim
}

fn reading_json(r: &Reading) -> serde_json::Value {
    json!({
        "event": "reading",
        "grams": r.grams,
        "date": format_date(&r.timestamp),
        "time": format_time(&r.timestamp),
    })
}

pub fn run(cmd: &Commands, ctx: &Context) -> Result<()> {
    match cmd {
        Commands::Ports => ports(ctx),
        Commands::Read => read(ctx),
        Commands::Monitor { count } => monitor(ctx, *count),
        Commands::Tare => tare(ctx),
        Commands::Capture { column: Some(c) } => capture_once(ctx, *c),
        Commands::Capture { column: None } => capture_interactive(ctx),
        Commands::Summary => summary(ctx, &Ledger::from_settings(&ctx.ledger)?),
        Commands::Open => open(ctx, &Ledger::from_settings(&ctx.ledger)?),
    }
}

fn ports(ctx: &Context) -> Result<()> {
    let ports = sisaqui_hardware::list_ports()?;
    let listed: Vec<_> = ports
        .iter()
        .map(|p| json!({ "port": p.name, "kind": p.kind }))
        .collect();
    ctx.emit(json!({ "ports": listed }), || {
        if ports.is_empty() {
            "Nenhuma".to_string()
        } else {
            ports
                .iter()
                .map(|p| format!("{}\t{}", p.name, p.kind))
                .collect::<Vec<_>>()
                .join("\n")
        }
    });
    Ok(())
}

fn read(ctx: &Context) -> Result<()> {
    let mut link = ctx.open_link()?;
    let reading = request_weight(&mut link, &ctx.poll, &MonotonicClock::new())?;
    tracing::info!(grams = reading.grams, "weight read");
    ctx.emit(reading_json(&reading), || reading.to_string());
    Ok(())
}

fn tare(ctx: &Context) -> Result<()> {
    let mut link = ctx.open_link()?;
    send_tare(&mut link)?;
    ctx.emit(json!({ "event": "tare" }), || "tare sent".to_string());
    Ok(())
}

fn monitor(ctx: &Context, count: Option<u64>) -> Result<()> {
    let link = ctx.open_link()?;
    let poller = Poller::spawn_with_shutdown(
        link,
        ctx.poll.clone(),
        MonotonicClock::new(),
        ctx.shutdown.clone(),
    );
    let mut seen: u64 = 0;
    while !ctx.stopped() {
        match poller.events().recv_timeout(Duration::from_millis(100)) {
            Ok(PollEvent::Reading(r)) => {
                seen += 1;
                ctx.emit(reading_json(&r), || {
                    format!("{}  {}", format_time(&r.timestamp), r)
                });
                if count.is_some_and(|n| seen >= n) {
                    break;
                }
            }
            Ok(PollEvent::TareSent | PollEvent::Unparsed(_)) => {}
            Ok(PollEvent::Fault(msg)) => {
                if ctx.json {
                    println!("{}", json!({ "event": "fault", "message": msg }));
                }
            }
            Err(e) if e.is_disconnected() => break,
            Err(_) => {}
        }
    }
    tracing::info!(
        readings = seen,
        polls = poller.polls(),
        stalled_ms = poller.stalled_for_now(),
        "monitor stopped"
    );
    Ok(())
}

fn start_session(ctx: &Context) -> Result<Session> {
    let ledger = Ledger::from_settings(&ctx.ledger)?;
    Session::builder()
        .with_link(ctx.open_link()?)
        .with_poll(ctx.poll.clone())
        .with_ledger(ledger)
        .with_shutdown(ctx.shutdown.clone())
        .build()
        .wrap_err("start capture session")
}

fn print_capture(ctx: &Context, ledger: &Ledger, c: &Capture) {
    ctx.emit(
        json!({
            "event": "capture",
            "column": c.row.column.key().to_string(),
            "label": c.row.column.label(),
            "grams": c.reading.grams,
            "weight": c.row.weight,
            "time": c.row.time,
            "session_count": c.session_count,
            "ledger": ledger.path().display().to_string(),
        }),
        || {
            format!(
                "{} #{}: {} g at {} -> {}",
                c.row.column.label(),
                c.session_count,
                c.row.weight,
                c.row.time,
                ledger.path().display()
            )
        },
    );
}

/// How long a capture waits for the poller's first reading.
fn first_reading_wait(poll: &PollSettings) -> Duration {
    poll.request_retry
        .saturating_mul(poll.request_attempts)
        .max(poll.read_timeout.saturating_mul(2))
}

fn capture_once(ctx: &Context, column: Column) -> Result<()> {
    let mut session = start_session(ctx)?;
    // NoReading from capture covers the case where nothing arrives
    let _ = session.poller().wait_for_reading(first_reading_wait(&ctx.poll));
    let capture = session.capture(column)?;
    print_capture(ctx, session.ledger(), &capture);
    Ok(())
}

/// Errors the operator can fix and retry without leaving the session.
fn recoverable(err: &eyre::Report) -> bool {
    matches!(
        err.downcast_ref::<AcquisitionError>(),
        Some(AcquisitionError::NoReading | AcquisitionError::LedgerLocked(_))
    )
}

fn capture_interactive(ctx: &Context) -> Result<()> {
    let mut session = start_session(ctx)?;
    if !ctx.json {
        println!("Ledger: {}", session.ledger().path().display());
        println!("{HELP}");
    }
    if session
        .poller()
        .wait_for_reading(first_reading_wait(&ctx.poll))
        .is_none()
    {
        tracing::warn!("no reading yet; captures are refused until the balance answers");
    }

    for line in std::io::stdin().lock().lines() {
        if ctx.stopped() {
            break;
        }
        let line = line.wrap_err("read command from stdin")?;
        let Some(key) = line.trim().chars().next() else {
            continue;
        };
        match key.to_ascii_lowercase() {
            'q' => break,
            't' => {
                session.tare()?;
                ctx.emit(json!({ "event": "tare" }), || "tare sent".to_string());
            }
            'w' => match session.latest() {
                Some(r) => ctx.emit(reading_json(&r), || r.to_string()),
                None => ctx.emit(json!({ "event": "reading", "grams": null }), || {
                    "no reading yet".to_string()
                }),
            },
            's' => summary(ctx, session.ledger())?,
            'o' => open(ctx, session.ledger())?,
            k => match Column::from_key(k) {
                Some(column) => match session.capture(column) {
                    Ok(c) => print_capture(ctx, session.ledger(), &c),
                    Err(e) if recoverable(&e) => eprintln!("{}", humanize(&e)),
                    Err(e) => return Err(e),
                },
                None => eprintln!("unknown command '{k}' ({HELP})"),
            },
        }
    }
    let counts: Vec<usize> = Column::ALL.iter().map(|c| session.count(*c)).collect();
    tracing::info!(?counts, "capture session finished");
    Ok(())
}

fn summary(ctx: &Context, ledger: &Ledger) -> Result<()> {
    let snap = ledger.load()?;
    if !ctx.json {
        println!("{}", ledger.path().display());
    }
    for column in Column::ALL {
        let stats = snap.stats(column);
        ctx.emit(
            json!({
                "column": column.key().to_string(),
                "label": column.label(),
                "count": snap.count(column),
                "mean": stats.map(|s| s.mean),
                "min": stats.map(|s| s.min),
                "max": stats.map(|s| s.max),
            }),
            || match stats {
                Some(s) => format!(
                    "{:<12} {:>3}  mean {} g  min {} g  max {} g",
                    column.label(),
                    snap.count(column),
                    comma_fixed2(s.mean),
                    comma_fixed2(s.min),
                    comma_fixed2(s.max)
                ),
                None => format!("{:<12} {:>3}", column.label(), snap.count(column)),
            },
        );
    }
    Ok(())
}

fn open(ctx: &Context, ledger: &Ledger) -> Result<()> {
    let opened = open_in_shell(ledger.path())?;
    let path = ledger.path().display().to_string();
    ctx.emit(json!({ "event": "open", "path": path, "opened": opened }), || {
        if opened {
            format!("opened {path}")
        } else {
            format!("{path} does not exist yet; capture something first")
        }
    });
    Ok(())
}
