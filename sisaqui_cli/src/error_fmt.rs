//! Human-readable error descriptions and structured JSON error formatting.

use sisaqui_core::error::{AcquisitionError, BuildError};
use sisaqui_hardware::HwError;

/// Exit codes other than 0 (ok) and 2 (usage, reported by clap).
pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_NO_READING: i32 = 3;
pub const EXIT_SERIAL: i32 = 4;
pub const EXIT_LEDGER_LOCKED: i32 = 5;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingLink => {
                "What happened: No serial link was provided to the capture session.\nLikely causes: The port failed to open before the session was built.\nHow to fix: Check the port with `sisaqui ports` and pass it with --port.".to_string()
            }
            BuildError::MissingLedger => {
                "What happened: No ledger was provided to the capture session.\nLikely causes: The ledger directory could not be resolved.\nHow to fix: Set [ledger] dir and name in the config, or pass --ledger.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/sisaqui.toml for a sample."
            ),
        };
    }

    if let Some(hw) = err.downcast_ref::<HwError>() {
        return match hw {
            HwError::NoPorts => "What happened: No serial port was found.\nLikely causes: The balance is off, the USB adapter is unplugged, or its driver is missing.\nHow to fix: Connect the balance, check `sisaqui ports`, or use --sim to try the tool without hardware.".to_string(),
            HwError::Open { port, reason } => format!(
                "What happened: Could not open serial port {port} ({reason}).\nLikely causes: Wrong port name, or another program (a terminal, the vendor software) holds the port.\nHow to fix: Close other programs using {port}, then check the name with `sisaqui ports`."
            ),
            HwError::Unsupported => "What happened: This build has no serial support.\nLikely causes: Built without the `hardware` feature.\nHow to fix: Rebuild with `--features hardware`, or use --sim.".to_string(),
            other => format!(
                "What happened: Serial link failure ({other}).\nLikely causes: Cable unplugged or balance switched off.\nHow to fix: Reconnect the balance and rerun."
            ),
        };
    }

    if let Some(ae) = err.downcast_ref::<AcquisitionError>() {
        return match ae {
            AcquisitionError::NoReading => "What happened: No weight has been received from the balance yet.\nLikely causes: Balance still starting up, wrong port, or framing other than 1200 7O1.\nHow to fix: Wait for the display to settle and retry; check [serial] in the config.".to_string(),
            AcquisitionError::NoResponse => "What happened: The balance did not answer the print request.\nLikely causes: Wrong port, balance in a menu, or interface not set to 1200 baud 7 data bits odd parity.\nHow to fix: Check the balance interface settings and the [serial] section, then rerun.".to_string(),
            AcquisitionError::Timeout => "What happened: Serial read timed out.\nLikely causes: Cable loose or read timeout too low.\nHow to fix: Check the cable and consider raising serial.read_timeout_ms.".to_string(),
            AcquisitionError::LedgerLocked(path) => format!(
                "What happened: The ledger {} is locked.\nLikely causes: The file is open in a spreadsheet program.\nHow to fix: Close the spreadsheet and capture again.",
                path.display()
            ),
            AcquisitionError::Ledger(msg) => format!(
                "What happened: Ledger error ({msg}).\nLikely causes: Missing directory permissions or a file edited by hand.\nHow to fix: Check [ledger] dir in the config and the file contents."
            ),
            AcquisitionError::Config(msg) => format!(
                "What happened: {msg}.\nLikely causes: A typo on the command line.\nHow to fix: See `sisaqui --help`."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("read config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path.\nHow to fix: Check the path. Original: {msg}"
        );
    }

    if lower.contains("invalid configuration")
        || lower.starts_with("serial.")
        || lower.starts_with("poll.")
        || lower.starts_with("ledger.")
        || lower.starts_with("logging.")
    {
        return format!(
            "What happened: Configuration is invalid.\nLikely causes: {msg}\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per failure family.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<HwError>().is_some() {
        return EXIT_SERIAL;
    }
    match err.downcast_ref::<AcquisitionError>() {
        Some(AcquisitionError::NoReading | AcquisitionError::NoResponse) => EXIT_NO_READING,
        Some(
            AcquisitionError::Serial(_)
            | AcquisitionError::SerialFault(_)
            | AcquisitionError::Timeout
            | AcquisitionError::Io(_),
        ) => EXIT_SERIAL,
        Some(AcquisitionError::LedgerLocked(_)) => EXIT_LEDGER_LOCKED,
        _ => EXIT_GENERIC,
    }
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    if let Some(hw) = err.downcast_ref::<HwError>() {
        return match hw {
            HwError::NoPorts => "NoPorts",
            HwError::Open { .. } => "PortOpen",
            HwError::Unsupported => "Unsupported",
            _ => "Serial",
        };
    }
    match err.downcast_ref::<AcquisitionError>() {
        Some(AcquisitionError::Serial(_) | AcquisitionError::SerialFault(_)) => "Serial",
        Some(AcquisitionError::Timeout) => "Timeout",
        Some(AcquisitionError::NoResponse) => "NoResponse",
        Some(AcquisitionError::NoReading) => "NoReading",
        Some(AcquisitionError::LedgerLocked(_)) => "LedgerLocked",
        Some(AcquisitionError::Ledger(_)) => "Ledger",
        Some(AcquisitionError::Config(_)) => "Config",
        Some(AcquisitionError::Stopped) => "Stopped",
        Some(AcquisitionError::Io(_)) => "Io",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = reason_name(err);
    let msg = humanize(err);
    if let Some(AcquisitionError::LedgerLocked(path)) = err.downcast_ref::<AcquisitionError>() {
        return json!({
            "reason": reason,
            "details": { "path": path.display().to_string() },
            "message": msg
        })
        .to_string();
    }
    json!({ "reason": reason, "message": msg }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn locked_ledger_names_the_file() {
        let err = eyre::Report::new(AcquisitionError::LedgerLocked(PathBuf::from("x/ensaio.csv")));
        assert!(humanize(&err).contains("x/ensaio.csv"));
        assert_eq!(exit_code_for_error(&err), EXIT_LEDGER_LOCKED);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "LedgerLocked");
        assert_eq!(v["details"]["path"], "x/ensaio.csv");
    }

    #[test]
    fn exit_codes_by_family() {
        let code = |e: AcquisitionError| exit_code_for_error(&eyre::Report::new(e));
        assert_eq!(code(AcquisitionError::NoReading), EXIT_NO_READING);
        assert_eq!(code(AcquisitionError::NoResponse), EXIT_NO_READING);
        assert_eq!(code(AcquisitionError::Timeout), EXIT_SERIAL);
        assert_eq!(code(AcquisitionError::Stopped), EXIT_GENERIC);
        assert_eq!(exit_code_for_error(&eyre::Report::new(HwError::NoPorts)), EXIT_SERIAL);
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), EXIT_GENERIC);
    }

    #[test]
    fn validation_messages_are_config_errors() {
        let err = eyre::eyre!("ledger.group_size must be >= 1");
        let text = humanize(&err);
        assert!(text.starts_with("What happened: Configuration is invalid."));
        assert!(text.contains("ledger.group_size"));
    }

    #[test]
    fn json_has_reason_and_message() {
        let err = eyre::Report::new(HwError::NoPorts);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "NoPorts");
        assert!(v["message"].as_str().unwrap().contains("No serial port"));
    }
}
