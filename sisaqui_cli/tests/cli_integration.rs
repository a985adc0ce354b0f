use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

// Fast timings so sim runs finish quickly; ledger lives in the temp dir
fn write_config(dir: &Path, layout: &str) -> PathBuf {
    let toml = format!(
        r#"
[serial]
read_timeout_ms = 50

[poll]
interval_ms = 10
error_backoff_ms = 20
tare_settle_ms = 10
request_attempts = 5
request_retry_ms = 10

[ledger]
dir = '{}'
name = "ensaio"
layout = "{layout}"
group_size = 2
"#,
        dir.join("dados").display()
    );
    let path = dir.join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn sisaqui(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sisaqui").unwrap();
    cmd.arg("--config").arg(cfg).arg("--sim");
    cmd.env_remove("RUST_LOG");
    cmd.env("SISAQUI_SIM_WEIGHT", "12.5");
    cmd
}

fn ledger_lines(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("dados").join("ensaio.csv"))
        .unwrap()
        .split("\r\n")
        .map(str::to_string)
        .collect()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["read"], 0, "12.5 g", "stdout")]
#[case(&["tare"], 0, "tare sent", "stdout")]
#[case(&["capture", "--column", "x"], 2, "unknown column", "stderr")]
#[case(&["monitor", "--count", "0"], 2, "error", "stderr")]
#[case(&["open"], 0, "does not exist yet", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "columns");

    let assert = sisaqui(&cfg).args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn read_json_reports_grams() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "columns");
    let out = sisaqui(&cfg).args(["--json", "read"]).output().unwrap();
    assert!(out.status.success());
    let line = String::from_utf8(out.stdout).unwrap();
    let v: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(v["event"], "reading");
    assert_eq!(v["grams"], 12.5);
    assert!(v["time"].as_str().unwrap().len() == 8);
}

#[rstest]
fn captures_fill_columns_and_summary_reports_them() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "columns");

    for col in ["a", "a", "b"] {
        sisaqui(&cfg)
            .args(["capture", "--column", col])
            .assert()
            .success()
            .stdout(predicate::str::contains("#1: 12,5 g"));
    }

    let lines = ledger_lines(dir.path());
    assert_eq!(lines[0], "Data;Hora;;Padrao (A);;;Cliente (B);;;Generico;");
    assert!(lines[2].contains(";;12,5;"), "first data row: {}", lines[2]);
    assert!(lines[3].starts_with(";;;12,5;"), "second data row: {}", lines[3]);
    assert!(lines.iter().any(|l| l == "Padrao (A);2;12,50;12,50;12,50"));

    sisaqui(&cfg)
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("Padrao (A)").and(predicate::str::contains("12,50")));
}

#[rstest]
fn summary_json_has_one_line_per_column() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "columns");
    sisaqui(&cfg)
        .args(["capture", "--column", "g"])
        .assert()
        .success();

    let out = sisaqui(&cfg).args(["--json", "summary"]).output().unwrap();
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    let rows: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["column"], "a");
    assert_eq!(rows[0]["count"], 0);
    assert!(rows[0]["mean"].is_null());
    assert_eq!(rows[2]["column"], "g");
    assert_eq!(rows[2]["count"], 1);
    assert_eq!(rows[2]["mean"], 12.5);
}

#[rstest]
fn sequential_layout_numbers_rows() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "sequential");
    for _ in 0..2 {
        sisaqui(&cfg)
            .args(["capture", "--column", "b"])
            .assert()
            .success();
    }
    let lines = ledger_lines(dir.path());
    assert_eq!(lines[0], "ID;Data;Hora;Peso (g)");
    assert!(lines[1].starts_with("1;") && lines[1].ends_with(";12,5"));
    assert!(lines[2].starts_with("2;"));
}

#[rstest]
fn interactive_session_reads_commands_from_stdin() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "columns");
    sisaqui(&cfg)
        .arg("capture")
        .write_stdin("a\ng\nw\nx\n\ns\nq\nb\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Padrao (A) #1: 12,5 g")
                .and(predicate::str::contains("Generico #1: 12,5 g"))
                .and(predicate::str::contains("12.5 g"))
                // b comes after q and is never captured
                .and(predicate::str::contains("Cliente (B) #1").not()),
        )
        .stderr(predicate::str::contains("unknown command 'x'"));

    let lines = ledger_lines(dir.path());
    assert!(lines[2].contains(";;12,5;"));
}

#[rstest]
fn silent_balance_maps_to_no_reading_exit() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "columns");

    sisaqui(&cfg)
        .env("SISAQUI_SIM_SILENT", "1")
        .arg("read")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("did not answer the print request"));

    sisaqui(&cfg)
        .env("SISAQUI_SIM_SILENT", "1")
        .args(["--json", "capture", "--column", "a"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("\"reason\":\"NoReading\""));

    // the ledger exists with headers only
    let lines = ledger_lines(dir.path());
    assert_eq!(lines[1], ";;;Peso (g);Hora;;Peso (g);Hora;;Peso (g);Hora");
    assert_eq!(lines[2], "");
}

#[rstest]
fn monitor_stops_after_count() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "columns");
    let out = sisaqui(&cfg)
        .env("SISAQUI_SIM_DRIFT", "1")
        .args(["--json", "monitor", "--count", "3"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    let grams: Vec<f64> = text
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
        .filter(|v| v["event"] == "reading")
        .map(|v| v["grams"].as_f64().unwrap())
        .collect();
    assert_eq!(grams.len(), 3);
    assert_eq!(grams[0], 12.5);
    assert!(grams[2] > grams[0], "drift should raise the load: {grams:?}");
}

#[rstest]
fn invalid_config_is_humanized() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[ledger]\ngroup_size = 0\n").unwrap();
    sisaqui(&cfg)
        .arg("summary")
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("Configuration is invalid")
                .and(predicate::str::contains("ledger.group_size")),
        );
}

#[rstest]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    sisaqui(&dir.path().join("nope.toml"))
        .arg("read")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not read the config file"));
}
