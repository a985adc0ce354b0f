//! Append-only layout: `ID;Data;Hora;Peso (g)`.

use std::fs::OpenOptions;
use std::path::Path;

use super::{Column, DELIMITER, LedgerRow, LedgerSnapshot, csv_error, io_error};
use crate::error::Result;

pub(crate) const HEADER: [&str; 4] = ["ID", "Data", "Hora", "Peso (g)"];

pub(super) fn create(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| io_error(path, &e))?;
    let mut w = writer(file);
    w.write_record(HEADER).map_err(|e| csv_error(path, e))?;
    w.flush().map_err(|e| io_error(path, &e))
}

fn writer<W: std::io::Write>(inner: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .terminator(csv::Terminator::CRLF)
        .from_writer(inner)
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(DELIMITER)
        .from_path(path)
        .map_err(|e| csv_error(path, e))
}

/// Rows carry no column; they are all reported under `Generic`.
pub(super) fn load(path: &Path) -> Result<LedgerSnapshot> {
    let mut snap = LedgerSnapshot::default();
    for rec in reader(path)?.records() {
        let rec = rec.map_err(|e| csv_error(path, e))?;
        let (Some(date), Some(time), Some(weight)) = (rec.get(1), rec.get(2), rec.get(3)) else {
            continue;
        };
        if weight.is_empty() {
            continue;
        }
        snap.date = Some(date.to_string());
        snap.push(LedgerRow {
            column: Column::Generic,
            weight: weight.to_string(),
            time: time.to_string(),
        });
    }
    Ok(snap)
}

/// One past the number of data rows already present.
pub(super) fn next_id(path: &Path) -> Result<u64> {
    let mut n: u64 = 0;
    for rec in reader(path)?.records() {
        let rec = rec.map_err(|e| csv_error(path, e))?;
        if rec.get(0).is_some_and(|f| !f.is_empty()) {
            n += 1;
        }
    }
    Ok(n + 1)
}

pub(super) fn append(path: &Path, id: u64, date: &str, row: &LedgerRow) -> Result<()> {
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| io_error(path, &e))?;
    let mut w = writer(file);
    let id = id.to_string();
    w.write_record([id.as_str(), date, row.time.as_str(), row.weight.as_str()])
        .map_err(|e| csv_error(path, e))?;
    w.flush().map_err(|e| io_error(path, &e))
}
