//! Side-by-side layout: `Data;Hora;;<A w;t>;;<B w;t>;;<G w;t>`.

use std::path::Path;

use super::{Column, DELIMITER, LedgerRow, LedgerSnapshot, csv_error, io_error};
use crate::atomic::write_atomic;
use crate::error::Result;
use crate::util::comma_fixed2;

pub(crate) const HEADER: [&str; 11] = [
    "Data",
    "Hora",
    "",
    "Padrao (A)",
    "",
    "",
    "Cliente (B)",
    "",
    "",
    "Generico",
    "",
];
pub(crate) const SUBHEADER: [&str; 11] = [
    "", "", "", "Peso (g)", "Hora", "", "Peso (g)", "Hora", "", "Peso (g)", "Hora",
];
pub(crate) const STATS_MARKER: &str = "Estatisticas:";
const STATS_HEADER: [&str; 5] = ["Tipo", "Quantidade", "Media (g)", "Minimo (g)", "Maximo (g)"];
/// Data rows shorter than this are not capture rows.
const MIN_DATA_FIELDS: usize = 10;

/// Weight field index per column; the time sits right after it.
fn weight_index(column: Column) -> usize {
    match column {
        Column::A => 3,
        Column::B => 6,
        Column::Generic => 9,
    }
}

pub(super) fn create(path: &Path) -> Result<()> {
    let mut out = Vec::new();
    push_row(&mut out, &HEADER)?;
    push_row(&mut out, &SUBHEADER)?;
    write_atomic(path, &out).map_err(|e| io_error(path, &e))
}

pub(super) fn load(path: &Path) -> Result<LedgerSnapshot> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(DELIMITER)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let mut snap = LedgerSnapshot::default();
    // blank rows never reach us; the csv reader skips empty lines
    for (idx, rec) in rdr.records().enumerate() {
        let rec = rec.map_err(|e| csv_error(path, e))?;
        if idx < 2 {
            continue;
        }
        if rec.get(0) == Some(STATS_MARKER) {
            break;
        }
        if rec.len() < MIN_DATA_FIELDS {
            continue;
        }
        if snap.date.is_none()
            && let Some(d) = rec.get(0).filter(|d| !d.is_empty() && *d != "Data")
        {
            snap.date = Some(d.to_string());
        }
        for column in Column::ALL {
            let wi = weight_index(column);
            let weight = rec.get(wi).unwrap_or("");
            if weight.is_empty() {
                continue;
            }
            snap.push(LedgerRow {
                column,
                weight: weight.to_string(),
                time: rec.get(wi + 1).unwrap_or("").to_string(),
            });
        }
    }
    Ok(snap)
}

/// Render the whole file for `snap`. `date`/`time` fill the first data row.
pub(crate) fn render(
    snap: &LedgerSnapshot,
    date: &str,
    time: &str,
    group_size: usize,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    push_row(&mut out, &HEADER)?;
    push_row(&mut out, &SUBHEADER)?;

    for i in 0..snap.depth() {
        if i > 0 && i % group_size == 0 {
            push_blank(&mut out);
        }
        let mut row: Vec<&str> = Vec::with_capacity(HEADER.len());
        if i == 0 {
            row.extend([date, time]);
        } else {
            row.extend(["", ""]);
        }
        for column in Column::ALL {
            row.push("");
            match snap.column(column).get(i) {
                Some(entry) => row.extend([entry.weight.as_str(), entry.time.as_str()]),
                None => row.extend(["", ""]),
            }
        }
        push_row(&mut out, &row)?;
    }

    push_blank(&mut out);
    push_row(&mut out, &[STATS_MARKER])?;
    push_row(&mut out, &STATS_HEADER)?;
    for column in Column::ALL {
        if let Some(s) = snap.stats(column) {
            let count = s.count.to_string();
            let (mean, min, max) = (comma_fixed2(s.mean), comma_fixed2(s.min), comma_fixed2(s.max));
            push_row(
                &mut out,
                &[column.label(), count.as_str(), mean.as_str(), min.as_str(), max.as_str()],
            )?;
        }
    }
    Ok(out)
}

pub(super) fn rewrite(
    path: &Path,
    snap: &LedgerSnapshot,
    date: &str,
    time: &str,
    group_size: usize,
) -> Result<()> {
    let bytes = render(snap, date, time, group_size)?;
    write_atomic(path, &bytes).map_err(|e| io_error(path, &e))
}

fn push_row(out: &mut Vec<u8>, fields: &[&str]) -> Result<()> {
    let mut w = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    w.write_record(fields)?;
    let bytes = w.into_inner().map_err(|e| eyre::eyre!("flush csv row: {}", e.error()))?;
    out.extend_from_slice(&bytes);
    Ok(())
}

fn push_blank(out: &mut Vec<u8>) {
    out.extend_from_slice(b"\r\n");
}
