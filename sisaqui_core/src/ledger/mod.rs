//! CSV ledger of captured weights.
//!
//! Two layouts share the same file naming and error mapping:
//! - `Columns`: A/B/Generic side by side, reparsed and rewritten on every
//!   capture, with a statistics block at the bottom.
//! - `Sequential`: one appended `ID;Data;Hora;Peso (g)` row per capture.
//!
//! Cells use `;` as delimiter and a decimal comma, matching what a
//! pt-BR spreadsheet opens without an import dialog.
mod columns;
mod sequential;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::config::{Layout, LedgerSettings};
use crate::error::{AcquisitionError, Result};
use crate::reading::Reading;
use crate::util::{comma_decimal, parse_comma_decimal};

pub(crate) const DELIMITER: u8 = b';';
/// Fallback when the configured ledger name is blank.
pub const DEFAULT_NAME: &str = "dados_sisaqui";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    A,
    B,
    Generic,
}

impl Column {
    pub const ALL: [Column; 3] = [Column::A, Column::B, Column::Generic];

    pub fn label(self) -> &'static str {
        match self {
            Column::A => "Padrao (A)",
            Column::B => "Cliente (B)",
            Column::Generic => "Generico",
        }
    }

    pub fn key(self) -> char {
        match self {
            Column::A => 'a',
            Column::B => 'b',
            Column::Generic => 'g',
        }
    }

    /// Keyboard shortcut: `a`, `b` or `g`, any case.
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'a' => Some(Column::A),
            'b' => Some(Column::B),
            'g' => Some(Column::Generic),
            _ => None,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Column::A => 0,
            Column::B => 1,
            Column::Generic => 2,
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Column {
    type Err = AcquisitionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Column::from_key(c),
            _ => match s.trim().to_ascii_lowercase().as_str() {
                "generic" | "generico" => Some(Column::Generic),
                _ => None,
            },
        }
        .ok_or_else(|| AcquisitionError::Config(format!("unknown column '{s}' (use a, b or g)")))
    }
}

/// One captured weight as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub column: Column,
    /// Comma-decimal grams, e.g. `100,0005`
    pub weight: String,
    /// `HH:MM:SS`
    pub time: String,
}

impl LedgerRow {
    pub fn from_reading(column: Column, reading: &Reading) -> Self {
        Self {
            column,
            weight: comma_decimal(reading.grams),
            time: format_time(&reading.timestamp),
        }
    }

    pub fn grams(&self) -> Option<f64> {
        parse_comma_decimal(&self.weight)
    }
}

/// Ledger contents grouped by column, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Date cell of the first data row (columns layout) or of the last row (sequential)
    pub date: Option<String>,
    entries: [Vec<LedgerRow>; 3],
}

impl LedgerSnapshot {
    pub fn column(&self, column: Column) -> &[LedgerRow] {
        &self.entries[column.index()]
    }

    pub fn push(&mut self, row: LedgerRow) {
        self.entries[row.column.index()].push(row);
    }

    pub fn count(&self, column: Column) -> usize {
        self.entries[column.index()].len()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }

    /// Longest column; number of data rows in the columns layout.
    pub fn depth(&self) -> usize {
        self.entries.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn stats(&self, column: Column) -> Option<ColumnStats> {
        ColumnStats::from_rows(self.column(column))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    /// Statistics over the parseable weights; `None` when there are none.
    pub fn from_rows(rows: &[LedgerRow]) -> Option<Self> {
        let weights: Vec<f64> = rows.iter().filter_map(LedgerRow::grams).collect();
        if weights.is_empty() {
            return None;
        }
        let sum: f64 = weights.iter().sum();
        let min = weights.iter().copied().fold(f64::INFINITY, f64::min);
        let max = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            count: weights.len(),
            mean: sum / weights.len() as f64,
            min,
            max,
        })
    }
}

pub fn format_date(ts: &DateTime<Local>) -> String {
    ts.format("%d/%m/%Y").to_string()
}

pub fn format_time(ts: &DateTime<Local>) -> String {
    ts.format("%H:%M:%S").to_string()
}

/// `<dir>/<name>.csv`, with a blank name falling back to [`DEFAULT_NAME`].
pub fn ledger_path(dir: &Path, name: &str) -> PathBuf {
    let name = match name.trim() {
        "" => DEFAULT_NAME,
        n => n,
    };
    if name.ends_with(".csv") {
        dir.join(name)
    } else {
        dir.join(format!("{name}.csv"))
    }
}

/// Map an I/O failure on the ledger file; a lock held by a spreadsheet
/// surfaces as `LedgerLocked`.
pub(crate) fn io_error(path: &Path, e: &std::io::Error) -> eyre::Report {
    // 32 = ERROR_SHARING_VIOLATION, 33 = ERROR_LOCK_VIOLATION
    let sharing = cfg!(windows) && matches!(e.raw_os_error(), Some(32 | 33));
    if e.kind() == std::io::ErrorKind::PermissionDenied || sharing {
        eyre::Report::new(AcquisitionError::LedgerLocked(path.to_path_buf()))
    } else {
        eyre::Report::new(AcquisitionError::Ledger(format!(
            "{}: {}",
            path.display(),
            e
        )))
    }
}

pub(crate) fn csv_error(path: &Path, e: csv::Error) -> eyre::Report {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => io_error(path, &io),
        other => eyre::Report::new(AcquisitionError::Ledger(format!(
            "{}: {:?}",
            path.display(),
            other
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    layout: Layout,
    group_size: usize,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>, layout: Layout, group_size: usize) -> Self {
        Self {
            path: path.into(),
            layout,
            group_size: group_size.max(1),
        }
    }

    /// Resolve the ledger file from settings, creating its directory.
    pub fn from_settings(settings: &LedgerSettings) -> Result<Self> {
        fs::create_dir_all(&settings.dir).map_err(|e| io_error(&settings.dir, &e))?;
        Ok(Self::new(
            ledger_path(&settings.dir, &settings.name),
            settings.layout,
            settings.group_size,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the file with its header rows. Returns `true` when created.
    pub fn ensure_exists(&self) -> Result<bool> {
        if self.exists() {
            return Ok(false);
        }
        match self.layout {
            Layout::Columns => columns::create(&self.path)?,
            Layout::Sequential => sequential::create(&self.path)?,
        }
        tracing::info!(path = %self.path.display(), "ledger created");
        Ok(true)
    }

    /// Read the ledger. A missing file reads as empty.
    pub fn load(&self) -> Result<LedgerSnapshot> {
        if !self.exists() {
            return Ok(LedgerSnapshot::default());
        }
        match self.layout {
            Layout::Columns => columns::load(&self.path),
            Layout::Sequential => sequential::load(&self.path),
        }
    }

    /// Store `reading` under `column` and return the row written.
    pub fn record(&self, column: Column, reading: &Reading) -> Result<LedgerRow> {
        let row = LedgerRow::from_reading(column, reading);
        let date = format_date(&reading.timestamp);
        match self.layout {
            Layout::Columns => {
                let mut snap = self.load()?;
                snap.push(row.clone());
                columns::rewrite(&self.path, &snap, &date, &row.time, self.group_size)?;
            }
            Layout::Sequential => {
                self.ensure_exists()?;
                let id = sequential::next_id(&self.path)?;
                sequential::append(&self.path, id, &date, &row)?;
            }
        }
        tracing::info!(
            path = %self.path.display(),
            column = column.label(),
            weight = %row.weight,
            "capture recorded"
        );
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn permission_denied_is_locked() {
        let p = Path::new("dados coletados/ensaio.csv");
        let r = io_error(p, &Error::from(ErrorKind::PermissionDenied));
        match r.downcast_ref::<AcquisitionError>() {
            Some(AcquisitionError::LedgerLocked(path)) => assert_eq!(path, p),
            other => panic!("expected LedgerLocked, got {other:?}"),
        }
        let r = io_error(p, &Error::from(ErrorKind::NotFound));
        assert!(matches!(
            r.downcast_ref::<AcquisitionError>(),
            Some(AcquisitionError::Ledger(_))
        ));
    }

    #[test]
    fn ledger_path_rules() {
        let dir = Path::new("out");
        assert_eq!(ledger_path(dir, " ensaio "), dir.join("ensaio.csv"));
        assert_eq!(ledger_path(dir, "ensaio.csv"), dir.join("ensaio.csv"));
        assert_eq!(ledger_path(dir, "   "), dir.join("dados_sisaqui.csv"));
    }

    #[test]
    fn column_keys() {
        assert_eq!(Column::from_key('A'), Some(Column::A));
        assert_eq!(Column::from_key('g'), Some(Column::Generic));
        assert_eq!(Column::from_key('x'), None);
        assert_eq!("b".parse::<Column>().ok(), Some(Column::B));
        assert_eq!("generic".parse::<Column>().ok(), Some(Column::Generic));
        assert!("zz".parse::<Column>().is_err());
    }

    #[test]
    fn stats_skip_garbage() {
        let rows = ["10,0", "oops", "20,0"].map(|w| LedgerRow {
            column: Column::A,
            weight: w.to_string(),
            time: String::new(),
        });
        let s = ColumnStats::from_rows(&rows).unwrap();
        assert_eq!(s.count, 2);
        assert_eq!(s.mean, 15.0);
        assert_eq!(s.min, 10.0);
        assert_eq!(s.max, 20.0);
        assert!(ColumnStats::from_rows(&[]).is_none());
    }
}
