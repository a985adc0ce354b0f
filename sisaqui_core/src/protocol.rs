//! Sartorius SBI command frames and response parsing.
//!
//! Commands are `ESC <code>` followed by CR LF. The balance answers a print
//! request with one fixed-width ASCII line such as `+    100.0005 g  `.

/// Line terminator appended to every command.
pub const TERMINATOR: &[u8] = b"\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Ask for the current weight
    Print,
    /// Zero-reset (tare)
    Tare,
}

impl Command {
    pub fn code(self) -> &'static [u8] {
        match self {
            Command::Print => b"\x1bP",
            Command::Tare => b"\x1bf4_",
        }
    }

    /// Complete frame as written to the port.
    pub fn frame(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.code().len() + TERMINATOR.len());
        out.extend_from_slice(self.code());
        out.extend_from_slice(TERMINATOR);
        out
    }
}

/// A parsed weight line.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightFrame {
    pub grams: f64,
    /// Text after the number, trimmed (`"g"`); `None` when the balance sent none.
    pub unit: Option<String>,
}

/// Extract the weight from a response line.
///
/// Finds the leftmost `[-+]?\s*\d+\.\d+` and drops the whitespace between
/// sign and digits. Integers alone do not count as a weight.
pub fn parse_weight(line: &str) -> Option<f64> {
    parse_frame(line).map(|f| f.grams)
}

pub fn parse_frame(line: &str) -> Option<WeightFrame> {
    let bytes = line.as_bytes();
    (0..bytes.len()).find_map(|start| {
        let end = match_number_at(bytes, start)?;
        let text: String = line[start..end]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let grams = text.parse::<f64>().ok()?;
        let rest = line[end..].trim();
        let unit = (!rest.is_empty()).then(|| rest.to_string());
        Some(WeightFrame { grams, unit })
    })
}

/// Returns the end offset of a number match starting exactly at `start`.
fn match_number_at(b: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if matches!(b.get(i), Some(b'+' | b'-')) {
        i += 1;
    }
    while b.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    let int_start = i;
    while b.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    if i == int_start || b.get(i) != Some(&b'.') {
        return None;
    }
    i += 1;
    let frac_start = i;
    while b.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    (i > frac_start).then_some(i)
}
