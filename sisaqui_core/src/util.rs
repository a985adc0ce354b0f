//! Decimal-comma helpers for ledger cells.

/// Shortest round-trip decimal with at least one fractional digit, comma separated.
///
/// `100.0005` → `100,0005`, `12.0` → `12,0`.
pub fn comma_decimal(v: f64) -> String {
    let mut s = format!("{v}");
    if v.is_finite() && !s.contains('.') {
        s.push_str(".0");
    }
    s.replace('.', ",")
}

/// Two fixed decimals, comma separated (`100,00`). Used for statistics.
pub fn comma_fixed2(v: f64) -> String {
    format!("{v:.2}").replace('.', ",")
}

/// Inverse of [`comma_decimal`]; also accepts a dot separator.
pub fn parse_comma_decimal(s: &str) -> Option<f64> {
    s.trim().replace(',', ".").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_decimal_keeps_one_fraction_digit() {
        assert_eq!(comma_decimal(100.0005), "100,0005");
        assert_eq!(comma_decimal(12.0), "12,0");
        assert_eq!(comma_decimal(-0.5), "-0,5");
    }

    #[test]
    fn fixed2_rounds() {
        assert_eq!(comma_fixed2(100.0), "100,00");
        assert_eq!(comma_fixed2(2.345_6), "2,35");
    }

    #[test]
    fn parse_accepts_both_separators() {
        assert_eq!(parse_comma_decimal("100,0005"), Some(100.0005));
        assert_eq!(parse_comma_decimal(" 3.5 "), Some(3.5));
        assert_eq!(parse_comma_decimal("abc"), None);
        assert_eq!(parse_comma_decimal(""), None);
    }
}
