/// Round `value` to `decimals` places, half away from zero.
///
/// # Examples
///
/// ```
/// use sensorlog_core::formatting::round_decimals;
///
/// assert_eq!(round_decimals(23.14851, 2), 23.15);
/// assert_eq!(round_decimals(-1.006, 2), -1.01);
/// assert_eq!(round_decimals(7.0, 0), 7.0);
/// ```
pub fn round_decimals(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use sensorlog_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let rounded = round_decimals(value, decimals);
    let text = format!("{:.prec$}", rounded.abs(), prec = decimals as usize);
    let (int_digits, frac_digits) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut out = String::new();
    // -0.0 compares equal to 0.0, so values rounding to zero lose the sign.
    if rounded < 0.0 {
        out.push('-');
    }
    out.push_str(&group_thousands(int_digits));
    if let Some(frac) = frac_digits {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format a weight as `"<n> lb"` with two decimals.
///
/// ```
/// use sensorlog_core::formatting::format_pounds;
///
/// assert_eq!(format_pounds(20.0), "20.00 lb");
/// assert_eq!(format_pounds(1234.567), "1,234.57 lb");
/// ```
pub fn format_pounds(value: f64) -> String {
    format!("{} lb", format_number(value, 2))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of a digit string.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── round_decimals ───────────────────────────────────────────────────────

    #[test]
    fn test_round_decimals_kg_conversion() {
        assert_eq!(round_decimals(10.5 * 2.20462, 2), 23.15);
        assert_eq!(round_decimals(5.0 * 2.20462, 2), 11.02);
    }

    #[test]
    fn test_round_decimals_negative() {
        assert_eq!(round_decimals(-2.5 * 2.20462, 2), -5.51);
    }

    // ── format_number ────────────────────────────────────────────────────────

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 2), "0.00");
    }

    #[test]
    fn test_format_number_no_thousands() {
        assert_eq!(format_number(123.456, 2), "123.46");
    }

    #[test]
    fn test_format_number_with_thousands() {
        assert_eq!(format_number(1_234.5, 1), "1,234.5");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(-9_876.5, 1), "-9,876.5");
    }

    #[test]
    fn test_format_number_negative_rounding_to_zero() {
        assert_eq!(format_number(-0.001, 2), "0.00");
    }

    #[test]
    fn test_format_number_rounding_carries_into_thousands() {
        assert_eq!(format_number(999.996, 2), "1,000.00");
    }

    // ── format_pounds ────────────────────────────────────────────────────────

    #[test]
    fn test_format_pounds_two_decimals() {
        assert_eq!(format_pounds(65.0), "65.00 lb");
        assert_eq!(format_pounds(23.149), "23.15 lb");
    }

    #[test]
    fn test_format_pounds_negative() {
        assert_eq!(format_pounds(-3.2), "-3.20 lb");
    }

    // ── group_thousands (via format_number) ──────────────────────────────────

    #[test]
    fn test_group_thousands_four_digits() {
        assert_eq!(format_number(1234.0, 0), "1,234");
    }

    #[test]
    fn test_group_thousands_seven_digits() {
        assert_eq!(format_number(1_234_567.0, 0), "1,234,567");
    }
}
