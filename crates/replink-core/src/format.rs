//! Display formatting for machine values
//!
//! The dashboard shows every numeric value rounded to a fixed number of
//! significant digits. [`format_precision`] follows the notation rules the
//! web platform uses for significant-digit formatting (fixed notation for
//! moderate exponents, exponential outside that range), because the values
//! round-trip through text inputs and must match what the firmware echoes.

/// Significant digits for axis positions
pub const AXIS_PRECISION: usize = 6;
/// Significant digits for heater temperatures
pub const HEATER_PRECISION: usize = 4;
/// Significant digits for fan targets (percent)
pub const FAN_PRECISION: usize = 3;
/// Significant digits for the speed ratio (percent)
pub const SPEED_PRECISION: usize = 4;
/// Significant digits for double-typed configuration options
pub const CONFIG_PRECISION: usize = 15;

/// Format `value` with `digits` significant digits.
///
/// Fixed notation is used while the decimal exponent is in `[-6, digits)`,
/// exponential notation (`1.23e+8` / `1.23e-7`) outside it.
pub fn format_precision(value: f64, digits: usize) -> String {
    let digits = digits.max(1);
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-Infinity" } else { "Infinity" }.to_string();
    }
    if value == 0.0 {
        return format!("{:.*}", digits - 1, 0.0);
    }

    // Round to the requested significant digits first; the exponent of the
    // rounded value decides the notation.
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exp) = sci.split_once('e').expect("exponential format always contains 'e'");
    let exp: i32 = exp.parse().expect("exponent is an integer");

    if exp < -6 || exp >= digits as i32 {
        let sign = if exp < 0 { "" } else { "+" };
        format!("{mantissa}e{sign}{exp}")
    } else {
        let decimals = (digits as i32 - 1 - exp).max(0) as usize;
        format!("{value:.decimals$}")
    }
}

/// Strip meaningless trailing zeros from a plain decimal string.
///
/// `123.0200` => `123.02`, `123.0000` => `123`, `1200` => `1200`.
/// Exponential strings are returned unchanged.
pub fn remove_trailing_zeros(num_str: &str) -> String {
    if !num_str.contains('.') || num_str.contains('e') || num_str.contains('E') {
        return num_str.to_string();
    }
    let trimmed = num_str.trim_end_matches('0');
    trimmed.strip_suffix('.').unwrap_or(trimmed).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_notation() {
        assert_eq!(format_precision(123.456789, AXIS_PRECISION), "123.457");
        assert_eq!(format_precision(21.375, HEATER_PRECISION), "21.38");
        assert_eq!(format_precision(0.5, FAN_PRECISION), "0.500");
        assert_eq!(format_precision(100.0, SPEED_PRECISION), "100.0");
        assert_eq!(format_precision(-12.5, HEATER_PRECISION), "-12.50");
    }

    #[test]
    fn zero_and_non_finite() {
        assert_eq!(format_precision(0.0, 3), "0.00");
        assert_eq!(format_precision(0.0, 1), "0");
        assert_eq!(format_precision(f64::NAN, 4), "NaN");
        assert_eq!(format_precision(f64::INFINITY, 4), "Infinity");
        assert_eq!(format_precision(f64::NEG_INFINITY, 4), "-Infinity");
    }

    #[test]
    fn exponential_notation() {
        assert_eq!(format_precision(123456789.0, 4), "1.235e+8");
        assert_eq!(format_precision(0.0000001234, 3), "1.23e-7");
        assert_eq!(format_precision(1000000.0, 3), "1.00e+6");
    }

    #[test]
    fn small_values_stay_fixed() {
        assert_eq!(format_precision(0.0001234, 3), "0.000123");
        assert_eq!(format_precision(0.99999999, 3), "1.00");
    }

    #[test]
    fn rounding_across_magnitude() {
        assert_eq!(format_precision(999.9996, 6), "1000.00");
        assert_eq!(format_precision(123.0, 1), "1e+2");
    }

    #[test]
    fn trailing_zeros() {
        assert_eq!(remove_trailing_zeros("123.0200"), "123.02");
        assert_eq!(remove_trailing_zeros("123.0000"), "123");
        assert_eq!(remove_trailing_zeros("1200"), "1200");
        assert_eq!(remove_trailing_zeros("0.000"), "0");
        assert_eq!(remove_trailing_zeros("1.20e+5"), "1.20e+5");
    }
}
