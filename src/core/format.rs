//! Human readable amounts at very different magnitudes.
//!
//! Fiat-like values keep two decimals above one unit and widen the precision
//! as they shrink so tiny token prices never collapse to `0.00`. Crypto-like
//! values use up to eight decimals without padding. Neither formatter emits
//! grouping separators, so their output can be fed straight back into
//! [`parse_amount`]. Use [`group_thousands`] for display-only text.

/// Formats a fiat-like amount.
pub fn format_fiat(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if magnitude < 0.00001 {
        format!("{value:.2e}")
    } else if magnitude < 0.0001 {
        format!("{value:.8}")
    } else if magnitude < 0.01 {
        format!("{value:.6}")
    } else if magnitude < 1.0 {
        format!("{value:.4}")
    } else {
        format!("{value:.2}")
    }
}

/// Formats a crypto-like amount with at most eight decimals.
pub fn format_crypto(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    // Below the eighth decimal a fixed rendering would read as zero
    if value.abs() < 0.000_000_01 {
        return format!("{value:.2e}");
    }
    let fixed = format!("{value:.8}");
    fixed
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Inserts `,` between thousands in the integer part of a formatted number.
pub fn group_thousands(formatted: &str) -> String {
    if formatted.contains('e') {
        return formatted.to_string();
    }
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Display form of a live price: fiat precision plus grouping.
pub fn format_price(value: f64) -> String {
    group_thousands(&format_fiat(value))
}

/// Parses user-typed amount text.
///
/// Grouping separators and surrounding whitespace are ignored. Returns `None`
/// for empty, non-numeric, negative or non-finite input.
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_fiat_thresholds() {
        assert_eq!(format_fiat(0.0), "0");
        assert_eq!(format_fiat(50000.0), "50000.00");
        assert_eq!(format_fiat(1.0), "1.00");
        assert_eq!(format_fiat(0.5), "0.5000");
        assert_eq!(format_fiat(0.005), "0.005000");
        assert_eq!(format_fiat(0.00005), "0.00005000");
        assert_eq!(format_fiat(0.0000012345), "1.23e-6");
    }

    #[test]
    fn test_format_crypto_trims_padding() {
        assert_eq!(format_crypto(0.0), "0");
        assert_eq!(format_crypto(0.0005), "0.0005");
        assert_eq!(format_crypto(2.0), "2");
        assert_eq!(format_crypto(1.123456789), "1.12345679");
        assert_eq!(format_crypto(0.000000001), "1.00e-9");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1234567.89"), "1,234,567.89");
        assert_eq!(group_thousands("999.00"), "999.00");
        assert_eq!(group_thousands("1000"), "1,000");
        assert_eq!(group_thousands("-12345.5"), "-12,345.5");
        assert_eq!(group_thousands("1.23e-6"), "1.23e-6");
        assert_eq!(format_price(64250.5), "64,250.50");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1"), Some(1.0));
        assert_eq!(parse_amount(" 1,250.5 "), Some(1250.5));
        assert_eq!(parse_amount("1.00e-9"), Some(0.000000001));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("-3"), None);
        assert_eq!(parse_amount("inf"), None);
    }

    #[test]
    fn test_formatted_output_parses_back() {
        for value in [0.0, 0.0000001, 0.00042, 0.75, 12.5, 98765.4321] {
            let fiat = format_fiat(value);
            let crypto = format_crypto(value);
            assert!(parse_amount(&fiat).is_some(), "fiat {fiat}");
            assert!(parse_amount(&crypto).is_some(), "crypto {crypto}");
        }
    }
}
