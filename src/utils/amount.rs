//! Base-unit / display-unit conversion
//!
//! Chains quote in their smallest unit (wei, sats, uatom); humans read
//! decimals. Pure integer/string math, no floats.

use crate::error::{OmnisigError, OmnisigResult};

pub const EVM_DECIMALS: u8 = 18;
pub const BTC_DECIMALS: u8 = 8;

/// Render a base-unit value with `decimals` places, trailing zeros
/// trimmed: `format_units(5000, 6)` is `"0.005"`.
pub fn format_units(value: u128, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let divisor = 10u128.pow(decimals as u32);
    let whole = value / divisor;
    let frac = value % divisor;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_text = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac_text.trim_end_matches('0'))
}

/// Parse a display amount into base units: `parse_units("0.5", 8)` is
/// `50_000_000`. Rejects negative values and excess precision.
pub fn parse_units(text: &str, decimals: u8) -> OmnisigResult<u128> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(OmnisigError::config_invalid(format!(
            "Amount is not a positive decimal: '{}'",
            text
        )));
    }
    let (whole_text, frac_text) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if frac_text.len() > decimals as usize {
        return Err(OmnisigError::config_invalid(format!(
            "'{}' has more than {} decimal places",
            text, decimals
        )));
    }
    let whole: u128 = if whole_text.is_empty() {
        0
    } else {
        whole_text
            .parse()
            .map_err(|_| OmnisigError::config_invalid(format!("Bad amount: '{}'", text)))?
    };
    let mut frac: u128 = 0;
    if !frac_text.is_empty() {
        frac = frac_text
            .parse()
            .map_err(|_| OmnisigError::config_invalid(format!("Bad amount: '{}'", text)))?;
        frac *= 10u128.pow(decimals as u32 - frac_text.len() as u32);
    }
    whole
        .checked_mul(10u128.pow(decimals as u32))
        .and_then(|scaled| scaled.checked_add(frac))
        .ok_or_else(|| OmnisigError::config_invalid(format!("Amount overflows: '{}'", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(5000, 6), "0.005");
        assert_eq!(format_units(1_500_000, 6), "1.5");
        assert_eq!(format_units(100_000_000, BTC_DECIMALS), "1");
        assert_eq!(format_units(0, 6), "0");
        assert_eq!(format_units(42, 0), "42");
        assert_eq!(format_units(1, 18), "0.000000000000000001");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("0.5", 8).unwrap(), 50_000_000);
        assert_eq!(parse_units("1", 6).unwrap(), 1_000_000);
        assert_eq!(parse_units(".25", 2).unwrap(), 25);
        assert_eq!(parse_units("3", 0).unwrap(), 3);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_units("-1", 6).is_err());
        assert!(parse_units("", 6).is_err());
        assert!(parse_units("1.2345678", 6).is_err());
        assert!(parse_units("1 atom", 6).is_err());
    }

    #[test]
    fn test_round_trips() {
        for value in [0u128, 1, 999, 100_000_000, 123_456_789] {
            let text = format_units(value, 8);
            assert_eq!(parse_units(&text, 8).unwrap(), value);
        }
    }
}
