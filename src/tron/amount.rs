//! Human <-> smallest-unit amount conversion.
//!
//! All arithmetic runs on arbitrary-precision integers; a raw amount for an
//! 18-decimal token does not fit in u64 or survive an f64 round trip.

use crate::error::{AppError, Result};
use num_bigint::BigUint;

/// Convert a human decimal amount ("10.5") to smallest units for a token
/// with the given decimal precision, returned as an integer.
///
/// The input must match `^\d+(\.\d+)?$`: no sign, no exponent, no
/// separators. Fractional digits beyond `decimals` are truncated silently;
/// callers that must not lose value should pass at most `decimals`
/// fractional digits.
pub fn to_smallest_units(human: &str, decimals: u32) -> Result<BigUint> {
    let s = human.trim();
    let (int_part, frac_part) = match s.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (s, ""),
    };

    let digits_only = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits_only(int_part) || (s.contains('.') && !digits_only(frac_part)) {
        return Err(AppError::InvalidAmount(human.trim().to_string()));
    }

    let wanted = decimals as usize;
    let mut digits = String::with_capacity(int_part.len() + wanted);
    digits.push_str(int_part);
    if frac_part.len() >= wanted {
        digits.push_str(&frac_part[..wanted]);
    } else {
        digits.push_str(frac_part);
        for _ in 0..wanted - frac_part.len() {
            digits.push('0');
        }
    }

    BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| AppError::InvalidAmount(human.trim().to_string()))
}

/// Convert a raw smallest-unit amount back to a human decimal string.
/// Pure integer division/remainder; trailing fractional zeros are trimmed.
pub fn from_smallest_units(raw: &BigUint, decimals: u32) -> String {
    if decimals == 0 {
        return raw.to_string();
    }

    let base = BigUint::from(10u32).pow(decimals);
    let int_part = raw / &base;
    let rem = raw % &base;

    let frac = format!("{:0>width$}", rem.to_string(), width = decimals as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac)
    }
}

/// Parse a raw smallest-unit amount from its decimal-string form, as
/// returned by chain reads. Negative or non-integer input is rejected.
pub fn parse_raw(raw: &str) -> Result<BigUint> {
    let s = raw.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::InvalidAmount(raw.trim().to_string()));
    }
    BigUint::parse_bytes(s.as_bytes(), 10)
        .ok_or_else(|| AppError::InvalidAmount(raw.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(s: &str) -> BigUint {
        parse_raw(s).unwrap()
    }

    #[test]
    fn converts_with_padding() {
        assert_eq!(to_smallest_units("1.5", 6).unwrap(), raw("1500000"));
        assert_eq!(to_smallest_units("10.5", 6).unwrap(), raw("10500000"));
        assert_eq!(to_smallest_units("7", 0).unwrap(), raw("7"));
        assert_eq!(to_smallest_units("0.000001", 6).unwrap(), raw("1"));
    }

    #[test]
    fn excess_fractional_digits_truncate_silently() {
        assert_eq!(to_smallest_units("1.23456789", 2).unwrap(), raw("123"));
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["", ".", "1.", ".5", "-1", "1e6", "1,000", "1.2.3", "abc"] {
            assert!(to_smallest_units(bad, 6).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn renders_human_form() {
        assert_eq!(from_smallest_units(&raw("1500000"), 6), "1.5");
        assert_eq!(from_smallest_units(&raw("1000000"), 6), "1");
        assert_eq!(from_smallest_units(&raw("1"), 6), "0.000001");
        assert_eq!(from_smallest_units(&raw("0"), 6), "0");
        assert_eq!(from_smallest_units(&raw("42"), 0), "42");
    }

    #[test]
    fn round_trips_beyond_u64() {
        // 18-decimal token, amount too large for u64 in raw form
        let human = "123456789012345678901.123456789012345678";
        let units = to_smallest_units(human, 18).unwrap();
        assert!(units > BigUint::from(u64::MAX));
        assert_eq!(from_smallest_units(&units, 18), human);
        assert_eq!(to_smallest_units(&from_smallest_units(&units, 18), 18).unwrap(), units);
    }

    #[test]
    fn parse_raw_rejects_signed_and_fractional() {
        assert!(parse_raw("-5").is_err());
        assert!(parse_raw("1.5").is_err());
        assert!(parse_raw("").is_err());
        assert_eq!(parse_raw(" 42 ").unwrap(), BigUint::from(42u32));
    }
}
