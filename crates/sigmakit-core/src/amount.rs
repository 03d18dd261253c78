//! ERG / nanoERG conversions
//!
//! Amounts are handled as decimal strings on the way in so that no value ever
//! passes through a float.

use crate::constants::{MIN_BOX_VALUE_NANO, NANOERG_PER_ERG};
use crate::errors::AmountError;
use crate::NanoErg;

const ERG_DECIMALS: usize = 9;

/// Parse a decimal ERG amount ("1.5", "0.001", "10") into nanoERG.
pub fn erg_to_nanoerg(erg: &str) -> Result<NanoErg, AmountError> {
    let s = erg.trim();
    if s.starts_with('-') {
        return Err(AmountError::Negative(s.to_string()));
    }

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(AmountError::Invalid(s.to_string()));
    }
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) {
        return Err(AmountError::Invalid(s.to_string()));
    }
    if frac.len() > ERG_DECIMALS {
        return Err(AmountError::TooPrecise(s.to_string()));
    }

    let whole_nano = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .ok()
            .and_then(|w| w.checked_mul(NANOERG_PER_ERG))
            .ok_or_else(|| AmountError::Overflow(s.to_string()))?
    };

    // Right-pad the fraction to nine digits: "5" -> "500000000"
    let frac_nano = if frac.is_empty() {
        0
    } else {
        format!("{:0<width$}", frac, width = ERG_DECIMALS)
            .parse::<u64>()
            .map_err(|_| AmountError::Invalid(s.to_string()))?
    };

    whole_nano
        .checked_add(frac_nano)
        .ok_or_else(|| AmountError::Overflow(s.to_string()))
}

/// Render nanoERG as a minimal decimal ERG string ("1.5", "0.001", "2").
pub fn nanoerg_to_erg_string(nano: NanoErg) -> String {
    let whole = nano / NANOERG_PER_ERG;
    let frac = nano % NANOERG_PER_ERG;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:09}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Render nanoERG with full precision and unit, e.g. `1.500000000 ERG`.
pub fn format_nanoerg(nano: NanoErg) -> String {
    format!(
        "{}.{:09} ERG",
        nano / NANOERG_PER_ERG,
        nano % NANOERG_PER_ERG
    )
}

/// Whether a box carrying `nano` nanoERG satisfies the protocol minimum.
pub fn is_valid_box_value(nano: NanoErg) -> bool {
    nano >= MIN_BOX_VALUE_NANO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erg_to_nanoerg_basic() {
        assert_eq!(erg_to_nanoerg("1").unwrap(), 1_000_000_000);
        assert_eq!(erg_to_nanoerg("1.5").unwrap(), 1_500_000_000);
        assert_eq!(erg_to_nanoerg("0.001").unwrap(), 1_000_000);
        assert_eq!(erg_to_nanoerg(".25").unwrap(), 250_000_000);
        assert_eq!(erg_to_nanoerg("10.123456789").unwrap(), 10_123_456_789);
        assert_eq!(erg_to_nanoerg(" 2. ").unwrap(), 2_000_000_000);
    }

    #[test]
    fn test_erg_to_nanoerg_errors() {
        assert!(matches!(
            erg_to_nanoerg("-1"),
            Err(AmountError::Negative(_))
        ));
        assert!(matches!(erg_to_nanoerg("abc"), Err(AmountError::Invalid(_))));
        assert!(matches!(erg_to_nanoerg("."), Err(AmountError::Invalid(_))));
        assert!(matches!(erg_to_nanoerg("1e9"), Err(AmountError::Invalid(_))));
        assert!(matches!(
            erg_to_nanoerg("0.0000000001"),
            Err(AmountError::TooPrecise(_))
        ));
        assert!(matches!(
            erg_to_nanoerg("18446744074"),
            Err(AmountError::Overflow(_))
        ));
    }

    #[test]
    fn test_nanoerg_to_erg_string() {
        assert_eq!(nanoerg_to_erg_string(1_500_000_000), "1.5");
        assert_eq!(nanoerg_to_erg_string(1_000_000), "0.001");
        assert_eq!(nanoerg_to_erg_string(2_000_000_000), "2");
        assert_eq!(nanoerg_to_erg_string(0), "0");
    }

    #[test]
    fn test_format_nanoerg() {
        assert_eq!(format_nanoerg(1_500_000_000), "1.500000000 ERG");
        assert_eq!(format_nanoerg(1_000_000), "0.001000000 ERG");
    }

    #[test]
    fn test_is_valid_box_value() {
        assert!(is_valid_box_value(1_000_000));
        assert!(!is_valid_box_value(500_000));
    }
}
