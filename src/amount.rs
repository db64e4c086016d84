//! Decimal amount parsing and formatting
//!
//! All conversions are exact integer arithmetic on `U256`; no floating point.

use alloy::primitives::U256;
use thiserror::Error;

/// Decimals of ETH and sETH
pub const ETHER_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Amount must be a valid number, got {0}")]
    Invalid(String),

    #[error("Amount {value} has more than {decimals} decimal places")]
    TooPrecise { value: String, decimals: u32 },

    #[error("Amount {0} is too large")]
    Overflow(String),
}

/// Parse a decimal string like `"1.25"` into base units with `decimals` places
pub fn parse_units(raw: &str, decimals: u32) -> Result<U256, AmountError> {
    let value = raw.trim();
    let invalid = || AmountError::Invalid(raw.to_string());

    let (whole, frac) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > decimals as usize {
        return Err(AmountError::TooPrecise {
            value: raw.to_string(),
            decimals,
        });
    }

    let digits = format!(
        "{}{}{}",
        whole,
        frac,
        "0".repeat(decimals as usize - frac.len())
    );
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| AmountError::Overflow(raw.to_string()))
}

/// Parse an amount in ether into wei
pub fn parse_ether(raw: &str) -> Result<U256, AmountError> {
    parse_units(raw, ETHER_DECIMALS)
}

/// Parse a Skywire token amount.
///
/// An optional `sETH` suffix is ignored. Values with a decimal point are in
/// ether units; bare integers are already wei.
pub fn parse_token_amount(raw: &str) -> Result<U256, AmountError> {
    let trimmed = raw.trim();
    let cut = trimmed.len().saturating_sub(4);
    let value = match trimmed.get(cut..) {
        Some(suffix) if suffix.eq_ignore_ascii_case("seth") => trimmed[..cut].trim(),
        _ => trimmed,
    };

    if value.contains('.') {
        parse_ether(value).map_err(|e| match e {
            AmountError::Invalid(_) => AmountError::Invalid(raw.to_string()),
            other => other,
        })
    } else if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        U256::from_str_radix(value, 10).map_err(|_| AmountError::Overflow(raw.to_string()))
    } else {
        Err(AmountError::Invalid(raw.to_string()))
    }
}

/// Format a U256 value with decimals
pub fn format_units(value: U256, decimals: u32) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = remainder_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}

/// Format wei as ether
pub fn format_ether(wei: U256) -> String {
    format_units(wei, ETHER_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_ETH: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn parses_decimal_ether() {
        assert_eq!(parse_ether("1").unwrap(), U256::from(ONE_ETH));
        assert_eq!(parse_ether("0.5").unwrap(), U256::from(ONE_ETH / 2));
        assert_eq!(parse_ether(".25").unwrap(), U256::from(ONE_ETH / 4));
        assert_eq!(parse_ether("0.000000000000000001").unwrap(), U256::from(1u8));
        assert_eq!(parse_ether("0").unwrap(), U256::ZERO);
    }

    #[test]
    fn rejects_malformed_amounts() {
        assert!(matches!(parse_ether(""), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_ether("."), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_ether("1.2.3"), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_ether("-1"), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_ether("1e18"), Err(AmountError::Invalid(_))));
        assert!(matches!(
            parse_ether("0.0000000000000000001"),
            Err(AmountError::TooPrecise { .. })
        ));
    }

    #[test]
    fn token_amount_integer_is_wei_and_decimal_is_ether() {
        assert_eq!(parse_token_amount("1000").unwrap(), U256::from(1000u64));
        assert_eq!(parse_token_amount("0.1").unwrap(), U256::from(ONE_ETH / 10));
        assert_eq!(parse_token_amount("0.1 sETH").unwrap(), U256::from(ONE_ETH / 10));
        assert_eq!(parse_token_amount("5SETH").unwrap(), U256::from(5u8));
        assert_eq!(
            parse_token_amount("abc").unwrap_err().to_string(),
            "Amount must be a valid number, got abc"
        );
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(ONE_ETH), 18), "1");
        assert_eq!(format_units(U256::from(ONE_ETH + ONE_ETH / 2), 18), "1.5");
        assert_eq!(format_units(U256::from(1_000_000_000u64), 6), "1000");
        assert_eq!(format_units(U256::ZERO, 18), "0");
        assert_eq!(format_ether(U256::from(1u8)), "0.000000000000000001");
    }
}
