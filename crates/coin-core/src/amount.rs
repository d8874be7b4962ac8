//! Exact amount math
//!
//! Display strings, raw integer amounts and exchange rates. Every conversion
//! goes through `BigUint` so nothing is ever rounded through a float.

use std::fmt;

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::constants::BPS_DENOMINATOR;
use crate::errors::ValidationError;
use crate::types::RawAmount;

/// 10^exp as a big integer
fn pow10(exp: u8) -> BigUint {
    BigUint::from(10u32).pow(u32::from(exp))
}

/// round(numerator / denominator), halves rounded up
fn div_round_half_up(numerator: &BigUint, denominator: &BigUint) -> BigUint {
    let two = BigUint::from(2u32);
    (numerator * &two + denominator) / (denominator * two)
}

fn to_raw(value: BigUint) -> Result<RawAmount, ValidationError> {
    value.to_u64().ok_or(ValidationError::AmountOverflow)
}

/// Whether `text` is an acceptable form value: empty, or digits with at most
/// one decimal point. Partial input such as `"12."` or `"."` is accepted.
pub fn is_valid_numeric_input(text: &str) -> bool {
    let mut seen_dot = false;
    for c in text.chars() {
        match c {
            '0'..='9' => {}
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    true
}

/// Split validated numeric text into integer and fraction digits
fn split_numeric(text: &str) -> Result<(&str, &str), ValidationError> {
    if !is_valid_numeric_input(text) {
        return Err(ValidationError::MalformedAmount {
            input: text.to_string(),
        });
    }
    Ok(match text.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (text, ""),
    })
}

/// A numeric amount together with the precision it is expressed in.
///
/// `raw` is the amount in the smallest unit, so `UiAmount { raw: 1250, decimals: 2 }`
/// is `12.50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UiAmount {
    pub raw: RawAmount,
    pub decimals: u8,
}

impl UiAmount {
    pub fn new(raw: RawAmount, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Self { raw: 0, decimals }
    }

    /// Parse decimal text at the given precision.
    ///
    /// Returns `Ok(None)` for empty text. More fraction digits than `decimals`
    /// is an error rather than a silent truncation.
    pub fn parse(text: &str, decimals: u8) -> Result<Option<Self>, ValidationError> {
        if text.is_empty() {
            return Ok(None);
        }
        let (int, frac) = split_numeric(text)?;
        if frac.len() > usize::from(decimals) {
            return Err(ValidationError::TooManyDecimals {
                input: text.to_string(),
                max: decimals,
            });
        }

        let mut digits = String::with_capacity(int.len() + usize::from(decimals));
        digits.push_str(int);
        digits.push_str(frac);
        for _ in frac.len()..usize::from(decimals) {
            digits.push('0');
        }

        let value = if digits.is_empty() {
            BigUint::zero()
        } else {
            digits
                .parse::<BigUint>()
                .map_err(|_| ValidationError::MalformedAmount {
                    input: text.to_string(),
                })?
        };

        Ok(Some(Self {
            raw: to_raw(value)?,
            decimals,
        }))
    }

    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Express the same value at another precision, rounding half up when
    /// precision is lost
    pub fn rescale(&self, decimals: u8) -> Result<Self, ValidationError> {
        if decimals == self.decimals {
            return Ok(*self);
        }
        let raw = BigUint::from(self.raw);
        let scaled = if decimals > self.decimals {
            raw * pow10(decimals - self.decimals)
        } else {
            div_round_half_up(&raw, &pow10(self.decimals - decimals))
        };
        Ok(Self {
            raw: to_raw(scaled)?,
            decimals,
        })
    }

    /// Display form: trailing zeros trimmed, at least one fraction digit when
    /// the token has any (`25` at 6 decimals renders `"25.0"`)
    pub fn to_display(&self) -> String {
        format_raw_amount(self.raw, self.decimals)
    }
}

impl fmt::Display for UiAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display())
    }
}

/// Render a raw amount as decimal text at the given precision
pub fn format_raw_amount(raw: RawAmount, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int, frac) = padded.split_at(padded.len() - decimals);
    let trimmed = frac.trim_end_matches('0');
    let frac = if trimmed.is_empty() { "0" } else { trimmed };
    format!("{}.{}", int, frac)
}

/// Parse decimal text straight to a raw amount. Empty text is zero.
pub fn to_raw_amount(text: &str, decimals: u8) -> Result<RawAmount, ValidationError> {
    Ok(UiAmount::parse(text, decimals)?.map(|a| a.raw).unwrap_or(0))
}

/// Apply a slippage tolerance in basis points, rounding down
pub fn apply_slippage_bps(raw: RawAmount, slippage_bps: u16) -> RawAmount {
    let bps = u64::from(slippage_bps).min(BPS_DENOMINATOR);
    let kept = u128::from(raw) * u128::from(BPS_DENOMINATOR - bps) / u128::from(BPS_DENOMINATOR);
    // kept <= raw, so it always fits
    kept as RawAmount
}

/// Output units received per input unit, as an exact rational.
///
/// Rates are expressed in display units (one whole input token buys
/// `rate` whole output tokens); token decimals are applied at conversion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRate {
    numerator: BigUint,
    denominator: BigUint,
}

impl ExchangeRate {
    /// Rate `numerator / denominator`; `None` when the denominator is zero
    pub fn new(numerator: u64, denominator: u64) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        Some(Self {
            numerator: BigUint::from(numerator),
            denominator: BigUint::from(denominator),
        })
    }

    /// Parse a decimal rate such as `"2.0"` or `"0.000153"`
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::MalformedRate {
            input: text.to_string(),
        };
        let (int, frac) = split_numeric(text).map_err(|_| malformed())?;
        if int.is_empty() && frac.is_empty() {
            return Err(malformed());
        }
        let frac_len = u8::try_from(frac.len()).map_err(|_| malformed())?;
        let numerator = format!("{}{}", int, frac)
            .parse::<BigUint>()
            .map_err(|_| malformed())?;
        Ok(Self {
            numerator,
            denominator: pow10(frac_len),
        })
    }

    /// Rate implied by a quote: `output_raw` received for `input_raw` spent
    pub fn from_raw_amounts(
        input_raw: RawAmount,
        input_decimals: u8,
        output_raw: RawAmount,
        output_decimals: u8,
    ) -> Result<Self, ValidationError> {
        if input_raw == 0 {
            return Err(ValidationError::ZeroAmount);
        }
        Ok(Self {
            numerator: BigUint::from(output_raw) * pow10(input_decimals),
            denominator: BigUint::from(input_raw) * pow10(output_decimals),
        })
    }

    /// A usable rate is strictly positive
    pub fn is_positive(&self) -> bool {
        !self.numerator.is_zero()
    }

    /// Input units per output unit; `None` for a zero rate
    pub fn reciprocal(&self) -> Option<Self> {
        if !self.is_positive() {
            return None;
        }
        Some(Self {
            numerator: self.denominator.clone(),
            denominator: self.numerator.clone(),
        })
    }

    /// Convert a raw input amount to the raw output amount at this rate,
    /// rounded half up at output precision
    pub fn convert(
        &self,
        input_raw: RawAmount,
        input_decimals: u8,
        output_decimals: u8,
    ) -> Result<RawAmount, ValidationError> {
        let numerator = BigUint::from(input_raw) * &self.numerator * pow10(output_decimals);
        let denominator = &self.denominator * pow10(input_decimals);
        to_raw(div_round_half_up(&numerator, &denominator))
    }

    /// Inverse conversion: raw input needed for a raw output amount
    pub fn convert_inverse(
        &self,
        output_raw: RawAmount,
        input_decimals: u8,
        output_decimals: u8,
    ) -> Result<RawAmount, ValidationError> {
        let inverse = self.reciprocal().ok_or_else(|| ValidationError::MalformedRate {
            input: self.to_string(),
        })?;
        inverse.convert(output_raw, output_decimals, input_decimals)
    }

    /// Decimal rendering truncated to `precision` fraction digits
    pub fn to_decimal_string(&self, precision: u8) -> String {
        let scaled = &self.numerator * pow10(precision) / &self.denominator;
        match scaled.to_u64() {
            Some(raw) => format_raw_amount(raw, precision),
            None => {
                let digits = scaled.to_string();
                let split = digits.len() - usize::from(precision);
                format!("{}.{}", &digits[..split], &digits[split..])
            }
        }
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string(12))
    }
}

/// An integer percentage in `[0, 100]`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const HUNDRED: Percent = Percent(100);

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if !(0..=100).contains(&value) {
            return Err(ValidationError::PercentOutOfRange {
                value: value.to_string(),
            });
        }
        Ok(Self(value as u8))
    }

    /// Parse caller-supplied text. Fractions, signs other than a bare
    /// integer, and out-of-range values are all rejected.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let trimmed = text.trim();
        let value = trimmed
            .parse::<i64>()
            .map_err(|_| ValidationError::PercentOutOfRange {
                value: text.to_string(),
            })?;
        Self::new(value)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// `100 - self`
    pub fn complement(&self) -> Percent {
        Percent(100 - self.0)
    }
}

impl TryFrom<i64> for Percent {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percent> for u8 {
    fn from(p: Percent) -> Self {
        p.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_numeric_input_validation() {
        assert!(is_valid_numeric_input(""));
        assert!(is_valid_numeric_input("12"));
        assert!(is_valid_numeric_input("12.5"));
        assert!(is_valid_numeric_input("12."));
        assert!(is_valid_numeric_input(".5"));
        assert!(!is_valid_numeric_input("-1"));
        assert!(!is_valid_numeric_input("1.2.3"));
        assert!(!is_valid_numeric_input("1e5"));
        assert!(!is_valid_numeric_input(" 1"));
    }

    #[test]
    fn test_parse_ui_amount() {
        assert_eq!(UiAmount::parse("", 6).unwrap(), None);
        assert_eq!(
            UiAmount::parse("12.5", 6).unwrap(),
            Some(UiAmount::new(12_500_000, 6))
        );
        assert_eq!(UiAmount::parse(".5", 2).unwrap(), Some(UiAmount::new(50, 2)));
        assert_eq!(UiAmount::parse("7.", 0).unwrap(), Some(UiAmount::new(7, 0)));
        assert_eq!(UiAmount::parse(".", 3).unwrap(), Some(UiAmount::zero(3)));
    }

    #[test]
    fn test_parse_rejects_excess_precision() {
        let err = UiAmount::parse("1.234", 2).unwrap_err();
        assert!(matches!(err, ValidationError::TooManyDecimals { max: 2, .. }));
    }

    #[test]
    fn test_parse_rejects_overflow() {
        let err = UiAmount::parse("18446744073709551616", 0).unwrap_err();
        assert_eq!(err, ValidationError::AmountOverflow);
    }

    #[test]
    fn test_format_raw_amount() {
        assert_eq!(format_raw_amount(25_000_000, 6), "25.0");
        assert_eq!(format_raw_amount(12_500_000, 6), "12.5");
        assert_eq!(format_raw_amount(1, 6), "0.000001");
        assert_eq!(format_raw_amount(0, 6), "0.0");
        assert_eq!(format_raw_amount(42, 0), "42");
    }

    #[test]
    fn test_rescale_rounds_half_up() {
        let amount = UiAmount::new(12_345, 3); // 12.345
        assert_eq!(amount.rescale(2).unwrap(), UiAmount::new(1_235, 2));
        assert_eq!(amount.rescale(5).unwrap(), UiAmount::new(1_234_500, 5));
        assert_eq!(UiAmount::new(12_344, 3).rescale(2).unwrap().raw, 1_234);
    }

    #[test]
    fn test_rate_conversion_exact() {
        let rate = ExchangeRate::parse("2.0").unwrap();
        let out = rate.convert(12_500_000, 6, 6).unwrap();
        assert_eq!(out, 25_000_000);
        assert_eq!(format_raw_amount(out, 6), "25.0");

        let back = rate.convert_inverse(out, 6, 6).unwrap();
        assert_eq!(back, 12_500_000);
    }

    #[test]
    fn test_rate_conversion_across_decimals() {
        // 1 AUDIO (8 dp) = 0.15 USDC (6 dp)
        let rate = ExchangeRate::parse("0.15").unwrap();
        assert_eq!(rate.convert(100_000_000, 8, 6).unwrap(), 150_000);
        assert_eq!(rate.convert_inverse(150_000, 8, 6).unwrap(), 100_000_000);
    }

    #[test]
    fn test_rate_from_quote() {
        // 2 SOL (9 dp) quoted for 300 USDC (6 dp)
        let rate = ExchangeRate::from_raw_amounts(2_000_000_000, 9, 300_000_000, 6).unwrap();
        assert_eq!(rate.to_decimal_string(2), "150.0");
        assert!(ExchangeRate::from_raw_amounts(0, 9, 1, 6).is_err());
    }

    #[test]
    fn test_zero_rate_is_not_positive() {
        let zero = ExchangeRate::parse("0").unwrap();
        assert!(!zero.is_positive());
        assert!(zero.reciprocal().is_none());
        assert!(zero.convert_inverse(1, 6, 6).is_err());
        assert!(ExchangeRate::new(1, 0).is_none());
        assert!(ExchangeRate::parse(".").is_err());
        assert!(ExchangeRate::parse("-2").is_err());
    }

    #[test]
    fn test_slippage() {
        assert_eq!(apply_slippage_bps(10_000, 200), 9_800);
        assert_eq!(apply_slippage_bps(10_000, 0), 10_000);
        assert_eq!(apply_slippage_bps(u64::MAX, 1), u64::MAX - u64::MAX / 10_000 - 1);
        assert_eq!(apply_slippage_bps(10_000, 20_000), 0);
    }

    #[test]
    fn test_percent_validation() {
        assert_eq!(Percent::parse("30").unwrap().value(), 30);
        assert_eq!(Percent::parse(" 0 ").unwrap(), Percent::ZERO);
        assert_eq!(Percent::parse("100").unwrap(), Percent::HUNDRED);
        assert!(Percent::parse("101").is_err());
        assert!(Percent::parse("-1").is_err());
        assert!(Percent::parse("12.5").is_err());
        assert!(Percent::parse("").is_err());
        assert_eq!(Percent::new(30).unwrap().complement().value(), 70);
    }

    proptest! {
        // Trip measured on the side whose unit is larger.
        #[test]
        fn prop_rounding_trip_within_one_unit(
            input in 0u64..1_000_000_000_000,
            num in 1u64..1_000_000,
            den in 1u64..1_000_000,
        ) {
            let rate = ExchangeRate::new(num, den).unwrap();
            let output = rate.convert(input, 6, 6).unwrap();
            let back = rate.convert_inverse(output, 6, 6).unwrap();
            if num >= den {
                prop_assert!(back.abs_diff(input) <= 1);
            } else {
                let again = rate.convert(back, 6, 6).unwrap();
                prop_assert!(again.abs_diff(output) <= 1);
            }
        }

        #[test]
        fn prop_display_parse_roundtrip(raw in any::<u64>(), decimals in 0u8..=12) {
            let text = format_raw_amount(raw, decimals);
            prop_assert_eq!(UiAmount::parse(&text, decimals).unwrap(), Some(UiAmount::new(raw, decimals)));
        }
    }
}
