//! Amount parsing and price-derived values.
//!
//! All token math is exact decimal on base units; only the USD figures, which
//! are display values, drop to `f64`.

use crate::config::MintVariant;
use crate::models::{Amount, PriceQuote};
use bigdecimal::BigDecimal;
use ethers::types::U256;
use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};
use std::str::FromStr;

pub const DEFAULT_DECIMALS: u32 = 18;

/// Exponent bounds for parsed decimals. A `U256` has at most 78 digits, so
/// anything outside them truncates to zero or overflows anyway.
const MAX_FRACTION_DIGITS: i64 = DEFAULT_DECIMALS as i64 + 78;
const MAX_INTEGER_EXPONENT: i64 = 78;

/// Protocol fee markup, +1%.
const MARKUP_NUM: u64 = 101;
const MARKUP_DEN: u64 = 100;

/// How the native fee is derived from the send amount and the pair's native price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionRule {
    /// `amount * price * 1.01`
    MultiplyByPrice,
    /// `amount / price / divisor * 1.01`
    DivideByPrice { divisor: u64 },
}

impl ConversionRule {
    pub fn for_variant(variant: MintVariant) -> Self {
        match variant {
            MintVariant::StayBull => Self::MultiplyByPrice,
            MintVariant::Pulsar => Self::DivideByPrice { divisor: 4 },
        }
    }

    /// Native-currency value paid alongside a mint of `amount` base units.
    pub fn native_fee(&self, amount: Amount, price_native: &str) -> Amount {
        let price = parse_price(price_native);
        if amount.is_zero() || price.is_zero() {
            return Amount::zero();
        }
        let x = u256_to_decimal(amount);
        let value = match self {
            Self::MultiplyByPrice => {
                x * price * BigDecimal::from(MARKUP_NUM) / BigDecimal::from(MARKUP_DEN)
            }
            Self::DivideByPrice { divisor } => {
                x * BigDecimal::from(MARKUP_NUM)
                    / (price * BigDecimal::from(*divisor) * BigDecimal::from(MARKUP_DEN))
            }
        };
        decimal_to_u256(&value)
    }

    /// Fixed-point (10^18) price the minter checks against a co-signed quote.
    pub fn price_denominator(&self, price_native: &str) -> Option<U256> {
        let price = parse_price(price_native);
        if price.is_zero() {
            return None;
        }
        let factor = match self {
            Self::MultiplyByPrice => BigDecimal::from(1u64),
            Self::DivideByPrice { divisor } => BigDecimal::from(*divisor),
        };
        let value = decimal_to_u256(&(price * factor * unit()));
        (!value.is_zero()).then_some(value)
    }
}

/// User-entered decimal to base units; anything unparseable or negative is zero.
pub fn parse_amount(input: &str) -> Amount {
    match parse_bounded(input) {
        Some(value) => decimal_to_u256(&(value * unit())),
        None => Amount::zero(),
    }
}

/// Price string to a non-negative decimal, zero when not loaded or malformed.
pub fn parse_price(price: &str) -> BigDecimal {
    match parse_bounded(price) {
        Some(p) if p > BigDecimal::zero() => p,
        _ => BigDecimal::zero(),
    }
}

/// Exponent notation is accepted, but only within the range a `U256` can use.
fn parse_bounded(input: &str) -> Option<BigDecimal> {
    let value = BigDecimal::from_str(input.trim()).ok()?;
    let (_, scale) = value.as_bigint_and_exponent();
    (-MAX_INTEGER_EXPONENT..=MAX_FRACTION_DIGITS)
        .contains(&scale)
        .then_some(value)
}

/// `price * amount / 10^18`, zero when the price is not loaded.
pub fn usd_value(price_usd: &str, amount: Amount) -> f64 {
    let price = parse_price(price_usd);
    if price.is_zero() || amount.is_zero() {
        return 0.0;
    }
    (price * u256_to_decimal(amount) / unit())
        .to_f64()
        .unwrap_or(0.0)
}

fn unit() -> BigDecimal {
    BigDecimal::from(10u64.pow(DEFAULT_DECIMALS))
}

fn u256_to_decimal(value: U256) -> BigDecimal {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    BigDecimal::new(BigInt::from_bytes_be(Sign::Plus, &buf), 0)
}

/// Truncates toward zero; negative or out-of-range values become zero.
fn decimal_to_u256(value: &BigDecimal) -> U256 {
    let (int, _) = value.with_scale(0).into_bigint_and_exponent();
    match int.to_biguint() {
        Some(n) => {
            let bytes = n.to_bytes_be();
            if bytes.len() > 32 {
                U256::zero()
            } else {
                U256::from_big_endian(&bytes)
            }
        }
        None => U256::zero(),
    }
}

/// Values derived from the current input amount and the latest quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingSnapshot {
    pub amount: Amount,
    /// Native value paid with the mint.
    pub native_fee: Amount,
    pub send_usd: f64,
    /// The mint is 1:1 in quantity, so this prices `amount` at the receive pair.
    pub receive_usd: f64,
    pub native_fee_usd: f64,
    pub price_denominator: Option<U256>,
}

impl PricingSnapshot {
    pub fn derive(
        amount: Amount,
        send: &PriceQuote,
        receive: &PriceQuote,
        native: &PriceQuote,
        rule: ConversionRule,
    ) -> Self {
        let native_fee = rule.native_fee(amount, send.native());
        Self {
            amount,
            native_fee,
            send_usd: usd_value(send.usd(), amount),
            receive_usd: usd_value(receive.usd(), amount),
            native_fee_usd: usd_value(native.usd(), native_fee),
            price_denominator: rule.price_denominator(send.native()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::exp10(18)
    }

    #[test]
    fn unparseable_input_is_zero() {
        for raw in [
            "",
            "   ",
            "abc",
            "1.2.3",
            "-5",
            "0",
            "NaN",
            "--1",
            "1e-1000000000",
            "1e999999999",
        ] {
            assert_eq!(parse_amount(raw), U256::zero(), "input {raw:?}");
        }
    }

    #[test]
    fn exponent_notation_within_range() {
        assert_eq!(parse_amount("2e1"), e18(20));
        assert_eq!(parse_amount("1e-18"), U256::one());
        assert_eq!(parse_amount("1e-19"), U256::zero());
        assert_eq!(parse_price("1e999999999"), BigDecimal::zero());
        assert_eq!(
            ConversionRule::MultiplyByPrice.native_fee(e18(1), "1e-1000000000"),
            U256::zero()
        );
    }

    #[test]
    fn input_is_scaled_and_truncated() {
        assert_eq!(parse_amount("3"), e18(3));
        assert_eq!(parse_amount("1.5"), U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(parse_amount("0.0000000000000000019"), U256::one());
        assert_eq!(parse_amount(" 2 "), e18(2));
    }

    #[test]
    fn divide_rule_matches_pulsar_ratio() {
        let rule = ConversionRule::DivideByPrice { divisor: 4 };
        assert_eq!(rule.native_fee(U256::zero(), "0.5"), U256::zero());
        assert_eq!(
            rule.native_fee(e18(1), "0.5"),
            U256::from(505_000_000_000_000_000u128)
        );
        assert_eq!(
            rule.native_fee(U256::from(123_456_789_000_000_000u128), "0.5"),
            U256::from(62_345_678_445_000_000u128)
        );
    }

    #[test]
    fn multiply_rule_matches_staybull_fee() {
        let rule = ConversionRule::MultiplyByPrice;
        assert_eq!(
            rule.native_fee(e18(1), "0.25"),
            U256::from(252_500_000_000_000_000u128)
        );
        assert_eq!(
            rule.native_fee(U256::from(123_456_789_000_000_000u128), "0.25"),
            U256::from(31_172_839_222_500_000u128)
        );
    }

    #[test]
    fn unloaded_price_yields_zero() {
        let rule = ConversionRule::DivideByPrice { divisor: 4 };
        assert_eq!(rule.native_fee(e18(1), "0"), U256::zero());
        assert_eq!(rule.native_fee(e18(1), "garbage"), U256::zero());
        assert_eq!(rule.price_denominator("0"), None);
        assert_eq!(usd_value("0", e18(5)), 0.0);
        assert_eq!(usd_value("", e18(5)), 0.0);
    }

    #[test]
    fn usd_value_uses_decimal_adjusted_amount() {
        assert_eq!(usd_value("2.5", e18(4)), 10.0);
        assert_eq!(usd_value("2.5", U256::zero()), 0.0);
    }

    #[test]
    fn price_denominator_is_fixed_point() {
        let rule = ConversionRule::DivideByPrice { divisor: 4 };
        assert_eq!(rule.price_denominator("0.5"), Some(e18(2)));
        assert_eq!(
            ConversionRule::MultiplyByPrice.price_denominator("0.25"),
            Some(U256::from(250_000_000_000_000_000u128))
        );
    }

    #[test]
    fn snapshot_derives_all_figures() {
        let send = PriceQuote::new("2", "0.5");
        let receive = PriceQuote::new("3", "1");
        let native = PriceQuote::new("4", "1");
        let snap = PricingSnapshot::derive(
            e18(1),
            &send,
            &receive,
            &native,
            ConversionRule::DivideByPrice { divisor: 4 },
        );
        assert_eq!(snap.native_fee, U256::from(505_000_000_000_000_000u128));
        assert_eq!(snap.send_usd, 2.0);
        assert_eq!(snap.receive_usd, 3.0);
        assert!((snap.native_fee_usd - 2.02).abs() < 1e-9);
    }

    #[test]
    fn snapshot_before_prices_load() {
        let empty = PriceQuote::default();
        let snap = PricingSnapshot::derive(
            e18(7),
            &empty,
            &empty,
            &empty,
            ConversionRule::MultiplyByPrice,
        );
        assert_eq!(snap.native_fee, U256::zero());
        assert_eq!(snap.send_usd, 0.0);
        assert_eq!(snap.price_denominator, None);
    }
}
