//! Wad fixed-point arithmetic for stableswap reserves
//!
//! Every reserve inside a pool is held in 18-decimal "wad" units regardless of the
//! token's native precision. This module owns the conversions between native token
//! amounts and wad amounts, and the single rounding utility that every division in
//! the engine goes through.
//!
//! ## Rounding Policy
//!
//! The engine must never pay out more than the curve allows. Callers pick the
//! direction explicitly:
//!
//! - [`Rounding::Down`] for anything the pool hands out (outputs, minted shares)
//! - [`Rounding::Up`] for anything the pool keeps or requires (fees, solved reserves)

use crate::common::errors::FixedPointError;
use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimal places of the normalized wad unit
pub const WAD_DECIMALS: u8 = 18;

/// One whole unit in wad (1e18)
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Basis point denominator (10_000 bps = 100%)
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Direction of every integer division in pool math
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rounding {
    /// Floor: used for amounts leaving the pool
    Down,
    /// Ceiling: used for amounts retained by the pool
    Up,
}

/// `a * b / denominator` with a 256-bit intermediate and explicit rounding
pub fn mul_div(
    a: U256,
    b: U256,
    denominator: U256,
    rounding: Rounding,
) -> Result<U256, FixedPointError> {
    if denominator.is_zero() {
        return Err(FixedPointError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(FixedPointError::Overflow {
        context: "mul_div product",
    })?;
    let quotient = product / denominator;
    match rounding {
        Rounding::Down => Ok(quotient),
        Rounding::Up if (product % denominator).is_zero() => Ok(quotient),
        Rounding::Up => quotient.checked_add(U256::one()).ok_or(FixedPointError::Overflow {
            context: "mul_div round up",
        }),
    }
}

/// [`mul_div`] over `u128` operands, failing if the result leaves `u128`
pub fn mul_div_u128(
    a: u128,
    b: u128,
    denominator: u128,
    rounding: Rounding,
) -> Result<u128, FixedPointError> {
    let result = mul_div(
        U256::from(a),
        U256::from(b),
        U256::from(denominator),
        rounding,
    )?;
    u256_to_u128(result)
}

/// Fee or share of `amount` expressed in basis points
pub fn bps_of(amount: u128, bps: u32, rounding: Rounding) -> Result<u128, FixedPointError> {
    mul_div_u128(amount, bps as u128, BPS_DENOMINATOR as u128, rounding)
}

/// Narrow a 256-bit value back to `u128`
pub fn u256_to_u128(value: U256) -> Result<u128, FixedPointError> {
    if value > U256::from(u128::MAX) {
        return Err(FixedPointError::Overflow {
            context: "narrowing U256 to u128",
        });
    }
    Ok(value.as_u128())
}

/// Wad amount as a human-readable `Decimal` (for logging and reports only)
pub fn wad_to_decimal(wad: u128) -> Result<Decimal, FixedPointError> {
    native_to_decimal(wad, WAD_DECIMALS)
}

fn native_to_decimal(amount: u128, decimals: u8) -> Result<Decimal, FixedPointError> {
    let signed = i128::try_from(amount).map_err(|_| FixedPointError::DecimalRange { value: amount })?;
    Decimal::try_from_i128_with_scale(signed, decimals as u32)
        .map_err(|_| FixedPointError::DecimalRange { value: amount })
}

/// Conversion between a token's native precision and wad units
///
/// `factor` is `10^(18 - decimals)`, so scaling up is exact and scaling down
/// truncates in the requested direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenScale {
    decimals: u8,
    factor: u128,
}

impl TokenScale {
    /// Scale for a token with `decimals` native decimal places (0..=18)
    pub fn new(decimals: u8) -> Result<Self, FixedPointError> {
        if decimals > WAD_DECIMALS {
            return Err(FixedPointError::UnsupportedDecimals {
                decimals,
                max: WAD_DECIMALS,
            });
        }
        Ok(Self {
            decimals,
            factor: 10u128.pow((WAD_DECIMALS - decimals) as u32),
        })
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn factor(&self) -> u128 {
        self.factor
    }

    /// Native amount to wad (exact)
    pub fn to_wad(&self, native: u128) -> Result<u128, FixedPointError> {
        native.checked_mul(self.factor).ok_or(FixedPointError::Overflow {
            context: "scaling native amount to wad",
        })
    }

    /// Wad amount to native units
    pub fn from_wad(&self, wad: u128, rounding: Rounding) -> Result<u128, FixedPointError> {
        mul_div_u128(wad, 1, self.factor, rounding)
    }

    /// Native amount rendered as a `Decimal` in whole tokens
    pub fn to_decimal(&self, native: u128) -> Result<Decimal, FixedPointError> {
        native_to_decimal(native, self.decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mul_div_rounding_directions() {
        let down = mul_div_u128(10, 1, 3, Rounding::Down).unwrap();
        let up = mul_div_u128(10, 1, 3, Rounding::Up).unwrap();
        assert_eq!(down, 3);
        assert_eq!(up, 4);

        // Exact division never rounds up
        assert_eq!(mul_div_u128(9, 1, 3, Rounding::Up).unwrap(), 3);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // 1e30 * 1e30 overflows u128 but the quotient fits
        let big = 10u128.pow(30);
        let result = mul_div_u128(big, big, big, Rounding::Down).unwrap();
        assert_eq!(result, big);
    }

    #[test]
    fn test_mul_div_errors() {
        assert_eq!(
            mul_div_u128(1, 1, 0, Rounding::Down),
            Err(FixedPointError::DivisionByZero)
        );
        assert!(matches!(
            mul_div_u128(u128::MAX, 2, 1, Rounding::Down),
            Err(FixedPointError::Overflow { .. })
        ));
    }

    #[test]
    fn test_bps_of() {
        // 0.04% of 100 wad
        let fee = bps_of(100 * WAD, 4, Rounding::Up).unwrap();
        assert_eq!(fee, 40_000_000_000_000_000);
        assert_eq!(bps_of(1, 4, Rounding::Up).unwrap(), 1);
        assert_eq!(bps_of(1, 4, Rounding::Down).unwrap(), 0);
    }

    #[test]
    fn test_token_scale_six_decimals() {
        let usdc = TokenScale::new(6).unwrap();
        assert_eq!(usdc.factor(), 1_000_000_000_000);

        let wad = usdc.to_wad(1_500_000).unwrap();
        assert_eq!(wad, 1_500_000_000_000_000_000);

        // Sub-unit wad dust truncates on the way out
        assert_eq!(usdc.from_wad(wad + 1, Rounding::Down).unwrap(), 1_500_000);
        assert_eq!(usdc.from_wad(wad + 1, Rounding::Up).unwrap(), 1_500_001);
    }

    #[test]
    fn test_token_scale_rejects_excess_decimals() {
        assert_eq!(
            TokenScale::new(24),
            Err(FixedPointError::UnsupportedDecimals {
                decimals: 24,
                max: 18
            })
        );
        assert_eq!(TokenScale::new(18).unwrap().factor(), 1);
    }

    #[test]
    fn test_decimal_rendering() {
        let usdc = TokenScale::new(6).unwrap();
        assert_eq!(usdc.to_decimal(1_234_567).unwrap(), dec!(1.234567));
        assert_eq!(wad_to_decimal(WAD / 4).unwrap(), dec!(0.25));
    }
}
