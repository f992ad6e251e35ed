//! # Stableswap Types - Shared Fixed-Point and Identifier Primitives
//!
//! ## Purpose
//!
//! Leaf crate of the stableswap workspace. Holds the pieces every other crate
//! agrees on: typed 20-byte addresses, the 18-decimal wad representation used for
//! all pool reserves, and the one rounding utility every division in pool math
//! goes through.
//!
//! ## Integration Points
//!
//! - **Engine**: reserves, shares and fees are wad `u128` values scaled through
//!   [`TokenScale`]; intermediate products use [`U256`]
//! - **Configuration**: [`Address`] and [`TokenAddress`] deserialize from
//!   `0x`-prefixed hex strings in TOML
//! - **Reporting**: [`wad_to_decimal`] renders wad amounts as `Decimal` for logs
//!   and JSON output, never for math

pub mod common;

pub use common::errors::{FixedPointError, ValidationError};
pub use common::fixed_point::{
    bps_of, mul_div, mul_div_u128, u256_to_u128, wad_to_decimal, Rounding, TokenScale,
    BPS_DENOMINATOR, WAD, WAD_DECIMALS,
};
pub use common::identifiers::{Address, TokenAddress};

// Re-exported for the address macro expansion
#[doc(hidden)]
pub use hex;
#[doc(hidden)]
pub use serde;

pub use primitive_types::U256;
pub use rust_decimal::Decimal;
