//! Error types for fixed-point arithmetic and identifier validation
//!
//! Covers overflow and scaling failures in wad arithmetic, plus parse failures
//! for typed addresses coming in from configuration.

use thiserror::Error;

/// Errors that can occur while parsing or validating typed identifiers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Address string is not `0x` followed by 40 hex characters
    #[error("Invalid address '{input}': expected 0x-prefixed 20-byte hex string")]
    InvalidAddress { input: String },
}

/// Errors that can occur during fixed-point arithmetic operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FixedPointError {
    /// Result does not fit the target integer width
    #[error("Overflow in fixed-point arithmetic: {context}")]
    Overflow { context: &'static str },

    /// Division by zero in fixed-point arithmetic
    #[error("Division by zero in fixed-point arithmetic")]
    DivisionByZero,

    /// Token precision above what the wad representation can hold exactly
    #[error("Unsupported token decimals {decimals} (maximum {max})")]
    UnsupportedDecimals { decimals: u8, max: u8 },

    /// Value cannot be represented as a `Decimal`
    #[error("Value {value} exceeds Decimal range")]
    DecimalRange { value: u128 },
}
