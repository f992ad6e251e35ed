//! Pool error taxonomy
//!
//! Every variant aborts the whole operation with no state change. Nothing in the
//! engine retries; the caller decides.

use crate::token::TokenError;
use thiserror::Error;
use types::FixedPointError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Newton iteration did not settle; reserves are at a degenerate ratio
    #[error("Invariant solver did not converge within {iterations} iterations")]
    Convergence { iterations: usize },

    #[error("Slippage exceeded: computed {actual}, minimum {minimum}")]
    SlippageExceeded { actual: u128, minimum: u128 },

    #[error("Insufficient shares: requested {requested}, available {available}")]
    InsufficientShares { requested: u128, available: u128 },

    #[error("Insufficient reserves: {0}")]
    InsufficientReserves(&'static str),

    #[error("Invalid amount: {0}")]
    InvalidAmount(&'static str),

    #[error("Token index {index} out of range for {n_tokens}-token pool")]
    InvalidTokenIndex { index: usize, n_tokens: usize },

    #[error("Input and output token are the same (index {0})")]
    SameToken(usize),

    #[error("Arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error("Invalid pool parameters: {0}")]
    InvalidParams(String),

    #[error("Token transfer failed: {0}")]
    Token(#[from] TokenError),
}

impl From<FixedPointError> for PoolError {
    fn from(err: FixedPointError) -> Self {
        match err {
            FixedPointError::Overflow { context } => PoolError::Overflow(context),
            FixedPointError::DivisionByZero => PoolError::Overflow("division by zero"),
            FixedPointError::DecimalRange { .. } => PoolError::Overflow("decimal range"),
            FixedPointError::UnsupportedDecimals { decimals, max } => PoolError::InvalidParams(
                format!("token decimals {} exceed maximum {}", decimals, max),
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;
