//! Stableswap pool instance
//!
//! One [`StableSwapPool`] owns the reserves and share ledger of one deployed pool.
//! All of that state sits behind a single mutex: every mutating operation holds it
//! across the whole compute, transfer and commit cycle, so operations on one pool
//! are totally ordered and never observe each other's intermediate state.

use crate::error::{PoolError, Result};
use crate::invariant::StableSwapMath;
use crate::share_ledger::ShareLedger;
use crate::token::{Token, TokenError, TransferBatch};
use config::limits::pool;
use config::PoolConfig;
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use types::{mul_div_u128, wad_to_decimal, Address, Rounding, TokenAddress, TokenScale, WAD};

/// Where swap fees end up
///
/// A pool uses exactly one policy for its whole life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeeDestination {
    /// Fees stay in the reserves and accrue to share holders
    #[default]
    Retain,
    /// Fees are transferred out to this account
    Forward(Address),
}

impl FeeDestination {
    pub fn sink(&self) -> Option<Address> {
        match self {
            FeeDestination::Retain => None,
            FeeDestination::Forward(sink) => Some(*sink),
        }
    }
}

impl From<Option<Address>> for FeeDestination {
    fn from(sink: Option<Address>) -> Self {
        sink.map_or(FeeDestination::Retain, FeeDestination::Forward)
    }
}

/// Construction parameters, fixed for the pool's lifetime
pub struct PoolParams {
    pub address: Address,
    /// Constituent tokens in index order
    pub tokens: Vec<Arc<dyn Token>>,
    pub amplification: u64,
    pub fee_bps: u32,
    pub fee_destination: FeeDestination,
}

impl PoolParams {
    /// Bind a loaded configuration to concrete token handles
    ///
    /// `tokens` must list the configured tokens in the same order with matching
    /// addresses and decimals.
    pub fn from_config(config: &PoolConfig, tokens: Vec<Arc<dyn Token>>) -> Result<Self> {
        if tokens.len() != config.tokens.len() {
            return Err(PoolError::InvalidParams(format!(
                "config '{}' lists {} tokens, {} handles supplied",
                config.name,
                config.tokens.len(),
                tokens.len()
            )));
        }
        for (configured, token) in config.tokens.iter().zip(&tokens) {
            if configured.address != token.address() || configured.decimals != token.decimals() {
                return Err(PoolError::InvalidParams(format!(
                    "token {} ({} decimals) does not match handle {} ({} decimals)",
                    configured.symbol,
                    configured.decimals,
                    token.address(),
                    token.decimals()
                )));
            }
        }
        Ok(Self {
            address: config.address,
            tokens,
            amplification: config.amplification,
            fee_bps: config.fee_bps,
            fee_destination: config.fee_sink.into(),
        })
    }
}

/// Mutable pool state guarded by the pool lock
#[derive(Debug, Default)]
pub(crate) struct PoolState {
    /// Wad-normalized reserves, one per token
    pub(crate) reserves: Vec<u128>,
    pub(crate) shares: ShareLedger,
}

/// Point-in-time view of a pool for reports and logs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSnapshot {
    pub address: Address,
    pub tokens: Vec<TokenAddress>,
    /// Reserves in whole tokens
    pub reserves: Vec<Decimal>,
    pub amplification: u64,
    pub fee_bps: u32,
    pub fee_destination: FeeDestination,
    pub total_shares: Decimal,
    pub invariant: Decimal,
    pub virtual_price: Option<Decimal>,
}

pub struct StableSwapPool {
    address: Address,
    tokens: Vec<Arc<dyn Token>>,
    scales: Vec<TokenScale>,
    amplification: u64,
    fee_bps: u32,
    fee_destination: FeeDestination,
    state: Mutex<PoolState>,
}

impl fmt::Debug for StableSwapPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StableSwapPool")
            .field("address", &self.address)
            .field("tokens", &self.token_addresses())
            .field("amplification", &self.amplification)
            .field("fee_bps", &self.fee_bps)
            .field("fee_destination", &self.fee_destination)
            .finish()
    }
}

impl StableSwapPool {
    /// Create an empty pool
    pub fn new(params: PoolParams) -> Result<Self> {
        let n = params.tokens.len();
        if !(pool::MIN_TOKENS..=pool::MAX_TOKENS).contains(&n) {
            return Err(PoolError::InvalidParams(format!(
                "{} tokens, expected {}..={}",
                n,
                pool::MIN_TOKENS,
                pool::MAX_TOKENS
            )));
        }

        let mut seen = HashSet::new();
        if !params.tokens.iter().all(|t| seen.insert(t.address())) {
            return Err(PoolError::InvalidParams("duplicate token".to_string()));
        }

        if !(pool::MIN_AMPLIFICATION..=pool::MAX_AMPLIFICATION).contains(&params.amplification) {
            return Err(PoolError::InvalidParams(format!(
                "amplification {} outside {}..={}",
                params.amplification,
                pool::MIN_AMPLIFICATION,
                pool::MAX_AMPLIFICATION
            )));
        }

        if params.fee_bps > pool::MAX_FEE_BPS {
            return Err(PoolError::InvalidParams(format!(
                "fee {} bps exceeds {}",
                params.fee_bps,
                pool::MAX_FEE_BPS
            )));
        }

        if params.fee_destination.sink() == Some(params.address) {
            return Err(PoolError::InvalidParams(
                "fee sink cannot be the pool itself".to_string(),
            ));
        }

        let scales = params
            .tokens
            .iter()
            .map(|t| TokenScale::new(t.decimals()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        info!(
            pool = %params.address,
            n_tokens = n,
            amplification = params.amplification,
            fee_bps = params.fee_bps,
            fee_destination = ?params.fee_destination,
            "Created stableswap pool"
        );

        Ok(Self {
            address: params.address,
            tokens: params.tokens,
            scales,
            amplification: params.amplification,
            fee_bps: params.fee_bps,
            fee_destination: params.fee_destination,
            state: Mutex::new(PoolState {
                reserves: vec![0; n],
                shares: ShareLedger::default(),
            }),
        })
    }

    /// Create an empty pool from a loaded configuration
    pub fn from_config(config: &PoolConfig, tokens: Vec<Arc<dyn Token>>) -> Result<Self> {
        Self::new(PoolParams::from_config(config, tokens)?)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn n_tokens(&self) -> usize {
        self.tokens.len()
    }

    pub fn token_addresses(&self) -> Vec<TokenAddress> {
        self.tokens.iter().map(|t| t.address()).collect()
    }

    pub fn token_index(&self, token: &TokenAddress) -> Option<usize> {
        self.tokens.iter().position(|t| &t.address() == token)
    }

    pub fn amplification(&self) -> u64 {
        self.amplification
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }

    pub fn fee_destination(&self) -> FeeDestination {
        self.fee_destination
    }

    /// Reserves in each token's native units
    pub fn get_reserves(&self) -> Vec<u128> {
        let state = self.state.lock();
        // Exact: reserves only ever move by scaled native amounts
        state
            .reserves
            .iter()
            .zip(&self.scales)
            .map(|(reserve, scale)| reserve / scale.factor())
            .collect()
    }

    /// Reserves in wad units
    pub fn normalized_reserves(&self) -> Vec<u128> {
        self.state.lock().reserves.clone()
    }

    pub fn total_shares(&self) -> u128 {
        self.state.lock().shares.total_supply()
    }

    pub fn share_balance(&self, holder: &Address) -> u128 {
        self.state.lock().shares.balance_of(holder)
    }

    /// Move pool shares between holders
    pub fn transfer_shares(&self, from: Address, to: Address, amount: u128) -> Result<()> {
        self.state.lock().shares.transfer(from, to, amount)
    }

    /// Current invariant D (wad)
    pub fn invariant(&self) -> Result<u128> {
        let state = self.state.lock();
        StableSwapMath::compute_d(&state.reserves, self.amplification)
    }

    /// Value of one share in wad, `None` while the pool is empty
    pub fn virtual_price(&self) -> Result<Option<u128>> {
        let state = self.state.lock();
        self.virtual_price_of(&state)
    }

    pub fn snapshot(&self) -> Result<PoolSnapshot> {
        let state = self.state.lock();
        let d = StableSwapMath::compute_d(&state.reserves, self.amplification)?;

        let reserves = state
            .reserves
            .iter()
            .zip(&self.scales)
            .map(|(reserve, scale)| scale.to_decimal(reserve / scale.factor()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let virtual_price = self
            .virtual_price_of(&state)?
            .map(wad_to_decimal)
            .transpose()?;

        Ok(PoolSnapshot {
            address: self.address,
            tokens: self.token_addresses(),
            reserves,
            amplification: self.amplification,
            fee_bps: self.fee_bps,
            fee_destination: self.fee_destination,
            total_shares: wad_to_decimal(state.shares.total_supply())?,
            invariant: wad_to_decimal(d)?,
            virtual_price,
        })
    }

    fn virtual_price_of(&self, state: &PoolState) -> Result<Option<u128>> {
        let total = state.shares.total_supply();
        if total == 0 {
            return Ok(None);
        }
        let d = StableSwapMath::compute_d(&state.reserves, self.amplification)?;
        Ok(Some(mul_div_u128(d, WAD, total, Rounding::Down)?))
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock()
    }

    pub(crate) fn token(&self, index: usize) -> &dyn Token {
        self.tokens[index].as_ref()
    }

    pub(crate) fn scale(&self, index: usize) -> TokenScale {
        self.scales[index]
    }

    pub(crate) fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.tokens.len() {
            return Err(PoolError::InvalidTokenIndex {
                index,
                n_tokens: self.tokens.len(),
            });
        }
        Ok(())
    }

    /// Run the token movements of one operation, reversing them all on failure
    pub(crate) fn settle<'a, F>(&'a self, operation: &'static str, transfers: F) -> Result<()>
    where
        F: FnOnce(&mut TransferBatch<'a>) -> std::result::Result<(), TokenError>,
    {
        let mut batch = TransferBatch::new(self.address);
        match transfers(&mut batch) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(pool = %self.address, operation, "Token transfer failed, rolling back: {}", e);
                batch.rollback();
                Err(e.into())
            }
        }
    }
}
