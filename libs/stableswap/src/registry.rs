//! Registry of live pools
//!
//! Pools are indexed by address and by constituent token. The registry only
//! hands out `Arc`s; every pool keeps its own lock, so operations on different
//! pools never wait on each other.

use crate::pool::StableSwapPool;
use crate::pool_traits::AmmPool;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use types::{Address, TokenAddress};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Pool {0} is already registered")]
    DuplicatePool(Address),

    #[error("Pool {0} is not registered")]
    UnknownPool(Address),
}

/// Best executable price found across registered pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutedQuote {
    pub pool: Address,
    pub amount_out: u128,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_pools: usize,
    pub indexed_tokens: usize,
}

#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: DashMap<Address, Arc<StableSwapPool>>,
    /// Token address -> addresses of pools holding it
    token_index: DashMap<TokenAddress, Vec<Address>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pool; fails if its address is already taken
    pub fn register(&self, pool: Arc<StableSwapPool>) -> Result<(), RegistryError> {
        let address = pool.address();
        let tokens = pool.token_addresses();

        match self.pools.entry(address) {
            Entry::Occupied(_) => return Err(RegistryError::DuplicatePool(address)),
            Entry::Vacant(slot) => {
                slot.insert(pool);
            }
        }

        for token in &tokens {
            self.token_index.entry(*token).or_default().push(address);
        }

        info!(pool = %address, n_tokens = tokens.len(), "Registered pool");
        Ok(())
    }

    pub fn get(&self, address: &Address) -> Option<Arc<StableSwapPool>> {
        self.pools.get(address).map(|entry| entry.clone())
    }

    /// Drop a pool from the registry, returning it
    pub fn remove(&self, address: &Address) -> Result<Arc<StableSwapPool>, RegistryError> {
        let (_, pool) = self
            .pools
            .remove(address)
            .ok_or(RegistryError::UnknownPool(*address))?;

        for token in pool.token_addresses() {
            if let Entry::Occupied(mut entry) = self.token_index.entry(token) {
                entry.get_mut().retain(|p| p != address);
                if entry.get().is_empty() {
                    entry.remove();
                }
            }
        }

        info!(pool = %address, "Removed pool");
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Find all pools containing a token
    pub fn pools_for_token(&self, token: &TokenAddress) -> Vec<Arc<StableSwapPool>> {
        self.token_index
            .get(token)
            .map(|entry| {
                entry
                    .iter()
                    .filter_map(|address| self.get(address))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pools that can swap `token_in` for `token_out`
    pub fn pools_for_pair(
        &self,
        token_in: &TokenAddress,
        token_out: &TokenAddress,
    ) -> Vec<Arc<StableSwapPool>> {
        self.pools_for_token(token_in)
            .into_iter()
            .filter(|pool| pool.supports(token_out))
            .collect()
    }

    /// Highest output for `amount_in` across every pool trading the pair
    ///
    /// Pools that cannot price the trade (empty, or the trade would drain
    /// them) are skipped.
    pub fn best_quote(
        &self,
        token_in: &TokenAddress,
        token_out: &TokenAddress,
        amount_in: u128,
    ) -> Option<RoutedQuote> {
        let best = self
            .pools_for_pair(token_in, token_out)
            .iter()
            .filter_map(|pool| {
                match pool.get_amount_out(token_in, token_out, amount_in) {
                    Ok(amount_out) => Some(RoutedQuote {
                        pool: pool.pool_address(),
                        amount_out,
                    }),
                    Err(e) => {
                        debug!(pool = %pool.pool_address(), "Skipping pool for quote: {}", e);
                        None
                    }
                }
            })
            .max_by_key(|quote| quote.amount_out);

        debug!(
            token_in = %token_in,
            token_out = %token_out,
            amount_in,
            best = ?best,
            "Routed quote"
        );
        best
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_pools: self.pools.len(),
            indexed_tokens: self.token_index.len(),
        }
    }
}
