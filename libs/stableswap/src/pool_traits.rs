//! Pool trait for routing across pools by token address

use crate::error::{PoolError, Result};
use crate::pool::StableSwapPool;
use rust_decimal::Decimal;
use types::{Address, TokenAddress};

/// Read-only pricing interface shared by every pool the registry holds
pub trait AmmPool: Send + Sync {
    fn pool_address(&self) -> Address;

    /// Calculate output amount (native units) for selling `amount_in` of `token_in`
    fn get_amount_out(
        &self,
        token_in: &TokenAddress,
        token_out: &TokenAddress,
        amount_in: u128,
    ) -> Result<u128>;

    /// Current reserves in whole tokens, in token index order
    fn get_liquidity(&self) -> Result<Vec<Decimal>>;

    /// Get fee tier
    fn get_fee_bps(&self) -> u32;

    fn supports(&self, token: &TokenAddress) -> bool;
}

impl AmmPool for StableSwapPool {
    fn pool_address(&self) -> Address {
        self.address()
    }

    fn get_amount_out(
        &self,
        token_in: &TokenAddress,
        token_out: &TokenAddress,
        amount_in: u128,
    ) -> Result<u128> {
        let i = self
            .token_index(token_in)
            .ok_or_else(|| unknown_token(token_in))?;
        let j = self
            .token_index(token_out)
            .ok_or_else(|| unknown_token(token_out))?;
        Ok(self.quote_swap(i, j, amount_in)?.amount_out)
    }

    fn get_liquidity(&self) -> Result<Vec<Decimal>> {
        Ok(self.snapshot()?.reserves)
    }

    fn get_fee_bps(&self) -> u32 {
        self.fee_bps()
    }

    fn supports(&self, token: &TokenAddress) -> bool {
        self.token_index(token).is_some()
    }
}

fn unknown_token(token: &TokenAddress) -> PoolError {
    PoolError::InvalidParams(format!("token {} is not in this pool", token))
}
