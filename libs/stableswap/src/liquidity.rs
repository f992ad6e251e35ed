//! Liquidity accounting
//!
//! Deposits mint shares in proportion to the growth of D, withdrawals burn them.
//! Share amounts round down and fees round up, so every operation leaves any
//! rounding dust with the remaining share holders.

use crate::error::{PoolError, Result};
use crate::invariant::StableSwapMath;
use crate::pool::{FeeDestination, PoolState, StableSwapPool};
use tracing::{debug, info, warn};
use types::{bps_of, mul_div_u128, Address, Rounding};

/// A priced deposit plus the reserves it leaves behind
struct Deposit {
    shares: u128,
    new_reserves: Vec<u128>,
}

/// A priced single-token withdrawal
struct SingleWithdrawal {
    amount_out: u128,
    forwarded_fee: u128,
    new_reserves: Vec<u128>,
}

impl StableSwapPool {
    /// Deposit `amounts` (native units, one per token) and mint pool shares
    ///
    /// The first deposit must include every token and mints D shares. Later
    /// deposits may be single-sided and mint `total * (D1 - D0) / D0`.
    pub fn add_liquidity(&self, caller: Address, amounts: &[u128], min_shares: u128) -> Result<u128> {
        let mut state = self.lock_state();
        let deposit = self.compute_deposit(&state, amounts)?;

        if deposit.shares < min_shares {
            warn!(
                pool = %self.address(),
                shares = deposit.shares,
                min_shares,
                "Deposit rejected: slippage exceeded"
            );
            return Err(PoolError::SlippageExceeded {
                actual: deposit.shares,
                minimum: min_shares,
            });
        }

        self.settle("add_liquidity", |batch| {
            for (i, amount) in amounts.iter().enumerate() {
                batch.pull(self.token(i), caller, *amount)?;
            }
            Ok(())
        })?;

        state.reserves = deposit.new_reserves;
        state.shares.mint(caller, deposit.shares)?;

        info!(
            pool = %self.address(),
            provider = %caller,
            amounts = ?amounts,
            shares = deposit.shares,
            total_shares = state.shares.total_supply(),
            "Liquidity added"
        );
        Ok(deposit.shares)
    }

    /// Shares `add_liquidity(amounts)` would mint right now
    pub fn calc_shares_for_deposit(&self, amounts: &[u128]) -> Result<u128> {
        let state = self.lock_state();
        Ok(self.compute_deposit(&state, amounts)?.shares)
    }

    /// Burn `shares` for a proportional slice of every reserve
    ///
    /// Returns the native amounts paid out, one per token.
    pub fn remove_liquidity(
        &self,
        caller: Address,
        shares: u128,
        min_amounts: &[u128],
    ) -> Result<Vec<u128>> {
        if shares == 0 {
            return Err(PoolError::InvalidAmount("shares to burn must be positive"));
        }
        if min_amounts.len() != self.n_tokens() {
            return Err(PoolError::InvalidAmount("one minimum per token required"));
        }

        let mut state = self.lock_state();
        state.shares.ensure_balance(&caller, shares)?;
        let total = state.shares.total_supply();

        let mut amounts = Vec::with_capacity(self.n_tokens());
        let mut new_reserves = state.reserves.clone();
        for (i, reserve) in state.reserves.iter().enumerate() {
            let scale = self.scale(i);
            let owed = mul_div_u128(*reserve, shares, total, Rounding::Down)?;
            let amount = scale.from_wad(owed, Rounding::Down)?;
            if amount < min_amounts[i] {
                warn!(
                    pool = %self.address(),
                    token = i,
                    amount,
                    minimum = min_amounts[i],
                    "Withdrawal rejected: slippage exceeded"
                );
                return Err(PoolError::SlippageExceeded {
                    actual: amount,
                    minimum: min_amounts[i],
                });
            }
            // owed <= reserve and to_wad(amount) <= owed
            new_reserves[i] = reserve - scale.to_wad(amount)?;
            amounts.push(amount);
        }

        self.settle("remove_liquidity", |batch| {
            for (i, amount) in amounts.iter().enumerate() {
                batch.push(self.token(i), caller, *amount)?;
            }
            Ok(())
        })?;

        state.shares.burn(caller, shares)?;
        state.reserves = new_reserves;

        info!(
            pool = %self.address(),
            provider = %caller,
            shares,
            amounts = ?amounts,
            total_shares = state.shares.total_supply(),
            "Liquidity removed"
        );
        Ok(amounts)
    }

    /// Burn `shares` for token `i` only
    ///
    /// The whole payout pays the swap fee and follows the swap fee destination.
    /// Returns the native amount paid out.
    pub fn remove_liquidity_one_token(
        &self,
        caller: Address,
        shares: u128,
        i: usize,
        min_amount_out: u128,
    ) -> Result<u128> {
        let mut state = self.lock_state();
        let withdrawal = self.compute_single_withdrawal(&state, caller, shares, i)?;

        if withdrawal.amount_out < min_amount_out {
            warn!(
                pool = %self.address(),
                token = i,
                amount_out = withdrawal.amount_out,
                min_amount_out,
                "Single-token withdrawal rejected: slippage exceeded"
            );
            return Err(PoolError::SlippageExceeded {
                actual: withdrawal.amount_out,
                minimum: min_amount_out,
            });
        }

        self.settle("remove_liquidity_one_token", |batch| {
            batch.push(self.token(i), caller, withdrawal.amount_out)?;
            if let FeeDestination::Forward(sink) = self.fee_destination() {
                batch.push(self.token(i), sink, withdrawal.forwarded_fee)?;
            }
            Ok(())
        })?;

        state.shares.burn(caller, shares)?;
        state.reserves = withdrawal.new_reserves;

        info!(
            pool = %self.address(),
            provider = %caller,
            shares,
            token = i,
            amount_out = withdrawal.amount_out,
            "Liquidity removed in one token"
        );
        Ok(withdrawal.amount_out)
    }

    fn compute_deposit(&self, state: &PoolState, amounts: &[u128]) -> Result<Deposit> {
        if amounts.len() != self.n_tokens() {
            return Err(PoolError::InvalidAmount("one amount per token required"));
        }
        let total = state.shares.total_supply();
        if total == 0 && amounts.iter().any(|a| *a == 0) {
            return Err(PoolError::InvalidAmount(
                "initial deposit must include every token",
            ));
        }
        if amounts.iter().all(|a| *a == 0) {
            return Err(PoolError::InvalidAmount("deposit is empty"));
        }

        let d0 = StableSwapMath::compute_d(&state.reserves, self.amplification())?;

        let mut new_reserves = state.reserves.clone();
        for (i, amount) in amounts.iter().enumerate() {
            new_reserves[i] = new_reserves[i]
                .checked_add(self.scale(i).to_wad(*amount)?)
                .ok_or(PoolError::Overflow("deposit reserve"))?;
        }
        let d1 = StableSwapMath::compute_d(&new_reserves, self.amplification())?;
        if d1 <= d0 {
            return Err(PoolError::InvalidAmount("deposit does not increase the invariant"));
        }

        let shares = if total == 0 {
            d1
        } else {
            mul_div_u128(total, d1 - d0, d0, Rounding::Down)?
        };
        if shares == 0 {
            return Err(PoolError::InvalidAmount("deposit mints zero shares"));
        }

        debug!(d0, d1, shares, "Deposit priced");
        Ok(Deposit {
            shares,
            new_reserves,
        })
    }

    fn compute_single_withdrawal(
        &self,
        state: &PoolState,
        caller: Address,
        shares: u128,
        i: usize,
    ) -> Result<SingleWithdrawal> {
        self.check_index(i)?;
        if shares == 0 {
            return Err(PoolError::InvalidAmount("shares to burn must be positive"));
        }
        state.shares.ensure_balance(&caller, shares)?;
        let total = state.shares.total_supply();
        if shares == total {
            return Err(PoolError::InsufficientReserves(
                "cannot withdraw the entire supply in one token",
            ));
        }

        let reserves = &state.reserves;
        let scale = self.scale(i);

        let d0 = StableSwapMath::compute_d(reserves, self.amplification())?;
        let d1 = d0 - mul_div_u128(d0, shares, total, Rounding::Down)?;
        let y = StableSwapMath::get_y(reserves, d1, self.amplification(), i)?;
        if y >= reserves[i] {
            return Err(PoolError::InvalidAmount("withdrawal rounds to zero"));
        }

        // Deposits are fee-free, so the whole payout is charged as a swap. A
        // lighter fee here would make deposit-then-withdraw cheaper than swap.
        let raw_output = reserves[i] - y;
        let fee = bps_of(raw_output, self.fee_bps(), Rounding::Up)?;

        let amount_out = scale.from_wad(raw_output - fee, Rounding::Down)?;
        if amount_out == 0 {
            return Err(PoolError::InvalidAmount("withdrawal rounds to zero"));
        }
        let forwarded_fee = match self.fee_destination() {
            FeeDestination::Retain => 0,
            FeeDestination::Forward(_) => scale.from_wad(fee, Rounding::Down)?,
        };

        let debit = scale.to_wad(amount_out)? + scale.to_wad(forwarded_fee)?;
        let mut new_reserves = reserves.clone();
        new_reserves[i] = reserves[i]
            .checked_sub(debit)
            .filter(|r| *r > 0)
            .ok_or(PoolError::InsufficientReserves("withdrawal would drain reserve"))?;

        debug!(d0, d1, y, raw_output, fee, amount_out, "Single-token withdrawal priced");
        Ok(SingleWithdrawal {
            amount_out,
            forwarded_fee,
            new_reserves,
        })
    }
}
