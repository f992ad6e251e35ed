//! Swap executor
//!
//! A swap adds the input to its reserve, holds D fixed, solves for the output
//! reserve and pays out the difference minus the fee. Rounding always leaves any
//! dust with the pool.

use crate::error::{PoolError, Result};
use crate::invariant::StableSwapMath;
use crate::pool::{FeeDestination, StableSwapPool};
use serde::Serialize;
use tracing::{debug, info, warn};
use types::{bps_of, Address, Rounding};

/// Outcome of pricing a swap, in native token units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwapQuote {
    pub token_in: usize,
    pub token_out: usize,
    pub amount_in: u128,
    /// Paid to the trader
    pub amount_out: u128,
    /// Fee charged on the output side
    pub fee: u128,
    /// Curve output before the fee
    pub raw_output: u128,
}

/// A priced swap plus the reserves it leaves behind
struct SwapComputation {
    quote: SwapQuote,
    new_reserves: Vec<u128>,
    /// Native fee amount moved to the sink (zero when fees are retained)
    forwarded_fee: u128,
}

impl StableSwapPool {
    /// Swap between the first two tokens of the pool
    ///
    /// `token_in_is_first` selects token 0 -> token 1, otherwise token 1 -> token 0.
    pub fn swap(
        &self,
        caller: Address,
        token_in_is_first: bool,
        amount_in: u128,
        min_amount_out: u128,
    ) -> Result<u128> {
        let (i, j) = if token_in_is_first { (0, 1) } else { (1, 0) };
        self.exchange(caller, i, j, amount_in, min_amount_out)
    }

    /// Swap `amount_in` of token `i` for token `j`
    ///
    /// Pulls the input from `caller` (the pool needs an allowance), pays the
    /// output to `caller`, and forwards the fee when the pool has a fee sink.
    /// Returns the native amount of token `j` paid out.
    pub fn exchange(
        &self,
        caller: Address,
        i: usize,
        j: usize,
        amount_in: u128,
        min_amount_out: u128,
    ) -> Result<u128> {
        let mut state = self.lock_state();
        let computed = self.compute_exchange(&state.reserves, i, j, amount_in)?;
        let quote = computed.quote;

        if quote.amount_out < min_amount_out {
            warn!(
                pool = %self.address(),
                amount_out = quote.amount_out,
                min_amount_out,
                "Swap rejected: slippage exceeded"
            );
            return Err(PoolError::SlippageExceeded {
                actual: quote.amount_out,
                minimum: min_amount_out,
            });
        }

        self.settle("swap", |batch| {
            batch.pull(self.token(i), caller, amount_in)?;
            batch.push(self.token(j), caller, quote.amount_out)?;
            if let FeeDestination::Forward(sink) = self.fee_destination() {
                batch.push(self.token(j), sink, computed.forwarded_fee)?;
            }
            Ok(())
        })?;

        state.reserves = computed.new_reserves;

        info!(
            pool = %self.address(),
            trader = %caller,
            token_in = i,
            token_out = j,
            amount_in,
            amount_out = quote.amount_out,
            fee = quote.fee,
            "Swap executed"
        );
        Ok(quote.amount_out)
    }

    /// Price a swap against current reserves without moving funds
    pub fn quote_swap(&self, i: usize, j: usize, amount_in: u128) -> Result<SwapQuote> {
        let state = self.lock_state();
        Ok(self.compute_exchange(&state.reserves, i, j, amount_in)?.quote)
    }

    fn compute_exchange(
        &self,
        reserves: &[u128],
        i: usize,
        j: usize,
        amount_in: u128,
    ) -> Result<SwapComputation> {
        self.check_index(i)?;
        self.check_index(j)?;
        if i == j {
            return Err(PoolError::SameToken(i));
        }
        if amount_in == 0 {
            return Err(PoolError::InvalidAmount("swap input must be positive"));
        }
        if reserves.iter().any(|r| *r == 0) {
            return Err(PoolError::InsufficientReserves("pool has an empty reserve"));
        }

        let scale_in = self.scale(i);
        let scale_out = self.scale(j);

        let d = StableSwapMath::compute_d(reserves, self.amplification())?;

        let mut new_reserves = reserves.to_vec();
        new_reserves[i] = reserves[i]
            .checked_add(scale_in.to_wad(amount_in)?)
            .ok_or(PoolError::Overflow("input reserve"))?;

        let y = StableSwapMath::get_y(&new_reserves, d, self.amplification(), j)?;
        if y >= reserves[j] {
            return Err(PoolError::InsufficientReserves("swap output rounds to nothing"));
        }

        let raw_output = reserves[j] - y;
        let fee = bps_of(raw_output, self.fee_bps(), Rounding::Up)?;
        let output = raw_output - fee;

        let amount_out = scale_out.from_wad(output, Rounding::Down)?;
        if amount_out == 0 {
            return Err(PoolError::InvalidAmount("swap output rounds to zero"));
        }

        let fee_native = scale_out.from_wad(fee, Rounding::Down)?;
        let forwarded_fee = match self.fee_destination() {
            FeeDestination::Retain => 0,
            FeeDestination::Forward(_) => fee_native,
        };

        // Bounded by raw_output, so the reserve stays at or above y >= 1
        let debit = scale_out.to_wad(amount_out)? + scale_out.to_wad(forwarded_fee)?;
        new_reserves[j] = reserves[j]
            .checked_sub(debit)
            .filter(|r| *r > 0)
            .ok_or(PoolError::InsufficientReserves("swap would drain output reserve"))?;

        debug!(d, y, raw_output, fee, amount_out, "Swap priced");

        Ok(SwapComputation {
            quote: SwapQuote {
                token_in: i,
                token_out: j,
                amount_in,
                amount_out,
                fee: fee_native,
                raw_output: scale_out.from_wad(raw_output, Rounding::Down)?,
            },
            new_reserves,
            forwarded_fee,
        })
    }
}
