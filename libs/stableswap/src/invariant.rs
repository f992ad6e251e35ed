//! Stableswap invariant solver
//!
//! Solves the N-token stableswap invariant
//!
//! ```text
//! A * n^n * sum(x_i) + D = A * D * n^n + D^(n+1) / (n^n * prod(x_i))
//! ```
//!
//! for D given the reserves, and for a single reserve given D. Both use Newton
//! iteration over 256-bit integers on wad-normalized reserves, floor every
//! division, and stop once successive iterates are within one unit.

use crate::error::{PoolError, Result};
use config::limits::{pool, solver};
use tracing::debug;
use types::{mul_div, u256_to_u128, Rounding, U256};

/// Stableswap math with integer-exact Newton solvers
pub struct StableSwapMath;

impl StableSwapMath {
    /// Compute the invariant D for `reserves` (wad) at amplification `amplification`
    ///
    /// Empty reserves give D = 0. A zero reserve next to non-zero ones has no
    /// finite solution and is rejected as [`PoolError::InsufficientReserves`].
    pub fn compute_d(reserves: &[u128], amplification: u64) -> Result<u128> {
        let n = Self::check_size(reserves.len())?;
        let sum = reserves
            .iter()
            .try_fold(U256::zero(), |acc, x| acc.checked_add(U256::from(*x)))
            .ok_or(PoolError::Overflow("reserve sum"))?;
        if sum.is_zero() {
            return Ok(0);
        }
        if reserves.iter().any(|x| *x == 0) {
            return Err(PoolError::InsufficientReserves(
                "cannot price a pool with an empty reserve",
            ));
        }

        let n_coins = U256::from(n);
        let ann = Self::ann(amplification, n)?;
        let mut d = sum;

        for iteration in 0..solver::MAX_ITERATIONS {
            // D_P = D^(n+1) / (n^n * prod(x_i)), built one reserve at a time
            let mut d_p = d;
            for x in reserves {
                let denominator = checked_mul(U256::from(*x), n_coins)?;
                d_p = mul_div(d_p, d, denominator, Rounding::Down)?;
            }

            let previous = d;
            let numerator = checked_add(checked_mul(ann, sum)?, checked_mul(d_p, n_coins)?)?;
            let denominator = checked_add(
                checked_mul(ann - U256::one(), d)?,
                checked_mul(n_coins + U256::one(), d_p)?,
            )?;
            d = mul_div(numerator, d, denominator, Rounding::Down)?;

            if within_threshold(d, previous) {
                debug!(iterations = iteration + 1, "compute_d converged");
                return Ok(u256_to_u128(d)?);
            }
        }

        Err(PoolError::Convergence {
            iterations: solver::MAX_ITERATIONS,
        })
    }

    /// Solve for reserve `target` such that the pool's invariant equals `d`
    ///
    /// `reserves[target]` is ignored; every other reserve must be non-zero. The
    /// floor solution is returned plus one unit, so an output computed as
    /// `old - y` is never larger than the curve permits.
    pub fn get_y(reserves: &[u128], d: u128, amplification: u64, target: usize) -> Result<u128> {
        let n = Self::check_size(reserves.len())?;
        if target >= n {
            return Err(PoolError::InvalidTokenIndex {
                index: target,
                n_tokens: n,
            });
        }
        if d == 0 {
            return Err(PoolError::InsufficientReserves("invariant is zero"));
        }

        let n_coins = U256::from(n);
        let ann = Self::ann(amplification, n)?;
        let d = U256::from(d);

        // c = D^(n+1) / (n^n * prod(x_k, k != target) * Ann * n)
        let mut c = d;
        let mut sum = U256::zero();
        for (k, x) in reserves.iter().enumerate() {
            if k == target {
                continue;
            }
            if *x == 0 {
                return Err(PoolError::InsufficientReserves(
                    "cannot solve against an empty reserve",
                ));
            }
            sum = checked_add(sum, U256::from(*x))?;
            c = mul_div(c, d, checked_mul(U256::from(*x), n_coins)?, Rounding::Down)?;
        }
        c = mul_div(c, d, checked_mul(ann, n_coins)?, Rounding::Down)?;
        let b = checked_add(sum, d / ann)?;

        let mut y = d;
        for iteration in 0..solver::MAX_ITERATIONS {
            let previous = y;
            let denominator = checked_add(checked_mul(y, U256::from(2u8))?, b)?
                .checked_sub(d)
                .filter(|v| !v.is_zero())
                .ok_or(PoolError::Convergence {
                    iterations: iteration,
                })?;
            y = checked_add(checked_mul(y, y)?, c)? / denominator;

            if within_threshold(y, previous) {
                debug!(iterations = iteration + 1, target, "get_y converged");
                return Ok(u256_to_u128(checked_add(y, U256::one())?)?);
            }
        }

        Err(PoolError::Convergence {
            iterations: solver::MAX_ITERATIONS,
        })
    }

    /// A * n^n
    fn ann(amplification: u64, n: usize) -> Result<U256> {
        if !(pool::MIN_AMPLIFICATION..=pool::MAX_AMPLIFICATION).contains(&amplification) {
            return Err(PoolError::InvalidParams(format!(
                "amplification {} outside {}..={}",
                amplification,
                pool::MIN_AMPLIFICATION,
                pool::MAX_AMPLIFICATION
            )));
        }
        let n_pow_n = (n as u64).pow(n as u32);
        Ok(U256::from(amplification) * U256::from(n_pow_n))
    }

    fn check_size(n: usize) -> Result<usize> {
        if !(pool::MIN_TOKENS..=pool::MAX_TOKENS).contains(&n) {
            return Err(PoolError::InvalidParams(format!(
                "{} reserves, expected {}..={}",
                n,
                pool::MIN_TOKENS,
                pool::MAX_TOKENS
            )));
        }
        Ok(n)
    }
}

fn within_threshold(a: U256, b: U256) -> bool {
    let diff = if a > b { a - b } else { b - a };
    diff <= U256::from(solver::CONVERGENCE_THRESHOLD)
}

fn checked_mul(a: U256, b: U256) -> Result<U256> {
    a.checked_mul(b).ok_or(PoolError::Overflow("invariant multiplication"))
}

fn checked_add(a: U256, b: U256) -> Result<U256> {
    a.checked_add(b).ok_or(PoolError::Overflow("invariant addition"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::WAD;

    #[test]
    fn test_balanced_pool_invariant_is_sum() {
        // On the peg D equals the plain sum of reserves
        let d = StableSwapMath::compute_d(&[1000 * WAD, 1000 * WAD], 100).unwrap();
        assert_eq!(d, 2000 * WAD);

        let d3 = StableSwapMath::compute_d(&[1000 * WAD, 1000 * WAD, 1000 * WAD], 100).unwrap();
        assert_eq!(d3, 3000 * WAD);
    }

    #[test]
    fn test_imbalanced_pool_invariant_below_sum() {
        let d = StableSwapMath::compute_d(&[1000 * WAD, 500 * WAD], 100).unwrap();
        assert!(d < 1500 * WAD);
        // High A keeps the curve close to constant-sum
        assert!(d > 1499 * WAD);

        // Lower A moves toward constant-product and lowers D
        let d_low_a = StableSwapMath::compute_d(&[1000 * WAD, 500 * WAD], 1).unwrap();
        assert!(d_low_a < d);
    }

    #[test]
    fn test_empty_and_degenerate_reserves() {
        assert_eq!(StableSwapMath::compute_d(&[0, 0], 100).unwrap(), 0);
        assert!(matches!(
            StableSwapMath::compute_d(&[1000 * WAD, 0], 100),
            Err(PoolError::InsufficientReserves(_))
        ));
        assert!(matches!(
            StableSwapMath::compute_d(&[1000 * WAD], 100),
            Err(PoolError::InvalidParams(_))
        ));
        assert!(matches!(
            StableSwapMath::compute_d(&[WAD, WAD], 0),
            Err(PoolError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_get_y_reproduces_reserve() {
        let reserves = [1000 * WAD, 1200 * WAD];
        let d = StableSwapMath::compute_d(&reserves, 100).unwrap();

        // Solving back for a reserve lands one or two units above it
        let y = StableSwapMath::get_y(&reserves, d, 100, 1).unwrap();
        assert!(y >= reserves[1]);
        assert!(y - reserves[1] <= 3);
    }

    #[test]
    fn test_get_y_after_deposit_into_other_side() {
        let reserves = [1000 * WAD, 1000 * WAD];
        let d = StableSwapMath::compute_d(&reserves, 100).unwrap();

        let moved = [1100 * WAD, 1000 * WAD];
        let y = StableSwapMath::get_y(&moved, d, 100, 1).unwrap();
        let out = reserves[1] - y;

        // Near the peg almost all of the 100 comes back out
        assert!(out < 100 * WAD);
        assert!(out > 99 * WAD);
    }

    #[test]
    fn test_get_y_rejects_bad_input() {
        let reserves = [1000 * WAD, 1000 * WAD];
        assert!(matches!(
            StableSwapMath::get_y(&reserves, 2000 * WAD, 100, 2),
            Err(PoolError::InvalidTokenIndex { index: 2, n_tokens: 2 })
        ));
        assert!(matches!(
            StableSwapMath::get_y(&reserves, 0, 100, 0),
            Err(PoolError::InsufficientReserves(_))
        ));
        assert!(matches!(
            StableSwapMath::get_y(&[0, 1000 * WAD, 1000 * WAD], 3000 * WAD, 100, 1),
            Err(PoolError::InsufficientReserves(_))
        ));
    }

    #[test]
    fn test_three_token_solver_consistency() {
        let reserves = [900 * WAD, 1100 * WAD, 1000 * WAD];
        let d = StableSwapMath::compute_d(&reserves, 200).unwrap();
        for target in 0..3 {
            let y = StableSwapMath::get_y(&reserves, d, 200, target).unwrap();
            assert!(y >= reserves[target]);
            assert!(y - reserves[target] <= 3);
        }
    }
}
