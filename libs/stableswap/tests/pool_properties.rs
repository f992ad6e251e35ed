//! Pool Accounting Property Tests
//!
//! Random operation sequences against a mixed-decimal pool. Every operation
//! either applies exactly the amounts it reports or leaves the pool untouched.

use proptest::prelude::*;
use std::sync::Arc;
use stableswap::{
    FeeDestination, InMemoryToken, PoolParams, StableSwapMath, StableSwapPool, Token,
};
use types::{Address, TokenAddress, WAD};

const POOL: Address = Address::repeat_byte(0xaa);
const LP: Address = Address::repeat_byte(0x10);
const TRADER: Address = Address::repeat_byte(0x20);
const SINK: Address = Address::repeat_byte(0xfe);

#[derive(Debug, Clone)]
enum Op {
    Swap { first: bool, whole: u32 },
    Add { whole: [u32; 2] },
    Remove { fraction_bps: u32 },
    RemoveOne { fraction_bps: u32, token: usize },
    TransferShares { fraction_bps: u32 },
}

struct Fixture {
    pool: StableSwapPool,
    tokens: Vec<Arc<InMemoryToken>>,
    units: [u128; 2],
}

fn fixture(
    decimals: [u8; 2],
    seed_whole: u128,
    amplification: u64,
    fee_destination: FeeDestination,
) -> Fixture {
    let tokens: Vec<Arc<InMemoryToken>> = decimals
        .iter()
        .enumerate()
        .map(|(i, d)| {
            Arc::new(InMemoryToken::new(
                TokenAddress::repeat_byte(i as u8 + 1),
                format!("USD{}", i),
                *d,
            ))
        })
        .collect();
    let units = [10u128.pow(decimals[0] as u32), 10u128.pow(decimals[1] as u32)];

    for (token, unit) in tokens.iter().zip(units) {
        for holder in [LP, TRADER] {
            token.mint(holder, 100_000_000 * unit).unwrap();
            token.approve(holder, POOL, u128::MAX).unwrap();
        }
    }

    let pool = StableSwapPool::new(PoolParams {
        address: POOL,
        tokens: tokens.iter().map(|t| t.clone() as Arc<dyn Token>).collect(),
        amplification,
        fee_bps: 4,
        fee_destination,
    })
    .unwrap();
    pool.add_liquidity(LP, &[seed_whole * units[0], seed_whole * units[1]], 0)
        .unwrap();

    Fixture {
        pool,
        tokens,
        units,
    }
}

prop_compose! {
    fn swap_op()
        (first in any::<bool>(), whole in 1u32..2_000u32) -> Op {
        Op::Swap { first, whole }
    }
}

prop_compose! {
    fn add_op()
        (a in 0u32..1_000u32, b in 0u32..1_000u32) -> Op {
        Op::Add { whole: [a, b] }
    }
}

prop_compose! {
    fn fraction()
        (fraction_bps in 1u32..5_000u32) -> u32 {
        fraction_bps
    }
}

fn operation() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => swap_op(),
        2 => add_op(),
        1 => fraction().prop_map(|fraction_bps| Op::Remove { fraction_bps }),
        1 => (fraction(), 0usize..2).prop_map(|(fraction_bps, token)| Op::RemoveOne { fraction_bps, token }),
        1 => fraction().prop_map(|fraction_bps| Op::TransferShares { fraction_bps }),
    ]
}

fn portion(balance: u128, fraction_bps: u32) -> u128 {
    balance * fraction_bps as u128 / 10_000
}

fn forwarded(f: &Fixture) -> [u128; 2] {
    [f.tokens[0].balance_of(&SINK), f.tokens[1].balance_of(&SINK)]
}

/// Apply `op`, returning the reserve deltas it reported (in, out) per token.
/// Fees forwarded to the sink count as outflow.
fn apply(f: &Fixture, op: &Op) -> Option<([u128; 2], [u128; 2])> {
    let sink_before = forwarded(f);
    let (credit, mut debit) = apply_reported(f, op)?;
    let sink_after = forwarded(f);
    for k in 0..2 {
        debit[k] += sink_after[k] - sink_before[k];
    }
    Some((credit, debit))
}

fn apply_reported(f: &Fixture, op: &Op) -> Option<([u128; 2], [u128; 2])> {
    let pool = &f.pool;
    match op {
        Op::Swap { first, whole } => {
            let (i, j) = if *first { (0, 1) } else { (1, 0) };
            let amount_in = *whole as u128 * f.units[i];
            let out = pool.swap(TRADER, *first, amount_in, 0).ok()?;
            let mut credit = [0; 2];
            let mut debit = [0; 2];
            credit[i] = amount_in;
            debit[j] = out;
            Some((credit, debit))
        }
        Op::Add { whole } => {
            let amounts = [
                whole[0] as u128 * f.units[0],
                whole[1] as u128 * f.units[1],
            ];
            pool.add_liquidity(LP, &amounts, 0).ok()?;
            Some((amounts, [0; 2]))
        }
        Op::Remove { fraction_bps } => {
            let shares = portion(pool.share_balance(&LP), *fraction_bps);
            let out = pool.remove_liquidity(LP, shares, &[0, 0]).ok()?;
            Some(([0; 2], [out[0], out[1]]))
        }
        Op::RemoveOne {
            fraction_bps,
            token,
        } => {
            let shares = portion(pool.share_balance(&LP), *fraction_bps);
            let out = pool
                .remove_liquidity_one_token(LP, shares, *token, 0)
                .ok()?;
            let mut debit = [0; 2];
            debit[*token] = out;
            Some(([0; 2], debit))
        }
        Op::TransferShares { fraction_bps } => {
            let shares = portion(pool.share_balance(&LP), *fraction_bps);
            pool.transfer_shares(LP, TRADER, shares).ok()?;
            Some(([0; 2], [0; 2]))
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: reserves always equal the sum of reported deltas and are
    /// fully backed by the pool's token balances
    #[test]
    fn reserves_track_reported_amounts(
        seed in 1_000u128..100_000u128,
        amplification in 1u64..2_000u64,
        forward_fees in any::<bool>(),
        ops in prop::collection::vec(operation(), 1..24),
    ) {
        let destination = if forward_fees {
            FeeDestination::Forward(SINK)
        } else {
            FeeDestination::Retain
        };
        let f = fixture([18, 6], seed, amplification, destination);
        let mut expected = f.pool.get_reserves();

        for op in &ops {
            let before = f.pool.get_reserves();
            let d_before = f.pool.invariant().unwrap();
            let shares_before = f.pool.total_shares();

            match apply(&f, op) {
                Some((credit, debit)) => {
                    for k in 0..2 {
                        expected[k] = expected[k] + credit[k] - debit[k];
                    }
                    if !forward_fees && matches!(op, Op::Swap { .. }) {
                        prop_assert!(f.pool.invariant().unwrap() >= d_before,
                                    "Swap lowered the invariant: {:?}", op);
                    }
                }
                None => {
                    prop_assert_eq!(f.pool.get_reserves(), before, "Failed {:?} moved reserves", op);
                    prop_assert_eq!(f.pool.total_shares(), shares_before);
                }
            }

            let reserves = f.pool.get_reserves();
            prop_assert_eq!(&reserves, &expected);
            prop_assert_eq!(f.pool.get_reserves(), reserves.clone());
            for k in 0..2 {
                prop_assert!(reserves[k] > 0, "Reserve {} drained by {:?}", k, op);
                prop_assert_eq!(f.tokens[k].balance_of(&POOL), reserves[k]);
            }
            prop_assert_eq!(
                f.pool.total_shares(),
                f.pool.share_balance(&LP) + f.pool.share_balance(&TRADER)
            );
        }
    }

    /// Property: depositing then withdrawing never returns more value than deposited
    #[test]
    fn liquidity_round_trip_never_profits(
        seed in 1_000u128..1_000_000u128,
        a in 1u128..10_000u128,
        b in 1u128..10_000u128,
    ) {
        let f = fixture([18, 18], seed, 100, FeeDestination::Retain);
        let deposit = [a * WAD, b * WAD];

        let shares = f.pool.add_liquidity(TRADER, &deposit, 0).unwrap();
        let returned = f.pool.remove_liquidity(TRADER, shares, &[0, 0]).unwrap();

        prop_assert!(returned[0] + returned[1] <= deposit[0] + deposit[1],
                    "Round trip returned {:?} for {:?}", returned, deposit);
        if a == b {
            prop_assert!(returned[0] <= deposit[0] && returned[1] <= deposit[1]);
        }
    }

    /// Property: a single-sided deposit withdrawn in the other token pays at
    /// least the swap fee
    #[test]
    fn deposit_then_single_withdrawal_never_beats_swap(
        seed in 1_000u128..1_000_000u128,
        amplification in 1u64..2_000u64,
        whole in 1u128..10_000u128,
    ) {
        let direct = fixture([18, 6], seed, amplification, FeeDestination::Retain);
        let routed = fixture([18, 6], seed, amplification, FeeDestination::Retain);
        let amount_in = whole * WAD;

        let swapped = direct.pool.swap(TRADER, true, amount_in, 0).unwrap();
        let shares = routed.pool.add_liquidity(TRADER, &[amount_in, 0], 0).unwrap();
        let withdrawn = routed.pool
            .remove_liquidity_one_token(TRADER, shares, 1, 0)
            .unwrap();

        prop_assert!(withdrawn <= swapped,
                    "Routed {} beat swap {} for {} in", withdrawn, swapped, amount_in);
    }

    /// Property: the invariant never exceeds the plain reserve sum
    #[test]
    fn invariant_bounded_by_sum(
        x in 1u128..1_000_000u128,
        y in 1u128..1_000_000u128,
        z in 1u128..1_000_000u128,
        amplification in 1u64..10_000u64,
    ) {
        let reserves = [x * WAD, y * WAD, z * WAD];
        let d = StableSwapMath::compute_d(&reserves, amplification).unwrap();
        prop_assert!(d <= reserves.iter().sum::<u128>());
        prop_assert!(d > 0);
    }

    /// Property: solving back for a reserve at the current invariant reproduces it
    #[test]
    fn get_y_inverts_compute_d(
        x in 1_000u128..1_000_000u128,
        ratio in 1u128..10u128,
        amplification in 1u64..5_000u64,
        target in 0usize..2,
    ) {
        let reserves = [x * WAD, x * ratio * WAD];
        let d = StableSwapMath::compute_d(&reserves, amplification).unwrap();
        let y = StableSwapMath::get_y(&reserves, d, amplification, target).unwrap();

        let diff = y.abs_diff(reserves[target]);
        prop_assert!(diff <= 1_000_000, "get_y off by {} wei", diff);
    }
}
