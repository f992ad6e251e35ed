//! Stableswap Pool Simulator
//!
//! Builds a pool from a TOML config (or the default balanced USD 2-pool) over
//! in-memory tokens, seeds it from one liquidity provider, runs a single swap
//! and prints the pool state before and after as JSON.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use config::{init_tracing, LogFormat, PoolConfig};
use stableswap::{InMemoryToken, PoolSnapshot, StableSwapPool, SwapQuote, Token};
use types::Address;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "simulate_pool")]
#[command(about = "Seed a stableswap pool, run one swap and report the result")]
struct Args {
    /// Pool configuration file (defaults to the balanced USD 2-pool)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Whole tokens deposited per constituent by the liquidity provider
    #[arg(long, default_value = "1000")]
    seed_amount: Decimal,

    /// Whole tokens sold in the swap
    #[arg(long, default_value = "100")]
    swap_amount: Decimal,

    /// Index of the token sold
    #[arg(long, default_value_t = 0)]
    token_in: usize,

    /// Index of the token bought
    #[arg(long, default_value_t = 1)]
    token_out: usize,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines instead of plain text
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    pool: String,
    sold: String,
    bought: String,
    shares_minted: Decimal,
    before: PoolSnapshot,
    quote: SwapQuote,
    amount_out: Decimal,
    after: PoolSnapshot,
}

const PROVIDER: Address = Address::repeat_byte(0x10);
const TRADER: Address = Address::repeat_byte(0x20);

fn main() -> Result<()> {
    let args = Args::parse();
    let log_format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_tracing(&args.log_level, log_format)?;

    let config = match &args.config {
        Some(path) => PoolConfig::load(path)
            .with_context(|| format!("Failed to load pool config {}", path.display()))?,
        None => PoolConfig::default_two_pool(),
    };
    info!(pool = %config.name, tokens = config.tokens.len(), "Loaded pool configuration");

    let tokens: Vec<Arc<InMemoryToken>> = config
        .tokens
        .iter()
        .map(|t| Arc::new(InMemoryToken::new(t.address, t.symbol.clone(), t.decimals)))
        .collect();
    let pool = StableSwapPool::from_config(
        &config,
        tokens.iter().map(|t| t.clone() as Arc<dyn Token>).collect(),
    )?;

    let seed = tokens
        .iter()
        .map(|t| to_native(args.seed_amount, t.decimals()))
        .collect::<Result<Vec<_>>>()?;
    for (token, amount) in tokens.iter().zip(&seed) {
        token.mint(PROVIDER, *amount)?;
        token.approve(PROVIDER, pool.address(), *amount)?;
    }
    let shares = pool.add_liquidity(PROVIDER, &seed, 0)?;

    let token_in = tokens
        .get(args.token_in)
        .ok_or_else(|| anyhow!("Token index {} out of range", args.token_in))?;
    let token_out = tokens
        .get(args.token_out)
        .ok_or_else(|| anyhow!("Token index {} out of range", args.token_out))?;
    let amount_in = to_native(args.swap_amount, token_in.decimals())?;
    token_in.mint(TRADER, amount_in)?;
    token_in.approve(TRADER, pool.address(), amount_in)?;

    let before = pool.snapshot()?;
    let quote = pool.quote_swap(args.token_in, args.token_out, amount_in)?;
    let amount_out = pool.exchange(TRADER, args.token_in, args.token_out, amount_in, quote.amount_out)?;

    let report = SimulationReport {
        pool: config.name.clone(),
        sold: token_in.symbol().to_string(),
        bought: token_out.symbol().to_string(),
        shares_minted: types::wad_to_decimal(shares)?,
        before,
        quote,
        amount_out: types::TokenScale::new(token_out.decimals())?.to_decimal(amount_out)?,
        after: pool.snapshot()?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Whole-token amount to native units, truncating below the token's precision
fn to_native(amount: Decimal, decimals: u8) -> Result<u128> {
    if amount.is_sign_negative() {
        return Err(anyhow!("Amount {} must not be negative", amount));
    }
    let unit = Decimal::from(10u64.pow(decimals as u32));
    amount
        .checked_mul(unit)
        .and_then(|native| native.trunc().to_u128())
        .ok_or_else(|| anyhow!("Amount {} does not fit {} decimals", amount, decimals))
}
