//! Pool Configuration Module
//!
//! Loads stableswap pool construction parameters from TOML files with
//! environment variable overrides (`STABLESWAP_FEE_BPS=10` etc.).

use crate::limits::{pool, ENV_PREFIX};
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};
use types::{Address, TokenAddress, WAD_DECIMALS};

/// Construction parameters for one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Human-readable pool name, used in logs only
    pub name: String,

    /// Account address the pool holds its tokens under
    pub address: Address,

    /// Amplification coefficient A
    #[serde(default = "default_amplification")]
    pub amplification: u64,

    /// Swap fee in basis points
    #[serde(default = "default_fee_bps")]
    pub fee_bps: u32,

    /// When set, swap fees are forwarded here instead of staying in reserves
    #[serde(default)]
    pub fee_sink: Option<Address>,

    /// Constituent tokens, in pool index order
    pub tokens: Vec<TokenConfig>,
}

/// One constituent token of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: TokenAddress,
    pub decimals: u8,
}

fn default_amplification() -> u64 {
    pool::DEFAULT_AMPLIFICATION
}

fn default_fee_bps() -> u32 {
    pool::DEFAULT_FEE_BPS
}

impl PoolConfig {
    /// Load from a TOML file with `STABLESWAP_*` environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    /// Load from a TOML file, taking overrides from variables under `prefix`
    pub fn load_with_env_prefix(path: &Path, prefix: &str) -> Result<Self> {
        info!("Loading pool config: {:?}", path);

        let builder = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder
            .build()
            .with_context(|| format!("Failed to build pool configuration from {:?}", path))?;

        let pool: PoolConfig = config
            .try_deserialize()
            .context("Failed to deserialize pool configuration")?;

        pool.validate()?;
        Ok(pool)
    }

    /// Parse an inline TOML document (no environment overrides)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()
            .context("Failed to parse pool configuration")?;

        let pool: PoolConfig = config
            .try_deserialize()
            .context("Failed to deserialize pool configuration")?;

        pool.validate()?;
        Ok(pool)
    }

    /// Two 18-decimal stablecoins at A = 100 and 4 bps, fees retained
    pub fn default_two_pool() -> Self {
        Self {
            name: "usd-2pool".to_string(),
            address: Address::repeat_byte(0xaa),
            amplification: pool::DEFAULT_AMPLIFICATION,
            fee_bps: pool::DEFAULT_FEE_BPS,
            fee_sink: None,
            tokens: vec![
                TokenConfig {
                    symbol: "USDA".to_string(),
                    address: TokenAddress::repeat_byte(0x01),
                    decimals: 18,
                },
                TokenConfig {
                    symbol: "USDB".to_string(),
                    address: TokenAddress::repeat_byte(0x02),
                    decimals: 18,
                },
            ],
        }
    }

    /// Check parameters against the pool limits
    pub fn validate(&self) -> Result<()> {
        let n = self.tokens.len();
        if !(pool::MIN_TOKENS..=pool::MAX_TOKENS).contains(&n) {
            bail!(
                "Pool '{}' has {} tokens, expected {}..={}",
                self.name,
                n,
                pool::MIN_TOKENS,
                pool::MAX_TOKENS
            );
        }

        let mut seen = HashSet::new();
        for token in &self.tokens {
            if !seen.insert(token.address) {
                bail!("Pool '{}' lists token {} twice", self.name, token.address);
            }
            if token.decimals > WAD_DECIMALS {
                bail!(
                    "Token {} has {} decimals, maximum is {}",
                    token.symbol,
                    token.decimals,
                    WAD_DECIMALS
                );
            }
        }

        if !(pool::MIN_AMPLIFICATION..=pool::MAX_AMPLIFICATION).contains(&self.amplification) {
            bail!(
                "Amplification {} outside {}..={}",
                self.amplification,
                pool::MIN_AMPLIFICATION,
                pool::MAX_AMPLIFICATION
            );
        }

        if self.fee_bps > pool::MAX_FEE_BPS {
            bail!("Fee {} bps exceeds {}", self.fee_bps, pool::MAX_FEE_BPS);
        }

        if self.fee_sink == Some(self.address) {
            bail!("Fee sink cannot be the pool address {}", self.address);
        }

        debug!(
            "Pool config '{}' valid: {} tokens, A={}, fee={}bps",
            self.name, n, self.amplification, self.fee_bps
        );
        Ok(())
    }

    /// Position of `token` in the pool's index order
    pub fn token_index(&self, token: &TokenAddress) -> Option<usize> {
        self.tokens.iter().position(|t| &t.address == token)
    }
}
