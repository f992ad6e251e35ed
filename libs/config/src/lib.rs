//! # Stableswap Configuration
//!
//! Construction parameters for stableswap pools and the limits every crate in the
//! workspace validates against.
//!
//! ## Features
//!
//! - **Pool Configuration**: token list, amplification, fee and fee sink loaded from
//!   TOML with `STABLESWAP_*` environment overrides
//! - **Limits**: token count, amplification and fee bounds, solver iteration cap
//! - **Logging**: one-call tracing subscriber setup for binaries, text or JSON
//!
//! ## Usage
//!
//! ```rust,no_run
//! use config::{init_tracing, LogFormat, PoolConfig};
//! use std::path::Path;
//!
//! init_tracing("info", LogFormat::Text).unwrap();
//! let pool = PoolConfig::load(Path::new("config/usd-3pool.toml")).unwrap();
//! println!("{} tokens, A = {}", pool.tokens.len(), pool.amplification);
//! ```

pub mod limits;
pub mod logging;
pub mod pool_config;

pub use logging::{init_tracing, LogFormat};
pub use pool_config::{PoolConfig, TokenConfig};
