//! # StableSwap Pool Engine
//!
//! ## Purpose
//!
//! Liquidity pool engine for assets that trade near a 1:1 peg. Prices swaps on the
//! stableswap invariant, which behaves like a constant-sum curve near balance and
//! like a constant-product curve as reserves diverge, and keeps the pool-share
//! ledger for liquidity providers.
//!
//! ## Integration Points
//!
//! - **Input Sources**: Pool parameters from [`PoolParams`] or a loaded `PoolConfig`
//! - **Token Movement**: Any [`Token`] implementation; [`InMemoryToken`] is bundled
//! - **Output Destinations**: Callers receive amounts and errors; state is queried
//!   through views and [`PoolSnapshot`]
//! - **Precision**: Reserves normalized to 18-decimal wad, 256-bit intermediates
//!
//! ## Architecture Role
//!
//! [`StableSwapMath`] is pure and stateless. [`StableSwapPool`] serializes every
//! mutation behind one lock per pool and runs the compute, transfer and commit
//! steps inside it, reversing token transfers if a later one fails.
//! [`PoolRegistry`] indexes pools by address and token for quote routing.
//!
//! See [`architecture_diagram()`] for visual representation of the data flow.
//!
//! ## Rounding
//!
//! Every rounding decision favours the pool: invariant and share amounts round
//! down, the solved reserve rounds up, fees round up, payouts round down.

pub mod error;
pub mod invariant;
pub mod liquidity;
pub mod pool;
pub mod pool_traits;
pub mod registry;
mod share_ledger;
pub mod swap;
pub mod token;

pub use error::{PoolError, Result};
pub use invariant::StableSwapMath;
pub use pool::{FeeDestination, PoolParams, PoolSnapshot, StableSwapPool};
pub use pool_traits::AmmPool;
pub use registry::{PoolRegistry, RegistryError, RegistryStats, RoutedQuote};
pub use swap::SwapQuote;
pub use token::{InMemoryToken, Token, TokenError};

/// Architecture diagram showing pool data flow and component relationships
#[cfg_attr(doc, aquamarine::aquamarine)]
/// ```mermaid
/// graph LR
///     subgraph Callers["👤 Callers"]
///         LP[Liquidity Providers]
///         TR[Traders]
///     end
///
///     subgraph Pool["🔒 StableSwapPool (one lock)"]
///         LQ[Liquidity Accounting]
///         SW[Swap Executor]
///         SL[Share Ledger]
///         RS[Wad Reserves]
///     end
///
///     subgraph Math["🧮 Invariant Solver"]
///         CD[compute_d]
///         GY[get_y]
///     end
///
///     subgraph Tokens["🪙 Token Interface"]
///         TB[Transfer Batch]
///         TK[Token Impl]
///     end
///
///     LP --> LQ
///     TR --> SW
///     LQ --> CD
///     SW --> CD
///     SW --> GY
///     LQ --> GY
///     LQ --> SL
///     LQ --> TB
///     SW --> TB
///     TB --> TK
///     LQ --> RS
///     SW --> RS
///
///     style Callers fill:#e1f5fe
///     style Pool fill:#fff3e0
///     style Math fill:#f3e5f5
///     style Tokens fill:#e8f5e9
/// ```
pub fn architecture_diagram() {
    // Rendered by aquamarine in rustdoc
}
