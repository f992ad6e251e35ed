//! Pool limits and defaults
//!
//! Constants shared by configuration validation and the engine so the two
//! never disagree on what a valid pool looks like.

/// Construction limits
pub mod pool {
    /// Smallest number of tokens a pool can hold
    pub const MIN_TOKENS: usize = 2;

    /// Largest number of tokens a pool can hold
    pub const MAX_TOKENS: usize = 8;

    /// Lower bound for the amplification coefficient A
    pub const MIN_AMPLIFICATION: u64 = 1;

    /// Upper bound for the amplification coefficient A
    pub const MAX_AMPLIFICATION: u64 = 1_000_000;

    /// Upper bound for the swap fee (100%)
    pub const MAX_FEE_BPS: u32 = 10_000;

    /// Default amplification for stable pairs
    pub const DEFAULT_AMPLIFICATION: u64 = 100;

    /// Default swap fee (0.04%)
    pub const DEFAULT_FEE_BPS: u32 = 4;
}

/// Invariant solver bounds
pub mod solver {
    /// Newton iterations before the solver gives up
    pub const MAX_ITERATIONS: usize = 255;

    /// Successive iterates within this distance count as converged
    pub const CONVERGENCE_THRESHOLD: u64 = 1;
}

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "STABLESWAP";
