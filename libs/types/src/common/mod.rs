//! Common types shared by every stableswap crate

pub mod errors;
pub mod fixed_point;
pub mod identifiers;
