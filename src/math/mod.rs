//! Numeric helpers: curve smoothing.

pub mod ema;

pub use ema::*;
