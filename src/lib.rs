//! `rsf-occupancy` library crate.
//!
//! The binary (`rsf`) is a thin wrapper around this library so that:
//!
//! - feed parsing and curve alignment are testable without a network or terminal
//! - the text report and the TUI share one pipeline

pub mod align;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod logging;
pub mod math;
pub mod plot;
pub mod report;
pub mod tui;
