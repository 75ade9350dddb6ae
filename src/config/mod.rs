//! # turcsv Configuration Module
//!
//! Centralizes all numeric configuration values. Interdependent constants are
//! grouped together in [`constants`] and their relationships enforced with
//! compile-time assertions.

pub mod constants;
pub use constants::*;
