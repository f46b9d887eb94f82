//! # coldb Configuration Module
//!
//! This module centralizes all configuration constants for coldb. Constants are
//! grouped by their functional area and interdependencies are enforced through
//! compile-time assertions.
//!
//! Runtime-tunable settings (storage root, index fanout, handle table capacity)
//! live on `DatabaseBuilder`; the values here are their defaults.
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric and naming configuration values

pub mod constants;
pub use constants::*;
