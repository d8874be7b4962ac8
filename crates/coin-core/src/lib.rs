//! coin-core: Shared types, errors, configuration and amount math
//!
//! This crate provides the foundational types used across the coin engine
//! workspace. Amount conversions live here so that every crate agrees on a
//! single exact (integer) representation.

pub mod amount;
pub mod config;
pub mod errors;
pub mod types;

pub use amount::*;
pub use config::*;
pub use errors::*;
pub use types::*;
