//! Vesting claim constants

/// Decimals the claimed token's transfers are checked against
pub const CLAIM_TOKEN_DECIMALS: u8 = coin_core::constants::PROJECT_TOKEN_DECIMALS;

pub const SECONDS_PER_HOUR: i64 = 3_600;

/// Denominator of the claim split
pub const PERCENT_DENOM: u128 = 100;
