//! Configuration types for the coin engine

use serde::{Deserialize, Serialize};

use crate::amount::Percent;
use crate::constants::{DEFAULT_SLIPPAGE_BPS, RESERVE_DECIMALS, RESERVE_MINT, RESERVE_SYMBOL};
use crate::types::{Commitment, TokenDescriptor};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Reserve currency the bonding curves trade against
    #[serde(default = "default_reserve")]
    pub reserve: TokenDescriptor,

    /// Commitment level used when confirming and reading balances
    #[serde(default = "default_commitment")]
    pub commitment: Commitment,

    /// Slippage tolerance requested from quote venues
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,

    /// Timeout for a single collaborator request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long to wait for a sent transaction to confirm
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    /// Share of every claim routed to the rewards pool
    #[serde(default)]
    pub default_pool_percent: Percent,
}

fn default_reserve() -> TokenDescriptor {
    TokenDescriptor::new(RESERVE_MINT, RESERVE_DECIMALS, RESERVE_SYMBOL)
}

fn default_commitment() -> Commitment {
    Commitment::Confirmed
}

fn default_slippage_bps() -> u16 {
    DEFAULT_SLIPPAGE_BPS
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_confirm_timeout_secs() -> u64 {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reserve: default_reserve(),
            commitment: default_commitment(),
            slippage_bps: default_slippage_bps(),
            request_timeout_secs: default_request_timeout_secs(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            default_pool_percent: Percent::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.reserve.token_id.as_str(), RESERVE_MINT);
        assert_eq!(config.reserve.decimals, 8);
        assert_eq!(config.commitment, Commitment::Confirmed);
        assert_eq!(config.slippage_bps, 200);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: EngineConfig =
            serde_json::from_str(r#"{"commitment":"finalized","default_pool_percent":30}"#).unwrap();
        assert_eq!(parsed.commitment, Commitment::Finalized);
        assert_eq!(parsed.default_pool_percent.value(), 30);
        assert_eq!(parsed.confirm_timeout_secs, 60);
    }

    #[test]
    fn test_pool_percent_out_of_range_rejected() {
        let parsed = serde_json::from_str::<EngineConfig>(r#"{"default_pool_percent":150}"#);
        assert!(parsed.is_err());
    }
}
