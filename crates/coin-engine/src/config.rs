//! Config file loading

use std::path::Path;

use anyhow::{bail, Context};
use coin_core::{constants::BPS_DENOMINATOR, Commitment, EngineConfig, TokenId};

pub const ENV_RESERVE_MINT: &str = "COIN_ENGINE_RESERVE_MINT";
pub const ENV_RESERVE_DECIMALS: &str = "COIN_ENGINE_RESERVE_DECIMALS";
pub const ENV_RESERVE_SYMBOL: &str = "COIN_ENGINE_RESERVE_SYMBOL";
pub const ENV_COMMITMENT: &str = "COIN_ENGINE_COMMITMENT";

/// Load the engine config from a JSON file (defaults when `path` is None),
/// then apply `COIN_ENGINE_*` environment overrides.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides looked up through `lookup` and validate the result
pub fn apply_overrides(
    mut config: EngineConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<EngineConfig> {
    if let Some(mint) = lookup(ENV_RESERVE_MINT) {
        config.reserve.token_id = TokenId::new(mint.trim());
    }
    if let Some(decimals) = lookup(ENV_RESERVE_DECIMALS) {
        config.reserve.decimals = decimals
            .trim()
            .parse()
            .with_context(|| format!("{} must be an integer, got {:?}", ENV_RESERVE_DECIMALS, decimals))?;
    }
    if let Some(symbol) = lookup(ENV_RESERVE_SYMBOL) {
        config.reserve.symbol = symbol.trim().to_string();
    }
    if let Some(commitment) = lookup(ENV_COMMITMENT) {
        config.commitment = parse_commitment(&commitment)?;
    }

    if u64::from(config.slippage_bps) > BPS_DENOMINATOR {
        bail!("slippage_bps must be at most {}, got {}", BPS_DENOMINATOR, config.slippage_bps);
    }
    if config.request_timeout_secs == 0 || config.confirm_timeout_secs == 0 {
        bail!("timeouts must be at least one second");
    }

    tracing::debug!(
        "Engine config: reserve={} commitment={} slippage={}bps",
        config.reserve,
        config.commitment,
        config.slippage_bps
    );
    Ok(config)
}

fn parse_commitment(text: &str) -> anyhow::Result<Commitment> {
    serde_json::from_value(serde_json::Value::String(text.trim().to_lowercase()))
        .with_context(|| format!("Unknown commitment level {:?}", text))
}
