//! Quote request and response types

use std::fmt;

use coin_core::{RawAmount, TokenId};
use serde::{Deserialize, Serialize};

/// Where a quote comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    /// General liquidity aggregator, any token to any token
    Aggregator,
    /// Bonding curve, reserve currency to or from a project token only
    BondingCurve,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aggregator => "aggregator",
            Self::BondingCurve => "bonding_curve",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exact-input quote request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub venue: Venue,
    pub input_mint: TokenId,
    pub output_mint: TokenId,
    /// Raw input amount
    pub amount: RawAmount,
    pub slippage_bps: u16,
}

/// A priced route between two tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub venue: Venue,
    pub input_mint: TokenId,
    pub output_mint: TokenId,
    pub in_amount: RawAmount,
    pub out_amount: RawAmount,
    /// Slippage-protected minimum output
    pub min_out_amount: RawAmount,
    pub slippage_bps: u16,
    /// Venue-specific route data passed back to the transaction builder
    #[serde(default)]
    pub route_payload: serde_json::Value,
}
