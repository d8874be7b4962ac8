//! Core type definitions for the coin engine

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ValidationError;

/// Length of an ed25519 public key / blockhash in bytes
pub const PUBKEY_BYTES: usize = 32;

/// Token mint address (base58)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// View the mint as an account address
    pub fn to_address(&self) -> Address {
        Address(self.0.clone())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction signature (base58, 64 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxSignature(pub String);

impl TxSignature {
    pub fn new(sig: impl Into<String>) -> Self {
        Self(sig.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recent blockhash a message is anchored to (base58, 32 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blockhash(pub String);

impl Blockhash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn from_bytes(bytes: &[u8; PUBKEY_BYTES]) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_bytes(&self) -> Result<[u8; PUBKEY_BYTES], ValidationError> {
        let invalid = || ValidationError::InvalidBlockhash {
            value: self.0.clone(),
        };
        let decoded = bs58::decode(&self.0).into_vec().map_err(|_| invalid())?;
        decoded.try_into().map_err(|_| invalid())
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account address (base58-encoded 32-byte public key)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Encode raw key bytes as a base58 address
    pub fn from_bytes(bytes: &[u8; PUBKEY_BYTES]) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode to the 32 raw key bytes
    pub fn to_bytes(&self) -> Result<[u8; PUBKEY_BYTES], ValidationError> {
        let decoded = bs58::decode(&self.0)
            .into_vec()
            .map_err(|_| ValidationError::InvalidAddress {
                address: self.0.clone(),
            })?;
        decoded
            .try_into()
            .map_err(|_| ValidationError::InvalidAddress {
                address: self.0.clone(),
            })
    }

    /// Check the address decodes to exactly 32 bytes
    pub fn is_valid(&self) -> bool {
        self.to_bytes().is_ok()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&TokenId> for Address {
    fn from(id: &TokenId) -> Self {
        id.to_address()
    }
}

/// Confirmation level requested from the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved token: identity plus decimal precision.
///
/// Decimals are part of the descriptor so that no conversion can happen
/// against a token whose precision is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDescriptor {
    pub token_id: TokenId,
    pub decimals: u8,
    pub symbol: String,
}

impl TokenDescriptor {
    pub fn new(token_id: impl Into<String>, decimals: u8, symbol: impl Into<String>) -> Self {
        Self {
            token_id: TokenId::new(token_id),
            decimals,
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for TokenDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.token_id)
    }
}

/// Input/output token pair of a conversion or swap
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub input: TokenDescriptor,
    pub output: TokenDescriptor,
}

impl TokenPair {
    pub fn new(input: TokenDescriptor, output: TokenDescriptor) -> Self {
        Self { input, output }
    }

    /// Identity key used to detect pair switches
    pub fn key(&self) -> String {
        format!("{}-{}", self.input.token_id, self.output.token_id)
    }

    /// Same pair with sides swapped
    pub fn flipped(&self) -> Self {
        Self {
            input: self.output.clone(),
            output: self.input.clone(),
        }
    }
}

/// Unix timestamp in whole seconds
pub type UnixTimestamp = i64;

/// Raw token amount in the smallest unit
pub type RawAmount = u64;

/// Constants
pub mod constants {
    /// wAUDIO mint, the reserve currency of the bonding-curve venues
    pub const RESERVE_MINT: &str = "9LzCMqDgTKYz9Drzqnpgee3SGa89up3a247ypMj2xrqM";

    /// wAUDIO decimals
    pub const RESERVE_DECIMALS: u8 = 8;

    /// wAUDIO symbol
    pub const RESERVE_SYMBOL: &str = "AUDIO";

    /// Decimals of every launched project token
    pub const PROJECT_TOKEN_DECIMALS: u8 = 9;

    /// Default slippage tolerance (2%)
    pub const DEFAULT_SLIPPAGE_BPS: u16 = 200;

    /// Basis points in 100%
    pub const BPS_DENOMINATOR: u64 = 10_000;
}
