//! coin-client: Capabilities the engine consumes from the outside world
//!
//! Quote venues, the transaction builder, the wallet and the cluster are all
//! reached through the async traits in this crate. The engine never talks to
//! a network directly, which keeps every collaborator swappable in tests.

pub mod confirm;
pub mod quote;

use std::time::Duration;

use async_trait::async_trait;
use coin_core::{Address, Blockhash, ClientError, Commitment, RawAmount, TokenId, TxSignature};
use coin_tx::{SignedTransaction, UnsignedTransaction};
use serde::{Deserialize, Serialize};

pub use confirm::confirm_signature;
pub use quote::{Quote, QuoteRequest, Venue};

/// Default timeout for collaborator calls (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Result type for collaborator calls
pub type Result<T> = std::result::Result<T, ClientError>;

/// How a signed transaction reaches the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitVia {
    /// Through the relay that co-signs bonding-curve transactions
    Relay,
    /// Straight to the cluster
    Direct,
}

/// Outcome of waiting on a sent transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Confirmation {
    Confirmed,
    Failed { reason: String },
    Timeout,
}

/// Price quotes from a venue
#[async_trait]
pub trait QuoteService: Send + Sync {
    /// `ClientError::QuoteUnavailable` when the venue has no route
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote>;
}

/// Turns a quote into a serialized unsigned transaction
#[async_trait]
pub trait TransactionBuilderService: Send + Sync {
    /// Legacy or v0 wire bytes of an unsigned transaction paid for by `user`
    async fn build_swap_transaction(&self, quote: &Quote, user: &Address) -> Result<Vec<u8>>;
}

/// The user's wallet
#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> Address;

    /// `ClientError::UserRejected` when the user declines
    async fn sign(&self, transaction: &UnsignedTransaction) -> Result<SignedTransaction>;
}

/// Cluster access: blockhashes, submission, confirmation and balances
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn latest_blockhash(&self) -> Result<Blockhash>;

    async fn send(&self, transaction: &SignedTransaction, via: SubmitVia) -> Result<TxSignature>;

    async fn confirm(&self, signature: &TxSignature, commitment: Commitment)
        -> Result<Confirmation>;

    /// Raw balance of `mint` held by `owner`; zero when no token account exists
    async fn token_balance(
        &self,
        owner: &Address,
        mint: &TokenId,
        commitment: Commitment,
    ) -> Result<RawAmount>;
}

/// Run a collaborator call with a timeout
pub async fn timed<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| ClientError::Timeout {
            secs: timeout.as_secs(),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timed_passes_result_through() {
        let ok = timed(DEFAULT_REQUEST_TIMEOUT, async { Ok(7u64) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<u64> = timed(DEFAULT_REQUEST_TIMEOUT, async {
            Err(ClientError::UserRejected)
        })
        .await;
        assert_eq!(err.unwrap_err(), ClientError::UserRejected);
    }

    #[tokio::test]
    async fn test_timed_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        };
        let err = timed(Duration::from_millis(10), slow).await.unwrap_err();
        assert_eq!(err, ClientError::Timeout { secs: 0 });
    }

    #[test]
    fn test_confirmation_serialization() {
        let json = serde_json::to_string(&Confirmation::Failed {
            reason: "slippage".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"failed","reason":"slippage"}"#);
    }
}
