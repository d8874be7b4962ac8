//! Vesting state types

use coin_core::{
    Address, ClientError, RawAmount, TokenId, TxError, UnixTimestamp, ValidationError,
};
use coin_tx::UnsignedTransaction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Escrowed vesting schedule, as stored on chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VestingSchedule {
    /// Escrow account holding the locked tokens
    pub escrow: Address,
    /// Wallet allowed to release from the escrow
    pub recipient: Address,
    pub vesting_start_time: UnixTimestamp,
    pub cliff_time: UnixTimestamp,
    /// Period length in seconds; zero disables periodic accrual
    pub frequency: u64,
    pub amount_per_period: RawAmount,
    pub number_of_periods: u64,
    pub cliff_unlock_amount: RawAmount,
    pub total_claimed_amount: RawAmount,
}

/// What a schedule allows right now. Computed per call, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResult {
    pub total_amount: RawAmount,
    pub claimed_amount: RawAmount,
    pub available_amount: RawAmount,
    pub claimant_share: RawAmount,
    pub pool_share: RawAmount,
    pub remaining_locked: RawAmount,
    /// Only reported when nothing is available
    pub next_unlock_time: Option<UnixTimestamp>,
}

impl ClaimResult {
    pub fn has_available(&self) -> bool {
        self.available_amount > 0
    }
}

/// A claim against the schedule of `token_mint` owned by `owner`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub token_mint: TokenId,
    /// Escrow recipient; signs and pays for the claim
    pub owner: Address,
    /// Token account receiving the claimant share
    pub receiver: Address,
    /// Share routed to the reward pool, validated to `[0, 100]` on use
    #[serde(default)]
    pub pool_percent: i64,
}

impl ClaimRequest {
    pub fn new(token_mint: TokenId, owner: Address, receiver: Address) -> Self {
        Self {
            token_mint,
            owner,
            receiver,
            pool_percent: 0,
        }
    }

    pub fn with_pool_percent(mut self, percent: i64) -> Self {
        self.pool_percent = percent;
        self
    }
}

#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    /// Unsigned claim transaction, fee paid by the owner
    Ready {
        transaction: UnsignedTransaction,
        claim: ClaimResult,
    },
    NothingToClaim { claim: ClaimResult, message: String },
}

impl ClaimOutcome {
    pub fn claim(&self) -> &ClaimResult {
        match self {
            Self::Ready { claim, .. } | Self::NothingToClaim { claim, .. } => claim,
        }
    }
}

#[derive(Debug, Error)]
pub enum VestingError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("No vesting schedule for {mint} owned by {owner}")]
    ScheduleNotFound { mint: String, owner: String },

    #[error("No reward pool token account for {mint}")]
    PoolAddressNotFound { mint: String },

    #[error("{owner} is not the recipient of escrow {escrow} (recipient: {recipient})")]
    NotRecipient {
        owner: String,
        escrow: String,
        recipient: String,
    },

    #[error("Vesting schedule amounts overflow")]
    ScheduleOverflow,

    #[error("Collaborator error: {0}")]
    Client(#[from] ClientError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TxError),
}

impl VestingError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::ScheduleNotFound { .. } => "schedule_not_found",
            Self::PoolAddressNotFound { .. } => "pool_address_not_found",
            Self::NotRecipient { .. } => "not_recipient",
            Self::ScheduleOverflow => "schedule_overflow",
            Self::Client(e) => e.error_code(),
            Self::Transaction(_) => "transaction_error",
        }
    }
}
