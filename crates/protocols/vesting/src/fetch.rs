//! Schedule, reward pool and release lookups

use std::time::Duration;

use async_trait::async_trait;
use coin_client::{timed, Result};
use coin_core::{Address, ClientError, RawAmount, TokenId};
use coin_tx::Message;

use crate::state::{VestingError, VestingSchedule};

/// Durable storage of vesting escrows
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// `ClientError::NotFound` when `owner` has no schedule for `mint`
    async fn get_vesting_schedule(&self, mint: &TokenId, owner: &Address)
        -> Result<VestingSchedule>;
}

/// Resolves the reward pool's token account for a mint
#[async_trait]
pub trait RewardPoolResolver: Send + Sync {
    async fn get_pool_address(&self, mint: &TokenId) -> Result<Address>;
}

/// Escrow release, as produced by the locking program's client
#[derive(Debug, Clone)]
pub struct ReleaseTransaction {
    pub message: Message,
    /// Owner's token account the released tokens land in
    pub destination_token_account: Address,
}

#[async_trait]
pub trait ReleaseBuilder: Send + Sync {
    /// Release at most `max_amount` from the schedule's escrow to `owner`
    async fn build_release(
        &self,
        schedule: &VestingSchedule,
        owner: &Address,
        max_amount: RawAmount,
    ) -> Result<ReleaseTransaction>;
}

/// Fetch the owner's schedule for `mint`
pub async fn fetch_schedule(
    store: &dyn ScheduleStore,
    mint: &TokenId,
    owner: &Address,
    timeout: Duration,
) -> std::result::Result<VestingSchedule, VestingError> {
    match timed(timeout, store.get_vesting_schedule(mint, owner)).await {
        Ok(schedule) => {
            tracing::debug!(
                "Schedule for {}: escrow={} start={} cliff={} frequency={} periods={} claimed={}",
                mint,
                schedule.escrow,
                schedule.vesting_start_time,
                schedule.cliff_time,
                schedule.frequency,
                schedule.number_of_periods,
                schedule.total_claimed_amount
            );
            Ok(schedule)
        }
        Err(ClientError::NotFound { .. }) => Err(VestingError::ScheduleNotFound {
            mint: mint.to_string(),
            owner: owner.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Resolve the reward pool token account for `mint`
pub async fn resolve_pool_account(
    resolver: &dyn RewardPoolResolver,
    mint: &TokenId,
    timeout: Duration,
) -> std::result::Result<Address, VestingError> {
    match timed(timeout, resolver.get_pool_address(mint)).await {
        Ok(address) => {
            tracing::debug!("Reward pool account for {}: {}", mint, address);
            Ok(address)
        }
        Err(ClientError::NotFound { .. }) => Err(VestingError::PoolAddressNotFound {
            mint: mint.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}
