//! Claim transaction building
//!
//! The escrow release lands the whole available amount in the owner's token
//! account; transfer instructions appended to the same message then move the
//! claimant share to the receiver and the pool share to the reward pool.

use std::sync::Arc;
use std::time::Duration;

use coin_client::{timed, DEFAULT_REQUEST_TIMEOUT};
use coin_core::{Percent, UnixTimestamp};
use coin_tx::{transfer_checked, UnsignedTransaction};

use crate::calculator::{compute_claim, nothing_to_claim_message};
use crate::constants::CLAIM_TOKEN_DECIMALS;
use crate::fetch::{
    fetch_schedule, resolve_pool_account, ReleaseBuilder, RewardPoolResolver, ScheduleStore,
};
use crate::state::{ClaimOutcome, ClaimRequest, VestingError};

/// External collaborators a claim needs
#[derive(Clone)]
pub struct ClaimServices {
    pub schedules: Arc<dyn ScheduleStore>,
    pub pools: Arc<dyn RewardPoolResolver>,
    pub release: Arc<dyn ReleaseBuilder>,
    pub request_timeout: Duration,
}

impl ClaimServices {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        pools: Arc<dyn RewardPoolResolver>,
        release: Arc<dyn ReleaseBuilder>,
    ) -> Self {
        Self {
            schedules,
            pools,
            release,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Build the unsigned claim transaction for `request` at `now`.
///
/// Nothing is submitted. The caller signs and sends, then re-reads the
/// schedule before claiming again.
pub async fn execute_claim(
    services: &ClaimServices,
    request: &ClaimRequest,
    now: UnixTimestamp,
) -> Result<ClaimOutcome, VestingError> {
    let pool_percent = Percent::new(request.pool_percent)?;
    tracing::info!(
        "Claim request: mint={} owner={} receiver={} pool={}",
        request.token_mint,
        request.owner,
        request.receiver,
        pool_percent
    );

    let schedule = fetch_schedule(
        services.schedules.as_ref(),
        &request.token_mint,
        &request.owner,
        services.request_timeout,
    )
    .await?;

    if schedule.recipient != request.owner {
        return Err(VestingError::NotRecipient {
            owner: request.owner.to_string(),
            escrow: schedule.escrow.to_string(),
            recipient: schedule.recipient.to_string(),
        });
    }

    let claim = compute_claim(&schedule, now, pool_percent)?;
    tracing::info!(
        "Vesting: total={} claimed={} available={} claimant={} pool={}",
        claim.total_amount,
        claim.claimed_amount,
        claim.available_amount,
        claim.claimant_share,
        claim.pool_share
    );

    if !claim.has_available() {
        let message = nothing_to_claim_message(&claim, now);
        tracing::info!("{}", message);
        return Ok(ClaimOutcome::NothingToClaim { claim, message });
    }

    let pool_account = if claim.pool_share > 0 {
        Some(
            resolve_pool_account(
                services.pools.as_ref(),
                &request.token_mint,
                services.request_timeout,
            )
            .await?,
        )
    } else {
        None
    };

    let release = timed(
        services.request_timeout,
        services
            .release
            .build_release(&schedule, &request.owner, claim.available_amount),
    )
    .await?;

    let mint = request.token_mint.to_address();
    let source = &release.destination_token_account;
    let mut transfers = Vec::with_capacity(2);
    if claim.claimant_share > 0 {
        transfers.push(transfer_checked(
            source,
            &mint,
            &request.receiver,
            &request.owner,
            claim.claimant_share,
            CLAIM_TOKEN_DECIMALS,
        ));
    }
    if let Some(pool) = &pool_account {
        transfers.push(transfer_checked(
            source,
            &mint,
            pool,
            &request.owner,
            claim.pool_share,
            CLAIM_TOKEN_DECIMALS,
        ));
    }

    let message = release
        .message
        .append_instructions(transfers, &request.owner)?;
    tracing::info!(
        "Claim transaction ready: {} instructions, remaining locked {}",
        message.instructions.len(),
        claim.remaining_locked
    );

    Ok(ClaimOutcome::Ready {
        transaction: UnsignedTransaction::new(message),
        claim,
    })
}
