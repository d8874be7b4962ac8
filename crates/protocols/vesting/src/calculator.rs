//! Vesting Calculator
//!
//! Pure claim math. No async, no collaborators.
//!
//! Nothing unlocks before the cliff. At the cliff the cliff amount unlocks,
//! then one `amount_per_period` per completed period counted from
//! `max(vesting_start_time, cliff_time)`, up to `number_of_periods`.

use coin_core::{Percent, RawAmount, UnixTimestamp};

use crate::constants::{PERCENT_DENOM, SECONDS_PER_HOUR};
use crate::state::{ClaimResult, VestingError, VestingSchedule};

/// Everything the schedule will ever release
pub fn total_amount(schedule: &VestingSchedule) -> Result<RawAmount, VestingError> {
    schedule
        .amount_per_period
        .checked_mul(schedule.number_of_periods)
        .and_then(|periodic| periodic.checked_add(schedule.cliff_unlock_amount))
        .ok_or(VestingError::ScheduleOverflow)
}

/// Point periods are counted from
fn accrual_anchor(schedule: &VestingSchedule) -> UnixTimestamp {
    schedule.vesting_start_time.max(schedule.cliff_time)
}

/// Completed periods at `now`, clamped to the schedule. Zero frequency
/// never accrues.
pub fn periods_elapsed(schedule: &VestingSchedule, now: UnixTimestamp) -> u64 {
    if schedule.frequency == 0 || now < schedule.cliff_time {
        return 0;
    }
    let since = i128::from(now) - i128::from(accrual_anchor(schedule));
    if since <= 0 {
        return 0;
    }
    let periods = since / i128::from(schedule.frequency);
    u64::try_from(periods)
        .unwrap_or(u64::MAX)
        .min(schedule.number_of_periods)
}

/// Amount unlocked at `now`, claimed or not
pub fn unlocked_amount(
    schedule: &VestingSchedule,
    now: UnixTimestamp,
) -> Result<RawAmount, VestingError> {
    // Validates the whole schedule fits before any partial sum
    total_amount(schedule)?;
    if now < schedule.cliff_time {
        return Ok(0);
    }
    let periodic = schedule.amount_per_period * periods_elapsed(schedule, now);
    Ok(schedule.cliff_unlock_amount + periodic)
}

/// When the next unlock happens, if any
pub fn next_unlock_time(schedule: &VestingSchedule, now: UnixTimestamp) -> Option<UnixTimestamp> {
    if now < schedule.cliff_time {
        return Some(schedule.cliff_time);
    }
    if schedule.frequency == 0 {
        return None;
    }
    let elapsed = periods_elapsed(schedule, now);
    if elapsed >= schedule.number_of_periods {
        return None;
    }
    let offset = (i128::from(elapsed) + 1) * i128::from(schedule.frequency);
    UnixTimestamp::try_from(i128::from(accrual_anchor(schedule)) + offset).ok()
}

/// Split `available` into (claimant, pool). The pool takes the remainder,
/// so the two always sum to `available`.
pub fn split_claim(available: RawAmount, pool_percent: Percent) -> (RawAmount, RawAmount) {
    let claimant = u128::from(available) * u128::from(pool_percent.complement().value())
        / PERCENT_DENOM;
    // claimant <= available, so the cast is lossless
    let claimant = claimant as RawAmount;
    let pool = available - claimant;
    assert_eq!(claimant + pool, available, "claim split does not add up");
    (claimant, pool)
}

/// Compute what `schedule` allows at `now`
pub fn compute_claim(
    schedule: &VestingSchedule,
    now: UnixTimestamp,
    pool_percent: Percent,
) -> Result<ClaimResult, VestingError> {
    let total = total_amount(schedule)?;
    let unlocked = unlocked_amount(schedule, now)?;
    let claimed = schedule.total_claimed_amount;
    let available = unlocked.saturating_sub(claimed);
    let (claimant_share, pool_share) = split_claim(available, pool_percent);

    let next_unlock_time = if available == 0 {
        next_unlock_time(schedule, now)
    } else {
        None
    };

    Ok(ClaimResult {
        total_amount: total,
        claimed_amount: claimed,
        available_amount: available,
        claimant_share,
        pool_share,
        remaining_locked: total.saturating_sub(unlocked.max(claimed)),
        next_unlock_time,
    })
}

/// Human-readable explanation for a claim with nothing available
pub fn nothing_to_claim_message(claim: &ClaimResult, now: UnixTimestamp) -> String {
    match claim.next_unlock_time {
        Some(next) if next > now => {
            let secs = i128::from(next) - i128::from(now);
            let hour = i128::from(SECONDS_PER_HOUR);
            // Hundredths of an hour, rounded half up
            let centi = (secs * 200 + hour) / (2 * hour);
            format!(
                "No tokens are currently available to claim. Next unlock in {}.{:02} hours.",
                centi / 100,
                centi % 100
            )
        }
        _ if claim.remaining_locked == 0 => {
            "All vesting periods completed and everything has been claimed.".to_string()
        }
        _ => "No tokens are currently available to claim.".to_string(),
    }
}
