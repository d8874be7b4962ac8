//! Vesting Claims
//!
//! Computes how much of an escrowed vesting schedule is claimable and builds
//! the claim transaction that releases it, splitting the claim between the
//! claimant and a shared reward pool.

pub mod calculator;
pub mod constants;
pub mod fetch;
pub mod state;
pub mod tx_builder;

pub use calculator::{compute_claim, next_unlock_time, split_claim, total_amount};
pub use fetch::{
    fetch_schedule, resolve_pool_account, ReleaseBuilder, ReleaseTransaction,
    RewardPoolResolver, ScheduleStore,
};
pub use state::{ClaimOutcome, ClaimRequest, ClaimResult, VestingError, VestingSchedule};
pub use tx_builder::{execute_claim, ClaimServices};
