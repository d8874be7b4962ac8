//! Token Swap Engine
//!
//! Swaps between arbitrary tokens, project tokens trading only against the
//! reserve currency on bonding curves and everything else through an
//! external aggregator.
//!
//! - Live input/output calculation with pair-change replay
//! - Route selection over four routes
//! - Transaction composition, including merging two curve legs into one
//!   message
//! - Execution with per-leg progress, cancellation and a resume record for
//!   interrupted two-transaction routes

pub mod calculation;
pub mod composer;
pub mod constants;
pub mod executor;
pub mod progress;
pub mod recovery;
pub mod route;
pub mod state;

#[cfg(test)]
mod testing;

// Re-exports
pub use calculation::{
    compute_swap, CalcEffect, CalcEvent, CalculationSource, CalculationState, PreservedAmounts,
    SwapCalculator, SwapComputation, Transition,
};
pub use composer::{
    ComposedTransaction, PlannedTransaction, SwapComposer, SwapServices, SwapSettings,
};
pub use constants::{programs, stages};
pub use executor::{CancelFlag, SwapExecutor};
pub use progress::{LegProgress, LegStage, SwapProgress};
pub use recovery::{PendingSecondLeg, UnconfirmedFirstLeg};
pub use route::{classify, plan_legs, LegPlan, RouteContext, SwapRoute, TokenClass};
pub use state::{SwapError, SwapFailureKind, SwapOutcome, SwapRequest};
