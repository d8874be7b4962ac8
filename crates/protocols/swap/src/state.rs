//! Swap State Types
//!
//! Requests, outcomes and the swap failure taxonomy.

use std::fmt;

use coin_core::{ClientError, RawAmount, TokenPair, TxSignature, UiAmount, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::stages;
use crate::progress::{LegStage, SwapProgress};
use crate::recovery::{PendingSecondLeg, UnconfirmedFirstLeg};
use crate::route::SwapRoute;

/// A swap to execute: exact raw input amount on a resolved pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub pair: TokenPair,
    pub amount: RawAmount,
}

impl SwapRequest {
    pub fn new(pair: TokenPair, amount: RawAmount) -> Self {
        Self { pair, amount }
    }

    /// Build from the form's input text
    pub fn from_ui(pair: TokenPair, amount: &str) -> Result<Self, ValidationError> {
        let amount = UiAmount::parse(amount, pair.input.decimals)?
            .ok_or(ValidationError::ZeroAmount)?;
        Ok(Self::new(pair, amount.raw))
    }

    /// Local checks that must pass before any collaborator is called
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pair.input.token_id == self.pair.output.token_id {
            return Err(ValidationError::SameToken {
                token: self.pair.input.token_id.to_string(),
            });
        }
        if self.amount == 0 {
            return Err(ValidationError::ZeroAmount);
        }
        Ok(())
    }
}

/// A completed swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapOutcome {
    pub route: SwapRoute,
    pub signatures: Vec<TxSignature>,
    pub input_amount: RawAmount,
    /// Quoted output of the final leg
    pub output_amount: RawAmount,
    pub progress: SwapProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapFailureKind {
    Validation,
    Quote,
    Build,
    Wallet,
    UserCancelled,
    Submission,
    /// First leg of a two-transaction route landed, the second did not
    PartialCompletion,
}

impl SwapFailureKind {
    pub fn error_stage(&self) -> &'static str {
        match self {
            Self::Validation => stages::VALIDATION,
            Self::Quote => stages::GETTING_QUOTE,
            Self::Build => stages::BUILDING_TRANSACTION,
            Self::Wallet => stages::SIGNING_TRANSACTION,
            Self::UserCancelled => stages::USER_REJECTED,
            Self::Submission => stages::SENDING_TRANSACTION,
            Self::PartialCompletion => stages::SECOND_LEG,
        }
    }
}

impl fmt::Display for SwapFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error_stage())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Swap failed at {}: {}", .kind.error_stage(), .message)]
pub struct SwapError {
    pub kind: SwapFailureKind,
    pub message: String,
    /// Snapshot of the attempt; absent for validation failures
    pub progress: Option<SwapProgress>,
    /// Resume record when the first leg of a mixed route landed
    pub pending: Option<PendingSecondLeg>,
    /// First leg of a mixed route that was sent but not seen confirmed
    pub unconfirmed: Option<UnconfirmedFirstLeg>,
}

impl SwapError {
    pub fn validation(err: ValidationError) -> Self {
        Self {
            kind: SwapFailureKind::Validation,
            message: err.to_string(),
            progress: None,
            pending: None,
            unconfirmed: None,
        }
    }

    /// Attribute a failure from where the attempt stopped
    pub fn from_progress(
        progress: SwapProgress,
        cause: &ClientError,
        pending: Option<PendingSecondLeg>,
    ) -> Self {
        let kind = attribute(&progress, cause, pending.is_some());
        tracing::warn!("Swap failed at {}: {}", kind.error_stage(), cause);
        Self {
            kind,
            message: cause.to_string(),
            progress: Some(progress),
            pending,
            unconfirmed: None,
        }
    }

    pub fn with_unconfirmed(mut self, unconfirmed: Option<UnconfirmedFirstLeg>) -> Self {
        self.unconfirmed = unconfirmed;
        self
    }

    pub fn error_stage(&self) -> &'static str {
        self.kind.error_stage()
    }

    /// Whether a fresh attempt is safe. Anything already sent must be
    /// checked with `confirm_pending` first.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            SwapFailureKind::Quote
            | SwapFailureKind::Build
            | SwapFailureKind::Wallet
            | SwapFailureKind::UserCancelled => true,
            SwapFailureKind::Submission => self
                .progress
                .as_ref()
                .map(|p| !p.legs().iter().any(|leg| leg.signature().is_some()))
                .unwrap_or(true),
            SwapFailureKind::Validation | SwapFailureKind::PartialCompletion => false,
        }
    }
}

fn attribute(progress: &SwapProgress, cause: &ClientError, partial: bool) -> SwapFailureKind {
    if partial {
        return SwapFailureKind::PartialCompletion;
    }
    let Some((_, leg)) = progress.first_stopped() else {
        return SwapFailureKind::Submission;
    };
    if leg.stage() == LegStage::UserCancelled || cause.is_user_rejection() {
        return SwapFailureKind::UserCancelled;
    }
    match leg.stopped_at() {
        Some(LegStage::NotStarted) | None => SwapFailureKind::Quote,
        Some(LegStage::QuoteReceived) => SwapFailureKind::Build,
        Some(LegStage::TransactionBuilt) => SwapFailureKind::Wallet,
        Some(_) => SwapFailureKind::Submission,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coin_client::Venue;
    use coin_core::TokenDescriptor;

    fn pair() -> TokenPair {
        TokenPair::new(
            TokenDescriptor::new("A", 6, "A"),
            TokenDescriptor::new("B", 9, "B"),
        )
    }

    fn progress_failed_at(steps: usize) -> SwapProgress {
        let mut progress = SwapProgress::new(SwapRoute::AggregatorOnly, [Venue::Aggregator]);
        let leg = progress.leg_mut(0);
        if steps > 0 {
            leg.quote_received(1);
        }
        if steps > 1 {
            leg.built();
        }
        if steps > 2 {
            leg.signed();
        }
        if steps > 3 {
            leg.sent(TxSignature::new("sig"));
        }
        leg.fail("boom");
        progress
    }

    #[test]
    fn test_request_validation() {
        assert!(SwapRequest::new(pair(), 1).validate().is_ok());
        assert_eq!(
            SwapRequest::new(pair(), 0).validate().unwrap_err(),
            ValidationError::ZeroAmount
        );

        let same = TokenPair::new(pair().input.clone(), pair().input);
        assert!(matches!(
            SwapRequest::new(same, 5).validate(),
            Err(ValidationError::SameToken { .. })
        ));
    }

    #[test]
    fn test_request_from_ui() {
        let request = SwapRequest::from_ui(pair(), "1.5").unwrap();
        assert_eq!(request.amount, 1_500_000);
        assert_eq!(
            SwapRequest::from_ui(pair(), "").unwrap_err(),
            ValidationError::ZeroAmount
        );
    }

    #[test]
    fn test_attribution_by_stage() {
        let cause = ClientError::Rpc {
            message: "x".into(),
        };
        let kinds: Vec<SwapFailureKind> = (0..5)
            .map(|steps| SwapError::from_progress(progress_failed_at(steps), &cause, None).kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                SwapFailureKind::Quote,
                SwapFailureKind::Build,
                SwapFailureKind::Wallet,
                SwapFailureKind::Submission,
                SwapFailureKind::Submission,
            ]
        );
    }

    #[test]
    fn test_user_rejection_is_cancellation() {
        let err = SwapError::from_progress(progress_failed_at(2), &ClientError::UserRejected, None);
        assert_eq!(err.kind, SwapFailureKind::UserCancelled);
        assert_eq!(err.error_stage(), "USER_REJECTED");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_sent_submission_is_not_blindly_retryable() {
        let cause = ClientError::ConfirmationTimeout {
            signature: "sig".into(),
        };
        let sent = SwapError::from_progress(progress_failed_at(4), &cause, None);
        assert!(!sent.is_retryable());

        let unsent = SwapError::from_progress(progress_failed_at(3), &cause, None);
        assert!(unsent.is_retryable());
    }

    #[test]
    fn test_display_includes_stage() {
        let err = SwapError::validation(ValidationError::ZeroAmount);
        assert_eq!(
            err.to_string(),
            "Swap failed at VALIDATION: Amount must be greater than zero"
        );
    }
}
