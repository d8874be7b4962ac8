//! Per-attempt swap progress
//!
//! Each transaction leg walks `NotStarted -> QuoteReceived -> TransactionBuilt
//! -> Signed -> Sent -> Confirmed`, one step at a time. A leg may leave the
//! happy path only into `UserCancelled` or `Failed`, and remembers the stage
//! it had reached so failures can be attributed.

use coin_client::Venue;
use coin_core::{RawAmount, TxSignature};
use serde::{Deserialize, Serialize};

use crate::route::SwapRoute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegStage {
    NotStarted,
    QuoteReceived,
    TransactionBuilt,
    Signed,
    Sent,
    Confirmed,
    UserCancelled,
    Failed,
}

impl LegStage {
    /// The one stage that may follow this one on the happy path
    pub fn next(&self) -> Option<LegStage> {
        match self {
            Self::NotStarted => Some(Self::QuoteReceived),
            Self::QuoteReceived => Some(Self::TransactionBuilt),
            Self::TransactionBuilt => Some(Self::Signed),
            Self::Signed => Some(Self::Sent),
            Self::Sent => Some(Self::Confirmed),
            Self::Confirmed | Self::UserCancelled | Self::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegProgress {
    venue: Venue,
    stage: LegStage,
    /// Last happy-path stage reached before cancellation or failure
    stopped_at: Option<LegStage>,
    quoted_output: Option<RawAmount>,
    signature: Option<TxSignature>,
    error: Option<String>,
}

impl LegProgress {
    pub fn new(venue: Venue) -> Self {
        Self {
            venue,
            stage: LegStage::NotStarted,
            stopped_at: None,
            quoted_output: None,
            signature: None,
            error: None,
        }
    }

    pub fn venue(&self) -> Venue {
        self.venue
    }

    pub fn stage(&self) -> LegStage {
        self.stage
    }

    pub fn stopped_at(&self) -> Option<LegStage> {
        self.stopped_at
    }

    pub fn quoted_output(&self) -> Option<RawAmount> {
        self.quoted_output
    }

    pub fn signature(&self) -> Option<&TxSignature> {
        self.signature.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_confirmed(&self) -> bool {
        self.stage == LegStage::Confirmed
    }

    /// Sent but not known to be confirmed
    pub fn is_in_flight(&self) -> bool {
        self.signature.is_some() && !self.is_confirmed()
    }

    pub(crate) fn advance(&mut self, next: LegStage) {
        assert_eq!(
            self.stage.next(),
            Some(next),
            "illegal leg transition {:?} -> {:?}",
            self.stage,
            next
        );
        self.stage = next;
    }

    pub(crate) fn quote_received(&mut self, quoted_output: RawAmount) {
        self.advance(LegStage::QuoteReceived);
        self.quoted_output = Some(quoted_output);
    }

    pub(crate) fn built(&mut self) {
        self.advance(LegStage::TransactionBuilt);
    }

    pub(crate) fn signed(&mut self) {
        self.advance(LegStage::Signed);
    }

    pub(crate) fn sent(&mut self, signature: TxSignature) {
        self.advance(LegStage::Sent);
        self.signature = Some(signature);
    }

    pub(crate) fn confirmed(&mut self) {
        self.advance(LegStage::Confirmed);
        self.error = None;
    }

    /// Leave the happy path. A terminal leg stays as it is.
    fn stop(&mut self, stage: LegStage, error: Option<String>) {
        if self.stage.is_terminal() {
            return;
        }
        self.stopped_at = Some(self.stage);
        self.stage = stage;
        self.error = error;
    }

    pub(crate) fn fail(&mut self, error: impl Into<String>) {
        self.stop(LegStage::Failed, Some(error.into()));
    }

    pub(crate) fn cancel(&mut self) {
        self.stop(LegStage::UserCancelled, None);
    }

    /// A leg whose confirmation timed out may still land; re-checking can
    /// bring it back to `Sent` so a later confirmation is recorded
    pub(crate) fn reopen_sent(&mut self) {
        if self.stage == LegStage::Failed
            && self.stopped_at == Some(LegStage::Sent)
            && self.signature.is_some()
        {
            self.stage = LegStage::Sent;
            self.stopped_at = None;
            self.error = None;
        }
    }
}

/// Progress of one swap attempt. Never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapProgress {
    route: SwapRoute,
    legs: Vec<LegProgress>,
}

impl SwapProgress {
    pub fn new(route: SwapRoute, venues: impl IntoIterator<Item = Venue>) -> Self {
        Self {
            route,
            legs: venues.into_iter().map(LegProgress::new).collect(),
        }
    }

    pub fn route(&self) -> SwapRoute {
        self.route
    }

    pub fn legs(&self) -> &[LegProgress] {
        &self.legs
    }

    pub(crate) fn leg_mut(&mut self, index: usize) -> &mut LegProgress {
        &mut self.legs[index]
    }

    pub fn is_complete(&self) -> bool {
        self.legs.iter().all(LegProgress::is_confirmed)
    }

    /// Signatures of every leg that reached the cluster
    pub fn signatures(&self) -> Vec<TxSignature> {
        let mut signatures: Vec<TxSignature> = Vec::new();
        for sig in self.legs.iter().filter_map(|leg| leg.signature.clone()) {
            if !signatures.contains(&sig) {
                signatures.push(sig);
            }
        }
        signatures
    }

    /// First leg that left the happy path, with its index
    pub fn first_stopped(&self) -> Option<(usize, &LegProgress)> {
        self.legs
            .iter()
            .enumerate()
            .find(|(_, leg)| matches!(leg.stage, LegStage::Failed | LegStage::UserCancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut leg = LegProgress::new(Venue::Aggregator);
        leg.quote_received(100);
        leg.built();
        leg.signed();
        leg.sent(TxSignature::new("sig"));
        assert!(leg.is_in_flight());
        leg.confirmed();

        assert!(leg.is_confirmed());
        assert!(!leg.is_in_flight());
        assert_eq!(leg.quoted_output(), Some(100));
        assert_eq!(leg.signature().unwrap().as_str(), "sig");
    }

    #[test]
    #[should_panic(expected = "illegal leg transition")]
    fn test_skipping_a_stage_panics() {
        let mut leg = LegProgress::new(Venue::Aggregator);
        leg.quote_received(1);
        leg.signed();
    }

    #[test]
    fn test_failure_records_reached_stage() {
        let mut leg = LegProgress::new(Venue::BondingCurve);
        leg.quote_received(1);
        leg.fail("builder down");

        assert_eq!(leg.stage(), LegStage::Failed);
        assert_eq!(leg.stopped_at(), Some(LegStage::QuoteReceived));
        assert_eq!(leg.error(), Some("builder down"));

        // Terminal legs do not move again
        leg.cancel();
        assert_eq!(leg.stage(), LegStage::Failed);
    }

    #[test]
    fn test_reopen_only_after_send() {
        let mut leg = LegProgress::new(Venue::Aggregator);
        leg.quote_received(1);
        leg.built();
        leg.signed();
        leg.sent(TxSignature::new("sig"));
        leg.fail("timeout");
        leg.reopen_sent();
        assert_eq!(leg.stage(), LegStage::Sent);
        leg.confirmed();
        assert!(leg.is_confirmed());

        let mut early = LegProgress::new(Venue::Aggregator);
        early.fail("no quote");
        early.reopen_sent();
        assert_eq!(early.stage(), LegStage::Failed);
    }

    #[test]
    fn test_swap_progress_summary() {
        let mut progress = SwapProgress::new(
            SwapRoute::MixedAggregatorAndBondingCurve,
            [Venue::Aggregator, Venue::BondingCurve],
        );
        assert!(!progress.is_complete());
        assert!(progress.first_stopped().is_none());

        progress.leg_mut(1).cancel();
        let (index, leg) = progress.first_stopped().unwrap();
        assert_eq!(index, 1);
        assert_eq!(leg.stage(), LegStage::UserCancelled);
    }

    #[test]
    fn test_shared_signature_listed_once() {
        let mut progress = SwapProgress::new(
            SwapRoute::CombinedBondingCurve,
            [Venue::BondingCurve, Venue::BondingCurve],
        );
        for i in 0..2 {
            let leg = progress.leg_mut(i);
            leg.quote_received(1);
            leg.built();
            leg.signed();
            leg.sent(TxSignature::new("merged"));
        }
        assert_eq!(progress.signatures(), vec![TxSignature::new("merged")]);
    }
}
