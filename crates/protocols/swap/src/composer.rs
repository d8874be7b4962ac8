//! Transaction composition
//!
//! Turns a validated swap request into signable transactions: quotes each
//! leg, has the builder service produce the leg's transaction and, for two
//! curve legs, merges both into one message.

use std::sync::Arc;
use std::time::Duration;

use coin_client::{
    timed, Broadcaster, Quote, QuoteRequest, QuoteService, Signer, SubmitVia,
    TransactionBuilderService, Venue,
};
use coin_core::{Address, ClientError, Commitment, EngineConfig, RawAmount};
use coin_tx::{Message, UnsignedTransaction};

use crate::constants::programs::POOL_PROGRAM_IDS;
use crate::progress::{LegProgress, SwapProgress};
use crate::route::{classify, plan_legs, submit_via_for, LegPlan, RouteContext, SwapRoute};
use crate::state::{SwapError, SwapRequest};

/// External collaborators a swap needs
#[derive(Clone)]
pub struct SwapServices {
    pub aggregator_quotes: Arc<dyn QuoteService>,
    pub bonding_curve_quotes: Arc<dyn QuoteService>,
    pub builder: Arc<dyn TransactionBuilderService>,
    pub signer: Arc<dyn Signer>,
    pub broadcaster: Arc<dyn Broadcaster>,
}

impl SwapServices {
    fn quotes_for(&self, venue: Venue) -> &dyn QuoteService {
        match venue {
            Venue::Aggregator => self.aggregator_quotes.as_ref(),
            Venue::BondingCurve => self.bonding_curve_quotes.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapSettings {
    pub slippage_bps: u16,
    pub commitment: Commitment,
    pub request_timeout: Duration,
    pub confirm_timeout: Duration,
}

impl From<&EngineConfig> for SwapSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            slippage_bps: config.slippage_bps,
            commitment: config.commitment,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            confirm_timeout: Duration::from_secs(config.confirm_timeout_secs),
        }
    }
}

impl Default for SwapSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// One signable transaction and the legs it carries
#[derive(Debug, Clone)]
pub struct PlannedTransaction {
    pub legs: Vec<usize>,
    pub submit_via: SubmitVia,
    pub transaction: UnsignedTransaction,
}

/// Everything needed to submit a swap
#[derive(Debug, Clone)]
pub struct ComposedTransaction {
    pub route: SwapRoute,
    pub plans: Vec<LegPlan>,
    /// Transactions ready now, in submission order
    pub transactions: Vec<PlannedTransaction>,
    pub input_amount: RawAmount,
    /// Quoted output of the last quoted leg
    pub expected_output: RawAmount,
    /// Slippage-protected minimum of the last quoted leg
    pub minimum_output: RawAmount,
    /// Signer's reserve balance before anything was sent, for routes whose
    /// second leg is sized by what the first actually delivered
    pub reserve_balance_before: Option<RawAmount>,
    pub progress: SwapProgress,
}

impl ComposedTransaction {
    /// The leg that can only be quoted after the first transaction confirms
    pub fn deferred_leg(&self) -> Option<&LegPlan> {
        match self.route {
            SwapRoute::MixedAggregatorAndBondingCurve => self.plans.get(1),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct SwapComposer {
    services: SwapServices,
    context: RouteContext,
    settings: SwapSettings,
}

impl SwapComposer {
    pub fn new(services: SwapServices, context: RouteContext, settings: SwapSettings) -> Self {
        Self {
            services,
            context,
            settings,
        }
    }

    pub fn services(&self) -> &SwapServices {
        &self.services
    }

    pub fn context(&self) -> &RouteContext {
        &self.context
    }

    pub fn settings(&self) -> &SwapSettings {
        &self.settings
    }

    /// Quote one leg, recording the result on `progress`
    pub async fn quote_leg(
        &self,
        plan: &LegPlan,
        amount: RawAmount,
        progress: &mut LegProgress,
    ) -> Result<Quote, ClientError> {
        let request = QuoteRequest {
            venue: plan.venue,
            input_mint: plan.input.token_id.clone(),
            output_mint: plan.output.token_id.clone(),
            amount,
            slippage_bps: self.settings.slippage_bps,
        };
        tracing::debug!(
            "Requesting {} quote {} {} -> {}",
            plan.venue,
            amount,
            plan.input.symbol,
            plan.output.symbol
        );

        let quotes = self.services.quotes_for(plan.venue);
        match timed(self.settings.request_timeout, quotes.get_quote(&request)).await {
            Ok(quote) => {
                tracing::info!(
                    "{} quote: {} {} -> {} {} (min {})",
                    plan.venue,
                    quote.in_amount,
                    plan.input.symbol,
                    quote.out_amount,
                    plan.output.symbol,
                    quote.min_out_amount
                );
                progress.quote_received(quote.out_amount);
                Ok(quote)
            }
            Err(e) => {
                progress.fail(e.to_string());
                Err(e)
            }
        }
    }

    /// Have the builder service produce the leg's transaction. Progress is
    /// left for the caller to advance once every leg of the transaction is
    /// built.
    ///
    /// Aggregator legs are usually v0 messages with lookup tables; they are
    /// decoded and signed as they are. Only curve legs are ever merged.
    pub async fn build_leg(
        &self,
        quote: &Quote,
        user: &Address,
    ) -> Result<UnsignedTransaction, ClientError> {
        let bytes = timed(
            self.settings.request_timeout,
            self.services.builder.build_swap_transaction(quote, user),
        )
        .await?;
        let transaction = UnsignedTransaction::from_bytes(&bytes).map_err(|e| {
            ClientError::BuildFailed {
                message: e.to_string(),
            }
        })?;
        if quote.venue == Venue::BondingCurve {
            ensure_pool_instruction(&transaction.message)?;
        }
        Ok(transaction)
    }

    /// Quote and build every leg that can be composed up front
    pub async fn compose(
        &self,
        request: &SwapRequest,
        user: &Address,
    ) -> Result<ComposedTransaction, SwapError> {
        request.validate().map_err(SwapError::validation)?;

        let route = classify(
            &request.pair.input.token_id,
            &request.pair.output.token_id,
            &self.context,
        );
        let plans = plan_legs(route, &request.pair, &self.context);
        let mut progress = SwapProgress::new(route, plans.iter().map(|p| p.venue));
        tracing::info!(
            "Composing {} swap of {} {} -> {}",
            route,
            request.amount,
            request.pair.input.symbol,
            request.pair.output.symbol
        );

        let composed = match route {
            SwapRoute::DirectBondingCurve | SwapRoute::AggregatorOnly => {
                self.compose_single(&plans, request.amount, user, &mut progress)
                    .await
            }
            SwapRoute::CombinedBondingCurve => {
                self.compose_combined(&plans, request.amount, user, &mut progress)
                    .await
            }
            SwapRoute::MixedAggregatorAndBondingCurve => {
                self.compose_mixed_first_leg(&plans, request.amount, user, &mut progress)
                    .await
            }
        };

        match composed {
            Ok(parts) => Ok(ComposedTransaction {
                route,
                plans,
                transactions: parts.transactions,
                input_amount: request.amount,
                expected_output: parts.expected_output,
                minimum_output: parts.minimum_output,
                reserve_balance_before: parts.reserve_balance_before,
                progress,
            }),
            Err(e) => Err(SwapError::from_progress(progress, &e, None)),
        }
    }

    async fn compose_single(
        &self,
        plans: &[LegPlan],
        amount: RawAmount,
        user: &Address,
        progress: &mut SwapProgress,
    ) -> Result<ComposedParts, ClientError> {
        let quote = self.quote_leg(&plans[0], amount, progress.leg_mut(0)).await?;
        let transaction = self
            .build_leg(&quote, user)
            .await
            .map_err(|e| fail_legs(progress, &[0], e))?;
        progress.leg_mut(0).built();

        Ok(ComposedParts {
            transactions: vec![PlannedTransaction {
                legs: vec![0],
                submit_via: submit_via_for(&plans[..1]),
                transaction,
            }],
            expected_output: quote.out_amount,
            minimum_output: quote.min_out_amount,
            reserve_balance_before: None,
        })
    }

    /// Two curve legs in one message. The second leg spends the first leg's
    /// slippage-protected minimum, so it can never spend more reserve than
    /// the first is guaranteed to deliver.
    async fn compose_combined(
        &self,
        plans: &[LegPlan],
        amount: RawAmount,
        user: &Address,
        progress: &mut SwapProgress,
    ) -> Result<ComposedParts, ClientError> {
        let first = self.quote_leg(&plans[0], amount, progress.leg_mut(0)).await?;
        let second = self
            .quote_leg(&plans[1], first.min_out_amount, progress.leg_mut(1))
            .await?;

        let first_tx = self
            .build_leg(&first, user)
            .await
            .map_err(|e| fail_legs(progress, &[0, 1], e))?;
        let second_tx = self
            .build_leg(&second, user)
            .await
            .map_err(|e| fail_legs(progress, &[0, 1], e))?;

        let blockhash = timed(
            self.settings.request_timeout,
            self.services.broadcaster.latest_blockhash(),
        )
        .await
        .map_err(|e| fail_legs(progress, &[0, 1], e))?;

        let merged = Message::merge(&[first_tx.message, second_tx.message], user, blockhash)
            .map_err(|e| {
                fail_legs(
                    progress,
                    &[0, 1],
                    ClientError::BuildFailed {
                        message: e.to_string(),
                    },
                )
            })?;
        tracing::debug!(
            "Merged curve legs into one message with {} instructions",
            merged.instructions.len()
        );

        progress.leg_mut(0).built();
        progress.leg_mut(1).built();

        Ok(ComposedParts {
            transactions: vec![PlannedTransaction {
                legs: vec![0, 1],
                submit_via: submit_via_for(plans),
                transaction: UnsignedTransaction::new(merged),
            }],
            expected_output: second.out_amount,
            minimum_output: second.min_out_amount,
            reserve_balance_before: None,
        })
    }

    async fn compose_mixed_first_leg(
        &self,
        plans: &[LegPlan],
        amount: RawAmount,
        user: &Address,
        progress: &mut SwapProgress,
    ) -> Result<ComposedParts, ClientError> {
        let reserve = &self.context.reserve.token_id;
        let before = timed(
            self.settings.request_timeout,
            self.services
                .broadcaster
                .token_balance(user, reserve, self.settings.commitment),
        )
        .await
        .map_err(|e| fail_legs(progress, &[0], e))?;

        let mut parts = self.compose_single(plans, amount, user, progress).await?;
        parts.reserve_balance_before = Some(before);
        Ok(parts)
    }
}

struct ComposedParts {
    transactions: Vec<PlannedTransaction>,
    expected_output: RawAmount,
    minimum_output: RawAmount,
    reserve_balance_before: Option<RawAmount>,
}

/// Mark `legs` failed and hand the error back
pub(crate) fn fail_legs(progress: &mut SwapProgress, legs: &[usize], err: ClientError) -> ClientError {
    for &index in legs {
        progress.leg_mut(index).fail(err.to_string());
    }
    err
}

/// A curve leg must actually invoke a pool program
fn ensure_pool_instruction(message: &Message) -> Result<(), ClientError> {
    if POOL_PROGRAM_IDS.iter().any(|id| message.invokes(id)) {
        Ok(())
    } else {
        Err(ClientError::BuildFailed {
            message: "bonding curve swap instruction not found in transaction".to_string(),
        })
    }
}
