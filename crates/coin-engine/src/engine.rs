//! Engine facade

use std::time::Duration;

use coin_core::{
    Address, ClientError, EngineConfig, ExchangeRate, Percent, TokenId, TokenPair, UnixTimestamp,
    ValidationError,
};
use swap::{
    CancelFlag, PendingSecondLeg, RouteContext, SwapCalculator, SwapComposer, SwapComputation,
    SwapError, SwapExecutor, SwapOutcome, SwapProgress, SwapRequest, SwapRoute, SwapServices,
    SwapSettings, UnconfirmedFirstLeg,
};
use vesting::{ClaimOutcome, ClaimRequest, ClaimResult, ClaimServices, VestingError, VestingSchedule};

/// Entry point for swap calculation, swap execution and vesting claims
pub struct Engine {
    config: EngineConfig,
    executor: SwapExecutor,
    claims: ClaimServices,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        swap_services: SwapServices,
        claim_services: ClaimServices,
        project_tokens: impl IntoIterator<Item = TokenId>,
    ) -> Self {
        let context = RouteContext::new(config.reserve.clone()).with_project_tokens(project_tokens);
        let composer = SwapComposer::new(swap_services, context, SwapSettings::from(&config));
        let claims =
            claim_services.with_timeout(Duration::from_secs(config.request_timeout_secs));
        tracing::info!("Engine ready, reserve {}", config.reserve);

        Self {
            config,
            executor: SwapExecutor::new(composer),
            claims,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a newly launched project token
    pub fn add_project_token(&mut self, token: TokenId) {
        let composer = self.executor.composer();
        let mut context = composer.context().clone();
        context.add_project_token(token);
        self.executor = SwapExecutor::new(SwapComposer::new(
            composer.services().clone(),
            context,
            composer.settings().clone(),
        ));
    }

    /// Fresh form calculator on `pair`
    pub fn calculator(&self, pair: TokenPair) -> SwapCalculator {
        SwapCalculator::with_pair(pair)
    }

    /// One-shot output for `input_text` on `pair`
    pub fn compute_swap(
        &self,
        input_text: &str,
        pair: &TokenPair,
        rate: Option<ExchangeRate>,
    ) -> Result<SwapComputation, ValidationError> {
        swap::compute_swap(input_text, pair, rate)
    }

    pub fn route(&self, pair: &TokenPair) -> SwapRoute {
        swap::classify(
            &pair.input.token_id,
            &pair.output.token_id,
            self.executor.composer().context(),
        )
    }

    /// Execute `request` for `signer_address`, which must be the address of
    /// the configured wallet
    pub async fn execute_swap(
        &self,
        request: &SwapRequest,
        signer_address: &Address,
        cancel: &CancelFlag,
    ) -> Result<SwapOutcome, SwapError> {
        let wallet = self.executor.composer().services().signer.address();
        if *signer_address != wallet {
            tracing::warn!("Swap requested for {} but wallet is {}", signer_address, wallet);
            return Err(SwapError::validation(ValidationError::InvalidAddress {
                address: signer_address.to_string(),
            }));
        }
        self.executor.execute_swap(request, cancel).await
    }

    pub async fn settle_first_leg(
        &self,
        unconfirmed: &UnconfirmedFirstLeg,
    ) -> Result<Option<PendingSecondLeg>, ClientError> {
        self.executor.settle_first_leg(unconfirmed).await
    }

    pub async fn resume_second_leg(
        &self,
        pending: &PendingSecondLeg,
        cancel: &CancelFlag,
    ) -> Result<SwapOutcome, SwapError> {
        self.executor.resume_second_leg(pending, cancel).await
    }

    pub async fn confirm_pending(&self, progress: &mut SwapProgress) -> Result<bool, ClientError> {
        self.executor.confirm_pending(progress).await
    }

    /// Claim on `schedule` at `now`. `pool_percent` falls back to the
    /// configured default.
    pub fn compute_claim(
        &self,
        schedule: &VestingSchedule,
        now: UnixTimestamp,
        pool_percent: Option<i64>,
    ) -> Result<ClaimResult, VestingError> {
        let percent = match pool_percent {
            Some(p) => Percent::new(p)?,
            None => self.config.default_pool_percent,
        };
        vesting::compute_claim(schedule, now, percent)
    }

    /// Claim request carrying the configured pool share
    pub fn claim_request(&self, token_mint: TokenId, owner: Address, receiver: Address) -> ClaimRequest {
        ClaimRequest::new(token_mint, owner, receiver)
            .with_pool_percent(i64::from(self.config.default_pool_percent.value()))
    }

    pub async fn execute_claim(
        &self,
        request: &ClaimRequest,
        now: UnixTimestamp,
    ) -> Result<ClaimOutcome, VestingError> {
        vesting::execute_claim(&self.claims, request, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coin_client::{
        Broadcaster, Confirmation, Quote, QuoteRequest, QuoteService, Result, Signer, SubmitVia,
        TransactionBuilderService,
    };
    use coin_core::{Blockhash, Commitment, RawAmount, TokenDescriptor, TxSignature};
    use coin_tx::{SignedTransaction, UnsignedTransaction};
    use std::sync::Arc;
    use swap::SwapFailureKind;
    use vesting::{ReleaseBuilder, ReleaseTransaction, RewardPoolResolver, ScheduleStore};

    /// Every collaborator, all unavailable
    struct Offline;

    fn offline<T>() -> Result<T> {
        Err(ClientError::Rpc {
            message: "offline".into(),
        })
    }

    #[async_trait]
    impl QuoteService for Offline {
        async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote> {
            Err(ClientError::QuoteUnavailable {
                input: request.input_mint.to_string(),
                output: request.output_mint.to_string(),
            })
        }
    }

    #[async_trait]
    impl TransactionBuilderService for Offline {
        async fn build_swap_transaction(&self, _quote: &Quote, _user: &Address) -> Result<Vec<u8>> {
            offline()
        }
    }

    #[async_trait]
    impl Signer for Offline {
        fn address(&self) -> Address {
            Address::from_bytes(&[1u8; 32])
        }

        async fn sign(&self, _transaction: &UnsignedTransaction) -> Result<SignedTransaction> {
            Err(ClientError::UserRejected)
        }
    }

    #[async_trait]
    impl Broadcaster for Offline {
        async fn latest_blockhash(&self) -> Result<Blockhash> {
            offline()
        }

        async fn send(&self, _tx: &SignedTransaction, _via: SubmitVia) -> Result<TxSignature> {
            offline()
        }

        async fn confirm(&self, _sig: &TxSignature, _c: Commitment) -> Result<Confirmation> {
            offline()
        }

        async fn token_balance(&self, _o: &Address, _m: &TokenId, _c: Commitment) -> Result<RawAmount> {
            offline()
        }
    }

    #[async_trait]
    impl ScheduleStore for Offline {
        async fn get_vesting_schedule(&self, mint: &TokenId, _owner: &Address) -> Result<VestingSchedule> {
            Err(ClientError::NotFound {
                what: "vesting schedule",
                key: mint.to_string(),
            })
        }
    }

    #[async_trait]
    impl RewardPoolResolver for Offline {
        async fn get_pool_address(&self, _mint: &TokenId) -> Result<Address> {
            offline()
        }
    }

    #[async_trait]
    impl ReleaseBuilder for Offline {
        async fn build_release(
            &self,
            _schedule: &VestingSchedule,
            _owner: &Address,
            _max_amount: RawAmount,
        ) -> Result<ReleaseTransaction> {
            offline()
        }
    }

    fn engine(config: EngineConfig) -> Engine {
        let offline = Arc::new(Offline);
        let swap_services = SwapServices {
            aggregator_quotes: offline.clone(),
            bonding_curve_quotes: offline.clone(),
            builder: offline.clone(),
            signer: offline.clone(),
            broadcaster: offline.clone(),
        };
        let claim_services = ClaimServices::new(offline.clone(), offline.clone(), offline);
        Engine::new(config, swap_services, claim_services, [TokenId::new("P1")])
    }

    fn token(id: &str, decimals: u8) -> TokenDescriptor {
        TokenDescriptor::new(id, decimals, id)
    }

    fn schedule() -> VestingSchedule {
        VestingSchedule {
            escrow: Address::new("escrow"),
            recipient: Address::new("owner"),
            vesting_start_time: 0,
            cliff_time: 1000,
            frequency: 100,
            amount_per_period: 5,
            number_of_periods: 10,
            cliff_unlock_amount: 50,
            total_claimed_amount: 0,
        }
    }

    #[test]
    fn test_compute_swap() {
        let engine = engine(EngineConfig::default());
        let pair = TokenPair::new(token("A", 6), token("B", 6));
        let result = engine
            .compute_swap("12.5", &pair, ExchangeRate::parse("2.0").ok())
            .unwrap();
        assert_eq!(result.output_amount, "25.0");
    }

    #[test]
    fn test_routes_follow_registered_tokens() {
        let mut engine = engine(EngineConfig::default());
        let reserve = engine.config().reserve.clone();
        let pair = TokenPair::new(reserve.clone(), token("P2", 9));
        assert_eq!(engine.route(&pair), SwapRoute::AggregatorOnly);

        engine.add_project_token(TokenId::new("P2"));
        assert_eq!(engine.route(&pair), SwapRoute::DirectBondingCurve);
        assert_eq!(
            engine.route(&TokenPair::new(token("P1", 9), token("P2", 9))),
            SwapRoute::CombinedBondingCurve
        );
    }

    #[test]
    fn test_claim_uses_configured_pool_share() {
        let mut config = EngineConfig::default();
        config.default_pool_percent = Percent::new(30).unwrap();
        let engine = engine(config);

        let claim = engine.compute_claim(&schedule(), 1_000_000, None).unwrap();
        assert_eq!((claim.claimant_share, claim.pool_share), (70, 30));

        let claim = engine.compute_claim(&schedule(), 1_000_000, Some(0)).unwrap();
        assert_eq!(claim.pool_share, 0);
        assert!(engine.compute_claim(&schedule(), 1_000_000, Some(101)).is_err());

        let request = engine.claim_request(TokenId::new("M"), Address::new("o"), Address::new("r"));
        assert_eq!(request.pool_percent, 30);
    }

    #[tokio::test]
    async fn test_execute_swap_reports_stage() {
        let engine = engine(EngineConfig::default());
        let cancel = CancelFlag::new();
        let wallet = Address::from_bytes(&[1u8; 32]);

        let same = SwapRequest::new(TokenPair::new(token("A", 6), token("A", 6)), 5);
        let err = engine.execute_swap(&same, &wallet, &cancel).await.unwrap_err();
        assert_eq!(err.kind, SwapFailureKind::Validation);

        let request = SwapRequest::new(TokenPair::new(token("A", 6), token("B", 6)), 5);
        let err = engine.execute_swap(&request, &wallet, &cancel).await.unwrap_err();
        assert_eq!(err.kind, SwapFailureKind::Quote);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_execute_swap_checks_signer_address() {
        let engine = engine(EngineConfig::default());
        let request = SwapRequest::new(TokenPair::new(token("A", 6), token("B", 6)), 5);
        let other = Address::from_bytes(&[2u8; 32]);

        let err = engine
            .execute_swap(&request, &other, &CancelFlag::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, SwapFailureKind::Validation);
        assert!(err.progress.is_none());
        assert!(err.message.contains(other.as_str()));
    }

    #[tokio::test]
    async fn test_execute_claim_without_schedule() {
        let engine = engine(EngineConfig::default());
        let request = engine.claim_request(TokenId::new("M"), Address::new("o"), Address::new("r"));
        let err = engine.execute_claim(&request, 0).await.unwrap_err();
        assert!(matches!(err, VestingError::ScheduleNotFound { .. }));
    }
}
