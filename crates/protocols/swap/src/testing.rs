//! In-memory collaborators for swap tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use coin_client::{
    Broadcaster, Confirmation, Quote, QuoteRequest, QuoteService, Result, Signer, SubmitVia,
    TransactionBuilderService, Venue,
};
use coin_core::{
    apply_slippage_bps, Address, Blockhash, ClientError, Commitment, ExchangeRate, RawAmount,
    TokenDescriptor, TokenId, TokenPair, TxSignature,
};
use coin_tx::{
    AccountMeta, AddressTableLookup, Instruction, Message, MessageVersion, SignedTransaction,
    UnsignedTransaction, COMPUTE_BUDGET_PROGRAM_ID, SIGNATURE_BYTES,
};

use crate::composer::{SwapComposer, SwapServices, SwapSettings};
use crate::constants::programs::DBC_PROGRAM_ID;
use crate::executor::SwapExecutor;
use crate::route::RouteContext;
use crate::state::SwapRequest;

pub(crate) const AGGREGATOR_PROGRAM: &str = "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4";

const RESERVE: &str = "AUDIO";

fn decimals_of(token: &str) -> u8 {
    match token {
        "AUDIO" => 8,
        "USDC" => 6,
        _ => 9,
    }
}

pub(crate) struct FakeQuotes {
    rates: HashMap<(String, String), (u64, u64)>,
    requests: Mutex<Vec<QuoteRequest>>,
    failures: Mutex<VecDeque<ClientError>>,
}

impl FakeQuotes {
    fn new(rates: &[(&str, &str, u64, u64)]) -> Self {
        Self {
            rates: rates
                .iter()
                .map(|(a, b, n, d)| ((a.to_string(), b.to_string()), (*n, *d)))
                .collect(),
            requests: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<QuoteRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn fail_next(&self, err: ClientError) {
        self.failures.lock().unwrap().push_back(err);
    }
}

#[async_trait]
impl QuoteService for FakeQuotes {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let key = (
            request.input_mint.as_str().to_string(),
            request.output_mint.as_str().to_string(),
        );
        let (num, den) = self.rates.get(&key).copied().ok_or(ClientError::QuoteUnavailable {
            input: key.0.clone(),
            output: key.1.clone(),
        })?;
        let rate = ExchangeRate::new(num, den).unwrap();
        let out_amount = rate
            .convert(
                request.amount,
                decimals_of(&key.0),
                decimals_of(&key.1),
            )
            .unwrap();

        Ok(Quote {
            venue: request.venue,
            input_mint: request.input_mint.clone(),
            output_mint: request.output_mint.clone(),
            in_amount: request.amount,
            out_amount,
            min_out_amount: apply_slippage_bps(out_amount, request.slippage_bps),
            slippage_bps: request.slippage_bps,
            route_payload: serde_json::Value::Null,
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeBuilder {
    fail_next: AtomicBool,
    versioned: AtomicBool,
}

impl FakeBuilder {
    pub(crate) fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Aggregator legs come back as v0 messages with a lookup table
    pub(crate) fn build_versioned(&self) {
        self.versioned.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransactionBuilderService for FakeBuilder {
    async fn build_swap_transaction(&self, quote: &Quote, user: &Address) -> Result<Vec<u8>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ClientError::BuildFailed {
                message: "builder unavailable".into(),
            });
        }

        let program = match quote.venue {
            Venue::BondingCurve => DBC_PROGRAM_ID,
            Venue::Aggregator => AGGREGATOR_PROGRAM,
        };
        let pool_seed = quote.output_mint.as_str().bytes().fold(0u8, |acc, b| acc.wrapping_add(b));
        let budget = Instruction::new(Address::new(COMPUTE_BUDGET_PROGRAM_ID), vec![], vec![2, 0, 0, 4, 0]);
        let swap = Instruction::new(
            Address::new(program),
            vec![
                AccountMeta::new(user.clone(), true),
                AccountMeta::new(Address::from_bytes(&[pool_seed; 32]), false),
            ],
            quote.in_amount.to_le_bytes().to_vec(),
        );
        let mut message = Message::compile(&[budget, swap], user, Blockhash::from_bytes(&[7u8; 32]))
            .map_err(|e| ClientError::BuildFailed {
                message: e.to_string(),
            })?;
        if quote.venue == Venue::Aggregator && self.versioned.load(Ordering::SeqCst) {
            message.version = MessageVersion::V0;
            message.address_table_lookups = vec![AddressTableLookup {
                account_key: Address::from_bytes(&[70u8; 32]),
                writable_indexes: vec![3],
                readonly_indexes: vec![8],
            }];
            let loaded = message.account_keys.len() as u8;
            if let Some(ix) = message.instructions.last_mut() {
                ix.accounts.extend([loaded, loaded + 1]);
            }
        }
        UnsignedTransaction::new(message)
            .to_bytes()
            .map_err(|e| ClientError::BuildFailed {
                message: e.to_string(),
            })
    }
}

pub(crate) struct FakeSigner {
    address: Address,
    reject: AtomicBool,
    counter: AtomicU8,
}

impl FakeSigner {
    fn new() -> Self {
        Self {
            address: Address::from_bytes(&[1u8; 32]),
            reject: AtomicBool::new(false),
            counter: AtomicU8::new(0),
        }
    }

    pub(crate) fn reject(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }

    pub(crate) fn signed_count(&self) -> u8 {
        self.counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Signer for FakeSigner {
    fn address(&self) -> Address {
        self.address.clone()
    }

    async fn sign(&self, transaction: &UnsignedTransaction) -> Result<SignedTransaction> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(ClientError::UserRejected);
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SignedTransaction::new(
            vec![[n; SIGNATURE_BYTES]],
            transaction.message.clone(),
        ))
    }
}

pub(crate) struct FakeBroadcaster {
    balances: Mutex<HashMap<(Address, String), RawAmount>>,
    sent: Mutex<Vec<(TxSignature, SubmitVia)>>,
    confirmations: Mutex<VecDeque<Confirmation>>,
    credits: Mutex<VecDeque<(Address, String, RawAmount)>>,
    fail_send: AtomicBool,
}

impl FakeBroadcaster {
    fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            confirmations: Mutex::new(VecDeque::new()),
            credits: Mutex::new(VecDeque::new()),
            fail_send: AtomicBool::new(false),
        }
    }

    pub(crate) fn blockhash(&self) -> Blockhash {
        Blockhash::from_bytes(&[9u8; 32])
    }

    pub(crate) fn set_balance(&self, owner: &Address, mint: &str, amount: RawAmount) {
        self.balances
            .lock()
            .unwrap()
            .insert((owner.clone(), mint.to_string()), amount);
    }

    /// Next send delivers `amount` of `mint` to `owner`
    pub(crate) fn credit_next_send(&self, owner: &Address, mint: &str, amount: RawAmount) {
        self.credits
            .lock()
            .unwrap()
            .push_back((owner.clone(), mint.to_string(), amount));
    }

    pub(crate) fn queue_confirmation(&self, outcome: Confirmation) {
        self.confirmations.lock().unwrap().push_back(outcome);
    }

    pub(crate) fn fail_sends(&self) {
        self.fail_send.store(true, Ordering::SeqCst);
    }

    pub(crate) fn sent(&self) -> Vec<(TxSignature, SubmitVia)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Broadcaster for FakeBroadcaster {
    async fn latest_blockhash(&self) -> Result<Blockhash> {
        Ok(self.blockhash())
    }

    async fn send(&self, transaction: &SignedTransaction, via: SubmitVia) -> Result<TxSignature> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ClientError::SubmissionFailed {
                message: "blockhash expired".into(),
            });
        }
        let signature = transaction.signature().ok_or(ClientError::SubmissionFailed {
            message: "unsigned".into(),
        })?;
        self.sent.lock().unwrap().push((signature.clone(), via));

        if let Some((owner, mint, amount)) = self.credits.lock().unwrap().pop_front() {
            *self.balances.lock().unwrap().entry((owner, mint)).or_insert(0) += amount;
        }
        Ok(signature)
    }

    async fn confirm(&self, _signature: &TxSignature, _c: Commitment) -> Result<Confirmation> {
        Ok(self
            .confirmations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Confirmation::Confirmed))
    }

    async fn token_balance(&self, owner: &Address, mint: &TokenId, _c: Commitment) -> Result<RawAmount> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&(owner.clone(), mint.as_str().to_string()))
            .copied()
            .unwrap_or(0))
    }
}

pub(crate) struct Harness {
    pub(crate) aggregator: Arc<FakeQuotes>,
    pub(crate) bonding_curve: Arc<FakeQuotes>,
    pub(crate) builder: Arc<FakeBuilder>,
    pub(crate) signer: Arc<FakeSigner>,
    pub(crate) broadcaster: Arc<FakeBroadcaster>,
    context: RouteContext,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let aggregator = FakeQuotes::new(&[
            ("USDC", "SOL", 1, 150),
            ("USDC", "AUDIO", 5, 1),
            ("AUDIO", "USDC", 1, 5),
            ("AUDIO", "SOL", 1, 750),
        ]);
        let bonding_curve = FakeQuotes::new(&[
            ("AUDIO", "P1", 2, 1),
            ("P1", "AUDIO", 1, 2),
            ("AUDIO", "P2", 4, 1),
            ("P2", "AUDIO", 1, 4),
        ]);
        let context = RouteContext::new(TokenDescriptor::new(RESERVE, 8, RESERVE))
            .with_project_tokens([TokenId::new("P1"), TokenId::new("P2")]);

        Self {
            aggregator: Arc::new(aggregator),
            bonding_curve: Arc::new(bonding_curve),
            builder: Arc::new(FakeBuilder::default()),
            signer: Arc::new(FakeSigner::new()),
            broadcaster: Arc::new(FakeBroadcaster::new()),
            context,
        }
    }

    pub(crate) fn services(&self) -> SwapServices {
        SwapServices {
            aggregator_quotes: self.aggregator.clone(),
            bonding_curve_quotes: self.bonding_curve.clone(),
            builder: self.builder.clone(),
            signer: self.signer.clone(),
            broadcaster: self.broadcaster.clone(),
        }
    }

    pub(crate) fn settings(&self) -> SwapSettings {
        SwapSettings {
            request_timeout: Duration::from_secs(1),
            confirm_timeout: Duration::from_secs(1),
            ..SwapSettings::default()
        }
    }

    pub(crate) fn composer(&self) -> SwapComposer {
        SwapComposer::new(self.services(), self.context.clone(), self.settings())
    }

    pub(crate) fn executor(&self) -> SwapExecutor {
        SwapExecutor::new(self.composer())
    }

    pub(crate) fn token(&self, id: &str) -> TokenDescriptor {
        TokenDescriptor::new(id, decimals_of(id), id)
    }

    pub(crate) fn request(&self, input: &str, output: &str, amount: RawAmount) -> SwapRequest {
        SwapRequest::new(TokenPair::new(self.token(input), self.token(output)), amount)
    }

    pub(crate) fn user(&self) -> Address {
        self.signer.address()
    }

    pub(crate) fn reserve_id(&self) -> &'static str {
        RESERVE
    }
}
