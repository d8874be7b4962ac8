//! Error types for the coin engine

use thiserror::Error;

/// Core errors that can occur in the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Collaborator error: {0}")]
    Client(#[from] ClientError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TxError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Stable machine-readable code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::Client(e) => e.error_code(),
            Self::Transaction(_) => "transaction_error",
            Self::Config(_) => "config_error",
            Self::Serialization(_) => "serialization_error",
        }
    }
}

/// Locally detected input problems. Never involves a collaborator and is
/// always recoverable by correcting the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Malformed amount: {input:?}")]
    MalformedAmount { input: String },

    #[error("Amount {input:?} has more than {max} decimal places")]
    TooManyDecimals { input: String, max: u8 },

    #[error("Token decimals unknown for {side} side")]
    MissingDecimals { side: &'static str },

    #[error("Percentage must be an integer between 0 and 100, got {value:?}")]
    PercentOutOfRange { value: String },

    #[error("Amount does not fit in a raw token amount")]
    AmountOverflow,

    #[error("Input and output token are the same: {token}")]
    SameToken { token: String },

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Invalid address: {address}")]
    InvalidAddress { address: String },

    #[error("Malformed exchange rate: {input:?}")]
    MalformedRate { input: String },

    #[error("Invalid blockhash: {value}")]
    InvalidBlockhash { value: String },
}

impl ValidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedAmount { .. } => "malformed_amount",
            Self::TooManyDecimals { .. } => "too_many_decimals",
            Self::MissingDecimals { .. } => "missing_decimals",
            Self::PercentOutOfRange { .. } => "percent_out_of_range",
            Self::AmountOverflow => "amount_overflow",
            Self::SameToken { .. } => "same_token",
            Self::ZeroAmount => "zero_amount",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::MalformedRate { .. } => "malformed_rate",
            Self::InvalidBlockhash { .. } => "invalid_blockhash",
        }
    }
}

/// Failures reported by external collaborators (quote venues, wallet,
/// cluster RPC, schedule storage)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("No quote available for {input} -> {output}")]
    QuoteUnavailable { input: String, output: String },

    #[error("User rejected the request")]
    UserRejected,

    #[error("Wallet error: {message}")]
    Wallet { message: String },

    #[error("Failed to build transaction: {message}")]
    BuildFailed { message: String },

    #[error("Transaction submission failed: {message}")]
    SubmissionFailed { message: String },

    #[error("Transaction {signature} not confirmed in time")]
    ConfirmationTimeout { signature: String },

    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("RPC error: {message}")]
    Rpc { message: String },
}

impl ClientError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::QuoteUnavailable { .. } => "quote_unavailable",
            Self::UserRejected => "user_rejected",
            Self::Wallet { .. } => "wallet_error",
            Self::BuildFailed { .. } => "build_failed",
            Self::SubmissionFailed { .. } => "submission_failed",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::NotFound { .. } => "not_found",
            Self::Timeout { .. } => "timeout",
            Self::Rpc { .. } => "rpc_error",
        }
    }

    /// Whether the user explicitly declined in the wallet
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected)
    }
}

/// Transaction encoding and assembly errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("Invalid key: {0}")]
    InvalidKey(#[from] ValidationError),

    #[error("Transaction references {count} accounts, limit is 256")]
    TooManyAccounts { count: usize },

    #[error("Instruction references account index {index} outside {len} keys")]
    AccountIndexOutOfRange { index: usize, len: usize },

    #[error("Unsupported message version prefix {prefix:#04x}")]
    UnsupportedVersion { prefix: u8 },

    #[error("Account index {index} is loaded from an address lookup table")]
    UnresolvedLookup { index: usize },

    #[error("Malformed transaction bytes: {message}")]
    Malformed { message: String },

    #[error("Message has no fee payer")]
    MissingFeePayer,

    #[error("Failed to decode base64 transaction: {message}")]
    Base64 { message: String },
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;
