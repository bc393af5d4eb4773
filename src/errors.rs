use crate::models::{Notice, NoticeLevel};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(#[from] ethers::providers::ProviderError),

    #[error("Contract error: {0}")]
    Contract(
        #[from]
        ethers::contract::ContractError<ethers::providers::Provider<ethers::providers::Http>>,
    ),

    #[error("ABI error: {0}")]
    Abi(#[from] ethers::abi::Error),

    #[error("ABI parse error: {0}")]
    AbiParse(#[from] ethers::abi::ParseError),

    #[error("Hex decode error: {0}")]
    Hex(#[from] ethers::utils::hex::FromHexError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] ethers::signers::WalletError),

    #[error("Serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Other: {0}")]
    Other(String),
}

/// Why a mint or buy-and-burn action stopped.
///
/// Every variant reduces to one short display string through [`ActionError::notice`].
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("wallet not connected")]
    NotConnected,

    #[error("a submission is already in flight")]
    Busy,

    #[error("required on-chain data not loaded yet")]
    DataLoading,

    #[error("no amount entered")]
    NoAmount,

    #[error("insufficient {symbol} balance")]
    InsufficientBalance { symbol: String },

    #[error("burn interval has not elapsed")]
    WaitForNextInterval,

    #[error("price unavailable")]
    PriceUnavailable,

    #[error("quote fetch failed: {0}")]
    Quote(#[source] AppError),

    #[error("signature fetch failed: {0}")]
    Signature(#[source] AppError),

    #[error("signature service returned an empty payload")]
    EmptySignature,

    #[error("transaction happens too frequently")]
    TooFrequent,

    #[error("transaction reverted")]
    Reverted,

    #[error("submission failed: {0}")]
    Submission(String),
}

impl ActionError {
    /// Short message shown to the user.
    pub fn notice(&self) -> Notice {
        let (level, message) = match self {
            ActionError::NotConnected => {
                (NoticeLevel::Info, "Please connect your wallet".to_string())
            }
            ActionError::Busy => (
                NoticeLevel::Info,
                "Transaction already in progress".to_string(),
            ),
            ActionError::DataLoading => (
                NoticeLevel::Info,
                "Please wait until the data is loaded".to_string(),
            ),
            ActionError::NoAmount => (NoticeLevel::Info, "Enter an amount".to_string()),
            ActionError::InsufficientBalance { symbol } => {
                (NoticeLevel::Error, format!("Insufficient {symbol} balance"))
            }
            ActionError::WaitForNextInterval => (
                NoticeLevel::Error,
                "Please wait for the next interval".to_string(),
            ),
            ActionError::PriceUnavailable => (
                NoticeLevel::Error,
                "Unable to fetch price at the moment. Please try again!".to_string(),
            ),
            ActionError::Quote(_) => (NoticeLevel::Error, "Error fetching quote".to_string()),
            ActionError::Signature(_) | ActionError::EmptySignature => (
                NoticeLevel::Error,
                "Error fetching signed message".to_string(),
            ),
            ActionError::TooFrequent => (
                NoticeLevel::Error,
                "Transaction happens too frequently.".to_string(),
            ),
            ActionError::Reverted => (NoticeLevel::Error, "Transaction Reverted...".to_string()),
            ActionError::Submission(short) => (NoticeLevel::Error, short.clone()),
        };
        Notice { level, message }
    }
}
