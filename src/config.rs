//! Configuration loader and application settings.

use crate::errors::{AppError, Result};
use ethers::types::Address;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PRICE_API: &str = "https://api.dexscreener.com";
pub const DEFAULT_QUOTE_API: &str = "https://sdk.piteas.io";
pub const DEFAULT_SLIPPAGE_PERCENT: f64 = 3.0;
/// Selector the quote service prefixes to its router call data.
pub const DEFAULT_CALLDATA_SELECTOR: &str = "8218b58f";

/// Which minter contract the mint flow talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintVariant {
    /// `mint(amount)`, payable value `amount * price * 1.01`.
    StayBull,
    /// `mint(amount, priceDenominator, nonce, deadline, signature)`,
    /// payable value `amount / price / 4 * 1.01`.
    Pulsar,
}

impl FromStr for MintVariant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "staybull" | "sbull" => Ok(Self::StayBull),
            "pulsar" => Ok(Self::Pulsar),
            other => Err(AppError::Config(format!("unknown MINT_VARIANT `{other}`"))),
        }
    }
}

/// Where the buy-and-burn swap amount comes from and which event counts as burnt supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurnVariant {
    /// Swap amount from `SWAP_AMOUNT`, burnt total from `BoughtAndBurnt`.
    ExecEnv,
    /// Swap amount from `swapAmount()`, burnt total from `CommitBurn`.
    CommitOnchain,
}

impl FromStr for BurnVariant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "exec-env" | "exec" => Ok(Self::ExecEnv),
            "commit-onchain" | "commit" => Ok(Self::CommitOnchain),
            other => Err(AppError::Config(format!("unknown BURN_VARIANT `{other}`"))),
        }
    }
}

/// Polling cadence of the periodic readers.
#[derive(Debug, Clone, Copy)]
pub struct PollIntervals {
    pub allowance: Duration,
    pub token_balance: Duration,
    pub price: Duration,
    pub burn_window: Duration,
    pub burn_balance: Duration,
    pub burn_totals: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            allowance: Duration::from_secs(5),
            token_balance: Duration::from_secs(5),
            price: Duration::from_secs(5),
            burn_window: Duration::from_secs(5),
            burn_balance: Duration::from_secs(10),
            burn_totals: Duration::from_secs(60),
        }
    }
}

/// Symbols used in notices and summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbols {
    pub send: String,
    pub receive: String,
    pub native: String,
}

/// External links surfaced by `status`.
#[derive(Debug, Clone, Default)]
pub struct Links {
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub disclaimer: Option<String>,
    pub explorer: Option<String>,
}

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// RPC endpoint for the EVM node.
    pub rpc_url: String,
    pub chain_id: u64,
    /// Hex private key used as the connected wallet.
    pub private_key: Option<String>,
    pub wallet_connect_id: Option<String>,

    pub mint_variant: MintVariant,
    /// Collateral token the user sends.
    pub send_token: Address,
    /// Minter contract, also the approval spender.
    pub minter: Address,

    pub burn_variant: BurnVariant,
    pub buy_and_burn: Address,
    /// Token bought and burnt; its balance on the buy-and-burn contract is the supply shown.
    pub burn_token: Address,
    /// Swap amount as a decimal string in native units.
    pub swap_amount: Option<String>,
    pub slippage_percent: f64,
    /// First block scanned for burn events.
    pub burn_events_from_block: u64,
    pub calldata_selector: String,

    /// Chain slug used by the price API (`pulsechain`, `ethereum`).
    pub price_chain: String,
    pub send_pair: Address,
    pub receive_pair: Address,
    pub native_pair: Address,

    pub price_api_url: String,
    pub quote_api_url: String,
    pub quote_referer: Option<String>,
    pub burn_signer_url: String,
    pub mint_signer_url: String,

    pub symbols: Symbols,
    pub links: Links,
    pub intervals: PollIntervals,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| AppError::Config(format!("Set {key} env var")))
        };
        let address = |key: &str| -> Result<Address> {
            let raw = required(key)?;
            raw.parse()
                .map_err(|_| AppError::Config(format!("{key} is not a valid address: {raw}")))
        };

        let mint_variant: MintVariant = get("MINT_VARIANT")
            .unwrap_or_else(|| "staybull".into())
            .parse()?;
        let burn_variant: BurnVariant = get("BURN_VARIANT")
            .unwrap_or_else(|| "exec-env".into())
            .parse()?;

        let chain_id = match get("CHAIN_ID") {
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::Config(format!("CHAIN_ID must be an integer: {raw}")))?,
            None => 369,
        };
        let slippage_percent = match get("SWAP_SLIPPAGE") {
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::Config(format!("SWAP_SLIPPAGE must be a number: {raw}")))?,
            None => DEFAULT_SLIPPAGE_PERCENT,
        };

        let burn_events_from_block = match get("BURN_EVENTS_FROM_BLOCK") {
            Some(raw) => raw.parse().map_err(|_| {
                AppError::Config(format!("BURN_EVENTS_FROM_BLOCK must be an integer: {raw}"))
            })?,
            None => 0,
        };

        let (default_send, default_receive, default_native) = match mint_variant {
            MintVariant::StayBull => ("LUSD", "sBULL", "PLS"),
            MintVariant::Pulsar => ("TITANX", "PULSAR", "ETH"),
        };

        Ok(Self {
            rpc_url: required("RPC_URL")?,
            chain_id,
            private_key: get("PRIVATE_KEY"),
            wallet_connect_id: get("WALLET_CONNECT_ID"),
            mint_variant,
            send_token: address("SEND_TOKEN_ADDRESS")?,
            minter: address("MINTER_ADDRESS")?,
            burn_variant,
            buy_and_burn: address("BUY_AND_BURN_ADDRESS")?,
            burn_token: address("BURN_TOKEN_ADDRESS")?,
            swap_amount: get("SWAP_AMOUNT"),
            slippage_percent,
            burn_events_from_block,
            calldata_selector: get("CALLDATA_SELECTOR")
                .unwrap_or_else(|| DEFAULT_CALLDATA_SELECTOR.into()),
            price_chain: get("PRICE_CHAIN").unwrap_or_else(|| "pulsechain".into()),
            send_pair: address("SEND_PAIR_ADDRESS")?,
            receive_pair: address("RECEIVE_PAIR_ADDRESS")?,
            native_pair: address("NATIVE_PAIR_ADDRESS")?,
            price_api_url: get("PRICE_API_URL").unwrap_or_else(|| DEFAULT_PRICE_API.into()),
            quote_api_url: get("QUOTE_API_URL").unwrap_or_else(|| DEFAULT_QUOTE_API.into()),
            quote_referer: get("QUOTE_REFERER"),
            burn_signer_url: required("BURN_SIGNER_URL")?,
            mint_signer_url: get("MINT_SIGNER_URL").unwrap_or_default(),
            symbols: Symbols {
                send: get("SEND_SYMBOL").unwrap_or_else(|| default_send.into()),
                receive: get("RECEIVE_SYMBOL").unwrap_or_else(|| default_receive.into()),
                native: get("NATIVE_SYMBOL").unwrap_or_else(|| default_native.into()),
            },
            links: Links {
                twitter: get("TWITTER_URL"),
                telegram: get("TELEGRAM_URL"),
                disclaimer: get("DISCLAIMER_URL"),
                explorer: get("EXPLORER_URL"),
            },
            intervals: PollIntervals::default(),
        })
    }
}
