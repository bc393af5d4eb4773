//! Shared data structures used throughout the application.

use ethers::types::{Address, H256, U256};
use serde::Deserialize;

/// Base-unit (18-decimal) token quantity.
pub type Amount = U256;

/// Latest pair price from the market-data feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    #[serde(default)]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub price_native: Option<String>,
}

impl PriceQuote {
    pub fn new(price_usd: impl Into<String>, price_native: impl Into<String>) -> Self {
        Self {
            price_usd: Some(price_usd.into()),
            price_native: Some(price_native.into()),
        }
    }

    /// USD price, `"0"` when the feed has not reported one.
    pub fn usd(&self) -> &str {
        self.price_usd.as_deref().unwrap_or("0")
    }

    /// Price in the chain's native currency, `"0"` when missing.
    pub fn native(&self) -> &str {
        self.price_native.as_deref().unwrap_or("0")
    }
}

/// On-chain approval mirror; stale until the next allowance poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowanceState {
    pub amount: Amount,
    pub contract: Address,
    pub spender: Address,
}

/// Cooldown between two buy-and-burn executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionWindow {
    /// Unix seconds of the last execution.
    pub last_action_timestamp: u64,
    pub interval_seconds: u64,
}

impl ActionWindow {
    /// `now - last >= interval`, compared in milliseconds.
    pub fn is_open_at(&self, now_ms: u64) -> bool {
        let elapsed = i128::from(now_ms) - i128::from(self.last_action_timestamp) * 1000;
        elapsed >= i128::from(self.interval_seconds) * 1000
    }

    /// Seconds until the window opens, zero when already open.
    pub fn remaining_secs_at(&self, now_ms: u64) -> u64 {
        let opens_at_ms = (u128::from(self.last_action_timestamp)
            + u128::from(self.interval_seconds))
            * 1000;
        let now = u128::from(now_ms);
        if now >= opens_at_ms {
            0
        } else {
            ((opens_at_ms - now).div_ceil(1000)) as u64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Dismissible user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }
}

/// Result of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub hash: H256,
    pub succeeded: bool,
}

/// Converts an on-chain integer to `u64`, saturating at `u64::MAX`.
pub fn saturating_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.as_u64()
    }
}
