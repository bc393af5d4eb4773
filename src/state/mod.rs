//! Explicit application state shared by readers, the input panel and the orchestrators.
//!
//! Each field is a `watch` channel written by exactly one component:
//! pollers write the on-chain and price reads, the input panel writes the
//! amount, the wallet connector writes the address and each orchestrator
//! writes its own phase/status. Anything else only subscribes.

use crate::mint::MintPhase;
use crate::models::{Amount, Notice, NoticeLevel, PriceQuote};
use ethers::types::{Address, U256};
use tokio::sync::{broadcast, watch};
use tracing::{error, info};

pub mod pricing;

pub use pricing::{ConversionRule, PricingSnapshot, parse_amount, usd_value};

const NOTICE_BUFFER: usize = 32;

/// Reads and inputs of the mint screen.
pub struct MintFeeds {
    pub input_amount: watch::Sender<Amount>,
    pub send_balance: watch::Sender<Option<Amount>>,
    pub receive_balance: watch::Sender<Option<Amount>>,
    pub allowance: watch::Sender<Option<Amount>>,
    pub send_quote: watch::Sender<Option<PriceQuote>>,
    pub receive_quote: watch::Sender<Option<PriceQuote>>,
    pub native_quote: watch::Sender<Option<PriceQuote>>,
    pub phase: watch::Sender<MintPhase>,
}

/// Reads of the buy-and-burn screen.
pub struct BurnFeeds {
    /// Native balance held by the buy-and-burn contract.
    pub native_balance: watch::Sender<Option<U256>>,
    pub last_burn_time: watch::Sender<Option<U256>>,
    pub burn_interval: watch::Sender<Option<U256>>,
    /// Only polled for `commit-onchain` deployments.
    pub onchain_swap_amount: watch::Sender<Option<U256>>,
    /// Burn-token balance sitting on the buy-and-burn contract.
    pub burn_token_supply: watch::Sender<Option<U256>>,
    pub burnt_total: watch::Sender<Option<U256>>,
    pub status: watch::Sender<String>,
}

pub struct AppState {
    pub wallet: watch::Sender<Option<Address>>,
    pub mint: MintFeeds,
    pub burn: BurnFeeds,
    pub notices: broadcast::Sender<Notice>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        let (notices, _) = broadcast::channel(NOTICE_BUFFER);
        Self {
            wallet: watch::Sender::new(None),
            mint: MintFeeds {
                input_amount: watch::Sender::new(Amount::zero()),
                send_balance: watch::Sender::new(None),
                receive_balance: watch::Sender::new(None),
                allowance: watch::Sender::new(None),
                send_quote: watch::Sender::new(None),
                receive_quote: watch::Sender::new(None),
                native_quote: watch::Sender::new(None),
                phase: watch::Sender::new(MintPhase::Idle),
            },
            burn: BurnFeeds {
                native_balance: watch::Sender::new(None),
                last_burn_time: watch::Sender::new(None),
                burn_interval: watch::Sender::new(None),
                onchain_swap_amount: watch::Sender::new(None),
                burn_token_supply: watch::Sender::new(None),
                burnt_total: watch::Sender::new(None),
                status: watch::Sender::new(String::new()),
            },
            notices,
        }
    }

    /// Publish a notice to subscribers and the log.
    pub fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success | NoticeLevel::Info => {
                info!(message = %notice.message, "[NOTICE]")
            }
            NoticeLevel::Error => error!(message = %notice.message, "[NOTICE]"),
        }
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn wallet_address(&self) -> Option<Address> {
        *self.wallet.borrow()
    }

    /// Derived amounts and USD figures for the current input.
    pub fn pricing(&self, rule: ConversionRule) -> PricingSnapshot {
        let amount = *self.mint.input_amount.borrow();
        let send = self.mint.send_quote.borrow().clone().unwrap_or_default();
        let receive = self.mint.receive_quote.borrow().clone().unwrap_or_default();
        let native = self.mint.native_quote.borrow().clone().unwrap_or_default();
        PricingSnapshot::derive(amount, &send, &receive, &native, rule)
    }

    pub fn set_burn_status(&self, status: impl Into<String>) {
        self.burn.status.send_replace(status.into());
    }

    pub fn clear_burn_status(&self) {
        self.burn.status.send_replace(String::new());
    }
}
