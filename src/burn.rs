//! Buy-and-burn trigger.
//!
//! One press runs a strictly sequential pipeline: preconditions, balance,
//! interval, swap quote, co-signature, then `exec`. The first failing stage
//! aborts the run; the status text is cleared on every exit.

use crate::api::{BurnSignMessage, CoSigner, QuoteRequest, SwapQuoteApi};
use crate::chain::TxSubmitter;
use crate::chain::submitter::short_message;
use crate::chain::tx::{BUY_AND_BURN_EXEC, TransactionRequest};
use crate::config::{AppConfig, BurnVariant};
use crate::errors::{ActionError, AppError};
use crate::models::{ActionWindow, Amount, Notice, TxOutcome, saturating_u64};
use crate::state::{AppState, parse_amount};
use crate::utils::{format_minutes, new_nonce, now_ms, to_display, whole_units};
use ethers::abi::Token;
use ethers::types::{Address, Bytes, U256};
use ethers::utils::{hex, id};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const STATUS_QUOTE: &str = "Fetching quote...";
pub const STATUS_SIGNATURE: &str = "Fetching signed message...";
pub const STATUS_EXECUTION: &str = "Waiting for Buy and Burn execution...";

#[derive(Debug, Clone)]
pub struct BurnSettings {
    pub variant: BurnVariant,
    pub buy_and_burn: Address,
    /// Token the swap buys.
    pub burn_token: Address,
    /// Swap amount for `exec-env` deployments, base units.
    pub env_swap_amount: Amount,
    pub slippage_percent: f64,
    pub calldata_selector: String,
    pub chain_id: u64,
    /// Quote-API name of the native currency, the swap input.
    pub native_symbol: String,
}

impl BurnSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            variant: config.burn_variant,
            buy_and_burn: config.buy_and_burn,
            burn_token: config.burn_token,
            env_swap_amount: config
                .swap_amount
                .as_deref()
                .map(parse_amount)
                .unwrap_or_default(),
            slippage_percent: config.slippage_percent,
            calldata_selector: config.calldata_selector.clone(),
            chain_id: config.chain_id,
            native_symbol: config.symbols.native.clone(),
        }
    }

    /// Swap amount for this deployment, `None` until loaded.
    pub fn swap_amount(&self, state: &AppState) -> Option<Amount> {
        let amount = match self.variant {
            BurnVariant::ExecEnv => Some(self.env_swap_amount),
            BurnVariant::CommitOnchain => *state.burn.onchain_swap_amount.borrow(),
        };
        amount.filter(|a| !a.is_zero())
    }

    pub fn stats(&self, state: &AppState) -> BurnStats {
        let burn = &state.burn;
        BurnStats {
            native_symbol: self.native_symbol.clone(),
            supply: *burn.burn_token_supply.borrow(),
            burnt: *burn.burnt_total.borrow(),
            native_balance: *burn.native_balance.borrow(),
            last_burn_time: burn.last_burn_time.borrow().map(saturating_u64),
            interval_secs: burn.burn_interval.borrow().map(saturating_u64),
            swap_amount: self.swap_amount(state),
        }
    }
}

/// Cooldown window from the latest reads, `None` until both are loaded.
pub fn burn_window(state: &AppState) -> Option<ActionWindow> {
    let last = (*state.burn.last_burn_time.borrow())?;
    let interval = (*state.burn.burn_interval.borrow())?;
    Some(ActionWindow {
        last_action_timestamp: saturating_u64(last),
        interval_seconds: saturating_u64(interval),
    })
}

pub struct BuyAndBurnOrchestrator {
    settings: BurnSettings,
    state: Arc<AppState>,
    quotes: Arc<dyn SwapQuoteApi>,
    signer: Arc<dyn CoSigner>,
    submitter: Arc<dyn TxSubmitter>,
}

impl BuyAndBurnOrchestrator {
    pub fn new(
        settings: BurnSettings,
        state: Arc<AppState>,
        quotes: Arc<dyn SwapQuoteApi>,
        signer: Arc<dyn CoSigner>,
        submitter: Arc<dyn TxSubmitter>,
    ) -> Self {
        Self {
            settings,
            state,
            quotes,
            signer,
            submitter,
        }
    }

    pub fn stats(&self) -> BurnStats {
        self.settings.stats(&self.state)
    }

    pub async fn execute(&self) -> Result<TxOutcome, ActionError> {
        self.execute_at(now_ms()).await
    }

    /// Run the pipeline as if the wall clock read `now_ms`.
    pub async fn execute_at(&self, now_ms: u64) -> Result<TxOutcome, ActionError> {
        let result = self.run(now_ms).await;
        self.state.clear_burn_status();
        match &result {
            Ok(outcome) => {
                info!(hash = ?outcome.hash, "[BURN] executed");
                self.state.notify(Notice::success("Transaction successful"));
            }
            Err(e) => {
                warn!(error = %e, "[BURN] aborted");
                self.state.notify(e.notice());
            }
        }
        result
    }

    async fn run(&self, now_ms: u64) -> Result<TxOutcome, ActionError> {
        let wallet = self
            .state
            .wallet_address()
            .ok_or(ActionError::NotConnected)?;

        let balance = *self.state.burn.native_balance.borrow();
        let (Some(balance), Some(window), Some(amount)) = (
            balance,
            burn_window(&self.state),
            self.settings.swap_amount(&self.state),
        ) else {
            return Err(ActionError::DataLoading);
        };

        if amount > balance {
            return Err(ActionError::InsufficientBalance {
                symbol: format!("Buy and Burn {}", self.settings.native_symbol),
            });
        }

        if !window.is_open_at(now_ms) {
            debug!(
                remaining_secs = window.remaining_secs_at(now_ms),
                "[BURN] interval not elapsed"
            );
            return Err(ActionError::WaitForNextInterval);
        }

        self.state.set_burn_status(STATUS_QUOTE);
        let raw = self
            .quotes
            .quote_calldata(QuoteRequest {
                token_in: self.settings.native_symbol.clone(),
                token_out: self.settings.burn_token,
                amount,
                slippage_percent: self.settings.slippage_percent,
            })
            .await
            .map_err(ActionError::Quote)?;
        let swap_data =
            strip_selector(&raw, &self.settings.calldata_selector).map_err(ActionError::Quote)?;

        self.state.set_burn_status(STATUS_SIGNATURE);
        let nonce = new_nonce();
        let signature = self
            .signer
            .sign_burn(BurnSignMessage {
                contract_addr: self.settings.buy_and_burn,
                wallet_addr: wallet,
                amount,
                nonce: nonce.to_string(),
                chain_id: self.settings.chain_id,
            })
            .await
            .map_err(ActionError::Signature)?
            .ok_or(ActionError::EmptySignature)?;

        self.state.set_burn_status(STATUS_EXECUTION);
        let request = TransactionRequest::new(
            self.settings.buy_and_burn,
            BUY_AND_BURN_EXEC,
            vec![
                Token::Bytes(swap_data.to_vec()),
                Token::Uint(U256::from(nonce)),
                Token::Bytes(signature.to_vec()),
            ],
        );
        let outcome = self.submitter.submit(request).await.map_err(|e| {
            let message = short_message(&e);
            if is_too_frequent(&e.to_string()) {
                ActionError::TooFrequent
            } else {
                ActionError::Submission(message)
            }
        })?;
        if !outcome.succeeded {
            return Err(ActionError::Reverted);
        }
        Ok(outcome)
    }
}

/// Drops the quote router's function selector so the remainder can be handed to `exec`.
///
/// Call data that does not start with `selector` is rejected.
pub fn strip_selector(calldata: &str, selector: &str) -> Result<Bytes, AppError> {
    let body = calldata.trim().trim_start_matches("0x");
    let selector = selector.trim().trim_start_matches("0x");
    let rest = body
        .get(..selector.len())
        .filter(|head| head.eq_ignore_ascii_case(selector))
        .map(|_| &body[selector.len()..])
        .ok_or_else(|| {
            AppError::Malformed(format!("call data does not start with selector {selector}"))
        })?;
    Ok(hex::decode(rest)?.into())
}

/// Whether a submission error is the contract's rate-limit revert.
///
/// The custom error `T()` has no arguments, so its revert data is exactly the
/// `0x`-prefixed selector.
pub fn is_too_frequent(message: &str) -> bool {
    let selector = format!("0x{}", hex::encode(&id("T()")[..]));
    let lower = message.to_ascii_lowercase();
    let exact_at = |at: usize| {
        !lower[at + selector.len()..].starts_with(|c: char| c.is_ascii_hexdigit())
    };
    lower.contains("too frequent") || lower.match_indices(&selector).any(|(at, _)| exact_at(at))
}

/// Buy-and-burn statistics as last read.
#[derive(Debug, Clone, PartialEq)]
pub struct BurnStats {
    pub native_symbol: String,
    pub supply: Option<U256>,
    pub burnt: Option<U256>,
    pub native_balance: Option<U256>,
    pub last_burn_time: Option<u64>,
    pub interval_secs: Option<u64>,
    pub swap_amount: Option<Amount>,
}

impl fmt::Display for BurnStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_unknown<T>(value: Option<T>, render: impl Fn(T) -> String) -> String {
            value.map(render).unwrap_or_else(|| "Unknown".to_string())
        }
        let native = &self.native_symbol;
        let whole = |v: U256| whole_units(v, 18).to_string();

        writeln!(f, "Total supply:     {}", or_unknown(self.supply, whole))?;
        writeln!(f, "Burnt supply:     {}", or_unknown(self.burnt, whole))?;
        let balance = or_unknown(self.native_balance, |v| {
            format!("{:.3} {native}", to_display(v, 18))
        });
        writeln!(f, "Buy and Burn {native}: {balance}")?;
        let last = or_unknown(self.last_burn_time, |t| format!("unix {t}"));
        writeln!(f, "Last burn:        {last}")?;
        let interval = or_unknown(self.interval_secs, format_minutes);
        writeln!(f, "Interval:         {interval}")?;
        let swap = or_unknown(self.swap_amount, |v| {
            format!("{} {native}", to_display(v, 18))
        });
        write!(f, "Swap amount:      {swap}")
    }
}
