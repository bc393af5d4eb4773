//! Periodic readers feeding [`AppState`].
//!
//! Each reader is one poller writing one feed. Wallet-dependent reads look up
//! the connected address on every tick and fall back to the zero address.

use crate::api::PriceSource;
use crate::chain::ChainReader;
use crate::config::{AppConfig, BurnVariant};
use crate::poller::{PollerSet, spawn_poller};
use crate::state::AppState;
use ethers::types::Address;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Balances, allowance and the three pair prices of the mint screen.
pub fn spawn_mint_readers(
    config: &AppConfig,
    chain: Arc<dyn ChainReader>,
    prices: Arc<dyn PriceSource>,
    state: Arc<AppState>,
) -> PollerSet {
    let intervals = config.intervals;
    let send_token = config.send_token;
    let minter = config.minter;
    let mut set = PollerSet::new();

    let (c, s) = (chain.clone(), state.clone());
    set.push(spawn_poller(
        "send-balance",
        intervals.token_balance,
        state.mint.send_balance.clone(),
        move || {
            let (c, owner) = (c.clone(), s.wallet_address().unwrap_or_default());
            async move { c.token_balance(send_token, owner).await }
        },
    ));

    // The minter is the receive token contract.
    let (c, s) = (chain.clone(), state.clone());
    set.push(spawn_poller(
        "receive-balance",
        intervals.token_balance,
        state.mint.receive_balance.clone(),
        move || {
            let (c, owner) = (c.clone(), s.wallet_address().unwrap_or_default());
            async move { c.token_balance(minter, owner).await }
        },
    ));

    let (c, s) = (chain, state.clone());
    set.push(spawn_poller(
        "allowance",
        intervals.allowance,
        state.mint.allowance.clone(),
        move || {
            let (c, owner) = (c.clone(), s.wallet_address().unwrap_or_default());
            async move { c.allowance(send_token, owner, minter).await }
        },
    ));

    let pairs = [
        ("send-price", config.send_pair, &state.mint.send_quote),
        ("receive-price", config.receive_pair, &state.mint.receive_quote),
        ("native-price", config.native_pair, &state.mint.native_quote),
    ];
    for (name, pair, feed) in pairs {
        let (p, price_chain) = (prices.clone(), config.price_chain.clone());
        set.push(spawn_poller(name, intervals.price, feed.clone(), move || {
            let (p, price_chain) = (p.clone(), price_chain.clone());
            async move { p.pair_quote(&price_chain, pair).await }
        }));
    }

    info!(count = set.len(), "[INIT] mint readers started");
    set
}

/// Contract balance, cooldown, swap amount and burn statistics.
pub fn spawn_burn_readers(
    config: &AppConfig,
    chain: Arc<dyn ChainReader>,
    state: Arc<AppState>,
) -> PollerSet {
    let intervals = config.intervals;
    let bnb = config.buy_and_burn;
    let mut set = PollerSet::new();

    let c = chain.clone();
    set.push(spawn_poller(
        "burn-native-balance",
        intervals.burn_balance,
        state.burn.native_balance.clone(),
        move || {
            let c = c.clone();
            async move { c.native_balance(bnb).await }
        },
    ));

    let c = chain.clone();
    set.push(spawn_poller(
        "last-burn-time",
        intervals.burn_window,
        state.burn.last_burn_time.clone(),
        move || {
            let c = c.clone();
            async move { c.last_burn_time(bnb).await }
        },
    ));

    let c = chain.clone();
    set.push(spawn_poller(
        "burn-interval",
        intervals.burn_window,
        state.burn.burn_interval.clone(),
        move || {
            let c = c.clone();
            async move { c.burn_interval(bnb).await }
        },
    ));

    if config.burn_variant == BurnVariant::CommitOnchain {
        let c = chain.clone();
        set.push(spawn_poller(
            "swap-amount",
            intervals.burn_window,
            state.burn.onchain_swap_amount.clone(),
            move || {
                let c = c.clone();
                async move { c.swap_amount(bnb).await }
            },
        ));
    }

    let (c, burn_token) = (chain.clone(), config.burn_token);
    set.push(spawn_poller(
        "burn-token-supply",
        intervals.burn_totals,
        state.burn.burn_token_supply.clone(),
        move || {
            let c = c.clone();
            async move { c.token_balance(burn_token, bnb).await }
        },
    ));

    let (c, variant, from_block) = (chain, config.burn_variant, config.burn_events_from_block);
    set.push(spawn_poller(
        "burnt-total",
        intervals.burn_totals,
        state.burn.burnt_total.clone(),
        move || {
            let c = c.clone();
            async move { c.burnt_total(bnb, variant, from_block).await }
        },
    ));

    info!(count = set.len(), "[INIT] burn readers started");
    set
}

/// Wait until `feed` holds a value, giving up after `within`.
pub async fn loaded<T: Clone>(feed: &watch::Sender<Option<T>>, within: Duration) -> Option<T> {
    let mut rx = feed.subscribe();
    let waited = tokio::time::timeout(within, rx.wait_for(Option::is_some)).await;
    match waited {
        Ok(Ok(value)) => value.clone(),
        _ => None,
    }
}
