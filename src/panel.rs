//! Token input panel: the only writer of the input amount.

use crate::config::Symbols;
use crate::models::Amount;
use crate::state::{AppState, ConversionRule, parse_amount};
use crate::utils::to_display;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const DISPLAY_DECIMALS: u32 = 18;

pub struct TokenInputPanel {
    state: Arc<AppState>,
    rule: ConversionRule,
    symbols: Symbols,
}

impl TokenInputPanel {
    pub fn new(state: Arc<AppState>, rule: ConversionRule, symbols: Symbols) -> Self {
        Self {
            state,
            rule,
            symbols,
        }
    }

    /// Store a typed decimal; anything unparseable stores zero.
    pub fn set_input(&self, raw: &str) -> Amount {
        let amount = parse_amount(raw);
        debug!(input = raw, amount = %amount, "[INPUT] amount");
        self.state.mint.input_amount.send_replace(amount);
        amount
    }

    /// Use the whole send-token balance, `None` while it is not loaded.
    pub fn set_max(&self) -> Option<Amount> {
        let balance = (*self.state.mint.send_balance.borrow())?;
        self.state.mint.input_amount.send_replace(balance);
        Some(balance)
    }

    /// Amount as shown in the input box: at most five decimals, no trailing zeros.
    pub fn input_text(&self) -> String {
        format_short(to_display(
            *self.state.mint.input_amount.borrow(),
            DISPLAY_DECIMALS,
        ))
    }

    pub fn view(&self) -> PanelView {
        let pricing = self.state.pricing(self.rule);
        let balance = |feed: &tokio::sync::watch::Sender<Option<Amount>>| {
            feed.borrow()
                .map(|b| to_display(b, DISPLAY_DECIMALS))
                .unwrap_or(0.0)
        };
        PanelView {
            symbols: self.symbols.clone(),
            input: self.input_text(),
            send_balance: balance(&self.state.mint.send_balance),
            receive_balance: balance(&self.state.mint.receive_balance),
            send_usd: pricing.send_usd,
            receive_usd: pricing.receive_usd,
            native_fee: to_display(pricing.native_fee, DISPLAY_DECIMALS),
            native_fee_usd: pricing.native_fee_usd,
        }
    }
}

/// `toFixed(5)` then drop trailing zeros.
fn format_short(value: f64) -> String {
    let fixed = format!("{value:.5}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Everything the mint screen displays for the current input.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub symbols: Symbols,
    pub input: String,
    pub send_balance: f64,
    pub receive_balance: f64,
    pub send_usd: f64,
    pub receive_usd: f64,
    pub native_fee: f64,
    pub native_fee_usd: f64,
}

impl fmt::Display for PanelView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.symbols;
        writeln!(
            f,
            "{} {} (${:.2})  Balance {}",
            self.input,
            s.send,
            self.send_usd,
            format_short(self.send_balance)
        )?;
        writeln!(
            f,
            "{} {} (${:.2})  Balance {}",
            self.input,
            s.receive,
            self.receive_usd,
            format_short(self.receive_balance)
        )?;
        write!(
            f,
            "Fee {} {} (${:.2})",
            format_short(self.native_fee),
            s.native,
            self.native_fee_usd
        )
    }
}
