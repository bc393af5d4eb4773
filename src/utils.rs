//! Miscellaneous helper utilities.

use ethers::types::{Address, U256};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize `tracing` subscriber with env-based filter.
///
/// If `RUST_LOG` is not set, defaults to `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Wall-clock time in unix milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Fresh single-use nonce for the co-signing services.
pub fn new_nonce() -> u64 {
    ethers::core::rand::random::<u64>()
}

/// `0x12...cdef` style short form of an address.
pub fn abbreviate_address(address: &Address) -> String {
    let full = format!("{address:?}");
    format!("{}...{}", &full[..4], &full[full.len() - 4..])
}

/// Renders an interval as `"N min"` or `"N min M sec"`.
pub fn format_minutes(seconds: u64) -> String {
    let minutes = seconds / 60;
    let rest = seconds % 60;
    if rest == 0 {
        format!("{minutes} min")
    } else {
        format!("{minutes} min {rest} sec")
    }
}

/// Base units to a display number with the given number of decimals.
pub fn to_display(amount: U256, decimals: u32) -> f64 {
    amount.to_string().parse::<f64>().unwrap_or(0.0) / 10_f64.powi(decimals as i32)
}

/// Whole display units, dropping the fractional part.
pub fn whole_units(amount: U256, decimals: u32) -> U256 {
    amount / U256::exp10(decimals as usize)
}
