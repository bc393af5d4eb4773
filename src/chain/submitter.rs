use super::tx::TransactionRequest;
use crate::errors::{AppError, Result};
use crate::models::TxOutcome;
use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, TransactionRequest as RawTransaction},
};
use std::sync::Arc;
use tracing::{info, warn};

/// Signs, broadcasts and waits for a transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    /// Address transactions are sent from.
    fn sender(&self) -> Address;

    async fn submit(&self, request: TransactionRequest) -> Result<TxOutcome>;
}

/// `TxSubmitter` backed by a local key and an HTTP provider.
pub struct EthersSubmitter {
    client: Arc<SignerMiddleware<Provider<Http>, LocalWallet>>,
}

impl EthersSubmitter {
    pub fn new(provider: Provider<Http>, wallet: LocalWallet) -> Self {
        Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
        }
    }
}

#[async_trait]
impl TxSubmitter for EthersSubmitter {
    fn sender(&self) -> Address {
        self.client.signer().address()
    }

    async fn submit(&self, request: TransactionRequest) -> Result<TxOutcome> {
        let function = request.function_name()?;
        let tx = RawTransaction::new()
            .from(self.sender())
            .to(request.target)
            .data(request.calldata()?)
            .value(request.value);

        info!(
            function = %function,
            target = ?request.target,
            value = %request.value,
            "[TX] submitting"
        );
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| AppError::Submission(e.to_string()))?;
        let hash = *pending;
        info!(hash = ?hash, "[TX] pending");

        let receipt = pending
            .await?
            .ok_or_else(|| AppError::Submission(format!("transaction {hash:?} dropped")))?;
        let succeeded = receipt.status.is_some_and(|s| s.as_u64() == 1);
        if !succeeded {
            warn!(hash = ?hash, "[TX] reverted on-chain");
        }
        Ok(TxOutcome { hash, succeeded })
    }
}

/// First line of an error, capped, as a user-facing string.
pub fn short_message(error: &AppError) -> String {
    const MAX: usize = 120;
    let full = match error {
        AppError::Submission(msg) => msg.clone(),
        other => other.to_string(),
    };
    let line = full.lines().next().unwrap_or("Something went wrong").trim();
    if line.is_empty() {
        return "Something went wrong".to_string();
    }
    if line.chars().count() > MAX {
        let cut: String = line.chars().take(MAX).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_keeps_first_line() {
        let err = AppError::Submission("execution reverted: T\nmore detail".into());
        assert_eq!(short_message(&err), "execution reverted: T");
    }

    #[test]
    fn short_message_caps_length() {
        let err = AppError::Submission("x".repeat(500));
        let msg = short_message(&err);
        assert_eq!(msg.chars().count(), 123);
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn short_message_never_empty() {
        let err = AppError::Submission(String::new());
        assert_eq!(short_message(&err), "Something went wrong");
    }
}
