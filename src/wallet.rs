//! Wallet connection and address identity.

use crate::errors::Result;
use crate::utils::abbreviate_address;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use tokio::sync::watch;
use tracing::info;

/// Holds the connected signer and publishes its address to the shared state.
pub struct WalletConnector {
    chain_id: u64,
    wallet: Option<LocalWallet>,
    address_tx: watch::Sender<Option<Address>>,
}

impl WalletConnector {
    pub fn new(chain_id: u64, address_tx: watch::Sender<Option<Address>>) -> Self {
        Self {
            chain_id,
            wallet: None,
            address_tx,
        }
    }

    /// Connect with a hex private key; replaces any existing connection.
    pub fn connect(&mut self, private_key: &str) -> Result<Address> {
        let wallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()?
            .with_chain_id(self.chain_id);
        let address = wallet.address();
        self.wallet = Some(wallet);
        self.address_tx.send_replace(Some(address));
        info!(address = %abbreviate_address(&address), "[WALLET] connected");
        Ok(address)
    }

    pub fn disconnect(&mut self) {
        if self.wallet.take().is_some() {
            info!("[WALLET] disconnected");
        }
        self.address_tx.send_replace(None);
    }

    pub fn address(&self) -> Option<Address> {
        self.wallet.as_ref().map(Signer::address)
    }

    /// Signer for building a transaction submitter.
    pub fn signer(&self) -> Option<LocalWallet> {
        self.wallet.clone()
    }

    /// Button label: short address when connected.
    pub fn label(&self) -> String {
        match self.address() {
            Some(address) => abbreviate_address(&address),
            None => "Connect Wallet".to_string(),
        }
    }
}
