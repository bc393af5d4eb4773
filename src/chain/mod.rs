//! On-chain reads and transaction submission.

use crate::config::BurnVariant;
use crate::errors::Result;
use async_trait::async_trait;
use ethers::{
    contract::abigen,
    providers::{Http, Middleware, Provider},
    types::{Address, U256},
};
use std::sync::Arc;
use tracing::debug;

pub mod submitter;
pub mod tx;

pub use submitter::{EthersSubmitter, TxSubmitter};
pub use tx::TransactionRequest;

abigen!(
    Erc20Token,
    r"[
        function balanceOf(address account) view returns (uint256)
        function allowance(address owner, address spender) view returns (uint256)
        function totalSupply() view returns (uint256)
    ]",
);

abigen!(
    BuyAndBurn,
    r"[
        function lastBurnTime() view returns (uint256)
        function burnInterval() view returns (uint256)
        function swapAmount() view returns (uint256)
        event CommitBurn(address indexed caller, uint256 reward, uint256 wethAmountSwapped, uint256 titanxAmountSwapped, uint256 pulsarAmountBurned)
        event BoughtAndBurnt(address indexed caller, uint256 nativeAmountSwapped, uint256 amountBurnt)
    ]",
);

/// Read-only contract and account queries used by the periodic readers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256>;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;

    async fn total_supply(&self, token: Address) -> Result<U256>;

    async fn native_balance(&self, account: Address) -> Result<U256>;

    async fn last_burn_time(&self, buy_and_burn: Address) -> Result<U256>;

    async fn burn_interval(&self, buy_and_burn: Address) -> Result<U256>;

    /// Swap amount configured on the contract (`commit-onchain` deployments).
    async fn swap_amount(&self, buy_and_burn: Address) -> Result<U256>;

    /// Sum of tokens burnt across the variant's burn events since `from_block`.
    async fn burnt_total(
        &self,
        buy_and_burn: Address,
        variant: BurnVariant,
        from_block: u64,
    ) -> Result<U256>;
}

/// `ChainReader` over a plain HTTP JSON-RPC provider.
#[derive(Clone)]
pub struct EthersChain {
    provider: Arc<Provider<Http>>,
}

impl EthersChain {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = Arc::new(Provider::<Http>::try_from(rpc_url)?);
        Ok(Self { provider })
    }

    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }

    pub async fn chain_id(&self) -> Result<u64> {
        Ok(self.provider.get_chainid().await?.as_u64())
    }

    fn token(&self, token: Address) -> Erc20Token<Provider<Http>> {
        Erc20Token::new(token, self.provider.clone())
    }

    fn buy_and_burn(&self, address: Address) -> BuyAndBurn<Provider<Http>> {
        BuyAndBurn::new(address, self.provider.clone())
    }
}

#[async_trait]
impl ChainReader for EthersChain {
    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256> {
        Ok(self.token(token).balance_of(owner).call().await?)
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        Ok(self.token(token).allowance(owner, spender).call().await?)
    }

    async fn total_supply(&self, token: Address) -> Result<U256> {
        Ok(self.token(token).total_supply().call().await?)
    }

    async fn native_balance(&self, account: Address) -> Result<U256> {
        Ok(self.provider.get_balance(account, None).await?)
    }

    async fn last_burn_time(&self, buy_and_burn: Address) -> Result<U256> {
        Ok(self.buy_and_burn(buy_and_burn).last_burn_time().call().await?)
    }

    async fn burn_interval(&self, buy_and_burn: Address) -> Result<U256> {
        Ok(self.buy_and_burn(buy_and_burn).burn_interval().call().await?)
    }

    async fn swap_amount(&self, buy_and_burn: Address) -> Result<U256> {
        Ok(self.buy_and_burn(buy_and_burn).swap_amount().call().await?)
    }

    async fn burnt_total(
        &self,
        buy_and_burn: Address,
        variant: BurnVariant,
        from_block: u64,
    ) -> Result<U256> {
        let contract = self.buy_and_burn(buy_and_burn);
        let total = match variant {
            BurnVariant::CommitOnchain => {
                let events = contract
                    .commit_burn_filter()
                    .from_block(from_block)
                    .query()
                    .await?;
                debug!(count = events.len(), "[CHAIN] CommitBurn events");
                events
                    .iter()
                    .fold(U256::zero(), |acc, e| acc.saturating_add(e.pulsar_amount_burned))
            }
            BurnVariant::ExecEnv => {
                let events = contract
                    .bought_and_burnt_filter()
                    .from_block(from_block)
                    .query()
                    .await?;
                debug!(count = events.len(), "[CHAIN] BoughtAndBurnt events");
                events
                    .iter()
                    .fold(U256::zero(), |acc, e| acc.saturating_add(e.amount_burnt))
            }
        };
        Ok(total)
    }
}
