//! Pair-price feed client (DexScreener-style API).

use super::endpoint;
use crate::errors::Result;
use crate::models::PriceQuote;
use async_trait::async_trait;
use ethers::types::Address;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct PairsResponse {
    #[serde(default)]
    pairs: Option<Vec<PriceQuote>>,
}

/// Source of pair prices.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Latest quote for `pair` on `chain`. An empty pair list yields a zero quote.
    async fn pair_quote(&self, chain: &str, pair: Address) -> Result<PriceQuote>;
}

pub struct DexScreenerClient {
    client: Client,
    base: Url,
}

impl DexScreenerClient {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base: Url::parse(base_url)?,
        })
    }

    fn pair_url(&self, chain: &str, pair: Address) -> Result<Url> {
        let pair = format!("{pair:?}");
        endpoint(&self.base, ["latest", "dex", "pairs", chain, &pair])
    }
}

#[async_trait]
impl PriceSource for DexScreenerClient {
    async fn pair_quote(&self, chain: &str, pair: Address) -> Result<PriceQuote> {
        let url = self.pair_url(chain, pair)?;
        let body: PairsResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let quote = first_pair(body);
        debug!(pair = ?pair, usd = quote.usd(), native = quote.native(), "[PRICE] quote");
        Ok(quote)
    }
}

fn first_pair(body: PairsResponse) -> PriceQuote {
    body.pairs
        .and_then(|pairs| pairs.into_iter().next())
        .unwrap_or_default()
}
