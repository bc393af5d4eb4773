//! Swap-quote API client.

use super::endpoint;
use crate::errors::Result;
use async_trait::async_trait;
use ethers::types::{Address, U256};
use reqwest::{Client, header};
use serde::Deserialize;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    /// Input token address or the native symbol.
    pub token_in: String,
    pub token_out: Address,
    pub amount: U256,
    pub slippage_percent: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    method_parameters: MethodParameters,
}

#[derive(Debug, Deserialize)]
struct MethodParameters {
    calldata: String,
}

/// Router quote service. Returns the raw hex call data of the quoted swap.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SwapQuoteApi: Send + Sync {
    async fn quote_calldata(&self, request: QuoteRequest) -> Result<String>;
}

pub struct PiteasClient {
    client: Client,
    base: Url,
    referer: Option<String>,
}

impl PiteasClient {
    pub fn new(client: Client, base_url: &str, referer: Option<String>) -> Result<Self> {
        Ok(Self {
            client,
            base: Url::parse(base_url)?,
            referer,
        })
    }

    fn quote_url(&self, request: &QuoteRequest) -> Result<Url> {
        let mut url = endpoint(&self.base, ["quote"])?;
        url.query_pairs_mut()
            .append_pair("tokenInAddress", &request.token_in)
            .append_pair("tokenOutAddress", &format!("{:?}", request.token_out))
            .append_pair("amount", &request.amount.to_string())
            .append_pair("allowedSlippage", &request.slippage_percent.to_string());
        Ok(url)
    }
}

#[async_trait]
impl SwapQuoteApi for PiteasClient {
    async fn quote_calldata(&self, request: QuoteRequest) -> Result<String> {
        let url = self.quote_url(&request)?;
        debug!(url = %url, "[QUOTE] requesting");
        let mut req = self
            .client
            .get(url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(referer) = &self.referer {
            req = req.header(header::REFERER, referer);
        }
        let body: QuoteResponse = req.send().await?.error_for_status()?.json().await?;
        Ok(body.method_parameters.calldata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_carries_amount_and_slippage() {
        let api = PiteasClient::new(Client::new(), "https://sdk.piteas.io", None).unwrap();
        let url = api
            .quote_url(&QuoteRequest {
                token_in: "PLS".into(),
                token_out: Address::repeat_byte(0x01),
                amount: U256::from(500_000_000_000_000_000u128),
                slippage_percent: 3.0,
            })
            .unwrap();
        assert_eq!(url.path(), "/quote");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("tokenInAddress".into(), "PLS".into()));
        assert_eq!(
            pairs[1].1,
            "0x0101010101010101010101010101010101010101".to_string()
        );
        assert_eq!(pairs[2].1, "500000000000000000");
        assert_eq!(pairs[3], ("allowedSlippage".into(), "3".into()));
    }

    #[test]
    fn quote_path_extends_base_path() {
        let api = PiteasClient::new(Client::new(), "https://gateway.example/piteas/", None).unwrap();
        let url = api
            .quote_url(&QuoteRequest {
                token_in: "PLS".into(),
                token_out: Address::repeat_byte(0x01),
                amount: U256::one(),
                slippage_percent: 0.5,
            })
            .unwrap();
        assert_eq!(url.path(), "/piteas/quote");
        assert_eq!(url.host_str(), Some("gateway.example"));
    }

    #[test]
    fn extracts_calldata() {
        let raw = r#"{"methodParameters":{"calldata":"0x8218b58f00ff","value":"0x0"},"destAmount":"1"}"#;
        let body: QuoteResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.method_parameters.calldata, "0x8218b58f00ff");
    }
}
