//! Off-chain co-signing services.
//!
//! The buy-and-burn signer returns an opaque `payload` passed straight to
//! `exec`; the PULSAR mint signer returns a signature plus the deadline the
//! minter enforces.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use ethers::utils::hex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnSignMessage {
    pub contract_addr: Address,
    pub wallet_addr: Address,
    #[serde(serialize_with = "as_decimal")]
    pub amount: U256,
    pub nonce: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintSignMessage {
    pub price_denominator: String,
    pub nonce: u64,
}

#[derive(Debug, Serialize)]
struct Envelope<'a, T> {
    message: &'a T,
}

#[derive(Debug, Deserialize)]
struct BurnPayload {
    #[serde(default)]
    payload: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MintPayload {
    payload: MintSignatureRaw,
}

#[derive(Debug, Deserialize)]
struct MintSignatureRaw {
    signature: String,
    deadline: serde_json::Value,
}

/// Signature and deadline for a PULSAR mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintSignature {
    pub signature: Bytes,
    pub deadline: U256,
}

fn as_decimal<S: serde::Serializer>(value: &U256, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&value.to_string())
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoSigner: Send + Sync {
    /// Signed payload for `exec`, `None` when the service answered without one.
    async fn sign_burn(&self, message: BurnSignMessage) -> Result<Option<Bytes>>;

    async fn sign_mint(&self, message: MintSignMessage) -> Result<MintSignature>;
}

pub struct HttpCoSigner {
    client: Client,
    burn_url: String,
    mint_url: String,
}

impl HttpCoSigner {
    pub fn new(client: Client, burn_url: impl Into<String>, mint_url: impl Into<String>) -> Self {
        Self {
            client,
            burn_url: burn_url.into(),
            mint_url: mint_url.into(),
        }
    }
}

#[async_trait]
impl CoSigner for HttpCoSigner {
    async fn sign_burn(&self, message: BurnSignMessage) -> Result<Option<Bytes>> {
        debug!(nonce = %message.nonce, "[SIGN] burn message");
        let body: BurnPayload = self
            .client
            .post(&self.burn_url)
            .json(&Envelope { message: &message })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        decode_optional_hex(body.payload)
    }

    async fn sign_mint(&self, message: MintSignMessage) -> Result<MintSignature> {
        if self.mint_url.is_empty() {
            return Err(AppError::Config("Set MINT_SIGNER_URL env var".into()));
        }
        debug!(nonce = message.nonce, "[SIGN] mint message");
        let body: MintPayload = self
            .client
            .post(&self.mint_url)
            .json(&Envelope { message: &message })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_mint_signature(body.payload)
    }
}

fn decode_optional_hex(raw: Option<String>) -> Result<Option<Bytes>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("0x") => Ok(None),
        Some(s) => Ok(Some(hex::decode(s.trim_start_matches("0x"))?.into())),
    }
}

fn parse_mint_signature(raw: MintSignatureRaw) -> Result<MintSignature> {
    let signature: Bytes = hex::decode(raw.signature.trim().trim_start_matches("0x"))?.into();
    if signature.is_empty() {
        return Err(AppError::Malformed("empty mint signature".into()));
    }
    let deadline = match &raw.deadline {
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| AppError::Malformed(format!("deadline {n}")))?,
        serde_json::Value::String(s) => U256::from_dec_str(s)
            .map_err(|_| AppError::Malformed(format!("deadline {s}")))?,
        other => return Err(AppError::Malformed(format!("deadline {other}"))),
    };
    Ok(MintSignature {
        signature,
        deadline,
    })
}
