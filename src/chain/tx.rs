//! Write-side transaction descriptions.

use crate::errors::{AppError, Result};
use ethers::abi::{Token, parse_abi};
use ethers::types::{Address, Bytes, U256};

pub const ERC20_APPROVE: &str = "function approve(address spender, uint256 value) returns (bool)";
pub const STAYBULL_MINT: &str = "function mint(uint256 amount) payable";
pub const PULSAR_MINT: &str = "function mint(uint256 titanxAmount, uint256 priceDenominator, uint256 nonce, uint256 deadline, bytes signature) payable";
pub const BUY_AND_BURN_EXEC: &str =
    "function exec(bytes swapData, uint256 nonce, bytes signature)";

/// A contract call built right before submission and dropped afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRequest {
    pub target: Address,
    /// Human-readable ABI signature of the called function.
    pub function: &'static str,
    pub args: Vec<Token>,
    /// Native value attached to the call.
    pub value: U256,
}

impl TransactionRequest {
    pub fn new(target: Address, function: &'static str, args: Vec<Token>) -> Self {
        Self {
            target,
            function,
            args,
            value: U256::zero(),
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// `approve(spender, amount)` on `token`.
    pub fn approve(token: Address, spender: Address, amount: U256) -> Self {
        Self::new(
            token,
            ERC20_APPROVE,
            vec![Token::Address(spender), Token::Uint(amount)],
        )
    }

    pub fn function_name(&self) -> Result<String> {
        let abi = parse_abi(&[self.function])?;
        abi.functions()
            .next()
            .map(|f| f.name.clone())
            .ok_or_else(|| AppError::Other(format!("no function in `{}`", self.function)))
    }

    /// ABI-encoded call data, selector included.
    pub fn calldata(&self) -> Result<Bytes> {
        let abi = parse_abi(&[self.function])?;
        let function = abi
            .functions()
            .next()
            .ok_or_else(|| AppError::Other(format!("no function in `{}`", self.function)))?;
        Ok(function.encode_input(&self.args)?.into())
    }
}
