//! Approve-or-mint orchestration.

use crate::api::{CoSigner, MintSignMessage};
use crate::chain::TxSubmitter;
use crate::chain::submitter::short_message;
use crate::chain::tx::{PULSAR_MINT, STAYBULL_MINT, TransactionRequest};
use crate::config::{AppConfig, MintVariant};
use crate::errors::ActionError;
use crate::models::{AllowanceState, Amount, Notice, TxOutcome};
use crate::poller::PollerHandle;
use crate::state::{AppState, ConversionRule};
use crate::utils::new_nonce;
use ethers::abi::Token;
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::{debug, info};

/// Where the mint button stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintPhase {
    /// No amount entered.
    Idle,
    /// Amount exceeds the known allowance; the next press approves.
    NeedsAllowance,
    /// Allowance covers a nonzero amount; the next press mints.
    Mintable,
    /// A transaction is in flight.
    Submitting,
}

impl MintPhase {
    /// Phase for `amount` against the last polled allowance (unknown counts as zero).
    pub fn evaluate(amount: Amount, allowance: Option<Amount>) -> Self {
        let allowance = allowance.unwrap_or_default();
        if amount > allowance {
            Self::NeedsAllowance
        } else if !amount.is_zero() {
            Self::Mintable
        } else {
            Self::Idle
        }
    }

    pub fn label(&self, send_symbol: &str, receive_symbol: &str) -> String {
        match self {
            Self::Idle => "Enter Amount".to_string(),
            Self::NeedsAllowance => format!("Approve {send_symbol}"),
            Self::Mintable => format!("Mint {receive_symbol}"),
            Self::Submitting => "Submitting...".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MintSettings {
    pub variant: MintVariant,
    pub send_token: Address,
    pub minter: Address,
    pub send_symbol: String,
    pub receive_symbol: String,
}

impl MintSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            variant: config.mint_variant,
            send_token: config.send_token,
            minter: config.minter,
            send_symbol: config.symbols.send.clone(),
            receive_symbol: config.symbols.receive.clone(),
        }
    }

    pub fn rule(&self) -> ConversionRule {
        ConversionRule::for_variant(self.variant)
    }
}

pub struct MintOrchestrator {
    settings: MintSettings,
    state: Arc<AppState>,
    submitter: Arc<dyn TxSubmitter>,
    signer: Arc<dyn CoSigner>,
}

impl MintOrchestrator {
    pub fn new(
        settings: MintSettings,
        state: Arc<AppState>,
        submitter: Arc<dyn TxSubmitter>,
        signer: Arc<dyn CoSigner>,
    ) -> Self {
        Self {
            settings,
            state,
            submitter,
            signer,
        }
    }

    /// Last polled approval of the minter over the send token.
    pub fn allowance(&self) -> Option<AllowanceState> {
        let amount = (*self.state.mint.allowance.borrow())?;
        Some(AllowanceState {
            amount,
            contract: self.settings.send_token,
            spender: self.settings.minter,
        })
    }

    pub fn phase(&self) -> MintPhase {
        *self.state.mint.phase.borrow()
    }

    /// Recompute the phase from the latest amount and allowance.
    ///
    /// Leaves `Submitting` untouched; the submission path restores it.
    pub fn refresh_phase(&self) -> MintPhase {
        let amount = *self.state.mint.input_amount.borrow();
        let allowance = *self.state.mint.allowance.borrow();
        let next = MintPhase::evaluate(amount, allowance);
        let mut current = next;
        self.state.mint.phase.send_if_modified(|phase| {
            if *phase == MintPhase::Submitting {
                current = MintPhase::Submitting;
                return false;
            }
            let changed = *phase != next;
            *phase = next;
            changed
        });
        current
    }

    /// Keep the phase in step with the input amount and allowance polls.
    pub fn track_phase(self: &Arc<Self>) -> PollerHandle {
        let this = Arc::clone(self);
        let mut amount_rx = self.state.mint.input_amount.subscribe();
        let mut allowance_rx = self.state.mint.allowance.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = amount_rx.changed() => if changed.is_err() { break },
                    changed = allowance_rx.changed() => if changed.is_err() { break },
                }
                let phase = this.refresh_phase();
                debug!(?phase, "[MINT] phase");
            }
        });
        PollerHandle::from_task("mint-phase", handle)
    }

    /// Handle a press of the mint button: approve or mint depending on the phase.
    pub async fn execute(&self) -> Result<TxOutcome, ActionError> {
        let result = self.run().await;
        match &result {
            Ok(outcome) => {
                info!(hash = ?outcome.hash, "[MINT] confirmed");
                self.state.notify(Notice::success("Transaction successful"));
            }
            Err(e) => self.state.notify(e.notice()),
        }
        result
    }

    async fn run(&self) -> Result<TxOutcome, ActionError> {
        let phase = self.refresh_phase();
        if self.state.wallet_address().is_none() {
            return Err(ActionError::NotConnected);
        }
        let amount = *self.state.mint.input_amount.borrow();
        let request = match phase {
            MintPhase::Submitting => return Err(ActionError::Busy),
            MintPhase::Idle => return Err(ActionError::NoAmount),
            MintPhase::NeedsAllowance => self.approval_request(amount)?,
            MintPhase::Mintable => self.mint_request(amount).await?,
        };
        self.submit(phase, request).await
    }

    /// An unknown balance is still loading, not insufficient.
    fn check_balance(&self, amount: Amount) -> Result<(), ActionError> {
        let balance = self
            .state
            .mint
            .send_balance
            .borrow()
            .ok_or(ActionError::DataLoading)?;
        if amount > balance {
            return Err(ActionError::InsufficientBalance {
                symbol: self.settings.send_symbol.clone(),
            });
        }
        Ok(())
    }

    fn approval_request(&self, amount: Amount) -> Result<TransactionRequest, ActionError> {
        self.check_balance(amount)?;
        Ok(TransactionRequest::approve(
            self.settings.send_token,
            self.settings.minter,
            amount,
        ))
    }

    async fn mint_request(&self, amount: Amount) -> Result<TransactionRequest, ActionError> {
        self.check_balance(amount)?;
        let pricing = self.state.pricing(self.settings.rule());
        if pricing.native_fee.is_zero() {
            return Err(ActionError::PriceUnavailable);
        }
        match self.settings.variant {
            MintVariant::StayBull => Ok(TransactionRequest::new(
                self.settings.minter,
                STAYBULL_MINT,
                vec![Token::Uint(amount)],
            )
            .with_value(pricing.native_fee)),
            MintVariant::Pulsar => {
                let denominator = pricing
                    .price_denominator
                    .ok_or(ActionError::PriceUnavailable)?;
                let nonce = new_nonce();
                let signed = self
                    .signer
                    .sign_mint(MintSignMessage {
                        price_denominator: denominator.to_string(),
                        nonce,
                    })
                    .await
                    .map_err(ActionError::Signature)?;
                Ok(TransactionRequest::new(
                    self.settings.minter,
                    PULSAR_MINT,
                    vec![
                        Token::Uint(amount),
                        Token::Uint(denominator),
                        Token::Uint(U256::from(nonce)),
                        Token::Uint(signed.deadline),
                        Token::Bytes(signed.signature.to_vec()),
                    ],
                )
                .with_value(pricing.native_fee))
            }
        }
    }

    async fn submit(
        &self,
        restore: MintPhase,
        request: TransactionRequest,
    ) -> Result<TxOutcome, ActionError> {
        let claimed = self.state.mint.phase.send_if_modified(|phase| {
            if *phase == MintPhase::Submitting {
                false
            } else {
                *phase = MintPhase::Submitting;
                true
            }
        });
        if !claimed {
            return Err(ActionError::Busy);
        }

        let result = self.submitter.submit(request).await;
        // Allowance only moves on the next poll, so the pre-submission phase still holds.
        self.state.mint.phase.send_replace(restore);

        let outcome = result.map_err(|e| ActionError::Submission(short_message(&e)))?;
        if !outcome.succeeded {
            return Err(ActionError::Reverted);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::signer::{MintSignature, MockCoSigner};
    use crate::chain::submitter::MockTxSubmitter;
    use crate::chain::tx::ERC20_APPROVE;
    use crate::errors::AppError;
    use crate::models::{NoticeLevel, PriceQuote};
    use ethers::types::{Bytes, H256};
    use std::sync::Mutex;

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::exp10(18)
    }

    fn settings(variant: MintVariant) -> MintSettings {
        MintSettings {
            variant,
            send_token: Address::repeat_byte(0x01),
            minter: Address::repeat_byte(0x02),
            send_symbol: "LUSD".into(),
            receive_symbol: "sBULL".into(),
        }
    }

    fn connected_state() -> Arc<AppState> {
        let state = Arc::new(AppState::new());
        state.wallet.send_replace(Some(Address::repeat_byte(0x09)));
        state.mint.send_balance.send_replace(Some(e18(50)));
        state
            .mint
            .send_quote
            .send_replace(Some(PriceQuote::new("1", "0.5")));
        state
    }

    fn ok_outcome() -> TxOutcome {
        TxOutcome {
            hash: H256::repeat_byte(0x77),
            succeeded: true,
        }
    }

    fn orchestrator(
        variant: MintVariant,
        state: Arc<AppState>,
        submitter: MockTxSubmitter,
        signer: MockCoSigner,
    ) -> MintOrchestrator {
        MintOrchestrator::new(settings(variant), state, Arc::new(submitter), Arc::new(signer))
    }

    #[test]
    fn approval_needed_iff_amount_exceeds_allowance() {
        let cases = [
            (0u64, 0u64, MintPhase::Idle),
            (1, 0, MintPhase::NeedsAllowance),
            (5, 5, MintPhase::Mintable),
            (6, 5, MintPhase::NeedsAllowance),
            (0, 5, MintPhase::Idle),
            (3, 9, MintPhase::Mintable),
        ];
        for (a, b, expected) in cases {
            assert_eq!(
                MintPhase::evaluate(U256::from(a), Some(U256::from(b))),
                expected,
                "amount {a} allowance {b}"
            );
        }
        assert_eq!(
            MintPhase::evaluate(U256::one(), None),
            MintPhase::NeedsAllowance
        );
    }

    #[test]
    fn allowance_mirrors_poll() {
        let state = connected_state();
        let orch = orchestrator(
            MintVariant::StayBull,
            state.clone(),
            MockTxSubmitter::new(),
            MockCoSigner::new(),
        );
        assert_eq!(orch.allowance(), None);
        state.mint.allowance.send_replace(Some(e18(2)));
        assert_eq!(
            orch.allowance(),
            Some(AllowanceState {
                amount: e18(2),
                contract: Address::repeat_byte(0x01),
                spender: Address::repeat_byte(0x02),
            })
        );
    }

    #[test]
    fn labels_follow_phase() {
        assert_eq!(MintPhase::NeedsAllowance.label("LUSD", "sBULL"), "Approve LUSD");
        assert_eq!(MintPhase::Mintable.label("LUSD", "sBULL"), "Mint sBULL");
        assert_eq!(MintPhase::Idle.label("LUSD", "sBULL"), "Enter Amount");
    }

    #[tokio::test]
    async fn insufficient_balance_blocks_approval() {
        let state = connected_state();
        state.mint.send_balance.send_replace(Some(e18(5)));
        state.mint.allowance.send_replace(Some(U256::zero()));
        state.mint.input_amount.send_replace(e18(10));
        let mut notices = state.subscribe_notices();

        let mut submitter = MockTxSubmitter::new();
        submitter.expect_submit().never();
        let orch = orchestrator(
            MintVariant::StayBull,
            state.clone(),
            submitter,
            MockCoSigner::new(),
        );

        let err = orch.execute().await.unwrap_err();
        assert!(matches!(err, ActionError::InsufficientBalance { .. }));
        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Insufficient LUSD balance");
        assert_eq!(orch.phase(), MintPhase::NeedsAllowance);
    }

    #[tokio::test]
    async fn approves_exact_amount_and_stays_until_poll() {
        let state = connected_state();
        state.mint.send_balance.send_replace(Some(e18(50)));
        state.mint.allowance.send_replace(Some(U256::zero()));
        state.mint.input_amount.send_replace(e18(3));

        let mut submitter = MockTxSubmitter::new();
        submitter
            .expect_submit()
            .times(1)
            .withf(|req| {
                req.function == ERC20_APPROVE
                    && req.target == Address::repeat_byte(0x01)
                    && req.args
                        == vec![
                            Token::Address(Address::repeat_byte(0x02)),
                            Token::Uint(U256::from(3u64) * U256::exp10(18)),
                        ]
                    && req.value.is_zero()
            })
            .returning(|_| Ok(ok_outcome()));
        let orch = orchestrator(
            MintVariant::StayBull,
            state.clone(),
            submitter,
            MockCoSigner::new(),
        );

        let outcome = orch.execute().await.unwrap();
        assert!(outcome.succeeded);
        assert_eq!(orch.phase(), MintPhase::NeedsAllowance);

        state.mint.allowance.send_replace(Some(e18(3)));
        assert_eq!(orch.refresh_phase(), MintPhase::Mintable);
    }

    #[tokio::test]
    async fn staybull_mint_pays_marked_up_native_value() {
        let state = connected_state();
        state.mint.allowance.send_replace(Some(e18(10)));
        state.mint.input_amount.send_replace(e18(1));
        let mut notices = state.subscribe_notices();

        let mut submitter = MockTxSubmitter::new();
        submitter
            .expect_submit()
            .times(1)
            .withf(|req| {
                // 1e18 * 0.5 * 1.01
                req.function == STAYBULL_MINT
                    && req.value == U256::from(505_000_000_000_000_000u128)
                    && req.args == vec![Token::Uint(U256::exp10(18))]
            })
            .returning(|_| Ok(ok_outcome()));
        let orch = orchestrator(
            MintVariant::StayBull,
            state.clone(),
            submitter,
            MockCoSigner::new(),
        );

        orch.execute().await.unwrap();
        assert_eq!(
            notices.recv().await.unwrap(),
            Notice::success("Transaction successful")
        );
        assert_eq!(orch.phase(), MintPhase::Mintable);
    }

    #[tokio::test]
    async fn pulsar_mint_fetches_signature_first() {
        let state = connected_state();
        state.mint.allowance.send_replace(Some(e18(10)));
        state.mint.input_amount.send_replace(e18(1));

        let signed_nonce = Arc::new(Mutex::new(None));
        let mut signer = MockCoSigner::new();
        let seen = signed_nonce.clone();
        signer
            .expect_sign_mint()
            .times(1)
            .withf(|msg| msg.price_denominator == "2000000000000000000")
            .returning(move |msg| {
                *seen.lock().unwrap() = Some(msg.nonce);
                Ok(MintSignature {
                    signature: Bytes::from(vec![0xab; 65]),
                    deadline: U256::from(1_900_000_000u64),
                })
            });
        let mut submitter = MockTxSubmitter::new();
        let seen = signed_nonce.clone();
        submitter
            .expect_submit()
            .times(1)
            .withf(move |req| {
                let nonce = seen.lock().unwrap().expect("signature fetched before submit");
                req.function == PULSAR_MINT
                    && req.args.len() == 5
                    && req.args[1] == Token::Uint(U256::from(2u64) * U256::exp10(18))
                    && req.args[2] == Token::Uint(U256::from(nonce))
                    && req.args[3] == Token::Uint(U256::from(1_900_000_000u64))
                    && req.args[4] == Token::Bytes(vec![0xab; 65])
                    // 1e18 / 0.5 / 4 * 1.01
                    && req.value == U256::from(505_000_000_000_000_000u128)
            })
            .returning(|_| Ok(ok_outcome()));
        let orch = orchestrator(MintVariant::Pulsar, state, submitter, signer);

        orch.execute().await.unwrap();
    }

    #[tokio::test]
    async fn insufficient_balance_blocks_mint() {
        let state = connected_state();
        state.mint.send_balance.send_replace(Some(e18(5)));
        state.mint.allowance.send_replace(Some(e18(20)));
        state.mint.input_amount.send_replace(e18(10));
        let mut notices = state.subscribe_notices();

        let mut signer = MockCoSigner::new();
        signer.expect_sign_mint().never();
        let mut submitter = MockTxSubmitter::new();
        submitter.expect_submit().never();
        let orch = orchestrator(MintVariant::Pulsar, state.clone(), submitter, signer);

        let err = orch.execute().await.unwrap_err();
        assert!(matches!(err, ActionError::InsufficientBalance { .. }));
        assert_eq!(
            notices.recv().await.unwrap().message,
            "Insufficient LUSD balance"
        );
        assert_eq!(orch.phase(), MintPhase::Mintable);
    }

    #[tokio::test]
    async fn unknown_balance_blocks_mint_as_loading() {
        let state = connected_state();
        state.mint.send_balance.send_replace(None);
        state.mint.allowance.send_replace(Some(e18(20)));
        state.mint.input_amount.send_replace(e18(1));

        let mut submitter = MockTxSubmitter::new();
        submitter.expect_submit().never();
        let orch = orchestrator(
            MintVariant::StayBull,
            state,
            submitter,
            MockCoSigner::new(),
        );

        let err = orch.execute().await.unwrap_err();
        assert!(matches!(err, ActionError::DataLoading));
    }

    #[tokio::test]
    async fn missing_price_blocks_pulsar_mint() {
        let state = connected_state();
        state.mint.send_quote.send_replace(None);
        state.mint.allowance.send_replace(Some(e18(10)));
        state.mint.input_amount.send_replace(e18(1));

        let mut signer = MockCoSigner::new();
        signer.expect_sign_mint().never();
        let mut submitter = MockTxSubmitter::new();
        submitter.expect_submit().never();
        let orch = orchestrator(MintVariant::Pulsar, state, submitter, signer);

        let err = orch.execute().await.unwrap_err();
        assert!(matches!(err, ActionError::PriceUnavailable));
    }

    #[tokio::test]
    async fn submission_failure_restores_phase_with_short_notice() {
        let state = connected_state();
        state.mint.allowance.send_replace(Some(e18(10)));
        state.mint.input_amount.send_replace(e18(1));
        let mut notices = state.subscribe_notices();

        let mut submitter = MockTxSubmitter::new();
        submitter
            .expect_submit()
            .returning(|_| Err(AppError::Submission("User rejected the request.\ntrace".into())));
        let orch = orchestrator(
            MintVariant::StayBull,
            state.clone(),
            submitter,
            MockCoSigner::new(),
        );

        let err = orch.execute().await.unwrap_err();
        assert!(matches!(err, ActionError::Submission(_)));
        assert_eq!(
            notices.recv().await.unwrap().message,
            "User rejected the request."
        );
        assert_eq!(orch.phase(), MintPhase::Mintable);
    }

    #[tokio::test]
    async fn press_while_submitting_is_ignored() {
        let state = connected_state();
        state.mint.allowance.send_replace(Some(e18(10)));
        state.mint.input_amount.send_replace(e18(1));
        state.mint.phase.send_replace(MintPhase::Submitting);

        let mut submitter = MockTxSubmitter::new();
        submitter.expect_submit().never();
        let orch = orchestrator(
            MintVariant::StayBull,
            state,
            submitter,
            MockCoSigner::new(),
        );
        assert!(matches!(orch.execute().await, Err(ActionError::Busy)));
    }

    #[tokio::test]
    async fn not_connected_submits_nothing() {
        let state = Arc::new(AppState::new());
        state.mint.input_amount.send_replace(e18(1));
        let mut submitter = MockTxSubmitter::new();
        submitter.expect_submit().never();
        let orch = orchestrator(
            MintVariant::StayBull,
            state,
            submitter,
            MockCoSigner::new(),
        );
        assert!(matches!(
            orch.execute().await,
            Err(ActionError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn tracker_follows_allowance_polls() {
        let state = connected_state();
        state.mint.input_amount.send_replace(e18(3));
        let orch = Arc::new(orchestrator(
            MintVariant::StayBull,
            state.clone(),
            MockTxSubmitter::new(),
            MockCoSigner::new(),
        ));
        let _tracker = orch.track_phase();
        let mut phase_rx = state.mint.phase.subscribe();

        state.mint.allowance.send_replace(Some(U256::zero()));
        phase_rx
            .wait_for(|p| *p == MintPhase::NeedsAllowance)
            .await
            .unwrap();

        state.mint.allowance.send_replace(Some(e18(3)));
        phase_rx
            .wait_for(|p| *p == MintPhase::Mintable)
            .await
            .unwrap();
    }
}
