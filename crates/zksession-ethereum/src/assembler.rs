//! User operation assembly
//!
//! [`UserOperationAssembler`] performs the individual assembly steps against
//! the node, bundler and optional paymaster. [`PipelineProgress`] keeps the
//! steps in their fixed order; a pipeline may skip stages but never go back.

use alloy_primitives::{Address, Bytes, B256, U256};
use tracing::{debug, info};
use zksession_core::{PublicChallenge, SignatureComposer, DUMMY_ECDSA_SIGNATURE};

use crate::abi;
use crate::bundler::Bundler;
use crate::config::ChainConfig;
use crate::error::{PipelineError, RpcError, Stage, StageError, UserOperationError};
use crate::node::NodeClient;
use crate::paymaster::Paymaster;
use crate::user_operation::UserOperation;

/// Forward-only record of the stages a pipeline has entered
#[derive(Debug, Clone, Default)]
pub struct PipelineProgress {
    completed: Vec<Stage>,
}

impl PipelineProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `stage`, failing if it does not come after the current one
    pub fn advance(&mut self, stage: Stage) -> Result<(), PipelineError> {
        if let Some(&current) = self.completed.last() {
            if stage <= current {
                return Err(PipelineError {
                    stage,
                    source: StageError::OutOfOrder {
                        from: current,
                        to: stage,
                    },
                });
            }
        }
        debug!(%stage, "Entering stage");
        self.completed.push(stage);
        Ok(())
    }

    pub fn current(&self) -> Option<Stage> {
        self.completed.last().copied()
    }

    /// Stages entered so far, in order
    pub fn stages(&self) -> &[Stage] {
        &self.completed
    }
}

/// Placeholder signature installed before gas estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DummySignature {
    /// 65-byte owner signature
    Ecdsa,
    /// Composed session signature with a proof of the configured length
    Session { session_key: Address },
}

/// Assembly steps for one user operation
pub struct UserOperationAssembler<'a, N, B, P> {
    node: &'a N,
    bundler: &'a B,
    paymaster: Option<&'a P>,
    config: &'a ChainConfig,
}

impl<'a, N, B, P> UserOperationAssembler<'a, N, B, P>
where
    N: NodeClient,
    B: Bundler,
    P: Paymaster,
{
    pub fn new(node: &'a N, bundler: &'a B, paymaster: Option<&'a P>, config: &'a ChainConfig) -> Self {
        Self {
            node,
            bundler,
            paymaster,
            config,
        }
    }

    /// Unsigned operation calling the account with `call_data`
    pub fn operation(&self, sender: Address, nonce: U256, call_data: Bytes) -> UserOperation {
        UserOperation {
            sender,
            nonce,
            call_data,
            ..Default::default()
        }
    }

    /// Call data for a session transaction
    pub fn execute_call_data(&self, dest: Address, value: U256, data: Bytes) -> Bytes {
        abi::execute_call(dest, value, data)
    }

    /// Current EntryPoint nonce of `sender`
    pub async fn nonce(&self, sender: Address) -> Result<U256, RpcError> {
        self.node.nonce(self.config.entry_point, sender).await
    }

    /// Counterfactual address of the account owned by `owner`
    pub async fn sender_address(&self, owner: Address, salt: U256) -> Result<Address, RpcError> {
        self.node.sender_address(self.config.factory, owner, salt).await
    }

    /// Price the operation at the bundler's fast tier
    pub async fn apply_gas_price(&self, operation: &mut UserOperation) -> Result<(), RpcError> {
        let tiers = self.bundler.gas_price().await?;
        operation.max_fee_per_gas = tiers.fast.max_fee_per_gas;
        operation.max_priority_fee_per_gas = tiers.fast.max_priority_fee_per_gas;
        Ok(())
    }

    /// Add `factory`/`factoryData` deploying the account on first use
    pub fn attach_deployment(&self, operation: &mut UserOperation, owner: Address, salt: U256) {
        operation.factory = Some(self.config.factory);
        operation.factory_data = Some(abi::create_account_call(owner, salt));
    }

    /// Set the verification gas the proof-checking account needs
    pub fn apply_verification_gas(&self, operation: &mut UserOperation) {
        operation.verification_gas_limit = Some(U256::from(self.config.verification_gas_limit));
    }

    pub fn apply_dummy_signature(&self, operation: &mut UserOperation, kind: DummySignature) {
        operation.signature = match kind {
            DummySignature::Ecdsa => Bytes::copy_from_slice(&DUMMY_ECDSA_SIGNATURE),
            DummySignature::Session { session_key } => {
                SignatureComposer::placeholder(session_key, self.config.proof_length)
            }
        };
    }

    /// Merge paymaster sponsorship, or bundler gas estimates when no
    /// paymaster is configured
    pub async fn sponsor(&self, operation: &mut UserOperation) -> Result<(), StageError> {
        let entry_point = self.config.entry_point;
        match self.paymaster {
            Some(paymaster) => {
                let sponsorship = paymaster.sponsor(operation, entry_point).await?;
                sponsorship.apply(operation);
            }
            None => {
                info!("No paymaster configured, estimating gas with the bundler");
                let estimate = self
                    .bundler
                    .estimate_user_operation_gas(operation, entry_point)
                    .await?;
                estimate.apply(operation);
            }
        }
        Ok(())
    }

    /// Operation hash and the challenge derived from it
    pub fn challenge(
        &self,
        operation: &UserOperation,
    ) -> Result<(B256, PublicChallenge), UserOperationError> {
        let hash = operation.hash(self.config.entry_point, self.config.chain_id)?;
        let challenge = PublicChallenge::from_hash(hash);
        debug!(operation_hash = %hash, %challenge, "Derived operation challenge");
        Ok((hash, challenge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_allows_skipping_forward() {
        let mut progress = PipelineProgress::new();
        progress.advance(Stage::Nonce).unwrap();
        progress.advance(Stage::GasPrice).unwrap();
        progress.advance(Stage::DummySignature).unwrap();
        assert_eq!(progress.current(), Some(Stage::DummySignature));
        assert_eq!(progress.stages().len(), 3);
    }

    #[test]
    fn test_progress_rejects_going_back() {
        let mut progress = PipelineProgress::new();
        progress.advance(Stage::Sponsor).unwrap();
        let err = progress.advance(Stage::GasPrice).unwrap_err();
        assert_eq!(err.stage, Stage::GasPrice);
        assert!(matches!(
            err.source,
            StageError::OutOfOrder {
                from: Stage::Sponsor,
                to: Stage::GasPrice
            }
        ));

        assert!(progress.advance(Stage::Sponsor).is_err());
    }
}
