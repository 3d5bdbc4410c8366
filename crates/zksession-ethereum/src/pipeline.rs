//! Session pipelines
//!
//! [`SessionPipeline::open_session`] deploys an account and registers a
//! session key with its claims root; [`SessionPipeline::send`] authorizes a
//! transaction under that session with a zero-knowledge proof. Each is a
//! linear sequence of stages and stops at the first failure. Nothing is sent
//! to the bundler before the `Submit` stage.

use alloy_primitives::{Address, Bytes, U256};
use tracing::{info, instrument};
use zksession_core::{
    CircuitInputBuilder, FieldElement, ProofBackend, PublicChallenge, SessionAllowlists,
    SessionMaterial, SignatureComposer, TransactionIntent,
};

use crate::abi;
use crate::assembler::{DummySignature, PipelineProgress, UserOperationAssembler};
use crate::bundler::Bundler;
use crate::config::ChainConfig;
use crate::error::{AtStage, PipelineError, Stage, StageError};
use crate::monitor::{InclusionReceipt, SubmissionMonitor};
use crate::node::NodeClient;
use crate::paymaster::Paymaster;
use crate::signer::{generate_key, sign_operation_hash, signer_from_key};
use crate::user_operation::UserOperation;

/// Salt used for every account deployed by [`SessionPipeline::open_session`]
pub const ACCOUNT_SALT: U256 = U256::ZERO;

/// Drives session operations from intent to inclusion
pub struct SessionPipeline<N, B, P, Z> {
    node: N,
    bundler: B,
    paymaster: Option<P>,
    prover: Z,
    config: ChainConfig,
}

impl<N, B, P, Z> SessionPipeline<N, B, P, Z>
where
    N: NodeClient,
    B: Bundler,
    P: Paymaster,
    Z: ProofBackend,
{
    pub fn new(node: N, bundler: B, paymaster: Option<P>, prover: Z, config: ChainConfig) -> Self {
        Self {
            node,
            bundler,
            paymaster,
            prover,
            config,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn bundler(&self) -> &B {
        &self.bundler
    }

    pub fn prover(&self) -> &Z {
        &self.prover
    }

    pub fn paymaster(&self) -> Option<&P> {
        self.paymaster.as_ref()
    }

    fn assembler(&self) -> UserOperationAssembler<'_, N, B, P> {
        UserOperationAssembler::new(&self.node, &self.bundler, self.paymaster.as_ref(), &self.config)
    }

    /// Deploy a fresh account and register a new session key on it
    ///
    /// Generates the owner and session keys, builds both allow-lists and the
    /// claims root, and submits one owner-signed operation that deploys the
    /// account and calls `addNewZKSessionKey(sessionKey, claimsRoot)`.
    #[instrument(skip_all, fields(contracts = contract_calls.len(), recipients = value_transfers.len()))]
    pub async fn open_session(
        &self,
        contract_calls: &[Address],
        value_transfers: &[Address],
    ) -> Result<(SessionMaterial, InclusionReceipt), PipelineError> {
        let assembler = self.assembler();
        let mut progress = PipelineProgress::new();

        progress.advance(Stage::Permissions)?;
        let (owner_key, owner) = generate_key();
        let (session_private_key, session_key) = generate_key();
        let allowlists =
            SessionAllowlists::build(self.config.allowlist_tree(), contract_calls, value_transfers)
                .at(Stage::Permissions)?;

        progress.advance(Stage::Nonce)?;
        let account = assembler
            .sender_address(owner, ACCOUNT_SALT)
            .await
            .at(Stage::Nonce)?;
        let nonce = assembler.nonce(account).await.at(Stage::Nonce)?;
        info!(%account, %owner, %session_key, "Opening session");

        let mut material = SessionMaterial {
            account,
            owner_private_key: owner_key,
            session_private_key,
            session_key,
            allowed_contracts: contract_calls.to_vec(),
            allowed_recipients: value_transfers.to_vec(),
            claims_root: FieldElement::ZERO,
        };
        let commitment = material
            .commitment(&allowlists, self.config.claims_tree())
            .at(Stage::Nonce)?;
        material.claims_root = commitment.root();

        let mut operation = assembler.operation(
            account,
            nonce,
            abi::add_session_key_call(session_key, commitment.root()),
        );

        progress.advance(Stage::GasPrice)?;
        assembler
            .apply_gas_price(&mut operation)
            .await
            .at(Stage::GasPrice)?;

        progress.advance(Stage::Deployment)?;
        assembler.attach_deployment(&mut operation, owner, ACCOUNT_SALT);

        progress.advance(Stage::DummySignature)?;
        assembler.apply_dummy_signature(&mut operation, DummySignature::Ecdsa);

        progress.advance(Stage::Sponsor)?;
        assembler.sponsor(&mut operation).await.at(Stage::Sponsor)?;

        progress.advance(Stage::Challenge)?;
        let (hash, _) = assembler.challenge(&operation).at(Stage::Challenge)?;

        progress.advance(Stage::ComposeSignature)?;
        let owner_signer = signer_from_key(owner_key).at(Stage::ComposeSignature)?;
        operation.signature =
            sign_operation_hash(&owner_signer, hash).at(Stage::ComposeSignature)?;

        let receipt = self.submit_and_wait(&mut progress, &operation).await?;
        info!(%account, claims_root = %material.claims_root, "Session opened");
        Ok((material, receipt))
    }

    /// Send `value` and `data` to `dest` from the session's account
    ///
    /// The intent is checked against the session allow-lists before any
    /// network call. The proof must echo both the session claims root and
    /// the operation challenge, otherwise nothing is signed or submitted.
    #[instrument(skip_all, fields(account = %material.account, %dest, %value))]
    pub async fn send(
        &self,
        material: &SessionMaterial,
        dest: Address,
        value: U256,
        data: Bytes,
    ) -> Result<InclusionReceipt, PipelineError> {
        let assembler = self.assembler();
        let mut progress = PipelineProgress::new();

        progress.advance(Stage::Permissions)?;
        let allowlists = material
            .allowlists(self.config.allowlist_tree())
            .at(Stage::Permissions)?;
        let commitment = material
            .commitment(&allowlists, self.config.claims_tree())
            .at(Stage::Permissions)?;
        if !commitment.matches(material.claims_root) {
            return Err(StageError::StaleSession {
                stored: material.claims_root,
                computed: commitment.root(),
            })
            .at(Stage::Permissions);
        }

        let intent = TransactionIntent::from_call(dest, value, &data);
        let mut builder =
            CircuitInputBuilder::new(&allowlists.value_transfers, &allowlists.contract_calls);
        if let Some(size) = self.config.batch_size {
            builder = builder.with_batch_size(size);
        }
        // Witnesses do not depend on the challenge; it is filled in once the
        // operation hash is known.
        let mut inputs = builder
            .build(
                material.account,
                material.session_key,
                PublicChallenge::from_field(FieldElement::ZERO),
                &[intent],
            )
            .at(Stage::Permissions)?;

        progress.advance(Stage::Nonce)?;
        let nonce = assembler.nonce(material.account).await.at(Stage::Nonce)?;
        let mut operation = assembler.operation(
            material.account,
            nonce,
            assembler.execute_call_data(dest, value, data),
        );

        progress.advance(Stage::GasPrice)?;
        assembler
            .apply_gas_price(&mut operation)
            .await
            .at(Stage::GasPrice)?;
        assembler.apply_verification_gas(&mut operation);

        progress.advance(Stage::DummySignature)?;
        assembler.apply_dummy_signature(
            &mut operation,
            DummySignature::Session {
                session_key: material.session_key,
            },
        );

        progress.advance(Stage::Sponsor)?;
        assembler.sponsor(&mut operation).await.at(Stage::Sponsor)?;

        progress.advance(Stage::Challenge)?;
        let (hash, challenge) = assembler.challenge(&operation).at(Stage::Challenge)?;
        inputs.op = challenge.as_field();

        progress.advance(Stage::Proof)?;
        let execution = self.prover.execute(&inputs).await.at(Stage::Proof)?;
        let proof = self.prover.prove(&execution).await.at(Stage::Proof)?;
        let proven_root = proof.claims_root().at(Stage::Proof)?;
        if !commitment.matches(proven_root) {
            return Err(StageError::ClaimsRootMismatch {
                expected: commitment.root(),
                actual: proven_root,
            })
            .at(Stage::Proof);
        }
        let proven_challenge = proof.challenge().at(Stage::Proof)?;
        if proven_challenge != challenge.as_u256() {
            return Err(StageError::ChallengeMismatch {
                expected: challenge.as_field(),
                actual: proven_challenge,
            })
            .at(Stage::Proof);
        }
        info!(proof_len = proof.proof.len(), "Session proof generated");

        progress.advance(Stage::ComposeSignature)?;
        let session_signer =
            signer_from_key(material.session_private_key).at(Stage::ComposeSignature)?;
        let ecdsa = sign_operation_hash(&session_signer, hash).at(Stage::ComposeSignature)?;
        operation.signature =
            SignatureComposer::compose(challenge, material.session_key, &ecdsa, &proof.proof);

        self.submit_and_wait(&mut progress, &operation).await
    }

    async fn submit_and_wait(
        &self,
        progress: &mut PipelineProgress,
        operation: &UserOperation,
    ) -> Result<InclusionReceipt, PipelineError> {
        let monitor = SubmissionMonitor::new(&self.bundler, self.config.entry_point);

        progress.advance(Stage::Submit)?;
        operation.validate().at(Stage::Submit)?;
        let user_op_hash = monitor.submit(operation).await.at(Stage::Submit)?;

        progress.advance(Stage::AwaitReceipt)?;
        monitor
            .await_inclusion(user_op_hash, &self.config.poll)
            .await
            .at(Stage::AwaitReceipt)
    }
}
