//! Error types for zksession-ethereum
//!
//! Errors are layered the way the pipeline is: transport and JSON-RPC errors
//! at the bottom, sponsorship and submission errors above them, and
//! [`PipelineError`] at the top naming the stage that failed.

use alloy_primitives::{B256, U256};
use core::fmt;
use thiserror::Error;
use zksession_core::{FieldElement, ProverError, SessionError};

/// Errors from a JSON-RPC endpoint
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request never produced a response (connection, TLS, HTTP status)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response could not be decoded into the expected type
    #[error("Failed to decode RPC response: {0}")]
    Decode(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

impl RpcError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, RpcError::Transport(_))
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Decode(err.to_string())
    }
}

/// Paymaster failures, keeping a refusal apart from an unreachable service
#[derive(Debug, Error)]
pub enum SponsorshipError {
    /// The paymaster answered and declined to sponsor the operation
    #[error("Sponsorship rejected ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Paymaster unreachable: {0}")]
    Network(RpcError),
}

impl From<RpcError> for SponsorshipError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Rpc { code, message } => SponsorshipError::Rejected { code, message },
            other => SponsorshipError::Network(other),
        }
    }
}

/// Errors while submitting an operation or waiting for its inclusion
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// No receipt appeared before the deadline
    #[error("No receipt for user operation {user_op_hash} after {elapsed_secs}s")]
    Timeout { user_op_hash: B256, elapsed_secs: u64 },

    /// The operation was included but its execution reverted
    #[error("User operation reverted in transaction {transaction_hash}: {reason}")]
    Reverted {
        transaction_hash: B256,
        reason: String,
    },
}

/// A user operation that cannot be hashed or sent yet
#[derive(Debug, Error)]
pub enum UserOperationError {
    #[error("User operation field '{0}' is not set")]
    MissingField(&'static str),

    #[error("User operation field '{field}' does not fit in 128 bits: {value}")]
    GasOverflow { field: &'static str, value: U256 },
}

/// Signing failures
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Stages of a session pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Check the intents against the session allow-lists
    Permissions,
    Nonce,
    GasPrice,
    Deployment,
    DummySignature,
    Sponsor,
    Challenge,
    Proof,
    ComposeSignature,
    Submit,
    AwaitReceipt,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Permissions => "permissions",
            Stage::Nonce => "nonce",
            Stage::GasPrice => "gas price",
            Stage::Deployment => "deployment",
            Stage::DummySignature => "dummy signature",
            Stage::Sponsor => "sponsor",
            Stage::Challenge => "challenge",
            Stage::Proof => "proof",
            Stage::ComposeSignature => "compose signature",
            Stage::Submit => "submit",
            Stage::AwaitReceipt => "await receipt",
        };
        f.write_str(name)
    }
}

/// Cause of a pipeline stage failure
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Prover(#[from] ProverError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Sponsorship(#[from] SponsorshipError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Operation(#[from] UserOperationError),

    #[error(transparent)]
    Signer(#[from] SignerError),

    /// The proof was generated for a different operation
    #[error("Proof challenge {actual:#x} does not match operation challenge {expected}")]
    ChallengeMismatch { expected: FieldElement, actual: U256 },

    /// The proof was generated against a different session snapshot
    #[error("Proof claims root {actual} does not match session claims root {expected}")]
    ClaimsRootMismatch {
        expected: FieldElement,
        actual: FieldElement,
    },

    /// Stored session material disagrees with its own allow-lists
    #[error("Session material claims root {stored} differs from recomputed root {computed}")]
    StaleSession {
        stored: FieldElement,
        computed: FieldElement,
    },

    #[error("Stage {to} cannot follow stage {from}")]
    OutOfOrder { from: Stage, to: Stage },
}

/// A pipeline aborted at `stage`
#[derive(Debug, Error)]
#[error("Pipeline failed at {stage} stage: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

/// Attach the failing stage to a result
pub trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T, E: Into<StageError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError {
            stage,
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_becomes_rejection() {
        let err = SponsorshipError::from(RpcError::Rpc {
            code: -32500,
            message: "insufficient balance".into(),
        });
        assert!(matches!(err, SponsorshipError::Rejected { code: -32500, .. }));

        let err = SponsorshipError::from(RpcError::Transport("connection refused".into()));
        assert!(matches!(err, SponsorshipError::Network(_)));
    }

    #[test]
    fn test_pipeline_error_names_stage() {
        let result: Result<(), SessionError> = Err(SessionError::EmptyBatch);
        let err = result.at(Stage::Permissions).unwrap_err();
        assert_eq!(err.stage, Stage::Permissions);
        assert!(err.to_string().contains("permissions stage"));
    }

    #[test]
    fn test_stage_order() {
        assert!(Stage::Nonce < Stage::GasPrice);
        assert!(Stage::Sponsor < Stage::Challenge);
        assert!(Stage::Submit < Stage::AwaitReceipt);
    }
}
