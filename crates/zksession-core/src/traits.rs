//! Trait definitions for zksession-core
//!
//! This module contains the port through which the pipeline drives a proving
//! system: witness generation from circuit inputs, then proof generation from
//! the witness. Adapters live in their own crates (for example the `nargo`/`bb`
//! subprocess backend) so the core stays free of process and file handling.

use alloy_primitives::{Bytes, U256};
use core::future::Future;
use thiserror::Error;

use crate::circuit::CircuitInputs;
use crate::field::FieldElement;

/// Index of the session claims root among the proof's public signals
pub const PUBLIC_SIGNAL_CLAIMS_ROOT: usize = 7;

/// Index of the operation challenge among the proof's public signals
pub const PUBLIC_SIGNAL_CHALLENGE: usize = 8;

/// Errors that can occur while executing or proving the session circuit
#[derive(Debug, Error)]
pub enum ProverError {
    /// The inputs do not satisfy the circuit's constraints
    #[error("Witness generation failed: {0}")]
    WitnessGeneration(String),

    #[error("Proof generation failed: {0}")]
    ProofGeneration(String),

    /// A required prover binary is not installed or not on `PATH`
    #[error("Prover binary '{0}' not found")]
    BinaryNotFound(String),

    /// The prover produced output that cannot be interpreted
    #[error("Invalid prover output: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of executing the circuit on a set of inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitExecution {
    /// Backend-specific serialized witness
    pub witness: Vec<u8>,
    /// Public signals computed during execution, when the backend reports them
    pub public_signals: Vec<U256>,
}

/// A generated proof together with its public signals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitProof {
    pub proof: Bytes,
    pub public_signals: Vec<U256>,
}

impl CircuitProof {
    /// Public signal at `index`
    pub fn public_signal(&self, index: usize) -> Result<U256, ProverError> {
        self.public_signals.get(index).copied().ok_or_else(|| {
            ProverError::InvalidOutput(format!(
                "proof exposes {} public signals, index {} requested",
                self.public_signals.len(),
                index
            ))
        })
    }

    /// Session claims root the proof was generated against
    pub fn claims_root(&self) -> Result<FieldElement, ProverError> {
        let value = self.public_signal(PUBLIC_SIGNAL_CLAIMS_ROOT)?;
        FieldElement::new(value).map_err(|e| ProverError::InvalidOutput(e.to_string()))
    }

    /// Operation challenge the proof was generated for
    pub fn challenge(&self) -> Result<U256, ProverError> {
        self.public_signal(PUBLIC_SIGNAL_CHALLENGE)
    }

    /// Proof bytes as `0x`-prefixed hex
    pub fn proof_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.proof))
    }
}

/// Trait for generating session proofs
///
/// Implementations may shell out to external provers (e.g. `nargo` and `bb`)
/// or use in-process proving libraries. Both steps are asynchronous so that
/// proving does not block the runtime driving the rest of the pipeline.
///
/// # Examples
///
/// ```rust,ignore
/// let execution = backend.execute(&inputs).await?;
/// let proof = backend.prove(&execution).await?;
/// let challenge = proof.challenge()?;
/// ```
pub trait ProofBackend: Send + Sync {
    /// Execute the circuit and produce a witness
    ///
    /// # Arguments
    ///
    /// * `inputs` - Fully assembled circuit inputs
    ///
    /// # Returns
    ///
    /// * `Ok(CircuitExecution)` - Witness and any public signals reported
    /// * `Err(ProverError::WitnessGeneration)` - The constraints are not satisfied
    fn execute(
        &self,
        inputs: &CircuitInputs,
    ) -> impl Future<Output = Result<CircuitExecution, ProverError>> + Send;

    /// Generate a proof from a witness
    ///
    /// # Arguments
    ///
    /// * `execution` - Output of [`ProofBackend::execute`]
    ///
    /// # Returns
    ///
    /// * `Ok(CircuitProof)` - Proof bytes and public signals
    /// * `Err(ProverError)` - Proving failed
    fn prove(
        &self,
        execution: &CircuitExecution,
    ) -> impl Future<Output = Result<CircuitProof, ProverError>> + Send;
}
