//! Error types for zksession-core
//!
//! This module defines the errors that can occur while building allow-list
//! trees, committing session claims and assembling circuit inputs.

use alloy_primitives::{Address, U256};

use crate::circuit::PermissionDimension;

/// Errors that can occur while preparing session authorization data
///
/// Capacity and shape errors are fatal to the current build and are not
/// retryable without changing the allow-list. Membership errors reject the
/// whole batch before any proving work is started.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Tree configuration cannot be used (zero depth, unsupported arity, ...)
    #[error("Invalid tree configuration: {0}")]
    InvalidConfig(String),

    /// The tree already holds `capacity` leaves
    #[error("Tree is full: capacity of {capacity} leaves reached")]
    TreeFull { capacity: u64 },

    /// No leaf has been inserted at the requested index
    #[error("No leaf at index {index} (tree holds {len} leaves)")]
    LeafNotFound { index: usize, len: usize },

    /// An active permission dimension references an address outside its allow-list
    #[error("{address} is not in the {dimension} allow-list")]
    NotAllowlisted {
        dimension: PermissionDimension,
        address: Address,
    },

    /// A witness does not have the shape the circuit expects
    #[error("Witness shape mismatch: expected {expected} siblings, got {actual}")]
    WitnessShape { expected: usize, actual: usize },

    /// A session claim was set twice
    #[error("Session claim '{0}' was already set")]
    ClaimAlreadySet(&'static str),

    /// A session claim was never set before commit
    #[error("Session claim '{0}' is missing")]
    MissingClaim(&'static str),

    /// No transaction intents were supplied
    #[error("Transaction batch is empty")]
    EmptyBatch,

    /// The batch length differs from the circuit's compiled batch size
    #[error("Circuit expects {expected} transactions per proof, got {actual}")]
    BatchSize { expected: usize, actual: usize },

    /// A value does not fit in the scalar field
    #[error("Value {0:#x} is not a canonical field element")]
    FieldOverflow(U256),

    /// The node hasher failed
    #[error("Hash computation failed: {0}")]
    Hash(String),

    /// ABI or hex encoding/decoding failed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// JSON/TOML (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<toml::ser::Error> for SessionError {
    fn from(err: toml::ser::Error) -> Self {
        SessionError::Serialization(format!("TOML error: {}", err))
    }
}

impl From<alloy_sol_types::Error> for SessionError {
    fn from(err: alloy_sol_types::Error) -> Self {
        SessionError::Encoding(format!("ABI error: {}", err))
    }
}
