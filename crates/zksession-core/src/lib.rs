//! Core types and traits for zero-knowledge session authorization
//!
//! This crate provides the off-chain half of a session-key scheme in which an
//! ERC-4337 account accepts operations signed by a delegated key only when a
//! succinct proof shows that every destination belongs to the session's
//! allow-lists.
//!
//! # Components
//!
//! - **Allow-list trees**: fixed-depth incremental Poseidon Merkle trees over
//!   addresses ([`AddressAllowlist`])
//! - **Session claims**: the 4-leaf commitment binding account, session key and
//!   both allow-list roots ([`SessionClaimsCommitment`])
//! - **Circuit inputs**: deterministic prover input assembly with membership
//!   witnesses and placeholders ([`CircuitInputBuilder`])
//! - **Signature composition**: the account's signature wire format
//!   ([`SignatureComposer`])
//! - **Proof backend port**: the narrow interface a prover adapter implements
//!   ([`ProofBackend`])
//!
//! # Usage
//!
//! ```rust
//! use alloy_primitives::{address, U256};
//! use zksession_core::{
//!     AddressAllowlist, AllowlistTree, CircuitInputBuilder, PublicChallenge,
//!     TransactionIntent, TreeConfig,
//! };
//!
//! let recipients = AddressAllowlist::from_addresses(
//!     TreeConfig::allowlist(),
//!     &[address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2")],
//! )?;
//! let contracts = AddressAllowlist::from_addresses(
//!     TreeConfig::allowlist(),
//!     &[address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1")],
//! )?;
//!
//! let intent = TransactionIntent::value_transfer(
//!     address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2"),
//!     U256::from(1u64),
//! );
//! let inputs = CircuitInputBuilder::new(&recipients, &contracts).build(
//!     address!("1111111111111111111111111111111111111111"),
//!     address!("2222222222222222222222222222222222222222"),
//!     PublicChallenge::from_hash([7u8; 32].into()),
//!     &[intent],
//! )?;
//! assert_eq!(inputs.dest.len(), 1);
//! # Ok::<(), zksession_core::SessionError>(())
//! ```

pub mod allowlist;
pub mod circuit;
pub mod claims;
pub mod error;
pub mod field;
pub mod hasher;
pub mod material;
pub mod merkle;
pub mod signature;
pub mod traits;

pub use allowlist::{AddressAllowlist, AllowlistTree, SessionAllowlists};
pub use circuit::{
    pack_path_indices, CircuitInputBuilder, CircuitInputs, PermissionDimension, TransactionIntent,
    ERC20_TRANSFER_SELECTOR,
};
pub use claims::{SessionClaims, SessionClaimsBuilder, SessionClaimsCommitment, CLAIM_COUNT};
pub use error::SessionError;
pub use field::{FieldElement, PublicChallenge, SNARK_SCALAR_FIELD};
pub use hasher::{NodeHasher, PoseidonHasher};
pub use material::SessionMaterial;
pub use merkle::{
    IncrementalMerkleTree, MerkleWitness, TreeConfig, DEFAULT_ALLOWLIST_DEPTH, DEFAULT_CLAIMS_DEPTH,
};
pub use signature::{
    ComposedSignature, SignatureComposer, DEFAULT_PROOF_LENGTH, DUMMY_ECDSA_SIGNATURE,
    ECDSA_SIGNATURE_LENGTH,
};
pub use traits::{
    CircuitExecution, CircuitProof, ProofBackend, ProverError, PUBLIC_SIGNAL_CHALLENGE,
    PUBLIC_SIGNAL_CLAIMS_ROOT,
};
