//! Noir proof backend for zero-knowledge session keys
//!
//! [`NargoBackend`] implements [`zksession_core::ProofBackend`] by running the
//! `nargo` and `bb` binaries against a compiled session circuit. Both tools
//! must be on `PATH` (or configured through [`NoirConfig`]).

pub mod backend;
pub mod output;

pub use backend::{NargoBackend, NoirConfig};
pub use output::{parse_public_inputs, read_proof_dir};
