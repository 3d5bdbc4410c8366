//! ERC-4337 v0.7 support for zero-knowledge session keys
//!
//! This crate turns session intents into submitted user operations:
//!
//! - [`UserOperation`] hashing and packing as the v0.7 EntryPoint does it
//! - JSON-RPC adapters for the node ([`HttpNodeClient`]), the bundler
//!   ([`HttpBundler`]) and the paymaster ([`HttpPaymaster`])
//! - [`UserOperationAssembler`] stage helpers and [`SubmissionMonitor`]
//! - [`SessionPipeline`], which runs the whole flow and reports the stage at
//!   which it failed
//!
//! The adapters sit behind the [`NodeClient`], [`Bundler`] and [`Paymaster`]
//! traits so the pipeline can be driven by in-process implementations.

pub mod abi;
pub mod assembler;
pub mod bundler;
pub mod config;
pub mod error;
pub mod monitor;
pub mod node;
pub mod paymaster;
pub mod pipeline;
pub mod rpc;
pub mod signer;
pub mod user_operation;

pub use assembler::{DummySignature, PipelineProgress, UserOperationAssembler};
pub use bundler::{
    Bundler, GasEstimate, GasPrice, GasPriceTiers, HttpBundler, TransactionReceipt,
    UserOperationReceipt,
};
pub use config::{pimlico_url, ChainConfig, DEFAULT_FACTORY, ENTRY_POINT_V07};
pub use error::{
    AtStage, PipelineError, RpcError, SignerError, SponsorshipError, Stage, StageError,
    SubmissionError, UserOperationError,
};
pub use monitor::{InclusionReceipt, PollConfig, SubmissionMonitor};
pub use node::{HttpNodeClient, NodeClient};
pub use paymaster::{HttpPaymaster, Paymaster, SponsorshipResult};
pub use pipeline::{SessionPipeline, ACCOUNT_SALT};
pub use rpc::JsonRpcClient;
pub use signer::{generate_key, sign_operation_hash, signer_from_key};
pub use user_operation::UserOperation;
