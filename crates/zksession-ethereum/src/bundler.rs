//! Bundler client
//!
//! Speaks the ERC-4337 bundler JSON-RPC namespace (`eth_*UserOperation*`)
//! plus Pimlico's gas price extension.

use alloy_primitives::{Address, B256, U256};
use core::future::Future;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RpcError;
use crate::rpc::JsonRpcClient;
use crate::user_operation::UserOperation;

/// Fee pair of one gas price tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPrice {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// Gas price tiers suggested by the bundler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPriceTiers {
    pub slow: GasPrice,
    pub standard: GasPrice,
    pub fast: GasPrice,
}

/// Gas limits estimated by the bundler for an unsponsored operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U256,
    pub call_gas_limit: U256,
}

impl GasEstimate {
    /// Fill the operation's gas limits, keeping a verification limit that was
    /// set explicitly if it is higher
    pub fn apply(&self, operation: &mut UserOperation) {
        operation.pre_verification_gas = Some(self.pre_verification_gas);
        operation.call_gas_limit = Some(self.call_gas_limit);
        operation.verification_gas_limit = Some(
            operation
                .verification_gas_limit
                .map_or(self.verification_gas_limit, |set| set.max(self.verification_gas_limit)),
        );
    }
}

/// Transaction part of a user operation receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U256>,
}

/// Receipt returned by `eth_getUserOperationReceipt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: B256,
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub actual_gas_used: Option<U256>,
    pub receipt: TransactionReceipt,
}

impl UserOperationReceipt {
    pub fn transaction_hash(&self) -> B256 {
        self.receipt.transaction_hash
    }
}

/// Bundler operations used by the pipeline
pub trait Bundler: Send + Sync {
    /// Current gas price tiers
    fn gas_price(&self) -> impl Future<Output = Result<GasPriceTiers, RpcError>> + Send;

    /// Gas limits for an operation carrying a placeholder signature
    fn estimate_user_operation_gas(
        &self,
        operation: &UserOperation,
        entry_point: Address,
    ) -> impl Future<Output = Result<GasEstimate, RpcError>> + Send;

    /// Submit a signed operation, returning its hash
    fn send_user_operation(
        &self,
        operation: &UserOperation,
        entry_point: Address,
    ) -> impl Future<Output = Result<B256, RpcError>> + Send;

    /// Receipt of an operation, `None` while it is still pending
    fn user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> impl Future<Output = Result<Option<UserOperationReceipt>, RpcError>> + Send;
}

/// [`Bundler`] over a Pimlico-compatible JSON-RPC endpoint
#[derive(Debug)]
pub struct HttpBundler {
    rpc: JsonRpcClient,
}

impl HttpBundler {
    pub fn new(url: &str) -> Result<Self, RpcError> {
        Ok(Self {
            rpc: JsonRpcClient::new(url)?,
        })
    }
}

impl Bundler for HttpBundler {
    async fn gas_price(&self) -> Result<GasPriceTiers, RpcError> {
        let tiers: GasPriceTiers = self
            .rpc
            .request("pimlico_getUserOperationGasPrice", serde_json::json!([]))
            .await?;
        debug!(
            max_fee = %tiers.fast.max_fee_per_gas,
            max_priority_fee = %tiers.fast.max_priority_fee_per_gas,
            "Fetched gas price tiers"
        );
        Ok(tiers)
    }

    async fn estimate_user_operation_gas(
        &self,
        operation: &UserOperation,
        entry_point: Address,
    ) -> Result<GasEstimate, RpcError> {
        self.rpc
            .request(
                "eth_estimateUserOperationGas",
                serde_json::json!([operation, entry_point]),
            )
            .await
    }

    async fn send_user_operation(
        &self,
        operation: &UserOperation,
        entry_point: Address,
    ) -> Result<B256, RpcError> {
        let hash: B256 = self
            .rpc
            .request(
                "eth_sendUserOperation",
                serde_json::json!([operation, entry_point]),
            )
            .await?;
        info!(user_op_hash = %hash, "User operation accepted by bundler");
        Ok(hash)
    }

    async fn user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>, RpcError> {
        self.rpc
            .request("eth_getUserOperationReceipt", serde_json::json!([user_op_hash]))
            .await
    }
}
