//! Read-only chain queries
//!
//! The pipeline needs two facts from the chain: the sender's EntryPoint
//! nonce and the counterfactual address of an account that is not deployed
//! yet. Both are `eth_call`s.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolValue;
use core::future::Future;
use tracing::debug;

use crate::abi;
use crate::error::RpcError;
use crate::rpc::JsonRpcClient;

/// Chain queries used by the pipeline
pub trait NodeClient: Send + Sync {
    /// `EntryPoint.getNonce(sender, 0)`
    fn nonce(
        &self,
        entry_point: Address,
        sender: Address,
    ) -> impl Future<Output = Result<U256, RpcError>> + Send;

    /// Address the factory deploys for `(owner, salt)`
    fn sender_address(
        &self,
        factory: Address,
        owner: Address,
        salt: U256,
    ) -> impl Future<Output = Result<Address, RpcError>> + Send;
}

/// [`NodeClient`] over a node's JSON-RPC endpoint
#[derive(Debug)]
pub struct HttpNodeClient {
    rpc: JsonRpcClient,
}

impl HttpNodeClient {
    pub fn new(rpc_url: &str) -> Result<Self, RpcError> {
        Ok(Self {
            rpc: JsonRpcClient::new(rpc_url)?,
        })
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        self.rpc
            .request(
                "eth_call",
                serde_json::json!([{ "to": to, "data": data }, "latest"]),
            )
            .await
    }
}

impl NodeClient for HttpNodeClient {
    async fn nonce(&self, entry_point: Address, sender: Address) -> Result<U256, RpcError> {
        let output = self.call(entry_point, abi::get_nonce_call(sender)).await?;
        let nonce = U256::abi_decode(&output)
            .map_err(|e| RpcError::Decode(format!("getNonce: {}", e)))?;
        debug!(%sender, %nonce, "Fetched account nonce");
        Ok(nonce)
    }

    async fn sender_address(
        &self,
        factory: Address,
        owner: Address,
        salt: U256,
    ) -> Result<Address, RpcError> {
        let output = self.call(factory, abi::get_address_call(owner, salt)).await?;
        let sender = Address::abi_decode(&output)
            .map_err(|e| RpcError::Decode(format!("getAddress: {}", e)))?;
        debug!(%owner, %sender, "Resolved counterfactual account address");
        Ok(sender)
    }
}
