//! Paymaster sponsorship
//!
//! A sponsoring paymaster returns its own fields together with gas limits it
//! simulated; all of them are merged over the operation before it is hashed.

use alloy_primitives::{Address, Bytes, U256};
use core::future::Future;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::SponsorshipError;
use crate::rpc::JsonRpcClient;
use crate::user_operation::UserOperation;

/// Fields returned by `pm_sponsorUserOperation`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipResult {
    pub paymaster: Address,
    pub paymaster_verification_gas_limit: U256,
    pub paymaster_post_op_gas_limit: U256,
    pub paymaster_data: Bytes,
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U256,
    pub call_gas_limit: U256,
}

impl SponsorshipResult {
    /// Merge the sponsorship over the operation
    pub fn apply(&self, operation: &mut UserOperation) {
        operation.paymaster = Some(self.paymaster);
        operation.paymaster_verification_gas_limit = Some(self.paymaster_verification_gas_limit);
        operation.paymaster_post_op_gas_limit = Some(self.paymaster_post_op_gas_limit);
        operation.paymaster_data = Some(self.paymaster_data.clone());
        operation.pre_verification_gas = Some(self.pre_verification_gas);
        operation.verification_gas_limit = Some(self.verification_gas_limit);
        operation.call_gas_limit = Some(self.call_gas_limit);
    }
}

/// Paymaster operations used by the pipeline
pub trait Paymaster: Send + Sync {
    /// Ask the paymaster to sponsor `operation`
    ///
    /// A refusal is [`SponsorshipError::Rejected`]; an unreachable service is
    /// [`SponsorshipError::Network`].
    fn sponsor(
        &self,
        operation: &UserOperation,
        entry_point: Address,
    ) -> impl Future<Output = Result<SponsorshipResult, SponsorshipError>> + Send;
}

/// [`Paymaster`] over a Pimlico-compatible JSON-RPC endpoint
#[derive(Debug)]
pub struct HttpPaymaster {
    rpc: JsonRpcClient,
}

impl HttpPaymaster {
    pub fn new(url: &str) -> Result<Self, SponsorshipError> {
        Ok(Self {
            rpc: JsonRpcClient::new(url).map_err(SponsorshipError::Network)?,
        })
    }
}

impl Paymaster for HttpPaymaster {
    async fn sponsor(
        &self,
        operation: &UserOperation,
        entry_point: Address,
    ) -> Result<SponsorshipResult, SponsorshipError> {
        let result: Result<SponsorshipResult, _> = self
            .rpc
            .request(
                "pm_sponsorUserOperation",
                serde_json::json!([operation, entry_point]),
            )
            .await;

        match result {
            Ok(sponsorship) => {
                info!(paymaster = %sponsorship.paymaster, "Operation sponsored");
                Ok(sponsorship)
            }
            Err(e) => {
                warn!(error = %e, "Sponsorship failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const SPONSORED: &str = r#"{"jsonrpc":"2.0","id":1,"result":{
        "paymaster":"0x0000000000000039cd5e8ae05257ce51c473ddd1",
        "paymasterVerificationGasLimit":"0x8a8e",
        "paymasterPostOpGasLimit":"0x1",
        "paymasterData":"0x00000000000000000000000000000000000000000000000000000066a0b0c0",
        "preVerificationGas":"0x1def0",
        "verificationGasLimit":"0x75300",
        "callGasLimit":"0x1cf19"}}"#;

    #[tokio::test]
    async fn test_sponsorship_is_merged() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_body(SPONSORED)
            .create_async()
            .await;

        let paymaster = HttpPaymaster::new(&server.url()).unwrap();
        let mut op = UserOperation::default();
        let sponsorship = paymaster.sponsor(&op, Address::ZERO).await.unwrap();
        sponsorship.apply(&mut op);

        assert_eq!(
            op.paymaster,
            Some(address!("0000000000000039cd5e8ae05257ce51c473ddd1"))
        );
        assert_eq!(op.pre_verification_gas, Some(U256::from(122_608u64)));
        assert_eq!(op.verification_gas_limit, Some(U256::from(480_000u64)));
        assert!(op.paymaster_and_data().unwrap().len() > 52);
    }

    #[tokio::test]
    async fn test_rejection_is_distinct_from_network_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32500,"message":"preVerificationGas is not enough"}}"#,
            )
            .create_async()
            .await;

        let paymaster = HttpPaymaster::new(&server.url()).unwrap();
        let err = paymaster
            .sponsor(&UserOperation::default(), Address::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, SponsorshipError::Rejected { code: -32500, .. }));

        // nothing listens on port 9 locally
        let offline = HttpPaymaster::new("http://127.0.0.1:9").unwrap();
        let err = offline
            .sponsor(&UserOperation::default(), Address::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, SponsorshipError::Network(_)));
    }
}
