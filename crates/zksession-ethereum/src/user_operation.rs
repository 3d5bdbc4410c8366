//! ERC-4337 v0.7 user operations
//!
//! [`UserOperation`] is the unpacked form bundlers accept over JSON-RPC. It is
//! filled in stage by stage; hashing requires every gas field to be present.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::error::UserOperationError;

/// Unpacked v0.7 user operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    pub call_data: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_verification_gas: Option<U256>,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    pub signature: Bytes,
}

fn required(value: Option<U256>, field: &'static str) -> Result<U256, UserOperationError> {
    value.ok_or(UserOperationError::MissingField(field))
}

fn to_u128_bytes(value: U256, field: &'static str) -> Result<[u8; 16], UserOperationError> {
    let value: u128 = value
        .try_into()
        .map_err(|_| UserOperationError::GasOverflow { field, value })?;
    Ok(value.to_be_bytes())
}

/// Two 128-bit values in one word, `high` in the upper half
fn pack_u128_pair(
    high: U256,
    high_field: &'static str,
    low: U256,
    low_field: &'static str,
) -> Result<B256, UserOperationError> {
    let mut word = [0u8; 32];
    word[..16].copy_from_slice(&to_u128_bytes(high, high_field)?);
    word[16..].copy_from_slice(&to_u128_bytes(low, low_field)?);
    Ok(B256::from(word))
}

impl UserOperation {
    /// `factory || factoryData`, empty for an already deployed account
    pub fn init_code(&self) -> Bytes {
        match self.factory {
            Some(factory) => {
                let mut code = factory.to_vec();
                if let Some(data) = &self.factory_data {
                    code.extend_from_slice(data);
                }
                code.into()
            }
            None => Bytes::new(),
        }
    }

    /// `verificationGasLimit || callGasLimit`
    pub fn account_gas_limits(&self) -> Result<B256, UserOperationError> {
        pack_u128_pair(
            required(self.verification_gas_limit, "verificationGasLimit")?,
            "verificationGasLimit",
            required(self.call_gas_limit, "callGasLimit")?,
            "callGasLimit",
        )
    }

    /// `maxPriorityFeePerGas || maxFeePerGas`
    pub fn gas_fees(&self) -> Result<B256, UserOperationError> {
        pack_u128_pair(
            self.max_priority_fee_per_gas,
            "maxPriorityFeePerGas",
            self.max_fee_per_gas,
            "maxFeePerGas",
        )
    }

    /// `paymaster || verificationGas || postOpGas || paymasterData`
    pub fn paymaster_and_data(&self) -> Result<Bytes, UserOperationError> {
        let Some(paymaster) = self.paymaster else {
            return Ok(Bytes::new());
        };
        let mut packed = paymaster.to_vec();
        packed.extend_from_slice(&to_u128_bytes(
            required(
                self.paymaster_verification_gas_limit,
                "paymasterVerificationGasLimit",
            )?,
            "paymasterVerificationGasLimit",
        )?);
        packed.extend_from_slice(&to_u128_bytes(
            required(self.paymaster_post_op_gas_limit, "paymasterPostOpGasLimit")?,
            "paymasterPostOpGasLimit",
        )?);
        if let Some(data) = &self.paymaster_data {
            packed.extend_from_slice(data);
        }
        Ok(packed.into())
    }

    /// Check that the operation is complete enough to hash and send
    pub fn validate(&self) -> Result<(), UserOperationError> {
        self.account_gas_limits()?;
        self.gas_fees()?;
        self.paymaster_and_data()?;
        required(self.pre_verification_gas, "preVerificationGas")?;
        Ok(())
    }

    /// Operation hash as computed by the v0.7 EntryPoint
    ///
    /// `keccak256(abi.encode(keccak256(packed), entryPoint, chainId))`; the
    /// signature field does not take part.
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> Result<B256, UserOperationError> {
        let packed = (
            self.sender,
            self.nonce,
            keccak256(self.init_code()),
            keccak256(&self.call_data),
            self.account_gas_limits()?,
            required(self.pre_verification_gas, "preVerificationGas")?,
            self.gas_fees()?,
            keccak256(self.paymaster_and_data()?),
        )
            .abi_encode_params();

        let outer = (keccak256(packed), entry_point, U256::from(chain_id)).abi_encode_params();
        Ok(keccak256(outer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, bytes};
    use proptest::prelude::*;

    fn operation() -> UserOperation {
        UserOperation {
            sender: address!("8448ff4b2733b52f62d81ca46d64bd16786299cd"),
            nonce: U256::from(3u64),
            call_data: bytes!("b61d27f6"),
            call_gas_limit: Some(U256::from(118_553u64)),
            verification_gas_limit: Some(U256::from(480_000u64)),
            pre_verification_gas: Some(U256::from(122_608u64)),
            max_fee_per_gas: U256::from(30_000_000_000u64),
            max_priority_fee_per_gas: U256::from(1_500_000_000u64),
            signature: Bytes::new(),
            ..Default::default()
        }
    }

    #[test]
    fn test_serializes_rpc_form() {
        let json = serde_json::to_value(operation()).unwrap();
        assert_eq!(json["nonce"], "0x3");
        assert_eq!(json["verificationGasLimit"], "0x75300");
        assert_eq!(json["callData"], "0xb61d27f6");
        assert!(json.get("factory").is_none());
        assert!(json.get("paymaster").is_none());
    }

    #[test]
    fn test_account_gas_limits_packing() {
        let limits = operation().account_gas_limits().unwrap();
        assert_eq!(U256::from_be_slice(&limits[..16]), U256::from(480_000u64));
        assert_eq!(U256::from_be_slice(&limits[16..]), U256::from(118_553u64));
    }

    #[test]
    fn test_init_code_concatenates_factory() {
        let mut op = operation();
        assert!(op.init_code().is_empty());
        op.factory = Some(address!("7934a31391b517f85bbf3c68fecc96b86d54e7b0"));
        op.factory_data = Some(bytes!("5fbfb9cf"));
        let code = op.init_code();
        assert_eq!(code.len(), 24);
        assert_eq!(&code[20..], &[0x5f, 0xbf, 0xb9, 0xcf]);
    }

    #[test]
    fn test_paymaster_and_data_layout() {
        let mut op = operation();
        op.paymaster = Some(address!("0000000000000039cd5e8ae05257ce51c473ddd1"));
        op.paymaster_verification_gas_limit = Some(U256::from(50_000u64));
        op.paymaster_post_op_gas_limit = Some(U256::from(1u64));
        op.paymaster_data = Some(bytes!("aabb"));

        let packed = op.paymaster_and_data().unwrap();
        assert_eq!(packed.len(), 20 + 16 + 16 + 2);
        assert_eq!(U256::from_be_slice(&packed[20..36]), U256::from(50_000u64));
        assert_eq!(U256::from_be_slice(&packed[36..52]), U256::from(1u64));
        assert_eq!(&packed[52..], &[0xaa, 0xbb]);
    }

    #[test]
    fn test_hash_requires_gas_fields() {
        let mut op = operation();
        op.pre_verification_gas = None;
        assert!(matches!(
            op.hash(Address::ZERO, 1),
            Err(UserOperationError::MissingField("preVerificationGas"))
        ));
    }

    #[test]
    fn test_hash_ignores_signature_and_binds_chain() {
        let entry_point = address!("0000000071727de22e5e9d8baf0edac6f37da032");
        let op = operation();
        let mut signed = op.clone();
        signed.signature = bytes!("01020304");

        let hash = op.hash(entry_point, 80002).unwrap();
        assert_eq!(hash, signed.hash(entry_point, 80002).unwrap());
        assert_ne!(hash, op.hash(entry_point, 1).unwrap());
    }

    #[test]
    fn test_gas_overflow() {
        let mut op = operation();
        op.max_fee_per_gas = U256::MAX;
        assert!(matches!(
            op.gas_fees(),
            Err(UserOperationError::GasOverflow { field: "maxFeePerGas", .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_gas_fees_unpack(priority in any::<u128>(), max_fee in any::<u128>()) {
            let mut op = operation();
            op.max_priority_fee_per_gas = U256::from(priority);
            op.max_fee_per_gas = U256::from(max_fee);
            let fees = op.gas_fees().unwrap();
            prop_assert_eq!(U256::from_be_slice(&fees[..16]), U256::from(priority));
            prop_assert_eq!(U256::from_be_slice(&fees[16..]), U256::from(max_fee));
        }

        #[test]
        fn prop_nonce_changes_hash(a in any::<u64>(), b in any::<u64>()) {
            prop_assume!(a != b);
            let entry_point = Address::repeat_byte(0x71);
            let mut first = operation();
            first.nonce = U256::from(a);
            let mut second = operation();
            second.nonce = U256::from(b);
            prop_assert_ne!(
                first.hash(entry_point, 80002).unwrap(),
                second.hash(entry_point, 80002).unwrap()
            );
        }
    }
}
