//! Circuit input assembly
//!
//! Turns a batch of transaction intents into the exact input set of the
//! session circuit. Every intent contributes one entry to each per-intent
//! array; each of its three permission dimensions gets either a real
//! membership witness or the all-zero placeholder, so the circuit always sees
//! the same arity.

use alloy_primitives::{Address, U256};
use core::fmt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::allowlist::AllowlistTree;
use crate::error::SessionError;
use crate::field::{FieldElement, PublicChallenge};
use crate::merkle::MerkleWitness;

/// Selector of ERC-20 `transfer(address,uint256)`
pub const ERC20_TRANSFER_SELECTOR: u32 = 0xa9059cbb;

/// One call the session wants to make
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIntent {
    pub destination: Address,
    /// Native value in wei
    pub value: U256,
    /// 4-byte selector as an integer, 0 for a plain value transfer
    pub function_selector: u32,
    /// ERC-20 transfer recipient, `Address::ZERO` when there is none
    pub secondary_destination: Address,
}

impl TransactionIntent {
    pub fn new(
        destination: Address,
        value: U256,
        function_selector: u32,
        secondary_destination: Address,
    ) -> Self {
        Self {
            destination,
            value,
            function_selector,
            secondary_destination,
        }
    }

    /// Filler entry with every dimension inactive
    pub fn inert() -> Self {
        Self::new(Address::ZERO, U256::ZERO, 0, Address::ZERO)
    }

    /// Plain native value transfer
    pub fn value_transfer(destination: Address, value: U256) -> Self {
        Self::new(destination, value, 0, Address::ZERO)
    }

    /// Derive the intent from the arguments of `execute(dest, value, data)`
    ///
    /// The selector is the first four bytes of `data`. For an ERC-20
    /// `transfer` the recipient becomes the secondary destination.
    pub fn from_call(destination: Address, value: U256, data: &[u8]) -> Self {
        let function_selector = data
            .get(..4)
            .map(|s| u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
            .unwrap_or(0);

        let secondary_destination = if function_selector == ERC20_TRANSFER_SELECTOR {
            // first argument word holds the recipient in its low 20 bytes
            data.get(16..36).map(Address::from_slice).unwrap_or(Address::ZERO)
        } else {
            Address::ZERO
        };

        Self::new(destination, value, function_selector, secondary_destination)
    }

    pub fn transfers_value(&self) -> bool {
        !self.value.is_zero()
    }

    pub fn calls_contract(&self) -> bool {
        self.function_selector != 0
    }

    pub fn has_secondary_transfer(&self) -> bool {
        self.secondary_destination != Address::ZERO
    }
}

/// The three permission checks the circuit performs per intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionDimension {
    /// `destination` must be in the value-transfer allow-list
    ValueTransfer,
    /// `destination` must be in the contract-call allow-list
    ContractCall,
    /// `secondary_destination` must be in the value-transfer allow-list
    SecondaryTransfer,
}

impl fmt::Display for PermissionDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PermissionDimension::ValueTransfer => "value-transfer",
            PermissionDimension::ContractCall => "contract-call",
            PermissionDimension::SecondaryTransfer => "secondary-transfer",
        };
        f.write_str(name)
    }
}

/// Pack witness path bits into one integer, first bit most significant
pub fn pack_path_indices(path_indices: &[u8]) -> FieldElement {
    let packed = path_indices.iter().fold(U256::ZERO, |acc, bit| {
        (acc << 1) | U256::from(*bit & 1)
    });
    // at most 32 bits for supported depths
    FieldElement::reduce(packed)
}

/// Inputs of the session circuit, named as the circuit names them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitInputs {
    pub account_identifier: FieldElement,
    pub session_key_identifier: FieldElement,
    pub allowed_smart_contract_tree_root: FieldElement,
    pub allowed_to_tree_root: FieldElement,
    pub op: FieldElement,
    pub dest: Vec<FieldElement>,
    pub value: Vec<FieldElement>,
    pub function_selector: Vec<FieldElement>,
    pub erc20_transfer_to: Vec<FieldElement>,
    pub eth_to_siblings: Vec<Vec<FieldElement>>,
    pub eth_to_path_indices: Vec<FieldElement>,
    pub allowed_smart_contract_call_siblings: Vec<Vec<FieldElement>>,
    pub allowed_smart_contract_call_path_indices: Vec<FieldElement>,
    pub erc20_to_address_siblings: Vec<Vec<FieldElement>>,
    pub erc20_to_address_path_indices: Vec<FieldElement>,
}

impl CircuitInputs {
    /// Number of intents in the batch
    pub fn batch_len(&self) -> usize {
        self.dest.len()
    }

    /// Render as a `Prover.toml` document
    pub fn to_prover_toml(&self) -> Result<String, SessionError> {
        Ok(toml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    fn push_witness(&mut self, dimension: PermissionDimension, siblings: Vec<FieldElement>, path: FieldElement) {
        let (sibling_rows, paths) = match dimension {
            PermissionDimension::ValueTransfer => {
                (&mut self.eth_to_siblings, &mut self.eth_to_path_indices)
            }
            PermissionDimension::ContractCall => (
                &mut self.allowed_smart_contract_call_siblings,
                &mut self.allowed_smart_contract_call_path_indices,
            ),
            PermissionDimension::SecondaryTransfer => (
                &mut self.erc20_to_address_siblings,
                &mut self.erc20_to_address_path_indices,
            ),
        };
        sibling_rows.push(siblings);
        paths.push(path);
    }
}

/// Builds [`CircuitInputs`] against a session's two allow-lists
pub struct CircuitInputBuilder<'a> {
    value_transfers: &'a dyn AllowlistTree,
    contract_calls: &'a dyn AllowlistTree,
    batch_size: Option<usize>,
}

impl<'a> CircuitInputBuilder<'a> {
    /// `value_transfers` is allow-list B, `contract_calls` allow-list A
    pub fn new(value_transfers: &'a dyn AllowlistTree, contract_calls: &'a dyn AllowlistTree) -> Self {
        Self {
            value_transfers,
            contract_calls,
            batch_size: None,
        }
    }

    /// Circuit array length; shorter batches are padded with inert intents
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Assemble the circuit inputs for one operation
    ///
    /// Fails without producing partial inputs if any active dimension of any
    /// intent references an address outside its allow-list.
    pub fn build(
        &self,
        account: Address,
        session_key: Address,
        challenge: PublicChallenge,
        intents: &[TransactionIntent],
    ) -> Result<CircuitInputs, SessionError> {
        if intents.is_empty() {
            return Err(SessionError::EmptyBatch);
        }
        let len = match self.batch_size {
            Some(expected) if intents.len() > expected => {
                return Err(SessionError::BatchSize {
                    expected,
                    actual: intents.len(),
                });
            }
            Some(expected) => expected,
            None => intents.len(),
        };
        let padding = std::iter::repeat(TransactionIntent::inert()).take(len - intents.len());

        let mut inputs = CircuitInputs {
            account_identifier: FieldElement::from_address(account),
            session_key_identifier: FieldElement::from_address(session_key),
            allowed_smart_contract_tree_root: self.contract_calls.root(),
            allowed_to_tree_root: self.value_transfers.root(),
            op: challenge.as_field(),
            dest: Vec::with_capacity(len),
            value: Vec::with_capacity(len),
            function_selector: Vec::with_capacity(len),
            erc20_transfer_to: Vec::with_capacity(len),
            eth_to_siblings: Vec::with_capacity(len),
            eth_to_path_indices: Vec::with_capacity(len),
            allowed_smart_contract_call_siblings: Vec::with_capacity(len),
            allowed_smart_contract_call_path_indices: Vec::with_capacity(len),
            erc20_to_address_siblings: Vec::with_capacity(len),
            erc20_to_address_path_indices: Vec::with_capacity(len),
        };

        for intent in intents.iter().copied().chain(padding) {
            inputs.dest.push(FieldElement::from_address(intent.destination));
            inputs.value.push(FieldElement::new(intent.value)?);
            inputs
                .function_selector
                .push(FieldElement::from_u64(u64::from(intent.function_selector)));
            inputs
                .erc20_transfer_to
                .push(FieldElement::from_address(intent.secondary_destination));

            let checks = [
                (
                    PermissionDimension::ValueTransfer,
                    intent.transfers_value(),
                    intent.destination,
                ),
                (
                    PermissionDimension::ContractCall,
                    intent.calls_contract(),
                    intent.destination,
                ),
                (
                    PermissionDimension::SecondaryTransfer,
                    intent.has_secondary_transfer(),
                    intent.secondary_destination,
                ),
            ];
            for (dimension, active, address) in checks {
                let tree = self.tree_for(dimension);
                let witness = if active {
                    self.membership(tree, dimension, address)?
                } else {
                    MerkleWitness::placeholder(tree.depth())
                };
                let path = pack_path_indices(&witness.path_indices);
                inputs.push_witness(dimension, witness.siblings, path);
            }
        }

        debug!(
            intents = intents.len(),
            padded = len - intents.len(),
            op = %inputs.op,
            "Assembled circuit inputs"
        );
        Ok(inputs)
    }

    fn tree_for(&self, dimension: PermissionDimension) -> &'a dyn AllowlistTree {
        match dimension {
            PermissionDimension::ContractCall => self.contract_calls,
            PermissionDimension::ValueTransfer | PermissionDimension::SecondaryTransfer => {
                self.value_transfers
            }
        }
    }

    fn membership(
        &self,
        tree: &dyn AllowlistTree,
        dimension: PermissionDimension,
        address: Address,
    ) -> Result<MerkleWitness, SessionError> {
        let Some(index) = tree.index_of(address) else {
            warn!(%dimension, %address, "Destination is not allow-listed");
            return Err(SessionError::NotAllowlisted { dimension, address });
        };

        let witness = tree.prove_membership(index)?;
        if witness.siblings.len() != tree.depth() || witness.path_indices.len() != tree.depth() {
            return Err(SessionError::WitnessShape {
                expected: tree.depth(),
                actual: witness.siblings.len(),
            });
        }
        Ok(witness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::AddressAllowlist;
    use crate::merkle::TreeConfig;
    use alloy_primitives::{address, hex};

    const A1: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1");
    const B1: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb1");
    const B2: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2");
    const C: Address = address!("cccccccccccccccccccccccccccccccccccccccc");
    const ACCOUNT: Address = address!("1111111111111111111111111111111111111111");
    const SESSION: Address = address!("2222222222222222222222222222222222222222");

    fn trees() -> (AddressAllowlist, AddressAllowlist) {
        let config = TreeConfig::new(5);
        (
            AddressAllowlist::from_addresses(config, &[B1, B2]).unwrap(),
            AddressAllowlist::from_addresses(config, &[A1]).unwrap(),
        )
    }

    fn challenge() -> PublicChallenge {
        PublicChallenge::from_field(FieldElement::from_u64(99))
    }

    #[test]
    fn test_pack_path_indices_msb_first() {
        assert_eq!(pack_path_indices(&[0, 0, 0]), FieldElement::ZERO);
        assert_eq!(pack_path_indices(&[1, 0, 0]), FieldElement::from_u64(4));
        assert_eq!(pack_path_indices(&[0, 0, 1]), FieldElement::from_u64(1));
        assert_eq!(pack_path_indices(&[1, 1, 0, 1]), FieldElement::from_u64(0b1101));
    }

    #[test]
    fn test_from_call_plain_transfer() {
        let intent = TransactionIntent::from_call(B1, U256::from(5u64), &[]);
        assert_eq!(intent, TransactionIntent::value_transfer(B1, U256::from(5u64)));
    }

    #[test]
    fn test_from_call_erc20_transfer() {
        let data = hex!("a9059cbb000000000000000000000000bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb20000000000000000000000000000000000000000000000000000000000000064");
        let intent = TransactionIntent::from_call(A1, U256::ZERO, &data);
        assert_eq!(intent.function_selector, ERC20_TRANSFER_SELECTOR);
        assert_eq!(intent.secondary_destination, B2);
        assert!(!intent.transfers_value());
    }

    #[test]
    fn test_from_call_other_selector_has_no_secondary() {
        let data = hex!("12345678000000000000000000000000bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2");
        let intent = TransactionIntent::from_call(A1, U256::ZERO, &data);
        assert_eq!(intent.function_selector, 0x12345678);
        assert_eq!(intent.secondary_destination, Address::ZERO);
    }

    #[test]
    fn test_value_transfer_uses_real_witness_and_placeholders() {
        let (b, a) = trees();
        let intent = TransactionIntent::value_transfer(B2, U256::from(10u64));
        let inputs = CircuitInputBuilder::new(&b, &a)
            .build(ACCOUNT, SESSION, challenge(), &[intent])
            .unwrap();

        let expected = b.prove_membership(1).unwrap();
        assert_eq!(inputs.eth_to_siblings[0], expected.siblings);
        assert_eq!(inputs.eth_to_path_indices[0], FieldElement::from_u64(0b10000));
        assert_eq!(inputs.allowed_smart_contract_call_siblings[0], vec![FieldElement::ZERO; 5]);
        assert_eq!(inputs.allowed_smart_contract_call_path_indices[0], FieldElement::ZERO);
        assert_eq!(inputs.erc20_to_address_siblings[0], vec![FieldElement::ZERO; 5]);
        assert_eq!(inputs.allowed_to_tree_root, b.root());
        assert_eq!(inputs.allowed_smart_contract_tree_root, a.root());
        assert_eq!(inputs.op, FieldElement::from_u64(99));
    }

    #[test]
    fn test_erc20_call_checks_contract_and_recipient() {
        let (b, a) = trees();
        let intent = TransactionIntent::new(A1, U256::ZERO, ERC20_TRANSFER_SELECTOR, B1);
        let inputs = CircuitInputBuilder::new(&b, &a)
            .build(ACCOUNT, SESSION, challenge(), &[intent])
            .unwrap();

        assert_eq!(
            inputs.allowed_smart_contract_call_siblings[0],
            a.prove_membership(0).unwrap().siblings
        );
        assert_eq!(
            inputs.erc20_to_address_siblings[0],
            b.prove_membership(0).unwrap().siblings
        );
        assert_eq!(inputs.eth_to_siblings[0], vec![FieldElement::ZERO; 5]);
        assert_eq!(
            inputs.function_selector[0],
            FieldElement::from_u64(0xa9059cbb)
        );
    }

    #[test]
    fn test_missing_destination_rejects_batch() {
        let (b, a) = trees();
        let ok = TransactionIntent::value_transfer(B1, U256::from(1u64));
        let bad = TransactionIntent::value_transfer(C, U256::from(1u64));
        let err = CircuitInputBuilder::new(&b, &a)
            .build(ACCOUNT, SESSION, challenge(), &[ok, bad])
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotAllowlisted {
                dimension: PermissionDimension::ValueTransfer,
                address: C
            }
        ));
    }

    #[test]
    fn test_contract_call_to_recipient_only_address_fails() {
        let (b, a) = trees();
        let intent = TransactionIntent::new(B1, U256::ZERO, 0x12345678, Address::ZERO);
        let err = CircuitInputBuilder::new(&b, &a)
            .build(ACCOUNT, SESSION, challenge(), &[intent])
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotAllowlisted {
                dimension: PermissionDimension::ContractCall,
                ..
            }
        ));
    }

    #[test]
    fn test_zero_value_no_selector_is_all_placeholders() {
        let (b, a) = trees();
        let intent = TransactionIntent::value_transfer(C, U256::ZERO);
        let inputs = CircuitInputBuilder::new(&b, &a)
            .build(ACCOUNT, SESSION, challenge(), &[intent])
            .unwrap();
        assert_eq!(inputs.eth_to_path_indices, vec![FieldElement::ZERO]);
        assert!(inputs.eth_to_siblings[0].iter().all(FieldElement::is_zero));
    }

    #[test]
    fn test_empty_and_wrong_size_batches() {
        let (b, a) = trees();
        let builder = CircuitInputBuilder::new(&b, &a);
        assert!(matches!(
            builder.build(ACCOUNT, SESSION, challenge(), &[]),
            Err(SessionError::EmptyBatch)
        ));

        let intent = TransactionIntent::value_transfer(B1, U256::from(1u64));
        let err = CircuitInputBuilder::new(&b, &a)
            .with_batch_size(2)
            .build(ACCOUNT, SESSION, challenge(), &[intent, intent, intent])
            .unwrap_err();
        assert!(matches!(err, SessionError::BatchSize { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_short_batch_is_padded_with_inert_intents() {
        let (b, a) = trees();
        let intent = TransactionIntent::value_transfer(B1, U256::from(1u64));
        let inputs = CircuitInputBuilder::new(&b, &a)
            .with_batch_size(2)
            .build(ACCOUNT, SESSION, challenge(), &[intent])
            .unwrap();

        assert_eq!(inputs.batch_len(), 2);
        assert_eq!(inputs.eth_to_siblings[0], b.prove_membership(0).unwrap().siblings);
        assert_eq!(inputs.dest[1], FieldElement::ZERO);
        assert_eq!(inputs.value[1], FieldElement::ZERO);
        assert_eq!(inputs.function_selector[1], FieldElement::ZERO);
        assert_eq!(inputs.erc20_transfer_to[1], FieldElement::ZERO);
        for (siblings, path) in [
            (&inputs.eth_to_siblings, &inputs.eth_to_path_indices),
            (
                &inputs.allowed_smart_contract_call_siblings,
                &inputs.allowed_smart_contract_call_path_indices,
            ),
            (&inputs.erc20_to_address_siblings, &inputs.erc20_to_address_path_indices),
        ] {
            assert_eq!(siblings.len(), 2);
            assert_eq!(siblings[1], vec![FieldElement::ZERO; 5]);
            assert_eq!(path[1], FieldElement::ZERO);
        }
    }

    #[test]
    fn test_value_outside_field_is_rejected() {
        let (b, a) = trees();
        let intent = TransactionIntent::value_transfer(B1, U256::MAX);
        assert!(matches!(
            CircuitInputBuilder::new(&b, &a).build(ACCOUNT, SESSION, challenge(), &[intent]),
            Err(SessionError::FieldOverflow(_))
        ));
    }

    #[test]
    fn test_prover_toml_uses_circuit_names() {
        let (b, a) = trees();
        let intent = TransactionIntent::value_transfer(B1, U256::from(16u64));
        let inputs = CircuitInputBuilder::new(&b, &a)
            .build(ACCOUNT, SESSION, challenge(), &[intent])
            .unwrap();
        let toml = inputs.to_prover_toml().unwrap();

        assert!(toml.contains("account_identifier = \"0x1111111111111111111111111111111111111111\""));
        assert!(toml.contains("op = \"0x63\""));
        assert!(toml.contains("value = [\"0x10\"]"));
        assert!(toml.contains("eth_to_path_indices = [\"0x0\"]"));

        let json = inputs.to_json().unwrap();
        assert_eq!(CircuitInputs::from_json(&json).unwrap(), inputs);
    }
}
