//! Scalar field elements
//!
//! Every value handed to the circuit (addresses, amounts, selectors, tree
//! nodes, the operation challenge) is an element of the BN254 scalar field.
//! [`FieldElement`] keeps the value canonical and owns its text form so that
//! serialization is an explicit property of the type rather than a global
//! behavior of the integer type.

use alloy_primitives::{uint, Address, B256, U256};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SessionError;

/// Order of the BN254 scalar field used by the proving system
pub const SNARK_SCALAR_FIELD: U256 =
    uint!(21888242871839275222246405745257275088548364400416034343698204186575808495617_U256);

/// A canonical element of the scalar field (`value < SNARK_SCALAR_FIELD`)
///
/// The text form is the prover's native hex form: lowercase, `0x`-prefixed,
/// without leading zeros, and `0x0` for zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FieldElement(U256);

impl FieldElement {
    /// The zero element
    pub const ZERO: FieldElement = FieldElement(U256::ZERO);

    /// Wrap a value that must already be canonical
    pub fn new(value: U256) -> Result<Self, SessionError> {
        if value >= SNARK_SCALAR_FIELD {
            return Err(SessionError::FieldOverflow(value));
        }
        Ok(Self(value))
    }

    /// Reduce an arbitrary 256-bit value modulo the field order
    pub fn reduce(value: U256) -> Self {
        Self(value.reduce_mod(SNARK_SCALAR_FIELD))
    }

    /// Encode an address as `uint160(address)`
    pub fn from_address(address: Address) -> Self {
        // 160-bit values are always below the field order
        Self(U256::from_be_slice(address.as_slice()))
    }

    /// Encode a small integer
    pub fn from_u64(value: u64) -> Self {
        Self(U256::from(value))
    }

    /// Big-endian bytes of a hash, reduced into the field
    pub fn from_be_bytes_reduced(bytes: B256) -> Self {
        Self::reduce(U256::from_be_bytes(bytes.0))
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// 32-byte big-endian representation
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0.to_be_bytes::<32>()
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl FromStr for FieldElement {
    type Err = SessionError;

    /// Accepts `0x`-prefixed hex or decimal text
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = U256::from_str(s.trim())
            .map_err(|e| SessionError::Encoding(format!("Invalid field element '{}': {}", s, e)))?;
        Self::new(value)
    }
}

impl From<Address> for FieldElement {
    fn from(address: Address) -> Self {
        Self::from_address(address)
    }
}

impl From<FieldElement> for U256 {
    fn from(value: FieldElement) -> Self {
        value.0
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// The operation hash reduced into the scalar field
///
/// It is fed to the circuit as the `op` input and echoed back as a public
/// signal, binding the proof to one specific user operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicChallenge(FieldElement);

impl PublicChallenge {
    /// Reduce an operation hash modulo the field order
    pub fn from_hash(operation_hash: B256) -> Self {
        Self(FieldElement::from_be_bytes_reduced(operation_hash))
    }

    /// Wrap a value already reported by the prover as a public signal
    pub fn from_field(value: FieldElement) -> Self {
        Self(value)
    }

    pub fn as_field(&self) -> FieldElement {
        self.0
    }

    pub fn as_u256(&self) -> U256 {
        self.0.as_u256()
    }
}

impl fmt::Display for PublicChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use proptest::prelude::*;

    #[test]
    fn test_field_hex_is_minimal() {
        assert_eq!(FieldElement::ZERO.to_string(), "0x0");
        assert_eq!(FieldElement::from_u64(255).to_string(), "0xff");
        assert_eq!(
            FieldElement::from_u64(10_000_000_000_000_000).to_string(),
            "0x2386f26fc10000"
        );
    }

    #[test]
    fn test_address_encoding() {
        let addr = address!("2555e3a97c4ac9705d70b9e5b9b6cc6fe2977a74");
        let field = FieldElement::from_address(addr);
        assert_eq!(field.to_string(), "0x2555e3a97c4ac9705d70b9e5b9b6cc6fe2977a74");
    }

    #[test]
    fn test_leading_zero_address_is_trimmed() {
        let addr = address!("00000000000000000000000000000000000000aa");
        assert_eq!(FieldElement::from_address(addr).to_string(), "0xaa");
    }

    #[test]
    fn test_new_rejects_field_order() {
        assert!(matches!(
            FieldElement::new(SNARK_SCALAR_FIELD),
            Err(SessionError::FieldOverflow(_))
        ));
        assert!(FieldElement::new(SNARK_SCALAR_FIELD - U256::from(1)).is_ok());
    }

    #[test]
    fn test_parse_hex_and_decimal() {
        let hex: FieldElement = "0x2a".parse().unwrap();
        let dec: FieldElement = "42".parse().unwrap();
        assert_eq!(hex, dec);
        assert!("0xzz".parse::<FieldElement>().is_err());
    }

    #[test]
    fn test_serde_uses_field_hex() {
        let json = serde_json::to_string(&FieldElement::from_u64(16)).unwrap();
        assert_eq!(json, "\"0x10\"");
        let back: FieldElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FieldElement::from_u64(16));
    }

    #[test]
    fn test_challenge_of_max_hash() {
        let challenge = PublicChallenge::from_hash(B256::repeat_byte(0xff));
        assert!(challenge.as_u256() < SNARK_SCALAR_FIELD);
        assert_eq!(challenge.as_u256(), U256::MAX % SNARK_SCALAR_FIELD);
    }

    proptest! {
        #[test]
        fn prop_challenge_is_reduced_and_stable(bytes in any::<[u8; 32]>()) {
            let hash = B256::from(bytes);
            let challenge = PublicChallenge::from_hash(hash);
            prop_assert!(challenge.as_u256() < SNARK_SCALAR_FIELD);
            prop_assert_eq!(challenge, PublicChallenge::from_hash(hash));
            prop_assert_eq!(challenge.as_u256(), U256::from_be_bytes(bytes) % SNARK_SCALAR_FIELD);
        }

        #[test]
        fn prop_display_roundtrips(bytes in any::<[u8; 32]>()) {
            let field = FieldElement::reduce(U256::from_be_bytes(bytes));
            let parsed: FieldElement = field.to_string().parse().unwrap();
            prop_assert_eq!(parsed, field);
        }
    }
}
