//! Session signature wire format
//!
//! The account contract expects `abi.encode(uint256 challenge, address
//! sessionKey, bytes ecdsaSignature, bytes proof)` in the operation's
//! signature field. The challenge lets the account check that the proof was
//! produced for this exact operation.

use alloy_primitives::{hex, Address, Bytes, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::field::{PublicChallenge, SNARK_SCALAR_FIELD};

/// Length of an `r || s || v` ECDSA signature
pub const ECDSA_SIGNATURE_LENGTH: usize = 65;

/// Proof length of the deployed session circuit, in bytes
pub const DEFAULT_PROOF_LENGTH: usize = 2144;

/// Well-formed ECDSA signature used while the real one cannot exist yet
pub const DUMMY_ECDSA_SIGNATURE: [u8; ECDSA_SIGNATURE_LENGTH] = hex!("a15569dd8f8324dbeabf8073fdec36d4b754f53ce5901e283c6de79af177dc94557fa3c9922cd7af2a96ca94402d35c39f266925ee6407aeb32b31d76978d4ba1c");

/// Decoded form of a session signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedSignature {
    pub challenge: U256,
    pub session_key: Address,
    pub ecdsa_signature: Bytes,
    pub proof: Bytes,
}

impl ComposedSignature {
    pub fn encode(&self) -> Bytes {
        (
            self.challenge,
            self.session_key,
            self.ecdsa_signature.clone(),
            self.proof.clone(),
        )
            .abi_encode_params()
            .into()
    }
}

/// Encoder/decoder for the session signature
#[derive(Debug, Default, Clone, Copy)]
pub struct SignatureComposer;

impl SignatureComposer {
    /// Encode the four signature parts
    pub fn compose(
        challenge: PublicChallenge,
        session_key: Address,
        ecdsa_signature: &[u8],
        proof: &[u8],
    ) -> Bytes {
        ComposedSignature {
            challenge: challenge.as_u256(),
            session_key,
            ecdsa_signature: Bytes::copy_from_slice(ecdsa_signature),
            proof: Bytes::copy_from_slice(proof),
        }
        .encode()
    }

    /// Recover the four parts of an encoded signature
    pub fn decode(data: &[u8]) -> Result<ComposedSignature, SessionError> {
        let (challenge, session_key, ecdsa_signature, proof) =
            <(U256, Address, Bytes, Bytes)>::abi_decode_params(data)?;
        Ok(ComposedSignature {
            challenge,
            session_key,
            ecdsa_signature,
            proof,
        })
    }

    /// Signature of the same byte length as a real one, for gas estimation
    ///
    /// Bundlers and paymasters price the operation by its size, so the
    /// placeholder uses non-zero filler with the final lengths.
    pub fn placeholder(session_key: Address, proof_len: usize) -> Bytes {
        let challenge = SNARK_SCALAR_FIELD - U256::from(1u64);
        ComposedSignature {
            challenge,
            session_key,
            ecdsa_signature: Bytes::copy_from_slice(&DUMMY_ECDSA_SIGNATURE),
            proof: vec![0xff; proof_len].into(),
        }
        .encode()
    }

    /// Encoded length for a given proof length
    pub fn encoded_len(proof_len: usize) -> usize {
        let padded = |len: usize| len.div_ceil(32) * 32;
        4 * 32 + 32 + padded(ECDSA_SIGNATURE_LENGTH) + 32 + padded(proof_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldElement;
    use alloy_primitives::address;

    const SESSION: Address = address!("6e7448a6335d5c947953994d071d4dc1f6e5be96");

    #[test]
    fn test_compose_decode_recovers_parts() {
        let challenge = PublicChallenge::from_field(FieldElement::from_u64(0x1234));
        let ecdsa = [7u8; ECDSA_SIGNATURE_LENGTH];
        let proof = vec![3u8; 100];

        let encoded = SignatureComposer::compose(challenge, SESSION, &ecdsa, &proof);
        let decoded = SignatureComposer::decode(&encoded).unwrap();

        assert_eq!(decoded.challenge, U256::from(0x1234u64));
        assert_eq!(decoded.session_key, SESSION);
        assert_eq!(decoded.ecdsa_signature.as_ref(), &ecdsa[..]);
        assert_eq!(decoded.proof.as_ref(), &proof[..]);
    }

    #[test]
    fn test_layout_is_parameter_encoding() {
        let challenge = PublicChallenge::from_field(FieldElement::from_u64(1));
        let encoded = SignatureComposer::compose(challenge, SESSION, &[0xaa; 65], &[0xbb; 2]);

        // head: challenge, address, offset(bytes1), offset(bytes2)
        assert_eq!(encoded[31], 1);
        assert_eq!(&encoded[44..64], SESSION.as_slice());
        assert_eq!(U256::from_be_slice(&encoded[64..96]), U256::from(128u64));
        assert_eq!(U256::from_be_slice(&encoded[96..128]), U256::from(256u64));
        assert_eq!(U256::from_be_slice(&encoded[128..160]), U256::from(65u64));
        assert_eq!(encoded.len(), SignatureComposer::encoded_len(2));
    }

    #[test]
    fn test_placeholder_length_matches_account_expectation() {
        let placeholder = SignatureComposer::placeholder(SESSION, DEFAULT_PROOF_LENGTH);
        assert_eq!(placeholder.len(), 2432);
        assert_eq!(placeholder.len(), SignatureComposer::encoded_len(DEFAULT_PROOF_LENGTH));

        let decoded = SignatureComposer::decode(&placeholder).unwrap();
        assert_eq!(decoded.proof.len(), DEFAULT_PROOF_LENGTH);
        assert_eq!(decoded.ecdsa_signature.len(), ECDSA_SIGNATURE_LENGTH);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(SignatureComposer::decode(&[1, 2, 3]).is_err());
    }
}
