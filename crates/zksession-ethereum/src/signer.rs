//! ECDSA signing of operation hashes
//!
//! Both the owner (deployment) and the session key (session operations) sign
//! the operation hash as an EIP-191 personal message.

use alloy_primitives::{Address, Bytes, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;

use crate::error::SignerError;

/// Load a signer from a raw secp256k1 private key
pub fn signer_from_key(key: B256) -> Result<PrivateKeySigner, SignerError> {
    PrivateKeySigner::from_bytes(&key).map_err(|e| SignerError::InvalidKey(e.to_string()))
}

/// Fresh random key, returned with its address
pub fn generate_key() -> (B256, Address) {
    let signer = PrivateKeySigner::random();
    (signer.to_bytes(), signer.address())
}

/// Sign `hash` as `"\x19Ethereum Signed Message:\n32" || hash`
///
/// Returns the 65-byte `r || s || v` form with `v` in {27, 28}.
pub fn sign_operation_hash(signer: &PrivateKeySigner, hash: B256) -> Result<Bytes, SignerError> {
    let signature = signer
        .sign_message_sync(hash.as_slice())
        .map_err(|e| SignerError::Signing(e.to_string()))?;
    Ok(Bytes::copy_from_slice(&signature.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{b256, Signature};
    use zksession_core::ECDSA_SIGNATURE_LENGTH;

    #[test]
    fn test_signature_recovers_to_signer() {
        let key = b256!("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80");
        let signer = signer_from_key(key).unwrap();
        let hash = B256::repeat_byte(0x42);

        let signature = sign_operation_hash(&signer, hash).unwrap();
        assert_eq!(signature.len(), ECDSA_SIGNATURE_LENGTH);
        assert!(matches!(signature[64], 27 | 28));

        let parsed = Signature::from_raw(&signature).unwrap();
        let recovered = parsed.recover_address_from_msg(hash.as_slice()).unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn test_zero_key_is_rejected() {
        assert!(matches!(
            signer_from_key(B256::ZERO),
            Err(SignerError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_generated_key_matches_address() {
        let (key, address) = generate_key();
        assert_eq!(signer_from_key(key).unwrap().address(), address);
    }
}
