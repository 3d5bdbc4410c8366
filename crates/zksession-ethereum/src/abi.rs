//! Contract interfaces used by session operations
//!
//! Only the handful of functions the pipeline calls are declared: the
//! account's `execute` and `addNewZKSessionKey`, the factory's
//! `createAccount`/`getAddress`, and the EntryPoint's `getNonce`.

use alloy_primitives::{aliases::U192, Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use zksession_core::FieldElement;

sol! {
    /// Smart account with zero-knowledge session keys
    interface ISessionAccount {
        function execute(address dest, uint256 value, bytes func);
        function addNewZKSessionKey(address _address, uint256 sessionTreeRoot) returns (bool);
    }

    /// SimpleAccount-style factory
    interface IAccountFactory {
        function createAccount(address owner, uint256 salt) returns (address ret);
        function getAddress(address owner, uint256 salt) returns (address);
    }

    /// ERC-4337 v0.7 EntryPoint (nonce manager)
    interface IEntryPoint {
        function getNonce(address sender, uint192 key) returns (uint256 nonce);
    }
}

/// Call data for `execute(dest, value, func)`
pub fn execute_call(dest: Address, value: U256, func: Bytes) -> Bytes {
    ISessionAccount::executeCall { dest, value, func }
        .abi_encode()
        .into()
}

/// Call data registering a session key with its claims root
pub fn add_session_key_call(session_key: Address, claims_root: FieldElement) -> Bytes {
    ISessionAccount::addNewZKSessionKeyCall {
        _address: session_key,
        sessionTreeRoot: claims_root.as_u256(),
    }
    .abi_encode()
    .into()
}

/// Factory data deploying an account for `owner`
pub fn create_account_call(owner: Address, salt: U256) -> Bytes {
    IAccountFactory::createAccountCall { owner, salt }
        .abi_encode()
        .into()
}

/// `eth_call` data for the counterfactual account address
pub fn get_address_call(owner: Address, salt: U256) -> Bytes {
    IAccountFactory::getAddressCall { owner, salt }
        .abi_encode()
        .into()
}

/// `eth_call` data for the sender's nonce in the default key space
pub fn get_nonce_call(sender: Address) -> Bytes {
    IEntryPoint::getNonceCall {
        sender,
        key: U192::ZERO,
    }
    .abi_encode()
    .into()
}
