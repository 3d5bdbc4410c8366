//! Session claims commitment
//!
//! A session is described on-chain by a single root: a depth-2 tree over four
//! claims inserted in a fixed order (account, session key, allow-list A root,
//! allow-list B root). The circuit recomputes this tree, so a different order
//! yields a root the verifier rejects. [`SessionClaimsBuilder`] makes the
//! order a property of the types instead of the caller.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::allowlist::AllowlistTree;
use crate::error::SessionError;
use crate::field::FieldElement;
use crate::hasher::PoseidonHasher;
use crate::merkle::{IncrementalMerkleTree, TreeConfig};

/// Number of leaves in the claims tree
pub const CLAIM_COUNT: usize = 4;

/// The four claims of a session, in commitment order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub account: Address,
    pub session_key: Address,
    pub allowlist_a_root: FieldElement,
    pub allowlist_b_root: FieldElement,
}

impl SessionClaims {
    pub fn builder() -> SessionClaimsBuilder {
        SessionClaimsBuilder::default()
    }

    /// Claims as tree leaves, in the order the circuit expects
    pub fn leaves(&self) -> [FieldElement; CLAIM_COUNT] {
        [
            FieldElement::from_address(self.account),
            FieldElement::from_address(self.session_key),
            self.allowlist_a_root,
            self.allowlist_b_root,
        ]
    }

    /// Insert the claims into a fresh tree and return the commitment
    pub fn commit(self, config: TreeConfig) -> Result<SessionClaimsCommitment, SessionError> {
        let leaves = self.leaves();
        if (CLAIM_COUNT as u64) > config.capacity() {
            return Err(SessionError::InvalidConfig(format!(
                "claims tree of depth {} cannot hold {} claims",
                config.depth, CLAIM_COUNT
            )));
        }

        let mut tree = IncrementalMerkleTree::new(config, PoseidonHasher)?;
        for leaf in leaves {
            tree.insert(leaf)?;
        }

        let root = tree.root();
        debug!(account = %self.account, session_key = %self.session_key, root = %root, "Committed session claims");
        Ok(SessionClaimsCommitment {
            claims: leaves,
            root,
        })
    }
}

/// Builder that accepts each claim exactly once
#[derive(Debug, Default, Clone)]
pub struct SessionClaimsBuilder {
    account: Option<Address>,
    session_key: Option<Address>,
    allowlist_a_root: Option<FieldElement>,
    allowlist_b_root: Option<FieldElement>,
}

fn set_once<T>(slot: &mut Option<T>, value: T, name: &'static str) -> Result<(), SessionError> {
    if slot.is_some() {
        return Err(SessionError::ClaimAlreadySet(name));
    }
    *slot = Some(value);
    Ok(())
}

impl SessionClaimsBuilder {
    pub fn with_account(mut self, account: Address) -> Result<Self, SessionError> {
        set_once(&mut self.account, account, "account")?;
        Ok(self)
    }

    pub fn with_session_key(mut self, session_key: Address) -> Result<Self, SessionError> {
        set_once(&mut self.session_key, session_key, "session_key")?;
        Ok(self)
    }

    /// Root of the contract-call allow-list
    pub fn with_allowlist_a_root(mut self, root: FieldElement) -> Result<Self, SessionError> {
        set_once(&mut self.allowlist_a_root, root, "allowlist_a_root")?;
        Ok(self)
    }

    /// Root of the value-transfer allow-list
    pub fn with_allowlist_b_root(mut self, root: FieldElement) -> Result<Self, SessionError> {
        set_once(&mut self.allowlist_b_root, root, "allowlist_b_root")?;
        Ok(self)
    }

    /// Check that every claim is present
    pub fn build(self) -> Result<SessionClaims, SessionError> {
        Ok(SessionClaims {
            account: self.account.ok_or(SessionError::MissingClaim("account"))?,
            session_key: self
                .session_key
                .ok_or(SessionError::MissingClaim("session_key"))?,
            allowlist_a_root: self
                .allowlist_a_root
                .ok_or(SessionError::MissingClaim("allowlist_a_root"))?,
            allowlist_b_root: self
                .allowlist_b_root
                .ok_or(SessionError::MissingClaim("allowlist_b_root"))?,
        })
    }

    pub fn commit(self, config: TreeConfig) -> Result<SessionClaimsCommitment, SessionError> {
        self.build()?.commit(config)
    }
}

/// Committed claims and their root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaimsCommitment {
    pub claims: [FieldElement; CLAIM_COUNT],
    pub root: FieldElement,
}

impl SessionClaimsCommitment {
    /// Commit a session from its two allow-lists
    pub fn from_session<A, B>(
        account: Address,
        session_key: Address,
        allowlist_a: &A,
        allowlist_b: &B,
        config: TreeConfig,
    ) -> Result<Self, SessionError>
    where
        A: AllowlistTree + ?Sized,
        B: AllowlistTree + ?Sized,
    {
        SessionClaims::builder()
            .with_account(account)?
            .with_session_key(session_key)?
            .with_allowlist_a_root(allowlist_a.root())?
            .with_allowlist_b_root(allowlist_b.root())?
            .commit(config)
    }

    pub fn root(&self) -> FieldElement {
        self.root
    }

    /// Whether this commitment matches a root read back from elsewhere
    pub fn matches(&self, root: FieldElement) -> bool {
        self.root == root
    }
}
