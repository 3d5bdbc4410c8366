//! Persisted session material
//!
//! Everything needed to act under an opened session: the account, both keys,
//! the allow-lists in insertion order, and the claims root registered on the
//! account. Serialization happens only through the explicit functions below.

use alloy_primitives::{Address, B256};
use core::fmt;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::allowlist::SessionAllowlists;
use crate::claims::SessionClaimsCommitment;
use crate::error::SessionError;
use crate::field::FieldElement;
use crate::merkle::TreeConfig;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMaterial {
    /// Smart account the session acts for
    pub account: Address,
    pub owner_private_key: B256,
    pub session_private_key: B256,
    /// Address of the session key
    pub session_key: Address,
    /// Allow-list A, in insertion order
    pub allowed_contracts: Vec<Address>,
    /// Allow-list B, in insertion order
    pub allowed_recipients: Vec<Address>,
    pub claims_root: FieldElement,
}

impl fmt::Debug for SessionMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMaterial")
            .field("account", &self.account)
            .field("owner_private_key", &"<redacted>")
            .field("session_private_key", &"<redacted>")
            .field("session_key", &self.session_key)
            .field("allowed_contracts", &self.allowed_contracts)
            .field("allowed_recipients", &self.allowed_recipients)
            .field("claims_root", &self.claims_root)
            .finish()
    }
}

impl SessionMaterial {
    pub fn to_json_string(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        std::fs::write(path, self.to_json_string()?).map_err(|e| {
            SessionError::Serialization(format!("cannot write {}: {}", path.display(), e))
        })
    }

    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            SessionError::Serialization(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Rebuild both allow-list trees from the stored address lists
    pub fn allowlists(&self, config: TreeConfig) -> Result<SessionAllowlists, SessionError> {
        SessionAllowlists::build(config, &self.allowed_contracts, &self.allowed_recipients)
    }

    /// Recompute the claims commitment from the stored lists
    pub fn commitment(
        &self,
        allowlists: &SessionAllowlists,
        claims_config: TreeConfig,
    ) -> Result<SessionClaimsCommitment, SessionError> {
        SessionClaimsCommitment::from_session(
            self.account,
            self.session_key,
            &allowlists.contract_calls,
            &allowlists.value_transfers,
            claims_config,
        )
    }
}
