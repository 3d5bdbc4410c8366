//! Address allow-lists
//!
//! A session carries two allow-lists: the contracts it may call (A) and the
//! addresses it may send value to (B). Both are incremental Merkle trees whose
//! leaves are `uint160(address)`.

use alloy_primitives::Address;
use tracing::debug;

use crate::error::SessionError;
use crate::field::FieldElement;
use crate::hasher::{NodeHasher, PoseidonHasher};
use crate::merkle::{IncrementalMerkleTree, MerkleWitness, TreeConfig};

/// Narrow interface over an address allow-list tree
///
/// The circuit input builder only needs lookups, witnesses and the root, so
/// any tree that can answer these can stand behind a session.
pub trait AllowlistTree {
    /// Append an address, returning its leaf index
    fn insert(&mut self, address: Address) -> Result<usize, SessionError>;

    /// Index of the first leaf holding `address`
    fn index_of(&self, address: Address) -> Option<usize>;

    /// Membership witness for the leaf at `index`
    fn prove_membership(&self, index: usize) -> Result<MerkleWitness, SessionError>;

    /// Current root
    fn root(&self) -> FieldElement;

    /// Number of inserted leaves
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed depth of the tree
    fn depth(&self) -> usize;

    fn config(&self) -> &TreeConfig;

    /// Look up `address` and return its witness in one step
    fn witness_for(&self, address: Address) -> Option<Result<MerkleWitness, SessionError>> {
        self.index_of(address).map(|index| self.prove_membership(index))
    }
}

/// Allow-list tree over addresses, backed by an [`IncrementalMerkleTree`]
#[derive(Debug, Clone)]
pub struct AddressAllowlist<H = PoseidonHasher> {
    tree: IncrementalMerkleTree<H>,
    addresses: Vec<Address>,
}

impl AddressAllowlist<PoseidonHasher> {
    /// Empty Poseidon allow-list
    pub fn new(config: TreeConfig) -> Result<Self, SessionError> {
        Self::with_hasher(config, PoseidonHasher)
    }

    /// Build a Poseidon allow-list from an ordered slice
    ///
    /// Insertion order is slice order, so the same slice always yields the
    /// same root.
    pub fn from_addresses(config: TreeConfig, addresses: &[Address]) -> Result<Self, SessionError> {
        let mut allowlist = Self::new(config)?;
        allowlist.extend(addresses.iter().copied())?;
        Ok(allowlist)
    }
}

impl<H: NodeHasher> AddressAllowlist<H> {
    pub fn with_hasher(config: TreeConfig, hasher: H) -> Result<Self, SessionError> {
        Ok(Self {
            tree: IncrementalMerkleTree::new(config, hasher)?,
            addresses: Vec::new(),
        })
    }

    /// Insert every address in order
    pub fn extend<I>(&mut self, addresses: I) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = Address>,
    {
        for address in addresses {
            self.insert(address)?;
        }
        debug!(leaves = self.len(), root = %self.root(), "Allow-list built");
        Ok(())
    }

    /// Addresses in insertion order
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn contains(&self, address: Address) -> bool {
        self.index_of(address).is_some()
    }

    pub fn hasher(&self) -> &H {
        self.tree.hasher()
    }
}

impl<H: NodeHasher> AllowlistTree for AddressAllowlist<H> {
    fn insert(&mut self, address: Address) -> Result<usize, SessionError> {
        let index = self.tree.insert(FieldElement::from_address(address))?;
        self.addresses.push(address);
        Ok(index)
    }

    fn index_of(&self, address: Address) -> Option<usize> {
        self.addresses.iter().position(|a| *a == address)
    }

    fn prove_membership(&self, index: usize) -> Result<MerkleWitness, SessionError> {
        self.tree.generate_proof(index)
    }

    fn root(&self) -> FieldElement {
        self.tree.root()
    }

    fn len(&self) -> usize {
        self.tree.len()
    }

    fn depth(&self) -> usize {
        self.tree.depth()
    }

    fn config(&self) -> &TreeConfig {
        self.tree.config()
    }
}

/// Both allow-lists of one session
#[derive(Debug, Clone)]
pub struct SessionAllowlists {
    /// Allow-list A: contracts the session may call
    pub contract_calls: AddressAllowlist,
    /// Allow-list B: addresses the session may send value to
    pub value_transfers: AddressAllowlist,
}

impl SessionAllowlists {
    /// Build both trees concurrently
    ///
    /// The trees are independent, so each is filled on its own scoped thread.
    pub fn build(
        config: TreeConfig,
        contract_calls: &[Address],
        value_transfers: &[Address],
    ) -> Result<Self, SessionError> {
        let (contract_calls, value_transfers) = std::thread::scope(|scope| {
            let a = scope.spawn(|| AddressAllowlist::from_addresses(config, contract_calls));
            let b = AddressAllowlist::from_addresses(config, value_transfers);
            let a = a
                .join()
                .unwrap_or_else(|_| Err(SessionError::Hash("allow-list worker panicked".into())));
            (a, b)
        });

        Ok(Self {
            contract_calls: contract_calls?,
            value_transfers: value_transfers?,
        })
    }

    /// Root of allow-list A
    pub fn contract_call_root(&self) -> FieldElement {
        self.contract_calls.root()
    }

    /// Root of allow-list B
    pub fn value_transfer_root(&self) -> FieldElement {
        self.value_transfers.root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const A1: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1");
    const B1: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb1");
    const B2: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2");

    #[test]
    fn test_from_addresses_keeps_order() {
        let list = AddressAllowlist::from_addresses(TreeConfig::new(4), &[B1, B2]).unwrap();
        assert_eq!(list.index_of(B1), Some(0));
        assert_eq!(list.index_of(B2), Some(1));
        assert_eq!(list.index_of(A1), None);
        assert_eq!(list.addresses(), &[B1, B2]);
    }

    #[test]
    fn test_duplicate_resolves_to_first_index() {
        let list = AddressAllowlist::from_addresses(TreeConfig::new(4), &[B1, B2, B1]).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.index_of(B1), Some(0));
    }

    #[test]
    fn test_order_changes_root() {
        let forward = AddressAllowlist::from_addresses(TreeConfig::new(4), &[B1, B2]).unwrap();
        let reverse = AddressAllowlist::from_addresses(TreeConfig::new(4), &[B2, B1]).unwrap();
        assert_ne!(forward.root(), reverse.root());
    }

    #[test]
    fn test_witness_leaf_is_address() {
        let list = AddressAllowlist::from_addresses(TreeConfig::new(4), &[B1, B2]).unwrap();
        let witness = list.witness_for(B2).unwrap().unwrap();
        assert_eq!(witness.leaf, FieldElement::from_address(B2));
        assert_eq!(witness.index, 1);
        assert!(witness.verify(list.hasher()));
        assert!(list.witness_for(A1).is_none());
    }

    #[test]
    fn test_session_allowlists_match_sequential_build() {
        let config = TreeConfig::new(5);
        let lists = SessionAllowlists::build(config, &[A1], &[B1, B2]).unwrap();

        let a = AddressAllowlist::from_addresses(config, &[A1]).unwrap();
        let b = AddressAllowlist::from_addresses(config, &[B1, B2]).unwrap();
        assert_eq!(lists.contract_call_root(), a.root());
        assert_eq!(lists.value_transfer_root(), b.root());
    }

    #[test]
    fn test_session_allowlists_propagate_capacity_error() {
        let result = SessionAllowlists::build(TreeConfig::new(1), &[A1, B1, B2], &[]);
        assert!(matches!(result, Err(SessionError::TreeFull { capacity: 2 })));
    }
}
