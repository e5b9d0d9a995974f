use alloy_primitives::{Address, U256};
use indexmap::{IndexMap, IndexSet};

/// Storage slot key.
pub type StorageKey = U256;

/// Storage slot value.
pub type StorageValue = U256;

/// Collects the accounts and storage slots touched while a transaction executes.
///
/// Accounts are kept in the order they were first touched. For every touched slot only the most
/// recently observed value is kept, whether it was read or written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessTracker {
    /// All touched accounts, in first-touch order
    accounts: IndexSet<Address>,
    /// Last observed value of every touched slot, per account
    storage: IndexMap<Address, IndexMap<StorageKey, StorageValue>>,
}

impl AccessTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the account as touched. Touching an account twice has no effect.
    #[inline]
    pub fn record_account_access(&mut self, address: Address) {
        self.accounts.insert(address);
    }

    /// Records the value returned by an `SLOAD` of `key` on `address`.
    pub fn record_storage_read(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        self.record_storage(address, key, value);
    }

    /// Records the value written by an `SSTORE` to `key` on `address`.
    pub fn record_storage_write(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        self.record_storage(address, key, value);
    }

    fn record_storage(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        self.record_account_access(address);
        self.storage.entry(address).or_default().insert(key, value);
    }

    /// Returns the touched accounts in first-touch order.
    pub fn accounts_touched(&self) -> impl Iterator<Item = Address> + '_ {
        self.accounts.iter().copied()
    }

    /// Returns the number of touched accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if the account was touched.
    pub fn is_touched(&self, address: &Address) -> bool {
        self.accounts.contains(address)
    }

    /// Returns the touched slots of the account with their last observed value.
    ///
    /// Returns an empty iterator for accounts without storage accesses.
    pub fn storage_touched(
        &self,
        address: &Address,
    ) -> impl Iterator<Item = (StorageKey, StorageValue)> + '_ {
        self.storage.get(address).into_iter().flat_map(|slots| slots.iter().map(|(k, v)| (*k, *v)))
    }
}
