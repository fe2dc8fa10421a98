//! In-process per-contract mutual exclusion.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

use aditivos_core::{ContractId, ContractLease, RepositoryError};
use tracing::debug;

/// Set of contracts currently leased, with a condition variable to wake
/// waiters when one is released.
#[derive(Debug, Default)]
pub struct ContractLocks {
    held: Mutex<HashSet<ContractId>>,
    released: Condvar,
}

impl ContractLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `id` is free, then hold it until the lease is dropped.
    pub fn acquire(&self, id: &ContractId) -> Result<ContractLease<'_>, RepositoryError> {
        let mut held = self.held.lock().map_err(|_| RepositoryError::LockPoisoned)?;
        while held.contains(id) {
            held = self
                .released
                .wait(held)
                .map_err(|_| RepositoryError::LockPoisoned)?;
        }
        held.insert(id.clone());
        drop(held);
        debug!(contract = %id, "lease acquired");

        let key = id.clone();
        Ok(ContractLease::new(id.clone(), move || self.release(&key)))
    }

    pub fn is_held(&self, id: &ContractId) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    fn release(&self, id: &ContractId) {
        // Runs from Drop: never panic, recover the set even if poisoned.
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.remove(id);
        drop(held);
        self.released.notify_all();
        debug!(contract = %id, "lease released");
    }
}
