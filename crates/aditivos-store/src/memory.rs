//! Volatile repository backed by hash maps.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use aditivos_core::{
    AmendmentId, AmendmentRecord, Contract, ContractAggregates, ContractId, ContractLease,
    Instrument, InstrumentId, Repository, RepositoryError,
};

use crate::lease::ContractLocks;

/// Repository kept entirely in memory, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    contracts: RwLock<HashMap<ContractId, Contract>>,
    amendments: RwLock<HashMap<AmendmentId, AmendmentRecord>>,
    instruments: RwLock<HashMap<InstrumentId, Instrument>>,
    locks: ContractLocks,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, RepositoryError> {
    lock.read().map_err(|_| RepositoryError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, RepositoryError> {
    lock.write().map_err(|_| RepositoryError::LockPoisoned)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contract_count(&self) -> Result<usize, RepositoryError> {
        Ok(read(&self.contracts)?.len())
    }
}

impl Repository for MemoryStore {
    fn lock_contract(&self, id: &ContractId) -> Result<ContractLease<'_>, RepositoryError> {
        self.locks.acquire(id)
    }

    fn load_contract(&self, id: &ContractId) -> Result<Option<Contract>, RepositoryError> {
        Ok(read(&self.contracts)?.get(id).cloned())
    }

    fn list_contracts(&self) -> Result<Vec<Contract>, RepositoryError> {
        let mut all: Vec<Contract> = read(&self.contracts)?.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    fn save_contract(&self, contract: &Contract) -> Result<(), RepositoryError> {
        write(&self.contracts)?.insert(contract.id.clone(), contract.clone());
        Ok(())
    }

    fn save_contract_aggregates(
        &self,
        id: &ContractId,
        aggregates: &ContractAggregates,
    ) -> Result<(), RepositoryError> {
        let mut contracts = write(&self.contracts)?;
        let contract = contracts
            .get_mut(id)
            .ok_or_else(|| RepositoryError::Conflict(format!("contract {id} does not exist")))?;
        contract.aggregates = aggregates.clone();
        Ok(())
    }

    fn load_amendment(&self, id: &AmendmentId) -> Result<Option<AmendmentRecord>, RepositoryError> {
        Ok(read(&self.amendments)?.get(id).cloned())
    }

    fn load_amendments(&self, contract_id: &ContractId) -> Result<Vec<AmendmentRecord>, RepositoryError> {
        Ok(read(&self.amendments)?
            .values()
            .filter(|r| &r.contract_id == contract_id)
            .cloned()
            .collect())
    }

    fn save_amendment(&self, record: &AmendmentRecord) -> Result<(), RepositoryError> {
        write(&self.amendments)?.insert(record.id, record.clone());
        Ok(())
    }

    fn load_instrument(&self, id: &InstrumentId) -> Result<Option<Instrument>, RepositoryError> {
        Ok(read(&self.instruments)?.get(id).cloned())
    }

    fn load_instruments(&self, contract_id: &ContractId) -> Result<Vec<Instrument>, RepositoryError> {
        Ok(read(&self.instruments)?
            .values()
            .filter(|i| &i.contract_id == contract_id)
            .cloned()
            .collect())
    }

    fn save_instrument(&self, instrument: &Instrument) -> Result<(), RepositoryError> {
        write(&self.instruments)?.insert(instrument.id, instrument.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aditivos_core::NewContract;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn contract(id: &str) -> Contract {
        NewContract {
            id: id.into(),
            type_label: "serviço".into(),
            original_value: dec!(1000),
            ..Default::default()
        }
        .into_contract(Utc::now())
    }

    #[test]
    fn contracts_round_trip_sorted() {
        let store = MemoryStore::new();
        store.save_contract(&contract("b")).unwrap();
        store.save_contract(&contract("a")).unwrap();
        let ids: Vec<_> = store
            .list_contracts()
            .unwrap()
            .into_iter()
            .map(|c| c.id.to_string())
            .collect();
        assert_eq!(ids, ["a", "b"]);
        assert!(store.load_contract(&"zz".into()).unwrap().is_none());
        assert_eq!(store.contract_count().unwrap(), 2);
    }

    #[test]
    fn aggregates_update_in_place() {
        let store = MemoryStore::new();
        store.save_contract(&contract("a")).unwrap();
        let mut agg = ContractAggregates::baseline(dec!(1000));
        agg.amendment_count = 2;
        store.save_contract_aggregates(&"a".into(), &agg).unwrap();
        let loaded = store.load_contract(&"a".into()).unwrap().unwrap();
        assert_eq!(loaded.aggregates.amendment_count, 2);
    }

    #[test]
    fn aggregates_for_unknown_contract_conflict() {
        let store = MemoryStore::new();
        let err = store
            .save_contract_aggregates(&"nope".into(), &ContractAggregates::baseline(dec!(1)))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }
}
