//! Boundaries the engine depends on: persistence and time.
//!
//! Every repository call is synchronous and individually atomic. Cross-entity
//! consistency (an amendment state write followed by the contract aggregate
//! write) is the caller's job, done while holding a [`ContractLease`].

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::contract::{Contract, ContractAggregates, ContractId};
use crate::instrument::{Instrument, InstrumentId};
use crate::term::{AmendmentId, AmendmentRecord};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("repository lock poisoned")]
    LockPoisoned,

    #[error("conflicting write: {0}")]
    Conflict(String),
}

impl RepositoryError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

// ── Contract lease ──────────────────────────────────────────────────────

/// Exclusive hold on one contract, released when dropped.
///
/// Two leases on the same contract never coexist; the second
/// [`Repository::lock_contract`] call blocks until the first is dropped.
pub struct ContractLease<'a> {
    contract_id: ContractId,
    release: Option<Box<dyn FnOnce() + Send + 'a>>,
}

impl<'a> ContractLease<'a> {
    pub fn new(contract_id: ContractId, release: impl FnOnce() + Send + 'a) -> Self {
        Self {
            contract_id,
            release: Some(Box::new(release)),
        }
    }

    pub fn contract_id(&self) -> &ContractId {
        &self.contract_id
    }
}

impl fmt::Debug for ContractLease<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractLease")
            .field("contract_id", &self.contract_id)
            .finish_non_exhaustive()
    }
}

impl Drop for ContractLease<'_> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

// ── Repository ──────────────────────────────────────────────────────────

/// Durable state of contracts, amendment ledgers, and instruments.
///
/// Loads return `Ok(None)` for unknown ids; deciding that absence is an
/// error belongs to the caller.
pub trait Repository: Send + Sync {
    fn lock_contract(&self, id: &ContractId) -> Result<ContractLease<'_>, RepositoryError>;

    fn load_contract(&self, id: &ContractId) -> Result<Option<Contract>, RepositoryError>;
    fn list_contracts(&self) -> Result<Vec<Contract>, RepositoryError>;
    /// Insert or replace a whole contract record.
    fn save_contract(&self, contract: &Contract) -> Result<(), RepositoryError>;
    fn save_contract_aggregates(
        &self,
        id: &ContractId,
        aggregates: &ContractAggregates,
    ) -> Result<(), RepositoryError>;

    fn load_amendment(&self, id: &AmendmentId) -> Result<Option<AmendmentRecord>, RepositoryError>;
    fn load_amendments(&self, contract_id: &ContractId) -> Result<Vec<AmendmentRecord>, RepositoryError>;
    /// Insert or replace by id.
    fn save_amendment(&self, record: &AmendmentRecord) -> Result<(), RepositoryError>;

    fn load_instrument(&self, id: &InstrumentId) -> Result<Option<Instrument>, RepositoryError>;
    fn load_instruments(&self, contract_id: &ContractId) -> Result<Vec<Instrument>, RepositoryError>;
    /// Insert or replace by id.
    fn save_instrument(&self, instrument: &Instrument) -> Result<(), RepositoryError>;
}

impl<R: Repository + ?Sized> Repository for &R {
    fn lock_contract(&self, id: &ContractId) -> Result<ContractLease<'_>, RepositoryError> {
        (**self).lock_contract(id)
    }
    fn load_contract(&self, id: &ContractId) -> Result<Option<Contract>, RepositoryError> {
        (**self).load_contract(id)
    }
    fn list_contracts(&self) -> Result<Vec<Contract>, RepositoryError> {
        (**self).list_contracts()
    }
    fn save_contract(&self, contract: &Contract) -> Result<(), RepositoryError> {
        (**self).save_contract(contract)
    }
    fn save_contract_aggregates(
        &self,
        id: &ContractId,
        aggregates: &ContractAggregates,
    ) -> Result<(), RepositoryError> {
        (**self).save_contract_aggregates(id, aggregates)
    }
    fn load_amendment(&self, id: &AmendmentId) -> Result<Option<AmendmentRecord>, RepositoryError> {
        (**self).load_amendment(id)
    }
    fn load_amendments(&self, contract_id: &ContractId) -> Result<Vec<AmendmentRecord>, RepositoryError> {
        (**self).load_amendments(contract_id)
    }
    fn save_amendment(&self, record: &AmendmentRecord) -> Result<(), RepositoryError> {
        (**self).save_amendment(record)
    }
    fn load_instrument(&self, id: &InstrumentId) -> Result<Option<Instrument>, RepositoryError> {
        (**self).load_instrument(id)
    }
    fn load_instruments(&self, contract_id: &ContractId) -> Result<Vec<Instrument>, RepositoryError> {
        (**self).load_instruments(contract_id)
    }
    fn save_instrument(&self, instrument: &Instrument) -> Result<(), RepositoryError> {
        (**self).save_instrument(instrument)
    }
}

// ── Clock ───────────────────────────────────────────────────────────────

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
