//! Request-scoped services over a [`Repository`].
//!
//! The [`Engine`] holds no state of its own between calls: every operation
//! reads what it needs from the repository, and every mutation that touches
//! more than one entity runs under the contract's lease.
//!
//! ```text
//! create ──► pending ──► approve ──► aggregate ──► save record + aggregates
//!                                        │
//!                                        └──► evaluate ──► advise (on read)
//! ```

mod error;
mod ledger;
mod report;
mod tracker;

pub use error::EngineError;
pub use report::{
    AmendmentCheck, ClassificationReport, ConformityReport, ContractSummary, TableFilter,
    TermAnalysis,
};

use aditivos_core::{
    Actor, Clock, ConformityPolicy, Contract, ContractId, NewContract, Repository, SystemClock,
    ValidationError,
};
use tracing::info;

pub struct Engine<R, C = SystemClock> {
    repo: R,
    clock: C,
    policy: ConformityPolicy,
}

impl<R: Repository> Engine<R> {
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, SystemClock)
    }
}

impl<R: Repository, C: Clock> Engine<R, C> {
    pub fn with_clock(repo: R, clock: C) -> Self {
        Self {
            repo,
            clock,
            policy: ConformityPolicy::default(),
        }
    }

    /// Replace the default thresholds.
    pub fn with_policy(mut self, policy: ConformityPolicy) -> Result<Self, ValidationError> {
        policy.validate()?;
        self.policy = policy;
        Ok(self)
    }

    pub fn policy(&self) -> &ConformityPolicy {
        &self.policy
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    // ── Contracts ──

    /// Register an imported contract with baseline aggregates.
    pub fn register_contract(&self, actor: &Actor, req: NewContract) -> Result<Contract, EngineError> {
        actor.validate()?;
        req.validate()?;
        let id = ContractId::new(req.id.trim());
        let _lease = self.repo.lock_contract(&id)?;
        if self.repo.load_contract(&id)?.is_some() {
            return Err(ValidationError::single("id", format!("contract {id} already registered")).into());
        }

        let contract = req.into_contract(self.clock.now());
        self.repo.save_contract(&contract)?;
        info!(
            contract = %contract.id,
            category = contract.classification().category.code(),
            original_value = %contract.original_value,
            actor = %actor,
            "contract registered"
        );
        Ok(contract)
    }

    pub fn contract(&self, id: &ContractId) -> Result<Contract, EngineError> {
        self.repo
            .load_contract(id)?
            .ok_or_else(|| EngineError::not_found("contract", id))
    }

    pub fn contracts(&self) -> Result<Vec<Contract>, EngineError> {
        Ok(self.repo.list_contracts()?)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn register_and_fetch() {
        let engine = engine();
        let c = register(&engine, "42", "serviço", dec!(100000));
        assert_eq!(engine.contract(&"42".into()).unwrap(), c);
        assert_eq!(engine.contracts().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let engine = engine();
        register(&engine, "42", "serviço", dec!(1));
        let err = engine
            .register_contract(
                &actor(),
                NewContract {
                    id: "42".into(),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(e) if e.has_field("id")));
    }

    #[test]
    fn unknown_contract_not_found() {
        let err = engine().contract(&"missing".into()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "contract", .. }));
        assert_eq!(err.to_string(), "contract missing not found");
    }

    #[test]
    fn blank_actor_rejected() {
        let err = engine()
            .register_contract(&Actor::new(" "), NewContract::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(e) if e.fields() == ["actor"]));
    }

    #[test]
    fn policy_validated() {
        let bad = ConformityPolicy {
            warning_ratio: dec!(2),
            ..Default::default()
        };
        assert!(engine().with_policy(bad).is_err());
    }
}
