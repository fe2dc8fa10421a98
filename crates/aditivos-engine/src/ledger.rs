//! Amendment ledger: creation, life-cycle transitions, queries, and the
//! aggregate run that follows every approval.

use std::cmp::Reverse;

use aditivos_core::money::percent_of;
use aditivos_core::{
    Actor, AmendmentId, AmendmentRecord, Clock, Contract, ContractAggregates, ContractId,
    Lifecycle, NewAmendment, Repository, SequenceNumber, TermKind, TermState, ValidationError,
    aggregate,
};
use chrono::Datelike;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::{Engine, EngineError};

/// Newest first; sequence breaks ties between records created in the same instant.
fn newest_first(records: &mut [AmendmentRecord]) {
    records.sort_by_key(|r| Reverse((r.created_at, r.sequence_number)));
}

impl<R: Repository, C: Clock> Engine<R, C> {
    /// Add a record to a contract's ledger in `pending` state.
    ///
    /// The percentage is fixed here against the contract's original value and
    /// never recomputed. A projection beyond the legal ceiling is logged, not
    /// rejected.
    pub fn create_amendment(&self, actor: &Actor, req: NewAmendment) -> Result<AmendmentRecord, EngineError> {
        actor.validate()?;
        req.validate()?;
        let Some(effective_date) = req.effective_date else {
            return Err(ValidationError::single("effective_date", "is required").into());
        };

        let _lease = self.repo.lock_contract(&req.contract_id)?;
        let contract = self.contract(&req.contract_id)?;
        let ledger = self.repo.load_amendments(&contract.id)?;

        let now = self.clock.now();
        let sequence_number = SequenceNumber::next_after(
            ledger
                .iter()
                .filter(|r| r.kind == req.kind)
                .map(|r| &r.sequence_number),
            now.year(),
        );
        let amendment_percent = match (req.kind, req.value) {
            (TermKind::Amendment, Some(value)) => percent_of(value, contract.original_value),
            _ => Decimal::ZERO,
        };

        let record = AmendmentRecord {
            id: AmendmentId::generate(),
            contract_id: contract.id.clone(),
            kind: req.kind,
            sequence_number,
            amendment_value: req.value,
            amendment_percent,
            original_value: contract.original_value,
            description: req.description.trim().to_owned(),
            justification: req.justification.trim().to_owned(),
            effective_date,
            execution_date: req.execution_date,
            state: TermState::Pending,
            commitment_ref: req.commitment_ref,
            notes: req.notes,
            attachments: req.attachments,
            created_by: actor.clone(),
            created_at: now,
            updated_by: None,
            updated_at: None,
        };
        self.repo.save_amendment(&record)?;

        info!(
            contract = %contract.id,
            amendment = %record.id,
            kind = record.kind.code(),
            sequence = %record.sequence_number,
            percent = %record.amendment_percent,
            actor = %actor,
            "amendment created"
        );

        if record.kind == TermKind::Amendment {
            let projected = contract.aggregates.cumulative_amendment_percent + amendment_percent;
            let ceiling = contract.classification().ceiling_percent;
            if projected > ceiling {
                warn!(
                    contract = %contract.id,
                    amendment = %record.id,
                    projected = %projected,
                    ceiling = %ceiling,
                    "amendment would exceed the legal ceiling if approved"
                );
            }
        }

        Ok(record)
    }

    /// Move a record through its life cycle.
    ///
    /// Entering an approved state recomputes the contract aggregates before
    /// returning. The record write and the aggregate write form one unit: if
    /// the aggregate write fails the record is restored to its previous state
    /// and the whole transition fails.
    pub fn transition_amendment(
        &self,
        actor: &Actor,
        id: &AmendmentId,
        next: TermState,
        notes: Option<String>,
    ) -> Result<AmendmentRecord, EngineError> {
        actor.validate()?;
        let contract_id = self.load_amendment(id)?.contract_id;
        let _lease = self.repo.lock_contract(&contract_id)?;

        // Re-read under the lease: another transition may have landed first.
        let previous = self.load_amendment(id)?;
        let state = previous.state.transition(next)?;

        let mut updated = previous.clone();
        updated.state = state;
        if let Some(notes) = notes {
            updated.notes = Some(notes);
        }
        updated.updated_by = Some(actor.clone());
        updated.updated_at = Some(self.clock.now());

        if state.is_approved() {
            let contract = self.contract(&contract_id)?;
            let mut ledger = self.repo.load_amendments(&contract_id)?;
            match ledger.iter_mut().find(|r| r.id == updated.id) {
                Some(slot) => *slot = updated.clone(),
                None => ledger.push(updated.clone()),
            }
            let totals = aggregate(contract.original_value, &ledger);

            self.repo.save_amendment(&updated)?;
            if let Err(err) = self.repo.save_contract_aggregates(&contract_id, &totals) {
                warn!(
                    contract = %contract_id,
                    amendment = %id,
                    error = %err,
                    "aggregate write failed, rolling back state transition"
                );
                if let Err(rollback) = self.repo.save_amendment(&previous) {
                    error!(
                        contract = %contract_id,
                        amendment = %id,
                        error = %rollback,
                        "rollback failed, amendment state may disagree with contract aggregates"
                    );
                }
                return Err(err.into());
            }
            log_aggregates(&contract, &totals);
        } else {
            self.repo.save_amendment(&updated)?;
        }

        info!(
            contract = %contract_id,
            amendment = %id,
            from = previous.state.code(),
            to = state.code(),
            actor = %actor,
            "amendment state changed"
        );
        Ok(updated)
    }

    /// Recompute and persist a contract's aggregates from its approved ledger.
    ///
    /// Idempotent: a second call with no new approvals writes identical values.
    pub fn recompute_contract_aggregates(&self, id: &ContractId) -> Result<ContractAggregates, EngineError> {
        let _lease = self.repo.lock_contract(id)?;
        let contract = self.contract(id)?;
        let ledger = self.repo.load_amendments(id)?;
        let totals = aggregate(contract.original_value, &ledger);
        self.repo.save_contract_aggregates(id, &totals)?;
        log_aggregates(&contract, &totals);
        Ok(totals)
    }

    // ── Queries ──

    pub fn load_amendment(&self, id: &AmendmentId) -> Result<AmendmentRecord, EngineError> {
        self.repo
            .load_amendment(id)?
            .ok_or_else(|| EngineError::not_found("amendment", id))
    }

    /// Every record of a contract, newest first.
    pub fn list_by_contract(&self, contract_id: &ContractId) -> Result<Vec<AmendmentRecord>, EngineError> {
        self.contract(contract_id)?;
        let mut records = self.repo.load_amendments(contract_id)?;
        newest_first(&mut records);
        Ok(records)
    }

    pub fn list_by_kind(&self, contract_id: &ContractId, kind: TermKind) -> Result<Vec<AmendmentRecord>, EngineError> {
        let mut records = self.list_by_contract(contract_id)?;
        records.retain(|r| r.kind == kind);
        Ok(records)
    }

    /// Records that have passed approval (approved or executed), newest first.
    pub fn list_approved(&self, contract_id: &ContractId) -> Result<Vec<AmendmentRecord>, EngineError> {
        let mut records = self.list_by_contract(contract_id)?;
        records.retain(|r| r.state.is_approved());
        Ok(records)
    }
}

fn log_aggregates(contract: &Contract, totals: &ContractAggregates) {
    info!(
        contract = %contract.id,
        current_value = %totals.current_value,
        cumulative_value = %totals.cumulative_amendment_value,
        cumulative_percent = %totals.cumulative_amendment_percent,
        amendments = totals.amendment_count,
        endorsements = totals.endorsement_count,
        terminations = totals.termination_count,
        "aggregates recomputed"
    );
}
