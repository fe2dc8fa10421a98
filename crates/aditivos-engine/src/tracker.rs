//! Ancillary instruments: covenants, grants, concessions and the like.
//!
//! Instruments never touch the contract aggregates; they share the lease only
//! so that sequence allocation stays gap-free under concurrency.

use std::cmp::Reverse;

use aditivos_core::{
    Actor, Clock, ContractId, Instrument, InstrumentId, InstrumentState, Lifecycle, NewInstrument,
    Repository, SequenceNumber, ValidationError,
};
use chrono::Datelike;
use tracing::info;

use crate::{Engine, EngineError};

impl<R: Repository, C: Clock> Engine<R, C> {
    pub fn create_instrument(&self, actor: &Actor, req: NewInstrument) -> Result<Instrument, EngineError> {
        actor.validate()?;
        req.validate()?;
        let (Some(start_date), Some(end_date)) = (req.start_date, req.end_date) else {
            return Err(ValidationError::single("start_date", "is required").into());
        };

        let _lease = self.repo.lock_contract(&req.contract_id)?;
        let contract = self.contract(&req.contract_id)?;
        let existing = self.repo.load_instruments(&contract.id)?;

        let now = self.clock.now();
        let sequence_number = SequenceNumber::next_after(
            existing
                .iter()
                .filter(|i| i.kind == req.kind)
                .map(|i| &i.sequence_number),
            now.year(),
        );

        let instrument = Instrument {
            id: InstrumentId::generate(),
            contract_id: contract.id,
            kind: req.kind,
            sequence_number,
            value: req.value,
            description: req.description.trim().to_owned(),
            start_date,
            end_date,
            state: InstrumentState::Pending,
            notes: req.notes,
            attachments: req.attachments,
            created_by: actor.clone(),
            created_at: now,
            updated_by: None,
            updated_at: None,
        };
        self.repo.save_instrument(&instrument)?;

        info!(
            contract = %instrument.contract_id,
            instrument = %instrument.id,
            kind = instrument.kind.code(),
            sequence = %instrument.sequence_number,
            actor = %actor,
            "instrument created"
        );
        Ok(instrument)
    }

    pub fn transition_instrument(
        &self,
        actor: &Actor,
        id: &InstrumentId,
        next: InstrumentState,
        notes: Option<String>,
    ) -> Result<Instrument, EngineError> {
        actor.validate()?;
        let contract_id = self.load_instrument(id)?.contract_id;
        let _lease = self.repo.lock_contract(&contract_id)?;

        let mut instrument = self.load_instrument(id)?;
        let from = instrument.state;
        instrument.state = from.transition(next)?;
        if let Some(notes) = notes {
            instrument.notes = Some(notes);
        }
        instrument.updated_by = Some(actor.clone());
        instrument.updated_at = Some(self.clock.now());
        self.repo.save_instrument(&instrument)?;

        info!(
            contract = %contract_id,
            instrument = %id,
            from = from.code(),
            to = next.code(),
            actor = %actor,
            "instrument state changed"
        );
        Ok(instrument)
    }

    pub fn load_instrument(&self, id: &InstrumentId) -> Result<Instrument, EngineError> {
        self.repo
            .load_instrument(id)?
            .ok_or_else(|| EngineError::not_found("instrument", id))
    }

    /// Instruments of a contract, latest start date first.
    pub fn list_instruments(&self, contract_id: &ContractId) -> Result<Vec<Instrument>, EngineError> {
        self.contract(contract_id)?;
        let mut instruments = self.repo.load_instruments(contract_id)?;
        instruments.sort_by_key(|i| Reverse((i.start_date, i.created_at)));
        Ok(instruments)
    }
}
