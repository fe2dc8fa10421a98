//! Amendment ledger records ("termos contratuais").

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Actor;
use crate::contract::ContractId;
use crate::error::{ValidationError, Violations};
use crate::lifecycle::TermState;
use crate::numbering::SequenceNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AmendmentId(Uuid);

impl AmendmentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AmendmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AmendmentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| ValidationError::single("id", e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    /// Aditivo: increases the contract value; counts against the legal ceiling.
    Amendment,
    /// Apostilamento: non-monetary annotation.
    Endorsement,
    DebtAcknowledgment,
    /// Rescisão: early close-out.
    Termination,
}

impl TermKind {
    pub const ALL: [TermKind; 4] = [
        Self::Amendment,
        Self::Endorsement,
        Self::DebtAcknowledgment,
        Self::Termination,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Amendment => "amendment",
            Self::Endorsement => "endorsement",
            Self::DebtAcknowledgment => "debt_acknowledgment",
            Self::Termination => "termination",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Amendment => "Aditivo",
            Self::Endorsement => "Apostilamento",
            Self::DebtAcknowledgment => "Reconhecimento de Dívida",
            Self::Termination => "Rescisão",
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TermKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.code() == wanted)
            .ok_or_else(|| ValidationError::single("kind", format!("unknown term kind {s:?}")))
    }
}

/// One entry of a contract's amendment ledger.
///
/// `amendment_value` and `amendment_percent` are fixed at creation and never
/// recomputed, even if the contract is later reclassified. Records are never
/// deleted; state transitions are the only mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendmentRecord {
    pub id: AmendmentId,
    pub contract_id: ContractId,
    pub kind: TermKind,
    pub sequence_number: SequenceNumber,
    pub amendment_value: Option<Decimal>,
    /// `amendment_value / original_value × 100` at creation, 2 decimals.
    /// Zero for every kind other than [`TermKind::Amendment`].
    pub amendment_percent: Decimal,
    /// Contract original value the percentage was computed against.
    pub original_value: Decimal,
    pub description: String,
    pub justification: String,
    pub effective_date: NaiveDate,
    pub execution_date: Option<NaiveDate>,
    pub state: TermState,
    /// Budget commitment ("empenho") backing the term.
    pub commitment_ref: Option<String>,
    pub notes: Option<String>,
    pub attachments: Vec<String>,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<Actor>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AmendmentRecord {
    /// Value this record adds to the contract once approved.
    pub fn counted_value(&self) -> Decimal {
        match self.kind {
            TermKind::Amendment => self.amendment_value.unwrap_or(Decimal::ZERO),
            _ => Decimal::ZERO,
        }
    }
}

/// A request to add a record to a contract's ledger.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAmendment {
    pub contract_id: ContractId,
    pub kind: TermKind,
    pub value: Option<Decimal>,
    pub description: String,
    pub justification: String,
    pub effective_date: Option<NaiveDate>,
    pub execution_date: Option<NaiveDate>,
    #[serde(default)]
    pub commitment_ref: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl NewAmendment {
    pub fn new(
        contract_id: impl Into<ContractId>,
        kind: TermKind,
        description: impl Into<String>,
        justification: impl Into<String>,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            contract_id: contract_id.into(),
            kind,
            value: None,
            description: description.into(),
            justification: justification.into(),
            effective_date: Some(effective_date),
            execution_date: None,
            commitment_ref: None,
            notes: None,
            attachments: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: Decimal) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_execution_date(mut self, date: NaiveDate) -> Self {
        self.execution_date = Some(date);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require_text("description", &self.description);
        v.require_text("justification", &self.justification);

        match self.effective_date {
            None => v.push("effective_date", "is required"),
            Some(effective) => {
                if let Some(execution) = self.execution_date
                    && execution < effective
                {
                    v.push("execution_date", "must not be before effective_date");
                }
            }
        }

        match (self.kind, self.value) {
            (TermKind::Amendment, None) => v.push("value", "is required for an amendment"),
            (TermKind::Amendment, Some(value)) if value <= Decimal::ZERO => {
                v.push("value", "must be greater than zero")
            }
            (_, Some(value)) if value < Decimal::ZERO => v.push("value", "must not be negative"),
            _ => {}
        }

        v.require_urls("attachments", &self.attachments);
        v.finish()
    }
}
