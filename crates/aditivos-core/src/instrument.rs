//! Ancillary legal instruments attached to a contract.
//!
//! Instruments share the approval life cycle (minus execution) and the
//! `NNN/YYYY` numbering of amendment records, with their own counter. They
//! never count against the amendment ceiling.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Actor;
use crate::contract::ContractId;
use crate::error::{ValidationError, Violations};
use crate::lifecycle::InstrumentState;
use crate::numbering::SequenceNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(Uuid);

impl InstrumentId {
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

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for InstrumentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| ValidationError::single("id", e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Collaboration,
    LoanForUse,
    Concession,
    Covenant,
    Cooperation,
    Grant,
    Partnership,
    Sponsorship,
    LetterOfIntent,
    Assignment,
    DebtAcknowledgment,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 11] = [
        Self::Collaboration,
        Self::LoanForUse,
        Self::Concession,
        Self::Covenant,
        Self::Cooperation,
        Self::Grant,
        Self::Partnership,
        Self::Sponsorship,
        Self::LetterOfIntent,
        Self::Assignment,
        Self::DebtAcknowledgment,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Collaboration => "collaboration",
            Self::LoanForUse => "loan_for_use",
            Self::Concession => "concession",
            Self::Covenant => "covenant",
            Self::Cooperation => "cooperation",
            Self::Grant => "grant",
            Self::Partnership => "partnership",
            Self::Sponsorship => "sponsorship",
            Self::LetterOfIntent => "letter_of_intent",
            Self::Assignment => "assignment",
            Self::DebtAcknowledgment => "debt_acknowledgment",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Collaboration => "Termo de Colaboração",
            Self::LoanForUse => "Comodato",
            Self::Concession => "Concessão",
            Self::Covenant => "Convênio",
            Self::Cooperation => "Acordo de Cooperação",
            Self::Grant => "Termo de Fomento",
            Self::Partnership => "Parceria",
            Self::Sponsorship => "Patrocínio",
            Self::LetterOfIntent => "Protocolo de Intenções",
            Self::Assignment => "Cessão",
            Self::DebtAcknowledgment => "Reconhecimento de Dívida",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for InstrumentKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.code() == wanted)
            .ok_or_else(|| {
                ValidationError::single("kind", format!("unknown instrument kind {s:?}"))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub contract_id: ContractId,
    pub kind: InstrumentKind,
    pub sequence_number: SequenceNumber,
    pub value: Decimal,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub state: InstrumentState,
    pub notes: Option<String>,
    pub attachments: Vec<String>,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<Actor>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInstrument {
    pub contract_id: ContractId,
    pub kind: InstrumentKind,
    pub value: Decimal,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl NewInstrument {
    pub fn new(
        contract_id: impl Into<ContractId>,
        kind: InstrumentKind,
        value: Decimal,
        description: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            contract_id: contract_id.into(),
            kind,
            value,
            description: description.into(),
            start_date: Some(start_date),
            end_date: Some(end_date),
            notes: None,
            attachments: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require_text("description", &self.description);
        if self.value <= Decimal::ZERO {
            v.push("value", "must be greater than zero");
        }
        if self.start_date.is_none() {
            v.push("start_date", "is required");
        }
        match (self.start_date, self.end_date) {
            (_, None) => v.push("end_date", "is required"),
            (Some(start), Some(end)) if end <= start => {
                v.push("end_date", "must be after start_date")
            }
            _ => {}
        }
        v.require_urls("attachments", &self.attachments);
        v.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn covenant() -> NewInstrument {
        NewInstrument::new(
            "c-1",
            InstrumentKind::Covenant,
            dec!(50000),
            "Convênio com a Secretaria de Saúde",
            date(2026, 1, 1),
            date(2026, 12, 31),
        )
    }

    #[test]
    fn valid_instrument() {
        assert!(covenant().validate().is_ok());
    }

    #[test]
    fn end_must_follow_start() {
        let mut req = covenant();
        req.end_date = Some(date(2026, 1, 1));
        assert_eq!(req.validate().unwrap_err().fields(), vec!["end_date"]);
        req.end_date = Some(date(2025, 6, 1));
        assert!(req.validate().unwrap_err().has_field("end_date"));
    }

    #[test]
    fn value_and_description_required() {
        let mut req = covenant();
        req.value = Decimal::ZERO;
        req.description = String::new();
        assert_eq!(
            req.validate().unwrap_err().fields(),
            vec!["description", "value"]
        );
    }

    #[test]
    fn missing_dates_reported() {
        let mut req = covenant();
        req.start_date = None;
        req.end_date = None;
        assert_eq!(
            req.validate().unwrap_err().fields(),
            vec!["start_date", "end_date"]
        );
    }

    #[test]
    fn kind_codes_parse() {
        for k in InstrumentKind::ALL {
            assert_eq!(k.code().parse::<InstrumentKind>(), Ok(k));
        }
        assert!("aditivo".parse::<InstrumentKind>().is_err());
    }
}
