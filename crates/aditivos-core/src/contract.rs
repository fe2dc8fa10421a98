//! The persistent contract record and the aggregate fields derived from its ledger.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::classify::{Classification, classify};
use crate::error::{ValidationError, Violations};

/// Opaque contract identity assigned by the importing system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(String);

impl ContractId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContractId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Fields recomputed from the approved ledger entries.
///
/// Written only by the aggregator. A fresh contract starts from
/// [`baseline`](Self::baseline): no amendments, current value equal to the
/// original value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAggregates {
    pub current_value: Decimal,
    pub cumulative_amendment_value: Decimal,
    pub cumulative_amendment_percent: Decimal,
    pub amendment_count: u32,
    pub endorsement_count: u32,
    pub termination_count: u32,
}

impl ContractAggregates {
    pub fn baseline(original_value: Decimal) -> Self {
        Self {
            current_value: original_value,
            cumulative_amendment_value: Decimal::ZERO,
            cumulative_amendment_percent: Decimal::ZERO,
            amendment_count: 0,
            endorsement_count: 0,
            termination_count: 0,
        }
    }
}

/// A public contract as known to the engine.
///
/// `original_value` is fixed once the contract is signed; every amendment
/// percentage is computed against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    /// Human contract number, e.g. `"045/2024"`.
    pub number: Option<String>,
    /// Declared contract type ("tipo"), free text.
    pub type_label: String,
    /// Contract object description ("objeto"), free text.
    pub object_text: String,
    pub original_value: Decimal,
    /// Owning directorate, used to filter portfolio reports.
    pub directorate: Option<String>,
    #[serde(flatten)]
    pub aggregates: ContractAggregates,
    pub registered_at: DateTime<Utc>,
}

/// Input for registering an imported contract.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewContract {
    pub id: String,
    pub number: Option<String>,
    pub type_label: String,
    pub object_text: String,
    pub original_value: Decimal,
    pub directorate: Option<String>,
}

impl NewContract {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require_text("id", &self.id);
        if self.original_value < Decimal::ZERO {
            v.push("original_value", "must not be negative");
        }
        v.finish()
    }

    pub fn into_contract(self, registered_at: DateTime<Utc>) -> Contract {
        Contract {
            id: ContractId::new(self.id.trim()),
            number: self.number,
            type_label: self.type_label,
            object_text: self.object_text,
            aggregates: ContractAggregates::baseline(self.original_value),
            original_value: self.original_value,
            directorate: self.directorate,
            registered_at,
        }
    }
}

impl Contract {
    pub fn classification(&self) -> Classification {
        classify(&self.type_label, &self.object_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Category;
    use rust_decimal_macros::dec;

    #[test]
    fn new_contract_starts_at_baseline() {
        let c = NewContract {
            id: " 42 ".into(),
            type_label: "serviço".into(),
            original_value: dec!(100000),
            ..Default::default()
        }
        .into_contract(Utc::now());

        assert_eq!(c.id.as_str(), "42");
        assert_eq!(c.aggregates.current_value, dec!(100000));
        assert_eq!(c.aggregates.cumulative_amendment_percent, Decimal::ZERO);
        assert_eq!(c.aggregates.amendment_count, 0);
        assert_eq!(c.classification().category, Category::WorksServicesPurchases);
    }

    #[test]
    fn rejects_blank_id_and_negative_value() {
        let err = NewContract {
            id: "  ".into(),
            original_value: dec!(-1),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.fields(), vec!["id", "original_value"]);
    }
}
