//! Tri-state compliance verdict against the statutory ceiling.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::contract::Contract;
use crate::error::{ValidationError, Violations};
use crate::money::share_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConformityStatus {
    #[serde(rename = "CONFORME")]
    Compliant,
    #[serde(rename = "ATENCAO")]
    Warning,
    #[serde(rename = "INCONFORME")]
    NonCompliant,
}

impl ConformityStatus {
    pub const ALL: [ConformityStatus; 3] = [Self::Compliant, Self::Warning, Self::NonCompliant];

    pub fn code(self) -> &'static str {
        match self {
            Self::Compliant => "CONFORME",
            Self::Warning => "ATENCAO",
            Self::NonCompliant => "INCONFORME",
        }
    }
}

impl fmt::Display for ConformityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ConformityStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|st| st.code() == wanted)
            .ok_or_else(|| ValidationError::single("status", format!("unknown status {s:?}")))
    }
}

/// Thresholds of the evaluator and the advisory table.
///
/// The legal ceilings themselves are statutory and live in
/// [`Category`](crate::classify::Category).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformityPolicy {
    /// Fraction of the ceiling above which a contract is in `ATENCAO`.
    pub warning_ratio: Decimal,
    /// Remaining headroom (percentage points) below which an INFO advisory fires.
    pub low_headroom_percent: Decimal,
}

impl Default for ConformityPolicy {
    fn default() -> Self {
        Self {
            warning_ratio: Decimal::new(8, 1),
            low_headroom_percent: Decimal::new(5, 0),
        }
    }
}

impl ConformityPolicy {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        if self.warning_ratio <= Decimal::ZERO || self.warning_ratio > Decimal::ONE {
            v.push("warning_ratio", "must be in (0, 1]");
        }
        if self.low_headroom_percent < Decimal::ZERO {
            v.push("low_headroom_percent", "must not be negative");
        }
        v.finish()
    }

    /// `ceiling × warning_ratio`: the cumulative percentage above which a
    /// contract stops being plainly compliant.
    pub fn safety_margin(&self, ceiling_percent: Decimal) -> Decimal {
        ceiling_percent * self.warning_ratio
    }

    pub fn status_for(&self, cumulative_percent: Decimal, ceiling_percent: Decimal) -> ConformityStatus {
        if cumulative_percent > ceiling_percent {
            ConformityStatus::NonCompliant
        } else if cumulative_percent > self.safety_margin(ceiling_percent) {
            ConformityStatus::Warning
        } else {
            ConformityStatus::Compliant
        }
    }
}

/// Outcome of evaluating a cumulative percentage against a classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub classification: Classification,
    pub cumulative_percent: Decimal,
    pub status: ConformityStatus,
    pub remaining_percent: Decimal,
    pub remaining_value: Decimal,
}

impl Verdict {
    pub fn within_legal_limit(&self) -> bool {
        self.cumulative_percent <= self.classification.ceiling_percent
    }
}

/// Judge `cumulative_percent` of a contract worth `original_value`.
pub fn judge(
    policy: &ConformityPolicy,
    classification: Classification,
    original_value: Decimal,
    cumulative_percent: Decimal,
) -> Verdict {
    let ceiling = classification.ceiling_percent;
    let remaining_percent = (ceiling - cumulative_percent).max(Decimal::ZERO);
    Verdict {
        classification,
        cumulative_percent,
        status: policy.status_for(cumulative_percent, ceiling),
        remaining_percent,
        remaining_value: share_of(original_value, remaining_percent),
    }
}

/// Evaluate a contract's persisted aggregates.
pub fn evaluate(policy: &ConformityPolicy, contract: &Contract) -> Verdict {
    judge(
        policy,
        contract.classification(),
        contract.original_value,
        contract.aggregates.cumulative_amendment_percent,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Category, classify};
    use crate::contract::NewContract;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn services() -> Classification {
        Category::WorksServicesPurchases.into()
    }

    #[test]
    fn warning_boundary_is_strict() {
        let p = ConformityPolicy::default();
        let at = |pct| judge(&p, services(), dec!(100000), pct).status;
        assert_eq!(at(dec!(20.0)), ConformityStatus::Compliant);
        assert_eq!(at(dec!(20.01)), ConformityStatus::Warning);
        assert_eq!(at(dec!(25.0)), ConformityStatus::Warning);
        assert_eq!(at(dec!(25.01)), ConformityStatus::NonCompliant);
    }

    #[test]
    fn renovation_uses_fifty_percent() {
        let p = ConformityPolicy::default();
        let v = judge(&p, classify("reforma e obra", ""), dec!(1000), dec!(30));
        assert_eq!(v.status, ConformityStatus::Compliant);
        assert_eq!(v.remaining_percent, dec!(20));
        assert_eq!(v.remaining_value, dec!(200.00));
    }

    #[test]
    fn remaining_never_negative() {
        let v = judge(&ConformityPolicy::default(), services(), dec!(1000), dec!(40));
        assert_eq!(v.remaining_percent, Decimal::ZERO);
        assert_eq!(v.remaining_value, Decimal::ZERO);
        assert!(!v.within_legal_limit());
    }

    #[test]
    fn evaluate_reads_persisted_aggregates() {
        let mut c = NewContract {
            id: "7".into(),
            type_label: "serviço".into(),
            original_value: dec!(100000),
            ..Default::default()
        }
        .into_contract(Utc::now());
        c.aggregates.cumulative_amendment_percent = dec!(20.0);

        let v = evaluate(&ConformityPolicy::default(), &c);
        assert_eq!(v.status, ConformityStatus::Compliant);
        assert_eq!(v.remaining_percent, dec!(5.0));
        assert_eq!(v.remaining_value, dec!(5000));
        assert!(v.within_legal_limit());
    }

    #[test]
    fn custom_ratio_moves_warning_threshold() {
        let p = ConformityPolicy {
            warning_ratio: dec!(0.5),
            ..Default::default()
        };
        assert_eq!(p.status_for(dec!(13), dec!(25)), ConformityStatus::Warning);
        assert!(p.validate().is_ok());
        let bad = ConformityPolicy {
            warning_ratio: dec!(1.5),
            low_headroom_percent: dec!(-1),
        };
        assert_eq!(
            bad.validate().unwrap_err().fields(),
            vec!["warning_ratio", "low_headroom_percent"]
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!("atencao".parse::<ConformityStatus>(), Ok(ConformityStatus::Warning));
        assert_eq!(ConformityStatus::NonCompliant.to_string(), "INCONFORME");
    }
}
