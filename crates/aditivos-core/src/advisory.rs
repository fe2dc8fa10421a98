//! Recommendations derived from a conformity verdict.
//!
//! A fixed rule table; every matching row fires, so a contract in `ATENCAO`
//! with little headroom gets both the warning and the headroom notice.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::conformity::{ConformityPolicy, ConformityStatus, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub action: String,
}

pub fn advise(policy: &ConformityPolicy, verdict: &Verdict) -> Vec<Advisory> {
    let ceiling = verdict.classification.ceiling_percent;
    let category = verdict.classification.label;
    let mut out = Vec::new();

    match verdict.status {
        ConformityStatus::NonCompliant => out.push(Advisory {
            severity: Severity::Critical,
            title: "Non-compliant contract".into(),
            message: format!("exceeded legal ceiling of {ceiling}% for {category}"),
            action: "Review approved terms and consider termination or renegotiation.".into(),
        }),
        ConformityStatus::Warning => out.push(Advisory {
            severity: Severity::Warning,
            title: "Approaching the limit".into(),
            message: format!("approaching legal ceiling of {ceiling}% for {category}"),
            action: "Monitor new amendments to avoid exceeding the limit.".into(),
        }),
        ConformityStatus::Compliant => {}
    }

    let remaining = verdict.remaining_percent;
    if remaining > Decimal::ZERO && remaining < policy.low_headroom_percent {
        out.push(Advisory {
            severity: Severity::Info,
            title: "Low remaining headroom".into(),
            message: format!("only {remaining}% headroom remains for future amendments"),
            action: "Plan any further amendments carefully.".into(),
        });
    }

    out
}
