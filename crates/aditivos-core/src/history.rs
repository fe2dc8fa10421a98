//! Per-contract views over the ledger: conformity history and term statistics.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::conformity::{ConformityPolicy, ConformityStatus};
use crate::lifecycle::TermState;
use crate::numbering::SequenceNumber;
use crate::term::{AmendmentRecord, TermKind};

/// One approved amendment and the cumulative position right after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub sequence_number: SequenceNumber,
    pub effective_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub amendment_value: Decimal,
    pub amendment_percent: Decimal,
    pub cumulative_percent: Decimal,
    pub status: ConformityStatus,
}

/// Running cumulative percentage over approved amendments, oldest first.
pub fn conformity_history(
    policy: &ConformityPolicy,
    ceiling_percent: Decimal,
    ledger: &[AmendmentRecord],
) -> Vec<HistoryPoint> {
    let mut approved: Vec<&AmendmentRecord> = ledger
        .iter()
        .filter(|r| r.kind == TermKind::Amendment && r.state.is_approved())
        .collect();
    approved.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.sequence_number.cmp(&b.sequence_number))
    });

    let mut running = Decimal::ZERO;
    approved
        .into_iter()
        .map(|r| {
            running += r.amendment_percent;
            HistoryPoint {
                sequence_number: r.sequence_number,
                effective_date: r.effective_date,
                created_at: r.created_at,
                amendment_value: r.counted_value(),
                amendment_percent: r.amendment_percent,
                cumulative_percent: running,
                status: policy.status_for(running, ceiling_percent),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub total: usize,
    pub amendments: usize,
    pub endorsements: usize,
    pub debt_acknowledgments: usize,
    pub terminations: usize,
    pub approved: usize,
    pub pending: usize,
    /// Creation time of the newest approved term of any kind.
    pub last_approved_at: Option<DateTime<Utc>>,
}

pub fn ledger_stats(ledger: &[AmendmentRecord]) -> LedgerStats {
    let mut stats = LedgerStats {
        total: ledger.len(),
        ..Default::default()
    };
    for r in ledger {
        match r.kind {
            TermKind::Amendment => stats.amendments += 1,
            TermKind::Endorsement => stats.endorsements += 1,
            TermKind::DebtAcknowledgment => stats.debt_acknowledgments += 1,
            TermKind::Termination => stats.terminations += 1,
        }
        if r.state.is_approved() {
            stats.approved += 1;
            stats.last_approved_at = stats.last_approved_at.max(Some(r.created_at));
        }
        if r.state == TermState::Pending {
            stats.pending += 1;
        }
    }
    stats
}
