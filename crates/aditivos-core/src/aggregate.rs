//! Contract aggregates recomputed from the approved ledger.
//!
//! Always a full recomputation over the approved set, never an increment, so
//! running it twice without new approvals yields identical aggregates.
//!
//! The cumulative percentage is the sum of the per-term percentages stored at
//! creation, not `cumulative_value / original_value × 100`. The two agree only
//! because every term's percentage was computed against the same immutable
//! `original_value`.

use rust_decimal::Decimal;

use crate::contract::ContractAggregates;
use crate::term::{AmendmentRecord, TermKind};

/// Recompute aggregates for a contract with `original_value` from its ledger.
///
/// Only records whose state has passed approval contribute; pending,
/// under-review and rejected records are ignored.
pub fn aggregate(original_value: Decimal, ledger: &[AmendmentRecord]) -> ContractAggregates {
    let mut totals = ContractAggregates::baseline(original_value);

    for record in ledger.iter().filter(|r| r.state.is_approved()) {
        match record.kind {
            TermKind::Amendment => {
                totals.cumulative_amendment_value += record.counted_value();
                totals.cumulative_amendment_percent += record.amendment_percent;
                totals.amendment_count += 1;
            }
            TermKind::Endorsement => totals.endorsement_count += 1,
            TermKind::Termination => totals.termination_count += 1,
            TermKind::DebtAcknowledgment => {}
        }
    }

    totals.current_value = original_value + totals.cumulative_amendment_value;
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::lifecycle::TermState;
    use crate::money::percent_of;
    use crate::numbering::SequenceNumber;
    use crate::term::AmendmentId;
    use chrono::{NaiveDate, Utc};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn record(kind: TermKind, value: Decimal, original: Decimal, state: TermState) -> AmendmentRecord {
        AmendmentRecord {
            id: AmendmentId::generate(),
            contract_id: "c-1".into(),
            kind,
            sequence_number: SequenceNumber::new(1, 2026),
            amendment_value: Some(value),
            amendment_percent: match kind {
                TermKind::Amendment => percent_of(value, original),
                _ => Decimal::ZERO,
            },
            original_value: original,
            description: "d".into(),
            justification: "j".into(),
            effective_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            execution_date: None,
            state,
            commitment_ref: None,
            notes: None,
            attachments: Vec::new(),
            created_by: Actor::new("ana"),
            created_at: Utc::now(),
            updated_by: None,
            updated_at: None,
        }
    }

    #[test]
    fn empty_ledger_is_baseline() {
        let a = aggregate(dec!(1000), &[]);
        assert_eq!(a, ContractAggregates::baseline(dec!(1000)));
    }

    #[test]
    fn single_approved_amendment() {
        let ledger = [record(
            TermKind::Amendment,
            dec!(20000),
            dec!(100000),
            TermState::Approved,
        )];
        let a = aggregate(dec!(100000), &ledger);
        assert_eq!(a.cumulative_amendment_value, dec!(20000));
        assert_eq!(a.cumulative_amendment_percent, dec!(20.0));
        assert_eq!(a.current_value, dec!(120000));
        assert_eq!(a.amendment_count, 1);
    }

    #[test]
    fn partitions_by_kind() {
        let o = dec!(1000);
        let ledger = [
            record(TermKind::Amendment, dec!(100), o, TermState::Approved),
            record(TermKind::Endorsement, dec!(50), o, TermState::Approved),
            record(TermKind::Endorsement, dec!(0), o, TermState::Executed),
            record(TermKind::Termination, dec!(0), o, TermState::Approved),
            record(TermKind::DebtAcknowledgment, dec!(70), o, TermState::Approved),
        ];
        let a = aggregate(o, &ledger);
        assert_eq!(a.amendment_count, 1);
        assert_eq!(a.endorsement_count, 2);
        assert_eq!(a.termination_count, 1);
        assert_eq!(a.cumulative_amendment_value, dec!(100));
        assert_eq!(a.current_value, dec!(1100));
    }

    #[test]
    fn unapproved_states_never_contribute() {
        let o = dec!(1000);
        let ledger = [
            record(TermKind::Amendment, dec!(100), o, TermState::Pending),
            record(TermKind::Amendment, dec!(200), o, TermState::UnderReview),
            record(TermKind::Amendment, dec!(300), o, TermState::Rejected),
            record(TermKind::Amendment, dec!(40), o, TermState::Approved),
        ];
        let a = aggregate(o, &ledger);
        assert_eq!(a.cumulative_amendment_value, dec!(40));
        assert_eq!(a.cumulative_amendment_percent, dec!(4.00));
        assert_eq!(a.amendment_count, 1);
    }

    #[test]
    fn percent_is_sum_of_stored_percentages() {
        // 1/3 each: stored 33.33 three times, so the sum is 99.99, not 100.
        let o = dec!(3);
        let ledger = [
            record(TermKind::Amendment, dec!(1), o, TermState::Approved),
            record(TermKind::Amendment, dec!(1), o, TermState::Approved),
            record(TermKind::Amendment, dec!(1), o, TermState::Approved),
        ];
        let a = aggregate(o, &ledger);
        assert_eq!(a.cumulative_amendment_percent, dec!(99.99));
        assert_eq!(a.cumulative_amendment_value, dec!(3));
    }

    fn state_strategy() -> impl Strategy<Value = TermState> {
        prop_oneof![
            Just(TermState::Pending),
            Just(TermState::UnderReview),
            Just(TermState::Approved),
            Just(TermState::Rejected),
            Just(TermState::Executed),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn idempotent_and_approved_subset_only(
            original in 1_000_i64..10_000_000,
            entries in prop::collection::vec((1_i64..500_000, state_strategy()), 0..12),
        ) {
            let original = Decimal::from(original);
            let ledger: Vec<_> = entries
                .iter()
                .map(|(v, s)| record(TermKind::Amendment, Decimal::from(*v), original, *s))
                .collect();

            let first = aggregate(original, &ledger);
            let second = aggregate(original, &ledger);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.current_value.to_string(), second.current_value.to_string());

            let approved: Vec<_> = ledger.iter().filter(|r| r.state.is_approved()).collect();
            let expected_value: Decimal = approved.iter().map(|r| r.counted_value()).sum();
            let expected_percent: Decimal = approved.iter().map(|r| r.amendment_percent).sum();
            prop_assert_eq!(first.cumulative_amendment_value, expected_value);
            prop_assert_eq!(first.cumulative_amendment_percent, expected_percent);
            prop_assert_eq!(first.amendment_count as usize, approved.len());
            prop_assert_eq!(first.current_value, original + expected_value);

            // Sum of stored percentages stays within rounding of value / original.
            let derived = percent_of(expected_value, original);
            let drift = (first.cumulative_amendment_percent - derived).abs();
            prop_assert!(drift <= dec!(0.005) * Decimal::from(approved.len() + 1));
        }
    }
}
