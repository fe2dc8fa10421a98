//! Portfolio-wide conformity rows and statistics.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::classify::Category;
use crate::conformity::{ConformityPolicy, ConformityStatus, evaluate};
use crate::contract::{Contract, ContractId};
use crate::error::ValidationError;
use crate::money::{percent_of, round2};

/// One flat line per contract, the unit of BI export and portfolio listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConformityRow {
    pub contract_id: ContractId,
    pub number: Option<String>,
    pub object_text: String,
    pub type_label: String,
    pub directorate: Option<String>,
    pub category: Category,
    pub ceiling_percent: Decimal,
    pub original_value: Decimal,
    pub current_value: Decimal,
    pub cumulative_amendment_value: Decimal,
    pub cumulative_amendment_percent: Decimal,
    pub amendment_count: u32,
    pub status: ConformityStatus,
    pub remaining_percent: Decimal,
    pub remaining_value: Decimal,
}

impl ConformityRow {
    pub fn from_contract(policy: &ConformityPolicy, contract: &Contract) -> Self {
        let verdict = evaluate(policy, contract);
        Self {
            contract_id: contract.id.clone(),
            number: contract.number.clone(),
            object_text: contract.object_text.clone(),
            type_label: contract.type_label.clone(),
            directorate: contract.directorate.clone(),
            category: verdict.classification.category,
            ceiling_percent: verdict.classification.ceiling_percent,
            original_value: contract.original_value,
            current_value: contract.aggregates.current_value,
            cumulative_amendment_value: contract.aggregates.cumulative_amendment_value,
            cumulative_amendment_percent: contract.aggregates.cumulative_amendment_percent,
            amendment_count: contract.aggregates.amendment_count,
            status: verdict.status,
            remaining_percent: verdict.remaining_percent,
            remaining_value: verdict.remaining_value,
        }
    }
}

// ── Pagination ──────────────────────────────────────────────────────────

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Result<Self, ValidationError> {
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(ValidationError::single(
                "limit",
                format!("must be between 1 and {MAX_PAGE_LIMIT}"),
            ));
        }
        Ok(Self { limit, offset })
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

// ── Statistics ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub compliant: usize,
    pub warning: usize,
    pub non_compliant: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotals {
    pub category: Category,
    pub contracts: usize,
    pub original_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioStats {
    pub total_contracts: usize,
    pub by_status: StatusCounts,
    /// Share of compliant contracts, 0 for an empty portfolio.
    pub conformity_percent: Decimal,
    pub by_category: Vec<CategoryTotals>,
    pub total_original_value: Decimal,
    pub total_current_value: Decimal,
    pub total_amendment_value: Decimal,
    pub average_amendment_percent: Decimal,
    pub with_amendments: usize,
    pub without_amendments: usize,
    pub max_amendment_percent: Option<Decimal>,
    pub min_amendment_percent: Option<Decimal>,
}

pub fn portfolio_stats(rows: &[ConformityRow]) -> PortfolioStats {
    let mut by_status = StatusCounts::default();
    let mut by_category: Vec<CategoryTotals> = Category::ALL
        .into_iter()
        .map(|category| CategoryTotals {
            category,
            contracts: 0,
            original_value: Decimal::ZERO,
        })
        .collect();

    let mut total_original = Decimal::ZERO;
    let mut total_current = Decimal::ZERO;
    let mut total_amendment = Decimal::ZERO;
    let mut percent_sum = Decimal::ZERO;
    let mut with_amendments = 0;

    for row in rows {
        match row.status {
            ConformityStatus::Compliant => by_status.compliant += 1,
            ConformityStatus::Warning => by_status.warning += 1,
            ConformityStatus::NonCompliant => by_status.non_compliant += 1,
        }
        if let Some(t) = by_category.iter_mut().find(|t| t.category == row.category) {
            t.contracts += 1;
            t.original_value += row.original_value;
        }
        total_original += row.original_value;
        total_current += row.current_value;
        total_amendment += row.cumulative_amendment_value;
        percent_sum += row.cumulative_amendment_percent;
        if row.amendment_count > 0 {
            with_amendments += 1;
        }
    }

    let total = rows.len();
    let average = if total == 0 {
        Decimal::ZERO
    } else {
        round2(percent_sum / Decimal::from(total))
    };

    PortfolioStats {
        total_contracts: total,
        conformity_percent: percent_of(Decimal::from(by_status.compliant), Decimal::from(total)),
        by_status,
        by_category,
        total_original_value: total_original,
        total_current_value: total_current,
        total_amendment_value: total_amendment,
        average_amendment_percent: average,
        with_amendments,
        without_amendments: total - with_amendments,
        max_amendment_percent: rows.iter().map(|r| r.cumulative_amendment_percent).max(),
        min_amendment_percent: rows.iter().map(|r| r.cumulative_amendment_percent).min(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::NewContract;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn row(id: &str, type_label: &str, original: Decimal, cumulative_pct: Decimal, count: u32) -> ConformityRow {
        let mut c = NewContract {
            id: id.into(),
            type_label: type_label.into(),
            original_value: original,
            ..Default::default()
        }
        .into_contract(Utc::now());
        let added = original * cumulative_pct / dec!(100);
        c.aggregates.cumulative_amendment_percent = cumulative_pct;
        c.aggregates.cumulative_amendment_value = added;
        c.aggregates.current_value = original + added;
        c.aggregates.amendment_count = count;
        ConformityRow::from_contract(&ConformityPolicy::default(), &c)
    }

    #[test]
    fn row_carries_verdict() {
        let r = row("1", "obra", dec!(1000), dec!(21), 1);
        assert_eq!(r.category, Category::WorksServicesPurchases);
        assert_eq!(r.status, ConformityStatus::Warning);
        assert_eq!(r.remaining_percent, dec!(4));
        assert_eq!(r.remaining_value, dec!(40.00));
    }

    #[test]
    fn stats_over_mixed_portfolio() {
        let rows = vec![
            row("1", "obra", dec!(1000), dec!(10), 1),
            row("2", "reforma", dec!(2000), dec!(60), 3),
            row("3", "locação", dec!(500), dec!(0), 0),
        ];
        let s = portfolio_stats(&rows);
        assert_eq!(s.total_contracts, 3);
        assert_eq!(s.by_status.compliant, 2);
        assert_eq!(s.by_status.non_compliant, 1);
        assert_eq!(s.conformity_percent, dec!(66.67));
        assert_eq!(s.total_original_value, dec!(3500));
        assert_eq!(s.total_amendment_value, dec!(1300));
        assert_eq!(s.total_current_value, dec!(4800));
        assert_eq!(s.average_amendment_percent, dec!(23.33));
        assert_eq!(s.with_amendments, 2);
        assert_eq!(s.without_amendments, 1);
        assert_eq!(s.max_amendment_percent, Some(dec!(60)));
        assert_eq!(s.min_amendment_percent, Some(dec!(0)));

        let renovation = s
            .by_category
            .iter()
            .find(|t| t.category == Category::RenovationEquipment)
            .unwrap();
        assert_eq!(renovation.contracts, 1);
        assert_eq!(renovation.original_value, dec!(2000));
    }

    #[test]
    fn empty_portfolio() {
        let s = portfolio_stats(&[]);
        assert_eq!(s.total_contracts, 0);
        assert_eq!(s.conformity_percent, Decimal::ZERO);
        assert_eq!(s.average_amendment_percent, Decimal::ZERO);
        assert_eq!(s.max_amendment_percent, None);
        assert_eq!(s.by_category.len(), 4);
    }

    #[test]
    fn page_bounds() {
        assert!(Page::new(0, 0).unwrap_err().has_field("limit"));
        assert!(Page::new(1001, 0).is_err());
        let p = Page::new(2, 1).unwrap();
        assert_eq!(p.apply(vec![1, 2, 3, 4]), vec![2, 3]);
        assert_eq!(Page::default().limit, 50);
    }
}
