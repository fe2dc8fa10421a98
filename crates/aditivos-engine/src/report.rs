//! Read-side views: per-contract conformity reports, amendment pre-checks,
//! and portfolio queries.
//!
//! Nothing here writes. Reports read the persisted aggregates as the
//! Aggregator left them; run [`Engine::recompute_contract_aggregates`] first
//! if they may be stale.

use aditivos_core::money::percent_of;
use aditivos_core::{
    Advisory, AmendmentRecord, Category, Classification, Clock, ConformityRow, ConformityStatus,
    Contract, ContractAggregates, ContractId, HistoryPoint, LEGAL_BASIS, LedgerStats, Page,
    PortfolioStats, Repository, SequenceNumber, TermKind, TermState, ValidationError, advise,
    conformity_history, evaluate, judge, ledger_stats, portfolio_stats,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{Engine, EngineError};

// ── Report types ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractSummary {
    pub id: ContractId,
    pub number: Option<String>,
    pub object_text: String,
    pub type_label: String,
    pub directorate: Option<String>,
    pub original_value: Decimal,
    pub current_value: Decimal,
}

impl From<&Contract> for ContractSummary {
    fn from(c: &Contract) -> Self {
        Self {
            id: c.id.clone(),
            number: c.number.clone(),
            object_text: c.object_text.clone(),
            type_label: c.type_label.clone(),
            directorate: c.directorate.clone(),
            original_value: c.original_value,
            current_value: c.aggregates.current_value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    #[serde(flatten)]
    pub classification: Classification,
    pub legal_basis: &'static str,
}

impl From<Classification> for ClassificationReport {
    fn from(classification: Classification) -> Self {
        Self {
            classification,
            legal_basis: LEGAL_BASIS,
        }
    }
}

/// One approved term as it appears in a conformity report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermAnalysis {
    pub sequence_number: SequenceNumber,
    pub kind: TermKind,
    pub kind_label: &'static str,
    pub description: String,
    pub amendment_value: Option<Decimal>,
    pub amendment_percent: Decimal,
    pub effective_date: NaiveDate,
    pub state: TermState,
}

impl From<&AmendmentRecord> for TermAnalysis {
    fn from(r: &AmendmentRecord) -> Self {
        Self {
            sequence_number: r.sequence_number,
            kind: r.kind,
            kind_label: r.kind.label(),
            description: r.description.clone(),
            amendment_value: r.amendment_value,
            amendment_percent: r.amendment_percent,
            effective_date: r.effective_date,
            state: r.state,
        }
    }
}

/// Full conformity picture of one contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConformityReport {
    pub contract: ContractSummary,
    pub classification: ClassificationReport,
    pub aggregates: ContractAggregates,
    pub status: ConformityStatus,
    pub within_legal_limit: bool,
    pub cumulative_percent: Decimal,
    pub remaining_percent: Decimal,
    pub remaining_value: Decimal,
    /// `ceiling × warning_ratio`.
    pub safety_margin_percent: Decimal,
    pub advisories: Vec<Advisory>,
    /// Approved and executed terms, newest first.
    pub approved_terms: Vec<TermAnalysis>,
    pub history: Vec<HistoryPoint>,
    pub statistics: LedgerStats,
}

/// Projection of a hypothetical amendment. Informs, never blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmendmentCheck {
    pub classification: Classification,
    pub requested_value: Decimal,
    pub amendment_percent: Decimal,
    pub current_percent: Decimal,
    pub projected_percent: Decimal,
    pub projected_status: ConformityStatus,
    pub within_legal_limit: bool,
    pub remaining_percent: Decimal,
    pub remaining_value: Decimal,
}

/// Narrowing of the conformity table. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableFilter {
    pub directorate: Option<String>,
    pub status: Option<ConformityStatus>,
    pub category: Option<Category>,
}

// ── Queries ─────────────────────────────────────────────────────────────

impl<R: Repository, C: Clock> Engine<R, C> {
    pub fn conformity(&self, id: &ContractId) -> Result<ConformityReport, EngineError> {
        let contract = self.contract(id)?;
        let mut ledger = self.repo.load_amendments(id)?;
        ledger.sort_by_key(|r| std::cmp::Reverse((r.created_at, r.sequence_number)));

        let verdict = evaluate(&self.policy, &contract);
        let ceiling = verdict.classification.ceiling_percent;

        Ok(ConformityReport {
            contract: ContractSummary::from(&contract),
            classification: verdict.classification.into(),
            aggregates: contract.aggregates.clone(),
            status: verdict.status,
            within_legal_limit: verdict.within_legal_limit(),
            cumulative_percent: verdict.cumulative_percent,
            remaining_percent: verdict.remaining_percent,
            remaining_value: verdict.remaining_value,
            safety_margin_percent: self.policy.safety_margin(ceiling),
            advisories: advise(&self.policy, &verdict),
            approved_terms: ledger
                .iter()
                .filter(|r| r.state.is_approved())
                .map(TermAnalysis::from)
                .collect(),
            history: conformity_history(&self.policy, ceiling, &ledger),
            statistics: ledger_stats(&ledger),
        })
    }

    /// Project `value` as one more approved amendment on top of the current
    /// cumulative percentage.
    pub fn check_amendment(&self, id: &ContractId, value: Decimal) -> Result<AmendmentCheck, EngineError> {
        if value <= Decimal::ZERO {
            return Err(ValidationError::single("value", "must be greater than zero").into());
        }
        let contract = self.contract(id)?;
        let classification = contract.classification();
        let current_percent = contract.aggregates.cumulative_amendment_percent;
        let amendment_percent = percent_of(value, contract.original_value);
        let projected = judge(
            &self.policy,
            classification,
            contract.original_value,
            current_percent + amendment_percent,
        );

        Ok(AmendmentCheck {
            classification,
            requested_value: value,
            amendment_percent,
            current_percent,
            projected_percent: projected.cumulative_percent,
            projected_status: projected.status,
            within_legal_limit: projected.within_legal_limit(),
            remaining_percent: projected.remaining_percent,
            remaining_value: projected.remaining_value,
        })
    }

    /// One conformity row per contract, ordered by contract id.
    pub fn conformity_rows(&self) -> Result<Vec<ConformityRow>, EngineError> {
        let mut rows: Vec<ConformityRow> = self
            .contracts()?
            .iter()
            .map(|c| ConformityRow::from_contract(&self.policy, c))
            .collect();
        rows.sort_by(|a, b| a.contract_id.cmp(&b.contract_id));
        Ok(rows)
    }

    pub fn portfolio_statistics(&self) -> Result<PortfolioStats, EngineError> {
        Ok(portfolio_stats(&self.conformity_rows()?))
    }

    pub fn contracts_by_status(&self, status: ConformityStatus, page: Page) -> Result<Vec<ConformityRow>, EngineError> {
        let mut rows = self.conformity_rows()?;
        rows.retain(|r| r.status == status);
        Ok(page.apply(rows))
    }

    pub fn contracts_by_category(&self, category: Category, page: Page) -> Result<Vec<ConformityRow>, EngineError> {
        let mut rows = self.conformity_rows()?;
        rows.retain(|r| r.category == category);
        Ok(page.apply(rows))
    }

    /// Flat export table, optionally restricted to one directorate
    /// (case-insensitive). Ordered by contract number, then id; contracts
    /// without a number sort last.
    pub fn conformity_table(&self, directorate: Option<&str>) -> Result<Vec<ConformityRow>, EngineError> {
        let wanted = directorate.map(|d| d.trim().to_lowercase());
        let mut rows = self.conformity_rows()?;
        if let Some(wanted) = wanted {
            rows.retain(|r| {
                r.directorate
                    .as_deref()
                    .is_some_and(|d| d.trim().to_lowercase() == wanted)
            });
        }
        rows.sort_by(|a, b| {
            (a.number.is_none(), &a.number, &a.contract_id).cmp(&(b.number.is_none(), &b.number, &b.contract_id))
        });
        Ok(rows)
    }

    /// [`conformity_table`](Self::conformity_table) narrowed by every set
    /// field of `filter`, then paged.
    pub fn filtered_table(&self, filter: &TableFilter, page: Page) -> Result<Vec<ConformityRow>, EngineError> {
        let mut rows = self.conformity_table(filter.directorate.as_deref())?;
        if let Some(status) = filter.status {
            rows.retain(|r| r.status == status);
        }
        if let Some(category) = filter.category {
            rows.retain(|r| r.category == category);
        }
        Ok(page.apply(rows))
    }
}

#[cfg(test)]
mod tests {
    use aditivos_core::{Actor, NewAmendment, NewContract, Severity};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::testing::*;

    fn approve(engine: &Engine<impl Repository, StepClock>, id: &str, value: Decimal) {
        let req = NewAmendment::new(
            id,
            TermKind::Amendment,
            "Acréscimo",
            "Demanda",
            NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
        )
        .with_value(value);
        let r = engine.create_amendment(&actor(), req).unwrap();
        engine
            .transition_amendment(&actor(), &r.id, TermState::Approved, None)
            .unwrap();
    }

    fn add(
        engine: &Engine<impl Repository, StepClock>,
        id: &str,
        number: Option<&str>,
        type_label: &str,
        directorate: Option<&str>,
    ) {
        engine
            .register_contract(
                &Actor::new("importer"),
                NewContract {
                    id: id.into(),
                    number: number.map(str::to_owned),
                    type_label: type_label.into(),
                    original_value: dec!(1000),
                    directorate: directorate.map(str::to_owned),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    #[test]
    fn services_contract_at_twenty_percent() {
        let engine = engine();
        register(&engine, "42", "serviço", dec!(100000));
        approve(&engine, "42", dec!(20000));

        let report = engine.conformity(&"42".into()).unwrap();
        assert_eq!(report.classification.classification.category, Category::WorksServicesPurchases);
        assert_eq!(report.classification.legal_basis, "Lei 14.133/2021");
        assert_eq!(report.status, ConformityStatus::Compliant);
        assert!(report.within_legal_limit);
        assert_eq!(report.remaining_percent, dec!(5.0));
        assert_eq!(report.remaining_value, dec!(5000));
        assert_eq!(report.safety_margin_percent, dec!(20));
        assert_eq!(report.contract.current_value, dec!(120000));
        // Exactly 5.0 headroom is not "low".
        assert!(report.advisories.is_empty());
        assert_eq!(report.approved_terms.len(), 1);
        assert_eq!(report.history.len(), 1);
        assert_eq!(report.history[0].cumulative_percent, dec!(20));
        assert_eq!(report.statistics.approved, 1);
        assert_eq!(
            report.statistics.last_approved_at,
            Some(report.history[0].created_at)
        );
    }

    #[test]
    fn warning_with_low_headroom_co_occur() {
        let engine = engine();
        register(&engine, "42", "serviço", dec!(100000));
        approve(&engine, "42", dec!(15000));
        approve(&engine, "42", dec!(8000));

        let report = engine.conformity(&"42".into()).unwrap();
        assert_eq!(report.status, ConformityStatus::Warning);
        let severities: Vec<_> = report.advisories.iter().map(|a| a.severity).collect();
        assert_eq!(severities, vec![Severity::Warning, Severity::Info]);
        let running: Vec<_> = report.history.iter().map(|h| h.cumulative_percent).collect();
        assert_eq!(running, vec![dec!(15), dec!(23)]);
        assert_eq!(report.history[0].status, ConformityStatus::Compliant);
        assert_eq!(report.history[1].status, ConformityStatus::Warning);
    }

    #[test]
    fn check_projects_without_writing() {
        let engine = engine();
        register(&engine, "42", "serviço", dec!(100000));
        approve(&engine, "42", dec!(20000));

        let check = engine.check_amendment(&"42".into(), dec!(6000)).unwrap();
        assert_eq!(check.amendment_percent, dec!(6));
        assert_eq!(check.current_percent, dec!(20));
        assert_eq!(check.projected_percent, dec!(26));
        assert_eq!(check.projected_status, ConformityStatus::NonCompliant);
        assert!(!check.within_legal_limit);
        assert_eq!(check.remaining_percent, Decimal::ZERO);

        assert_eq!(
            engine.contract(&"42".into()).unwrap().aggregates.cumulative_amendment_percent,
            dec!(20)
        );
        assert_eq!(engine.list_by_contract(&"42".into()).unwrap().len(), 1);
    }

    #[test]
    fn check_rejects_non_positive_value() {
        let engine = engine();
        register(&engine, "42", "serviço", dec!(100000));
        let err = engine.check_amendment(&"42".into(), dec!(0)).unwrap_err();
        assert!(matches!(err, EngineError::Validation(e) if e.fields() == ["value"]));
    }

    #[test]
    fn portfolio_filters_and_pages() {
        let engine = engine();
        add(&engine, "c", Some("003/2024"), "serviço", Some("DIAF"));
        add(&engine, "a", Some("001/2024"), "reforma", Some("diaf"));
        add(&engine, "b", None, "obra", Some("DIOP"));
        approve(&engine, "c", dec!(300));

        let stats = engine.portfolio_statistics().unwrap();
        assert_eq!(stats.total_contracts, 3);
        assert_eq!(stats.by_status.non_compliant, 1);
        assert_eq!(stats.conformity_percent, dec!(66.67));
        let renovation = stats
            .by_category
            .iter()
            .find(|t| t.category == Category::RenovationEquipment)
            .unwrap();
        assert_eq!(renovation.contracts, 1);

        let compliant = engine
            .contracts_by_status(ConformityStatus::Compliant, Page::default())
            .unwrap();
        let ids: Vec<_> = compliant.iter().map(|r| r.contract_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);

        let second = engine
            .contracts_by_status(ConformityStatus::Compliant, Page::new(1, 1).unwrap())
            .unwrap();
        assert_eq!(second[0].contract_id.as_str(), "b");

        let works = engine
            .contracts_by_category(Category::WorksServicesPurchases, Page::default())
            .unwrap();
        assert_eq!(works.len(), 2);

        let diaf: Vec<_> = engine
            .conformity_table(Some("Diaf"))
            .unwrap()
            .into_iter()
            .map(|r| r.contract_id.to_string())
            .collect();
        assert_eq!(diaf, ["a", "c"]);

        let all: Vec<_> = engine
            .conformity_table(None)
            .unwrap()
            .into_iter()
            .map(|r| r.contract_id.to_string())
            .collect();
        assert_eq!(all, ["a", "c", "b"]);
    }

    #[test]
    fn filtered_table_combines_directorate_filter_and_page() {
        let engine = engine();
        add(&engine, "c", Some("003/2024"), "serviço", Some("DIAF"));
        add(&engine, "a", Some("001/2024"), "reforma", Some("diaf"));
        add(&engine, "b", None, "obra", Some("DIOP"));
        add(&engine, "d", Some("002/2024"), "serviço", Some("DIAF"));
        approve(&engine, "c", dec!(300));

        let ids = |filter: &TableFilter, page: Page| -> Vec<String> {
            engine
                .filtered_table(filter, page)
                .unwrap()
                .into_iter()
                .map(|r| r.contract_id.to_string())
                .collect()
        };

        let diaf_compliant = TableFilter {
            directorate: Some("DIAF".into()),
            status: Some(ConformityStatus::Compliant),
            ..Default::default()
        };
        assert_eq!(ids(&diaf_compliant, Page::default()), ["a", "d"]);

        let diaf_works = TableFilter {
            directorate: Some("diaf".into()),
            category: Some(Category::WorksServicesPurchases),
            ..Default::default()
        };
        assert_eq!(ids(&diaf_works, Page::default()), ["d", "c"]);

        let everything = TableFilter::default();
        assert_eq!(ids(&everything, Page::new(1, 0).unwrap()), ["a"]);
        assert_eq!(ids(&everything, Page::new(2, 2).unwrap()), ["c", "b"]);
    }

    #[test]
    fn unknown_contract_reports_not_found() {
        let engine = engine();
        assert!(matches!(
            engine.conformity(&"x".into()),
            Err(EngineError::NotFound { .. })
        ));
        assert!(matches!(
            engine.check_amendment(&"x".into(), dec!(1)),
            Err(EngineError::NotFound { .. })
        ));
    }
}
