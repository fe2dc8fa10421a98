//! Human-readable cards and tables for engine results.
//!
//! Cards group fields under section headers with a fixed label column; long
//! lists are truncated after [`MAX_LIST_ITEMS`] entries.

use std::fmt::Display;

use aditivos_core::schema::conformity_batch;
use aditivos_core::{
    AmendmentRecord, ConformityRow, Contract, ContractAggregates, Instrument, Lifecycle,
    PortfolioStats,
};
use aditivos_engine::{AmendmentCheck, ConformityReport};
use arrow::util::pretty::pretty_format_batches;

const MAX_LIST_ITEMS: usize = 10;

// ── Field helpers ──

fn line(label: &str, value: impl Display) {
    println!("  {:<26} {}", label, value);
}

fn opt_line(label: &str, value: Option<impl Display>) {
    if let Some(v) = value {
        line(label, v);
    }
}

fn percent(value: impl Display) -> String {
    format!("{value}%")
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max - 3).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

// ── Contracts ──

pub fn print_contract(contract: &Contract) {
    println!("=== {} ===", contract.id);
    if !contract.object_text.is_empty() {
        println!("{}", contract.object_text);
    }
    println!();

    println!("Identity");
    opt_line("number", contract.number.as_deref());
    line("type", &contract.type_label);
    opt_line("directorate", contract.directorate.as_deref());
    let classification = contract.classification();
    line("category", classification.label);
    line("ceiling", percent(classification.ceiling_percent));
    line("registered_at", contract.registered_at.format("%Y-%m-%d %H:%M:%S"));
    println!();

    print_aggregates(contract.original_value, &contract.aggregates);
}

fn print_aggregates(original_value: impl Display, a: &ContractAggregates) {
    println!("Aggregates");
    line("original_value", original_value);
    line("current_value", a.current_value);
    line("cumulative_value", a.cumulative_amendment_value);
    line("cumulative_percent", percent(a.cumulative_amendment_percent));
    line("amendments", a.amendment_count);
    line("endorsements", a.endorsement_count);
    line("terminations", a.termination_count);
    println!();
}

// ── Conformity ──

pub fn print_conformity(report: &ConformityReport) {
    let c = &report.contract;
    println!("=== {} ===", c.id);
    if !c.object_text.is_empty() {
        println!("{}", truncate(&c.object_text, 100));
    }
    println!();

    println!("Classification");
    line("category", report.classification.classification.label);
    line("ceiling", percent(report.classification.classification.ceiling_percent));
    line("legal_basis", report.classification.legal_basis);
    println!();

    print_aggregates(c.original_value, &report.aggregates);

    println!("Conformity");
    line("status", report.status);
    line("within_legal_limit", yes_no(report.within_legal_limit));
    line("safety_margin", percent(report.safety_margin_percent));
    line("remaining_percent", percent(report.remaining_percent));
    line("remaining_value", report.remaining_value);
    println!();

    if !report.advisories.is_empty() {
        println!("Advisories");
        for a in &report.advisories {
            println!("  [{:?}] {}", a.severity, a.title);
            println!("      {}", a.message);
            println!("      -> {}", a.action);
        }
        println!();
    }

    if !report.history.is_empty() {
        println!("History ({}):", report.history.len());
        let show = report.history.len().min(MAX_LIST_ITEMS);
        for h in &report.history[..show] {
            println!(
                "    {:<10} {}  +{:<8} {:>8}  {}",
                h.sequence_number.to_string(),
                h.effective_date,
                percent(h.amendment_percent),
                percent(h.cumulative_percent),
                h.status
            );
        }
        if report.history.len() > MAX_LIST_ITEMS {
            println!("    ... and {} more", report.history.len() - MAX_LIST_ITEMS);
        }
        println!();
    }

    let s = &report.statistics;
    println!("Ledger");
    line("total", s.total);
    line("approved", s.approved);
    line("pending", s.pending);
    line("amendments", s.amendments);
    line("endorsements", s.endorsements);
    line("debt_acknowledgments", s.debt_acknowledgments);
    line("terminations", s.terminations);
    opt_line("last_approved_at", s.last_approved_at.map(|at| at.format("%Y-%m-%d %H:%M:%S")));
    println!();
}

pub fn print_check(check: &AmendmentCheck) {
    println!("Projection");
    line("category", check.classification.label);
    line("ceiling", percent(check.classification.ceiling_percent));
    line("requested_value", check.requested_value);
    line("amendment_percent", percent(check.amendment_percent));
    line("current_percent", percent(check.current_percent));
    line("projected_percent", percent(check.projected_percent));
    line("projected_status", check.projected_status);
    line("within_legal_limit", yes_no(check.within_legal_limit));
    line("remaining_percent", percent(check.remaining_percent));
    line("remaining_value", check.remaining_value);
}

// ── Ledger ──

pub fn print_amendment(r: &AmendmentRecord) {
    println!("=== {} {} ===", r.kind.label(), r.sequence_number);
    println!("{}", r.description);
    println!();
    line("id", r.id);
    line("contract", &r.contract_id);
    line("state", r.state.code());
    opt_line("value", r.amendment_value);
    line("percent", percent(r.amendment_percent));
    line("effective_date", r.effective_date);
    opt_line("execution_date", r.execution_date);
    opt_line("commitment_ref", r.commitment_ref.as_deref());
    opt_line("notes", r.notes.as_deref());
    for url in &r.attachments {
        line("attachment", url);
    }
    line("created", format!("{} by {}", r.created_at.format("%Y-%m-%d %H:%M:%S"), r.created_by));
    if let (Some(at), Some(by)) = (r.updated_at, &r.updated_by) {
        line("updated", format!("{} by {}", at.format("%Y-%m-%d %H:%M:%S"), by));
    }
}

pub fn print_amendments(records: &[AmendmentRecord]) {
    if records.is_empty() {
        println!("(no records)");
        return;
    }
    for r in records {
        let value = r.amendment_value.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "  {:<10} {:<20} {:<13} {:>14} {:>8}  {}",
            r.sequence_number.to_string(),
            r.kind.code(),
            r.state.code(),
            value,
            percent(r.amendment_percent),
            r.id
        );
    }
}

pub fn print_instrument(i: &Instrument) {
    println!("=== {} {} ===", i.kind.label(), i.sequence_number);
    println!("{}", i.description);
    println!();
    line("id", i.id);
    line("contract", &i.contract_id);
    line("state", i.state.code());
    line("value", i.value);
    line("period", format!("{} .. {}", i.start_date, i.end_date));
    opt_line("notes", i.notes.as_deref());
    for url in &i.attachments {
        line("attachment", url);
    }
}

pub fn print_instruments(instruments: &[Instrument]) {
    if instruments.is_empty() {
        println!("(no instruments)");
        return;
    }
    for i in instruments {
        println!(
            "  {:<10} {:<18} {:<13} {:>14}  {} .. {}  {}",
            i.sequence_number.to_string(),
            i.kind.code(),
            i.state.code(),
            i.value.to_string(),
            i.start_date,
            i.end_date,
            i.id
        );
    }
}

// ── Portfolio ──

pub fn print_stats(stats: &PortfolioStats) {
    println!("Portfolio");
    line("contracts", stats.total_contracts);
    line("compliant", stats.by_status.compliant);
    line("warning", stats.by_status.warning);
    line("non_compliant", stats.by_status.non_compliant);
    line("conformity", percent(stats.conformity_percent));
    println!();

    println!("Values");
    line("original", stats.total_original_value);
    line("current", stats.total_current_value);
    line("amendments", stats.total_amendment_value);
    line("average_percent", percent(stats.average_amendment_percent));
    opt_line("max_percent", stats.max_amendment_percent.map(percent));
    opt_line("min_percent", stats.min_amendment_percent.map(percent));
    line("with_amendments", stats.with_amendments);
    line("without_amendments", stats.without_amendments);
    println!();

    println!("Categories");
    for t in &stats.by_category {
        line(t.category.code(), format!("{} ({})", t.contracts, t.original_value));
    }
}

/// Render conformity rows through Arrow's table formatter.
pub fn print_rows(rows: &[ConformityRow]) -> anyhow::Result<()> {
    let batch = conformity_batch(rows)?;
    println!("{}", pretty_format_batches(&[batch])?);
    println!("{} row(s)", rows.len());
    Ok(())
}
