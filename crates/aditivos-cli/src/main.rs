//! `aditivos`: track contract amendments against the Lei 14.133/2021 ceilings.
//!
//! ```bash
//! # Register a contract, then record and approve an amendment
//! aditivos --actor ana contract add 42 --type serviço --value 100000
//! aditivos --actor ana amendment create 42 --value 20000 \
//!     --description "Acréscimo" --justification "Demanda" --effective 2026-03-10
//! aditivos --actor ana amendment state <ID> approved
//!
//! # Conformity card, or JSON for scripts
//! aditivos conformity 42
//! aditivos conformity 42 --json
//!
//! # Portfolio export for BI
//! aditivos report --directorate DIAF --parquet conformidade.parquet
//! ```
//!
//! Logs go to stderr (`RUST_LOG` filters them); stdout carries only results.

mod display;

use std::path::PathBuf;

use aditivos_core::portfolio::DEFAULT_PAGE_LIMIT;
use aditivos_core::schema::conformity_batch;
use aditivos_core::{
    Actor, AmendmentId, Category, ConformityPolicy, ConformityRow, ConformityStatus, ContractId,
    InstrumentId, InstrumentKind, InstrumentState, NewAmendment, NewContract, NewInstrument, Page,
    TermKind, TermState,
};
use aditivos_engine::{Engine, TableFilter};
use aditivos_store::{DuckStore, write_parquet};
use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "aditivos", version)]
#[command(about = "Contract amendment ledger and legal-ceiling conformity")]
struct Cli {
    /// DuckDB database file
    #[arg(long, global = true, env = "ADITIVOS_DB", default_value = "aditivos.duckdb")]
    db: PathBuf,

    /// Identity recorded on every mutation
    #[arg(long, global = true, env = "ADITIVOS_ACTOR")]
    actor: Option<String>,

    /// Fraction of the ceiling above which a contract is flagged ATENCAO
    #[arg(long, global = true, env = "ADITIVOS_WARNING_RATIO")]
    warning_ratio: Option<Decimal>,

    /// Headroom (percentage points) below which a low-headroom notice fires
    #[arg(long, global = true, env = "ADITIVOS_LOW_HEADROOM")]
    low_headroom: Option<Decimal>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register and inspect contracts
    #[command(subcommand)]
    Contract(ContractCmd),

    /// Amendment ledger (aditivos, apostilamentos, rescisões)
    #[command(subcommand)]
    Amendment(AmendmentCmd),

    /// Ancillary instruments (convênios, concessões, ...)
    #[command(subcommand)]
    Instrument(InstrumentCmd),

    /// Conformity report for one contract
    Conformity {
        contract: String,
        #[arg(long)]
        json: bool,
    },

    /// Project a hypothetical amendment without recording it
    Check {
        contract: String,
        value: Decimal,
        #[arg(long)]
        json: bool,
    },

    /// Recompute a contract's aggregates from its approved ledger
    Recompute { contract: String },

    /// Portfolio statistics
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Flat conformity table, optionally filtered and exported to Parquet
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[arg(long)]
    directorate: Option<String>,
    #[arg(long, conflicts_with = "category")]
    status: Option<ConformityStatus>,
    #[arg(long)]
    category: Option<Category>,
    #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
    limit: usize,
    #[arg(long, default_value_t = 0)]
    offset: usize,
    /// Write the rows as Parquet instead of printing them
    #[arg(long)]
    parquet: Option<PathBuf>,
}

impl ReportArgs {
    fn rows(&self, engine: &Engine<DuckStore>) -> anyhow::Result<Vec<ConformityRow>> {
        let filter = TableFilter {
            directorate: self.directorate.clone(),
            status: self.status,
            category: self.category,
        };
        let page = Page::new(self.limit, self.offset)?;
        Ok(engine.filtered_table(&filter, page)?)
    }
}

#[derive(Subcommand, Debug)]
enum ContractCmd {
    Add {
        id: String,
        #[arg(long = "type")]
        type_label: String,
        #[arg(long)]
        value: Decimal,
        #[arg(long)]
        number: Option<String>,
        #[arg(long, default_value = "")]
        object: String,
        #[arg(long)]
        directorate: Option<String>,
    },
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum AmendmentCmd {
    Create {
        contract: String,
        #[arg(long, default_value = "amendment")]
        kind: TermKind,
        #[arg(long)]
        value: Option<Decimal>,
        #[arg(long)]
        description: String,
        #[arg(long)]
        justification: String,
        #[arg(long)]
        effective: NaiveDate,
        #[arg(long)]
        execution: Option<NaiveDate>,
        /// Budget commitment (empenho)
        #[arg(long)]
        commitment: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long = "attachment")]
        attachments: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    State {
        id: AmendmentId,
        state: TermState,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        json: bool,
    },
    List {
        contract: String,
        #[arg(long, conflicts_with = "approved")]
        kind: Option<TermKind>,
        #[arg(long)]
        approved: bool,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum InstrumentCmd {
    Create {
        contract: String,
        #[arg(long)]
        kind: InstrumentKind,
        #[arg(long)]
        value: Decimal,
        #[arg(long)]
        description: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long = "attachment")]
        attachments: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    State {
        id: InstrumentId,
        state: InstrumentState,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        json: bool,
    },
    List {
        contract: String,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let engine = open_engine(&cli)?;

    match cli.command {
        Command::Contract(cmd) => run_contract(&engine, cli.actor.as_deref(), cmd),
        Command::Amendment(cmd) => run_amendment(&engine, cli.actor.as_deref(), cmd),
        Command::Instrument(cmd) => run_instrument(&engine, cli.actor.as_deref(), cmd),
        Command::Conformity { contract, json } => {
            let report = engine.conformity(&ContractId::new(contract))?;
            emit(json, &report, display::print_conformity)
        }
        Command::Check {
            contract,
            value,
            json,
        } => {
            let check = engine.check_amendment(&ContractId::new(contract), value)?;
            emit(json, &check, display::print_check)
        }
        Command::Recompute { contract } => {
            let totals = engine.recompute_contract_aggregates(&ContractId::new(contract))?;
            println!("{}", serde_json::to_string_pretty(&totals)?);
            Ok(())
        }
        Command::Stats { json } => {
            let stats = engine.portfolio_statistics()?;
            emit(json, &stats, display::print_stats)
        }
        Command::Report(args) => {
            let rows = args.rows(&engine)?;
            match args.parquet {
                Some(path) => {
                    let batch = conformity_batch(&rows)?;
                    write_parquet(&path, &batch)
                        .with_context(|| format!("writing {}", path.display()))?;
                    eprintln!("  Wrote {} rows to {}", rows.len(), path.display());
                    Ok(())
                }
                None => display::print_rows(&rows),
            }
        }
    }
}

fn open_engine(cli: &Cli) -> anyhow::Result<Engine<DuckStore>> {
    debug!(db = %cli.db.display(), "opening database");
    let store = DuckStore::open_persistent(&cli.db)
        .with_context(|| format!("opening database {}", cli.db.display()))?;

    let mut policy = ConformityPolicy::default();
    if let Some(ratio) = cli.warning_ratio {
        policy.warning_ratio = ratio;
    }
    if let Some(headroom) = cli.low_headroom {
        policy.low_headroom_percent = headroom;
    }
    Engine::new(store)
        .with_policy(policy)
        .context("invalid conformity policy")
}

fn require_actor(actor: Option<&str>) -> anyhow::Result<Actor> {
    match actor {
        Some(name) if !name.trim().is_empty() => Ok(Actor::new(name.trim())),
        _ => bail!("this command records who made the change: pass --actor or set ADITIVOS_ACTOR"),
    }
}

/// Print `value` as JSON or through its card renderer.
fn emit<T: Serialize>(json: bool, value: &T, card: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        card(value);
    }
    Ok(())
}

// ── Subcommands ──

fn run_contract(engine: &Engine<DuckStore>, actor: Option<&str>, cmd: ContractCmd) -> anyhow::Result<()> {
    match cmd {
        ContractCmd::Add {
            id,
            type_label,
            value,
            number,
            object,
            directorate,
        } => {
            let contract = engine.register_contract(
                &require_actor(actor)?,
                NewContract {
                    id,
                    number,
                    type_label,
                    object_text: object,
                    original_value: value,
                    directorate,
                },
            )?;
            display::print_contract(&contract);
            Ok(())
        }
        ContractCmd::Show { id, json } => {
            let contract = engine.contract(&ContractId::new(id))?;
            emit(json, &contract, display::print_contract)
        }
    }
}

fn run_amendment(engine: &Engine<DuckStore>, actor: Option<&str>, cmd: AmendmentCmd) -> anyhow::Result<()> {
    match cmd {
        AmendmentCmd::Create {
            contract,
            kind,
            value,
            description,
            justification,
            effective,
            execution,
            commitment,
            notes,
            attachments,
            json,
        } => {
            let req = NewAmendment {
                contract_id: ContractId::new(contract),
                kind,
                value,
                description,
                justification,
                effective_date: Some(effective),
                execution_date: execution,
                commitment_ref: commitment,
                notes,
                attachments,
            };
            let record = engine.create_amendment(&require_actor(actor)?, req)?;
            emit(json, &record, display::print_amendment)
        }
        AmendmentCmd::State {
            id,
            state,
            notes,
            json,
        } => {
            let record = engine.transition_amendment(&require_actor(actor)?, &id, state, notes)?;
            emit(json, &record, display::print_amendment)
        }
        AmendmentCmd::List {
            contract,
            kind,
            approved,
            json,
        } => {
            let id = ContractId::new(contract);
            let records = match kind {
                Some(kind) => engine.list_by_kind(&id, kind)?,
                None if approved => engine.list_approved(&id)?,
                None => engine.list_by_contract(&id)?,
            };
            emit(json, &records, |r: &Vec<_>| display::print_amendments(r))
        }
    }
}

fn run_instrument(engine: &Engine<DuckStore>, actor: Option<&str>, cmd: InstrumentCmd) -> anyhow::Result<()> {
    match cmd {
        InstrumentCmd::Create {
            contract,
            kind,
            value,
            description,
            start,
            end,
            notes,
            attachments,
            json,
        } => {
            let mut req = NewInstrument::new(contract.as_str(), kind, value, description, start, end);
            req.notes = notes;
            req.attachments = attachments;
            let instrument = engine.create_instrument(&require_actor(actor)?, req)?;
            emit(json, &instrument, display::print_instrument)
        }
        InstrumentCmd::State {
            id,
            state,
            notes,
            json,
        } => {
            let instrument = engine.transition_instrument(&require_actor(actor)?, &id, state, notes)?;
            emit(json, &instrument, display::print_instrument)
        }
        InstrumentCmd::List { contract, json } => {
            let instruments = engine.list_instruments(&ContractId::new(contract))?;
            emit(json, &instruments, |i: &Vec<_>| display::print_instruments(i))
        }
    }
}
