//! Domain model and pure rules for tracking contract amendments against the
//! statutory ceilings of Lei 14.133/2021.
//!
//! Nothing here performs I/O. Persistence and time are reached through the
//! [`ports`] traits, implemented by `aditivos-store` and driven by
//! `aditivos-engine`.

pub mod actor;
pub mod advisory;
pub mod aggregate;
pub mod classify;
pub mod conformity;
pub mod contract;
pub mod error;
pub mod history;
pub mod instrument;
pub mod lifecycle;
pub mod money;
pub mod numbering;
pub mod portfolio;
pub mod ports;
pub mod schema;
pub mod term;

pub use actor::Actor;
pub use advisory::{Advisory, Severity, advise};
pub use aggregate::aggregate;
pub use classify::{Category, Classification, LEGAL_BASIS, classify};
pub use conformity::{ConformityPolicy, ConformityStatus, Verdict, evaluate, judge};
pub use contract::{Contract, ContractAggregates, ContractId, NewContract};
pub use error::{InvalidTransition, ValidationError, Violation};
pub use history::{HistoryPoint, LedgerStats, conformity_history, ledger_stats};
pub use instrument::{Instrument, InstrumentId, InstrumentKind, NewInstrument};
pub use lifecycle::{InstrumentState, Lifecycle, TermState};
pub use numbering::SequenceNumber;
pub use portfolio::{ConformityRow, Page, PortfolioStats, portfolio_stats};
pub use ports::{Clock, ContractLease, Repository, RepositoryError, SystemClock};
pub use term::{AmendmentId, AmendmentRecord, NewAmendment, TermKind};
