//! DuckDB-backed repository.
//!
//! Decimals are stored as their canonical text so no precision is lost to
//! floating point; dates are ISO-8601 text and timestamps RFC 3339 with
//! nanoseconds so lexical and chronological order agree.

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use aditivos_core::{
    Actor, AmendmentId, AmendmentRecord, Contract, ContractAggregates, ContractId, ContractLease,
    Instrument, InstrumentId, Lifecycle, Repository, RepositoryError,
};
use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{Connection, Row, params};
use rust_decimal::Decimal;
use tracing::info;

use crate::StoreError;
use crate::lease::ContractLocks;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS contracts (
    id                           VARCHAR PRIMARY KEY,
    number                       VARCHAR,
    type_label                   VARCHAR NOT NULL,
    object_text                  VARCHAR NOT NULL,
    original_value               VARCHAR NOT NULL,
    directorate                  VARCHAR,
    current_value                VARCHAR NOT NULL,
    cumulative_amendment_value   VARCHAR NOT NULL,
    cumulative_amendment_percent VARCHAR NOT NULL,
    amendment_count              UINTEGER NOT NULL,
    endorsement_count            UINTEGER NOT NULL,
    termination_count            UINTEGER NOT NULL,
    registered_at                VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS amendments (
    id                VARCHAR PRIMARY KEY,
    contract_id       VARCHAR NOT NULL,
    kind              VARCHAR NOT NULL,
    sequence_number   VARCHAR NOT NULL,
    amendment_value   VARCHAR,
    amendment_percent VARCHAR NOT NULL,
    original_value    VARCHAR NOT NULL,
    description       VARCHAR NOT NULL,
    justification     VARCHAR NOT NULL,
    effective_date    VARCHAR NOT NULL,
    execution_date    VARCHAR,
    state             VARCHAR NOT NULL,
    commitment_ref    VARCHAR,
    notes             VARCHAR,
    attachments       VARCHAR NOT NULL,
    created_by        VARCHAR NOT NULL,
    created_at        VARCHAR NOT NULL,
    updated_by        VARCHAR,
    updated_at        VARCHAR
);
CREATE TABLE IF NOT EXISTS instruments (
    id              VARCHAR PRIMARY KEY,
    contract_id     VARCHAR NOT NULL,
    kind            VARCHAR NOT NULL,
    sequence_number VARCHAR NOT NULL,
    value           VARCHAR NOT NULL,
    description     VARCHAR NOT NULL,
    start_date      VARCHAR NOT NULL,
    end_date        VARCHAR NOT NULL,
    state           VARCHAR NOT NULL,
    notes           VARCHAR,
    attachments     VARCHAR NOT NULL,
    created_by      VARCHAR NOT NULL,
    created_at      VARCHAR NOT NULL,
    updated_by      VARCHAR,
    updated_at      VARCHAR
);
";

const CONTRACT_COLUMNS: &str = "id, number, type_label, object_text, original_value, directorate, \
     current_value, cumulative_amendment_value, cumulative_amendment_percent, \
     amendment_count, endorsement_count, termination_count, registered_at";

const AMENDMENT_COLUMNS: &str = "id, contract_id, kind, sequence_number, amendment_value, \
     amendment_percent, original_value, description, justification, effective_date, \
     execution_date, state, commitment_ref, notes, attachments, created_by, created_at, \
     updated_by, updated_at";

const INSTRUMENT_COLUMNS: &str = "id, contract_id, kind, sequence_number, value, description, \
     start_date, end_date, state, notes, attachments, created_by, created_at, updated_by, \
     updated_at";

/// Repository persisted in DuckDB.
///
/// Use [`open`](Self::open) for an in-memory database and
/// [`open_persistent`](Self::open_persistent) for a file that survives
/// process restarts. Tables are created on open when missing.
pub struct DuckStore {
    conn: Mutex<Connection>,
    locks: ContractLocks,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened amendment database");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            locks: ContractLocks::new(),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Number of rows in `table`.
    pub fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row(&format!("SELECT count(*)::BIGINT FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ── Contracts ──

    fn select_contracts(&self, filter: &str, id: Option<&str>) -> Result<Vec<Contract>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts {filter} ORDER BY id"
        ))?;
        let raw = match id {
            Some(id) => stmt.query_map(params![id], RawContract::from_row)?,
            None => stmt.query_map([], RawContract::from_row)?,
        }
        .collect::<duckdb::Result<Vec<_>>>()?;
        raw.into_iter().map(RawContract::into_domain).collect()
    }

    fn upsert_contract(&self, c: &Contract) -> Result<(), StoreError> {
        let a = &c.aggregates;
        self.conn()?.execute(
            &format!(
                "INSERT OR REPLACE INTO contracts ({CONTRACT_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            params![
                c.id.as_str(),
                c.number,
                c.type_label,
                c.object_text,
                c.original_value.to_string(),
                c.directorate,
                a.current_value.to_string(),
                a.cumulative_amendment_value.to_string(),
                a.cumulative_amendment_percent.to_string(),
                a.amendment_count,
                a.endorsement_count,
                a.termination_count,
                timestamp(&c.registered_at),
            ],
        )?;
        Ok(())
    }

    fn update_aggregates(&self, id: &ContractId, a: &ContractAggregates) -> Result<usize, StoreError> {
        let changed = self.conn()?.execute(
            "UPDATE contracts SET current_value = ?, cumulative_amendment_value = ?, \
             cumulative_amendment_percent = ?, amendment_count = ?, endorsement_count = ?, \
             termination_count = ? WHERE id = ?",
            params![
                a.current_value.to_string(),
                a.cumulative_amendment_value.to_string(),
                a.cumulative_amendment_percent.to_string(),
                a.amendment_count,
                a.endorsement_count,
                a.termination_count,
                id.as_str(),
            ],
        )?;
        Ok(changed)
    }

    // ── Amendments ──

    fn select_amendments(&self, column: &str, key: &str) -> Result<Vec<AmendmentRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {AMENDMENT_COLUMNS} FROM amendments WHERE {column} = ? ORDER BY created_at"
        ))?;
        let raw = stmt
            .query_map(params![key], RawAmendment::from_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        raw.into_iter().map(RawAmendment::into_domain).collect()
    }

    fn upsert_amendment(&self, r: &AmendmentRecord) -> Result<(), StoreError> {
        self.conn()?.execute(
            &format!(
                "INSERT OR REPLACE INTO amendments ({AMENDMENT_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            params![
                r.id.to_string(),
                r.contract_id.as_str(),
                r.kind.code(),
                r.sequence_number.to_string(),
                r.amendment_value.map(|v| v.to_string()),
                r.amendment_percent.to_string(),
                r.original_value.to_string(),
                r.description,
                r.justification,
                r.effective_date.to_string(),
                r.execution_date.map(|d| d.to_string()),
                r.state.code(),
                r.commitment_ref,
                r.notes,
                attachments_json(&r.attachments)?,
                r.created_by.as_str(),
                timestamp(&r.created_at),
                r.updated_by.as_ref().map(|a| a.as_str()),
                r.updated_at.as_ref().map(timestamp),
            ],
        )?;
        Ok(())
    }

    // ── Instruments ──

    fn select_instruments(&self, column: &str, key: &str) -> Result<Vec<Instrument>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {INSTRUMENT_COLUMNS} FROM instruments WHERE {column} = ? ORDER BY created_at"
        ))?;
        let raw = stmt
            .query_map(params![key], RawInstrument::from_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        raw.into_iter().map(RawInstrument::into_domain).collect()
    }

    fn upsert_instrument(&self, i: &Instrument) -> Result<(), StoreError> {
        self.conn()?.execute(
            &format!(
                "INSERT OR REPLACE INTO instruments ({INSTRUMENT_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            params![
                i.id.to_string(),
                i.contract_id.as_str(),
                i.kind.code(),
                i.sequence_number.to_string(),
                i.value.to_string(),
                i.description,
                i.start_date.to_string(),
                i.end_date.to_string(),
                i.state.code(),
                i.notes,
                attachments_json(&i.attachments)?,
                i.created_by.as_str(),
                timestamp(&i.created_at),
                i.updated_by.as_ref().map(|a| a.as_str()),
                i.updated_at.as_ref().map(timestamp),
            ],
        )?;
        Ok(())
    }
}

impl Repository for DuckStore {
    fn lock_contract(&self, id: &ContractId) -> Result<ContractLease<'_>, RepositoryError> {
        self.locks.acquire(id)
    }

    fn load_contract(&self, id: &ContractId) -> Result<Option<Contract>, RepositoryError> {
        Ok(self
            .select_contracts("WHERE id = ?", Some(id.as_str()))?
            .into_iter()
            .next())
    }

    fn list_contracts(&self) -> Result<Vec<Contract>, RepositoryError> {
        Ok(self.select_contracts("", None)?)
    }

    fn save_contract(&self, contract: &Contract) -> Result<(), RepositoryError> {
        Ok(self.upsert_contract(contract)?)
    }

    fn save_contract_aggregates(
        &self,
        id: &ContractId,
        aggregates: &ContractAggregates,
    ) -> Result<(), RepositoryError> {
        match self.update_aggregates(id, aggregates)? {
            0 => Err(RepositoryError::Conflict(format!("contract {id} does not exist"))),
            _ => Ok(()),
        }
    }

    fn load_amendment(&self, id: &AmendmentId) -> Result<Option<AmendmentRecord>, RepositoryError> {
        Ok(self
            .select_amendments("id", &id.to_string())?
            .into_iter()
            .next())
    }

    fn load_amendments(&self, contract_id: &ContractId) -> Result<Vec<AmendmentRecord>, RepositoryError> {
        Ok(self.select_amendments("contract_id", contract_id.as_str())?)
    }

    fn save_amendment(&self, record: &AmendmentRecord) -> Result<(), RepositoryError> {
        Ok(self.upsert_amendment(record)?)
    }

    fn load_instrument(&self, id: &InstrumentId) -> Result<Option<Instrument>, RepositoryError> {
        Ok(self
            .select_instruments("id", &id.to_string())?
            .into_iter()
            .next())
    }

    fn load_instruments(&self, contract_id: &ContractId) -> Result<Vec<Instrument>, RepositoryError> {
        Ok(self.select_instruments("contract_id", contract_id.as_str())?)
    }

    fn save_instrument(&self, instrument: &Instrument) -> Result<(), RepositoryError> {
        Ok(self.upsert_instrument(instrument)?)
    }
}

// ── Column codecs ──

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn attachments_json(urls: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(urls).map_err(|e| StoreError::corrupt("attachments", "", e))
}

fn parse<T>(column: &'static str, value: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| StoreError::corrupt(column, value, e))
}

fn parse_opt<T>(column: &'static str, value: Option<&str>) -> Result<Option<T>, StoreError>
where
    T: FromStr,
    T::Err: Display,
{
    value.map(|v| parse(column, v)).transpose()
}

fn parse_decimal(column: &'static str, value: &str) -> Result<Decimal, StoreError> {
    parse(column, value)
}

fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::corrupt(column, value, e))
}

fn parse_attachments(value: &str) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(value).map_err(|e| StoreError::corrupt("attachments", value, e))
}

struct RawContract {
    id: String,
    number: Option<String>,
    type_label: String,
    object_text: String,
    original_value: String,
    directorate: Option<String>,
    current_value: String,
    cumulative_amendment_value: String,
    cumulative_amendment_percent: String,
    amendment_count: u32,
    endorsement_count: u32,
    termination_count: u32,
    registered_at: String,
}

impl RawContract {
    fn from_row(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            number: row.get(1)?,
            type_label: row.get(2)?,
            object_text: row.get(3)?,
            original_value: row.get(4)?,
            directorate: row.get(5)?,
            current_value: row.get(6)?,
            cumulative_amendment_value: row.get(7)?,
            cumulative_amendment_percent: row.get(8)?,
            amendment_count: row.get(9)?,
            endorsement_count: row.get(10)?,
            termination_count: row.get(11)?,
            registered_at: row.get(12)?,
        })
    }

    fn into_domain(self) -> Result<Contract, StoreError> {
        Ok(Contract {
            id: ContractId::new(self.id),
            number: self.number,
            type_label: self.type_label,
            object_text: self.object_text,
            original_value: parse_decimal("original_value", &self.original_value)?,
            directorate: self.directorate,
            aggregates: ContractAggregates {
                current_value: parse_decimal("current_value", &self.current_value)?,
                cumulative_amendment_value: parse_decimal(
                    "cumulative_amendment_value",
                    &self.cumulative_amendment_value,
                )?,
                cumulative_amendment_percent: parse_decimal(
                    "cumulative_amendment_percent",
                    &self.cumulative_amendment_percent,
                )?,
                amendment_count: self.amendment_count,
                endorsement_count: self.endorsement_count,
                termination_count: self.termination_count,
            },
            registered_at: parse_timestamp("registered_at", &self.registered_at)?,
        })
    }
}

struct RawAmendment {
    id: String,
    contract_id: String,
    kind: String,
    sequence_number: String,
    amendment_value: Option<String>,
    amendment_percent: String,
    original_value: String,
    description: String,
    justification: String,
    effective_date: String,
    execution_date: Option<String>,
    state: String,
    commitment_ref: Option<String>,
    notes: Option<String>,
    attachments: String,
    created_by: String,
    created_at: String,
    updated_by: Option<String>,
    updated_at: Option<String>,
}

impl RawAmendment {
    fn from_row(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            contract_id: row.get(1)?,
            kind: row.get(2)?,
            sequence_number: row.get(3)?,
            amendment_value: row.get(4)?,
            amendment_percent: row.get(5)?,
            original_value: row.get(6)?,
            description: row.get(7)?,
            justification: row.get(8)?,
            effective_date: row.get(9)?,
            execution_date: row.get(10)?,
            state: row.get(11)?,
            commitment_ref: row.get(12)?,
            notes: row.get(13)?,
            attachments: row.get(14)?,
            created_by: row.get(15)?,
            created_at: row.get(16)?,
            updated_by: row.get(17)?,
            updated_at: row.get(18)?,
        })
    }

    fn into_domain(self) -> Result<AmendmentRecord, StoreError> {
        Ok(AmendmentRecord {
            id: parse("id", &self.id)?,
            contract_id: ContractId::new(self.contract_id),
            kind: parse("kind", &self.kind)?,
            sequence_number: parse("sequence_number", &self.sequence_number)?,
            amendment_value: parse_opt("amendment_value", self.amendment_value.as_deref())?,
            amendment_percent: parse_decimal("amendment_percent", &self.amendment_percent)?,
            original_value: parse_decimal("original_value", &self.original_value)?,
            description: self.description,
            justification: self.justification,
            effective_date: parse("effective_date", &self.effective_date)?,
            execution_date: parse_opt("execution_date", self.execution_date.as_deref())?,
            state: parse("state", &self.state)?,
            commitment_ref: self.commitment_ref,
            notes: self.notes,
            attachments: parse_attachments(&self.attachments)?,
            created_by: Actor::new(self.created_by),
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_by: self.updated_by.map(Actor::new),
            updated_at: self
                .updated_at
                .as_deref()
                .map(|t| parse_timestamp("updated_at", t))
                .transpose()?,
        })
    }
}

struct RawInstrument {
    id: String,
    contract_id: String,
    kind: String,
    sequence_number: String,
    value: String,
    description: String,
    start_date: String,
    end_date: String,
    state: String,
    notes: Option<String>,
    attachments: String,
    created_by: String,
    created_at: String,
    updated_by: Option<String>,
    updated_at: Option<String>,
}

impl RawInstrument {
    fn from_row(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            contract_id: row.get(1)?,
            kind: row.get(2)?,
            sequence_number: row.get(3)?,
            value: row.get(4)?,
            description: row.get(5)?,
            start_date: row.get(6)?,
            end_date: row.get(7)?,
            state: row.get(8)?,
            notes: row.get(9)?,
            attachments: row.get(10)?,
            created_by: row.get(11)?,
            created_at: row.get(12)?,
            updated_by: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    fn into_domain(self) -> Result<Instrument, StoreError> {
        Ok(Instrument {
            id: parse("id", &self.id)?,
            contract_id: ContractId::new(self.contract_id),
            kind: parse("kind", &self.kind)?,
            sequence_number: parse("sequence_number", &self.sequence_number)?,
            value: parse_decimal("value", &self.value)?,
            description: self.description,
            start_date: parse("start_date", &self.start_date)?,
            end_date: parse("end_date", &self.end_date)?,
            state: parse("state", &self.state)?,
            notes: self.notes,
            attachments: parse_attachments(&self.attachments)?,
            created_by: Actor::new(self.created_by),
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_by: self.updated_by.map(Actor::new),
            updated_at: self
                .updated_at
                .as_deref()
                .map(|t| parse_timestamp("updated_at", t))
                .transpose()?,
        })
    }
}
