//! Repository adapters: in-memory, DuckDB (feature `duckdb`), and Parquet
//! export (feature `parquet`).

mod error;
pub use error::StoreError;

mod lease;
pub use lease::ContractLocks;

mod memory;
pub use memory::MemoryStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

#[cfg(feature = "parquet")]
mod export;
#[cfg(feature = "parquet")]
pub use export::write_parquet;
