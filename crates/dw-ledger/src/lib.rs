//! Execution ledger for dwflow.
//!
//! Provides a DuckDB-backed store at `target/ledger.duckdb` recording every
//! run, the per-unit status of each run, named sub-steps and the sizes of
//! datasets units wrote. The ledger is what makes a failed run resumable.

pub mod connection;
pub mod ddl;
pub mod error;
pub mod fallback;
pub mod migration;
pub mod records;
pub(crate) mod row_helpers;
pub mod runs;
pub mod status;
pub mod steps;
pub mod units;

pub use connection::Ledger;
pub use error::{LedgerError, LedgerResult};
pub use fallback::FallbackLog;
pub use records::{DatasetStats, NewUnit, RunRecord, StepRecord, UnitRecord};
pub use status::{RunStatus, UnitStatus};
