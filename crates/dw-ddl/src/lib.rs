//! dw-ddl - Physical model builder for dwflow
//!
//! Turns the schema model into ordered DDL: sequences and tables, indexes,
//! foreign-key constraints, their drops, and the inserts for curated
//! dimension rows. A [`DdlPlan`] for the whole warehouse drops everything and
//! recreates it with dimensions complete before any fact index.

pub mod apply;
pub mod builder;
pub mod error;
pub mod plan;
pub mod statement;

pub use apply::{apply_plan, ApplySummary};
pub use builder::{AuditValues, PhysicalModelBuilder};
pub use error::{DdlError, DdlResult};
pub use plan::DdlPlan;
pub use statement::{DdlKind, DdlStatement};
