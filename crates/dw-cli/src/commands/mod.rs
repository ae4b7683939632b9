//! CLI command implementations

pub(crate) mod common;
pub(crate) mod ddl;
pub(crate) mod plan;
pub(crate) mod run;
pub(crate) mod status;
