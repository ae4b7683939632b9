//! Concrete work units.
//!
//! One type per [`UnitKind`]; [`build_units`] turns a schedule into runnable
//! units, rendering every SQL template up front so a broken template fails
//! the run before any unit executes.

mod extract;
mod load;
mod rebuild;
mod sql_step;

pub use extract::ExtractUnit;
pub use load::{DimensionLoadUnit, FactLoadUnit};
pub use rebuild::RebuildUnit;
pub use sql_step::{SummaryUnit, TransformUnit};

use crate::error::{RunnerError, RunnerResult};
use crate::schedule::{Schedule, UnitKind};
use crate::unit::WorkUnit;
use dw_core::sql_utils::qualify;
use dw_core::{CoreError, Layers, LoadedStep, Project, TableSchema};
use dw_db::source_for;
use dw_sql::{PreparedSql, SqlRenderer};

/// Instantiate every unit of a schedule.
pub fn build_units(
    project: &Project,
    schedule: &Schedule,
    renderer: &SqlRenderer<'_>,
) -> RunnerResult<Vec<Box<dyn WorkUnit>>> {
    schedule
        .units()
        .iter()
        .map(|planned| {
            let name = planned.name.clone();
            let unit: Box<dyn WorkUnit> = match &planned.kind {
                UnitKind::Extract { source, table } => {
                    let config = project
                        .config
                        .sources
                        .iter()
                        .find(|s| s.name == *source)
                        .ok_or_else(|| unknown("source", source))?;
                    Box::new(ExtractUnit::new(
                        name,
                        source_for(config, &project.root),
                        table.clone(),
                    ))
                }
                UnitKind::Transform { step } => Box::new(TransformUnit::new(
                    name,
                    step.clone(),
                    prepare(renderer, &project.transforms, step)?,
                )),
                UnitKind::RebuildPhysicalModel => Box::new(RebuildUnit::new(name)),
                UnitKind::LoadDimension { table } => {
                    Box::new(DimensionLoadUnit::new(name, table.clone()))
                }
                UnitKind::LoadFact { table } => Box::new(FactLoadUnit::new(name, table.clone())),
                UnitKind::Summarise { step } => Box::new(SummaryUnit::new(
                    name,
                    step.clone(),
                    prepare(renderer, &project.summaries, step)?,
                )),
            };
            Ok(unit)
        })
        .collect()
}

/// Render and validate one SQL step.
pub fn prepare(
    renderer: &SqlRenderer<'_>,
    steps: &[LoadedStep],
    name: &str,
) -> RunnerResult<PreparedSql> {
    let step = steps
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| unknown("SQL step", name))?;
    Ok(renderer.prepare(name, &step.sql)?)
}

fn unknown(kind: &str, name: &str) -> RunnerError {
    RunnerError::Config(CoreError::ConfigInvalid {
        message: format!("scheduled {kind} '{name}' is not declared in the project"),
    })
}

/// Relation feeding a warehouse table: its declared `source`, or the
/// transform-layer table of the same name.
pub(crate) fn source_relation(layers: &Layers, table: &TableSchema) -> String {
    table
        .source
        .clone()
        .unwrap_or_else(|| qualify(&layers.transform, &table.name))
}
