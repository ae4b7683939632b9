//! Ordering work units into a run schedule.

use crate::error::{RunnerError, RunnerResult};
use dw_core::{CoreError, LoadPhase, Project, Stage, StageSet, TableKind, TableName, UnitName};
use dw_db::{source_for, Database};
use dw_ledger::NewUnit;
use std::collections::HashSet;

/// Name of the unit that drops and recreates the physical model.
pub const REBUILD_UNIT: &str = "rebuild_physical_model";

/// What a unit does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    /// Copy one source table into the extract layer
    Extract { source: TableName, table: TableName },
    /// Materialise a transform step into the transform layer
    Transform { step: TableName },
    /// Drop and recreate every warehouse table
    RebuildPhysicalModel,
    LoadDimension { table: TableName },
    LoadFact { table: TableName },
    /// Materialise a summary step into the summary layer
    Summarise { step: TableName },
}

impl UnitKind {
    pub fn stage(&self) -> Stage {
        match self {
            UnitKind::Extract { .. } => Stage::Extract,
            UnitKind::Transform { .. } => Stage::Transform,
            UnitKind::RebuildPhysicalModel
            | UnitKind::LoadDimension { .. }
            | UnitKind::LoadFact { .. } => Stage::Load,
            UnitKind::Summarise { .. } => Stage::Summarise,
        }
    }

    /// Position inside LOAD; `None` outside it.
    pub fn load_phase(&self) -> Option<LoadPhase> {
        match self {
            UnitKind::RebuildPhysicalModel => Some(LoadPhase::Structure),
            UnitKind::LoadDimension { .. } => Some(LoadPhase::Dimension),
            UnitKind::LoadFact { .. } => Some(LoadPhase::Fact),
            _ => None,
        }
    }

    /// Unit name recorded in the ledger.
    pub fn unit_name(&self) -> UnitName {
        match self {
            UnitKind::Extract { source, table } => UnitName::new(format!("extract_{source}_{table}")),
            UnitKind::Transform { step } => UnitName::new(format!("transform_{step}")),
            UnitKind::RebuildPhysicalModel => UnitName::new(REBUILD_UNIT),
            UnitKind::LoadDimension { table } | UnitKind::LoadFact { table } => {
                UnitName::new(format!("load_{table}"))
            }
            UnitKind::Summarise { step } => UnitName::new(format!("summarise_{step}")),
        }
    }
}

/// A named unit waiting to be scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUnit {
    pub name: UnitName,
    pub kind: UnitKind,
}

impl PlannedUnit {
    pub fn new(kind: UnitKind) -> Self {
        Self {
            name: kind.unit_name(),
            kind,
        }
    }

    pub fn stage(&self) -> Stage {
        self.kind.stage()
    }
}

/// Units in execution order.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    units: Vec<PlannedUnit>,
}

impl Schedule {
    pub fn units(&self) -> &[PlannedUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.iter().any(|u| u.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.name.as_str()).collect()
    }

    /// Ledger rows for a fresh run.
    pub fn to_new_units(&self) -> Vec<NewUnit> {
        self.units
            .iter()
            .map(|u| NewUnit {
                name: u.name.clone(),
                stage: u.stage(),
            })
            .collect()
    }
}

/// Order declared units into a schedule.
///
/// Stages run EXTRACT, TRANSFORM, LOAD, SUMMARISE. Inside LOAD the rebuild
/// unit comes first, then every dimension, then every fact. Declaration order
/// is kept within each bucket. Units of stages outside `stages` are dropped.
pub fn construct_schedule(declared: Vec<PlannedUnit>, stages: &StageSet) -> RunnerResult<Schedule> {
    let mut seen = HashSet::new();
    for unit in &declared {
        if !seen.insert(unit.name.clone()) {
            return Err(RunnerError::DuplicateUnit(unit.name.to_string()));
        }
    }

    let mut units: Vec<PlannedUnit> = declared
        .into_iter()
        .filter(|u| stages.contains(u.stage()))
        .collect();
    // stable: declaration order survives inside each (stage, phase) bucket
    units.sort_by_key(|u| (u.stage(), u.kind.load_phase()));
    Ok(Schedule { units })
}

/// Every unit the project declares, in declaration order.
///
/// Sources without an explicit table list are asked for their tables, which
/// for DuckDB sources attaches the source file to `db`.
pub async fn declare_units(
    project: &Project,
    db: &dyn Database,
    rebuild: bool,
) -> RunnerResult<Vec<PlannedUnit>> {
    let mut units = Vec::new();

    for source_config in &project.config.sources {
        let tables = if source_config.tables.is_empty() {
            source_for(source_config, &project.root)
                .list_tables(db)
                .await?
                .into_iter()
                .map(|table| {
                    TableName::try_new(table.as_str()).ok_or_else(|| {
                        RunnerError::Config(CoreError::ConfigInvalid {
                            message: format!(
                                "source '{}' has table '{table}', which is not a valid identifier; list its tables explicitly",
                                source_config.name
                            ),
                        })
                    })
                })
                .collect::<RunnerResult<Vec<_>>>()?
        } else {
            source_config.tables.clone()
        };
        for table in tables {
            units.push(PlannedUnit::new(UnitKind::Extract {
                source: source_config.name.clone(),
                table,
            }));
        }
    }

    for step in &project.transforms {
        units.push(PlannedUnit::new(UnitKind::Transform {
            step: step.name.clone(),
        }));
    }

    if rebuild {
        units.push(PlannedUnit::new(UnitKind::RebuildPhysicalModel));
    }
    for table in project.schema.tables() {
        let kind = match table.kind() {
            TableKind::Dimension => UnitKind::LoadDimension {
                table: table.name.clone(),
            },
            TableKind::Fact => UnitKind::LoadFact {
                table: table.name.clone(),
            },
            TableKind::Summary | TableKind::Other => continue,
        };
        units.push(PlannedUnit::new(kind));
    }

    for step in &project.summaries {
        units.push(PlannedUnit::new(UnitKind::Summarise {
            step: step.name.clone(),
        }));
    }

    Ok(units)
}

#[cfg(test)]
#[path = "schedule_test.rs"]
mod tests;
