//! Pipeline stages, load phases and run modes.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A pipeline stage. Declaration order here is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Transform,
    Load,
    Summarise,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [
        Stage::Extract,
        Stage::Transform,
        Stage::Load,
        Stage::Summarise,
    ];

    /// Label persisted in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "EXTRACT",
            Stage::Transform => "TRANSFORM",
            Stage::Load => "LOAD",
            Stage::Summarise => "SUMMARISE",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extract" => Ok(Stage::Extract),
            "transform" => Ok(Stage::Transform),
            "load" => Ok(Stage::Load),
            "summarise" | "summarize" => Ok(Stage::Summarise),
            _ => Err(CoreError::UnknownStage {
                label: s.to_string(),
            }),
        }
    }
}

/// Sub-ordering inside the LOAD stage.
///
/// Facts depend on dimension surrogate keys, so every dimension-phase unit
/// is sequenced before every fact-phase unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoadPhase {
    /// Physical model rebuild, ahead of any load
    Structure,
    Dimension,
    Fact,
}

/// A set of selected stages, kept in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSet(Vec<Stage>);

impl StageSet {
    /// Every stage.
    pub fn all() -> Self {
        Self(Stage::ALL.to_vec())
    }

    /// Build from an arbitrary list; duplicates are collapsed and order normalised.
    pub fn from_stages(stages: impl IntoIterator<Item = Stage>) -> Self {
        let mut v: Vec<Stage> = stages.into_iter().collect();
        v.sort();
        v.dedup();
        Self(v)
    }

    /// Parse a comma-separated list such as `extract,transform`.
    pub fn parse(list: &str) -> CoreResult<Self> {
        let stages = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Stage::from_str)
            .collect::<CoreResult<Vec<_>>>()?;
        if stages.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "stage list must not be empty".to_string(),
            });
        }
        Ok(Self::from_stages(stages))
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.0.contains(&stage)
    }

    pub fn iter(&self) -> impl Iterator<Item = Stage> + '_ {
        self.0.iter().copied()
    }
}

impl Default for StageSet {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for StageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.0.iter().map(|s| s.as_str()).collect();
        f.write_str(&labels.join(","))
    }
}

/// Whether a run reloads everything or only applies deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    FullReload,
    Incremental,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::FullReload => "FULL_RELOAD",
            RunMode::Incremental => "INCREMENTAL",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "FULL_RELOAD" | "FULL" => Ok(RunMode::FullReload),
            "INCREMENTAL" | "DELTA" => Ok(RunMode::Incremental),
            _ => Err(CoreError::ConfigInvalid {
                message: format!("unknown run mode '{s}'"),
            }),
        }
    }
}
