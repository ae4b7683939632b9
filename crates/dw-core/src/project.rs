//! Project loading: config, schema model and SQL step bodies.

use crate::config::{Config, SqlStep};
use crate::dag::StepDag;
use crate::error::{CoreError, CoreResult};
use crate::names::TableName;
use crate::schema::SchemaModel;
use std::path::{Path, PathBuf};

/// A SQL step with its body read from disk.
#[derive(Debug, Clone)]
pub struct LoadedStep {
    pub name: TableName,
    pub path: PathBuf,
    pub sql: String,
}

/// A fully loaded dwflow project.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: Config,
    pub schema: SchemaModel,
    /// Transforms in dependency order
    pub transforms: Vec<LoadedStep>,
    /// Summaries in dependency order
    pub summaries: Vec<LoadedStep>,
}

impl Project {
    /// Load a project from its root directory.
    pub fn load(root: &Path) -> CoreResult<Self> {
        if !root.is_dir() {
            return Err(CoreError::ProjectNotFound {
                path: root.display().to_string(),
            });
        }
        let config = Config::load_from_dir(root)?;
        Self::load_with_config(root, config)
    }

    /// Load a project using an already parsed config.
    pub fn load_with_config(root: &Path, config: Config) -> CoreResult<Self> {
        let schema = SchemaModel::load_from_paths(&config.schema_paths_absolute(root))?;
        let transforms = load_steps(root, &config.transforms)?;
        let summaries = load_steps(root, &config.summaries)?;

        log::debug!(
            "Loaded project '{}': {} table(s), {} transform(s), {} summar(y/ies)",
            config.name,
            schema.tables().len(),
            transforms.len(),
            summaries.len()
        );

        Ok(Self {
            root: root.to_path_buf(),
            config,
            schema,
            transforms,
            summaries,
        })
    }

    /// Directory holding the ledger and fallback log.
    pub fn target_dir(&self) -> PathBuf {
        self.config.target_path_absolute(&self.root)
    }

    /// Resolve a project-relative path.
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        let p = Path::new(relative);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }
}

fn load_steps(root: &Path, steps: &[SqlStep]) -> CoreResult<Vec<LoadedStep>> {
    let order = StepDag::build(steps)?.ordered();
    order
        .into_iter()
        .map(|name| {
            let step = steps
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| CoreError::ConfigInvalid {
                    message: format!("step '{name}' vanished while ordering"),
                })?;
            let path = root.join(&step.sql);
            let sql = std::fs::read_to_string(&path).map_err(|e| CoreError::IoWithPath {
                path: path.display().to_string(),
                source: e,
            })?;
            let sql = sql.trim().trim_end_matches(';').trim().to_string();
            if sql.is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("step '{}' has an empty SQL file", step.name),
                });
            }
            Ok(LoadedStep { name, path, sql })
        })
        .collect()
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
