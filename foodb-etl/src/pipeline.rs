//! Full database rebuild
//!
//! Deletes the database file, then runs the raw USDA load, the canonical
//! foods builder, and the macro builder in that order. Each step opens and
//! closes its own connection. The first failing step stops the run; whatever
//! earlier steps wrote stays in the file.

use crate::nutrition::{run_build_foods, run_build_macros, FoodsReport, MacrosReport};
use crate::usda::{run_load_usda, UsdaLoadReport};
use foodb_common::db::remove_database;
use foodb_common::{Error, PipelineConfig, Result};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    LoadUsda,
    BuildFoods,
    BuildMacros,
}

impl Step {
    /// Execution order of a full rebuild
    pub const ALL: [Step; 3] = [Step::LoadUsda, Step::BuildFoods, Step::BuildMacros];

    pub fn name(&self) -> &'static str {
        match self {
            Step::LoadUsda => "load_usda",
            Step::BuildFoods => "build_foods",
            Step::BuildMacros => "build_macros",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepReport {
    LoadUsda(UsdaLoadReport),
    BuildFoods(FoodsReport),
    BuildMacros(MacrosReport),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub database_path: PathBuf,
    /// A previous database file was deleted before the run
    pub removed_existing: bool,
    pub steps: Vec<StepReport>,
}

/// Run one step against the configured database
///
/// Errors are tagged with the step name.
pub async fn run_step(step: Step, config: &PipelineConfig) -> Result<StepReport> {
    let result = match step {
        Step::LoadUsda => run_load_usda(config).await.map(StepReport::LoadUsda),
        Step::BuildFoods => run_build_foods(config).await.map(StepReport::BuildFoods),
        Step::BuildMacros => run_build_macros(config).await.map(StepReport::BuildMacros),
    };
    result.map_err(|e| Error::in_step(step.name(), e))
}

/// Delete the database and rebuild it from the configured inputs
pub async fn run_pipeline(config: &PipelineConfig) -> Result<PipelineReport> {
    let removed_existing = remove_database(&config.database_path)?;
    let mut steps = Vec::with_capacity(Step::ALL.len());

    for step in Step::ALL {
        info!("=== Running {} ===", step);
        match run_step(step, config).await {
            Ok(report) => {
                info!("[OK] {}", step);
                steps.push(report);
            }
            Err(e) => {
                error!("[FAILED] {} (exit {}): {}", step, e.exit_code(), e);
                return Err(e);
            }
        }
    }

    info!("All steps completed successfully.");
    Ok(PipelineReport {
        database_path: config.database_path.clone(),
        removed_existing,
        steps,
    })
}
