//! USDA layer: raw CSV loading, foundation backfill, and listing

pub mod foundation;
pub mod listing;
pub mod loader;
pub mod tables;

pub use foundation::backfill_foundation_descriptions;
pub use listing::{list_foundation_foods, FoundationListing};
pub use loader::{count_rows, load_table, TableLoadReport};

use foodb_common::db::open_database;
use foodb_common::{PipelineConfig, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Outcome of the raw load step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsdaLoadReport {
    pub tables: Vec<TableLoadReport>,
    pub foundation_descriptions_filled: u64,
}

impl UsdaLoadReport {
    pub fn table(&self, name: &str) -> Option<&TableLoadReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn total_inserted(&self) -> u64 {
        self.tables.iter().map(|t| t.inserted).sum()
    }

    pub fn total_missing_parent(&self) -> u64 {
        self.tables.iter().map(|t| t.missing_parent).sum()
    }
}

/// Load every USDA table from `csv_dir`, then backfill foundation descriptions
pub async fn load_usda_tables(pool: &SqlitePool, csv_dir: &Path) -> Result<UsdaLoadReport> {
    let mut report = UsdaLoadReport::default();

    for table in tables::LOAD_ORDER {
        report.tables.push(load_table(pool, csv_dir, table).await?);
    }
    report.foundation_descriptions_filled = backfill_foundation_descriptions(pool).await?;

    for table in tables::LOAD_ORDER {
        info!("{}: {} rows", table.name, count_rows(pool, table.name).await?);
    }

    info!(
        "USDA layer loaded: {} rows inserted, {} rows skipped for missing parents",
        report.total_inserted(),
        report.total_missing_parent()
    );
    Ok(report)
}

/// Raw loader step: opens the configured database for the step's lifetime
pub async fn run_load_usda(config: &PipelineConfig) -> Result<UsdaLoadReport> {
    let pool = open_database(&config.database_path).await?;
    let result = load_usda_tables(&pool, &config.csv_dir).await;
    pool.close().await;
    result
}
