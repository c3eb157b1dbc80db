//! Canonical foods builder

use super::mapping::CanonicalMapping;
use foodb_common::db::{open_database, upsert_nutrition_food, NutritionFood};
use foodb_common::{PipelineConfig, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FoodsReport {
    /// Entries inserted or updated
    pub processed: u64,
}

/// Upsert every mapping entry into `nutrition_food`
pub async fn build_foods(pool: &SqlitePool, mapping: &CanonicalMapping) -> Result<FoodsReport> {
    let mut report = FoodsReport::default();

    for (id, entry) in mapping.iter() {
        let food = NutritionFood {
            id: id.to_string(),
            usda_food_id: entry.usda_food_id,
            name: entry.name.clone(),
        };
        upsert_nutrition_food(pool, &food).await?;
        report.processed += 1;
    }

    info!("Inserted/updated {} canonical foods", report.processed);
    Ok(report)
}

/// Canonical foods step: reads the configured mapping file
pub async fn run_build_foods(config: &PipelineConfig) -> Result<FoodsReport> {
    let mapping = CanonicalMapping::load(&config.mapping_path);
    let pool = open_database(&config.database_path).await?;
    let result = build_foods(&pool, &mapping).await;
    pool.close().await;
    result
}
