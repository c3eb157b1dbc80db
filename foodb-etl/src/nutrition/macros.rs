//! Macro-nutrient deriver
//!
//! One point lookup per tracked nutrient; a missing row counts as 0.0. Only
//! the first matching `food_nutrient` row is used, nothing is aggregated.

use super::mapping::CanonicalMapping;
use super::nutrient_ids::{CALORIES, CARBS, FAT, PROTEIN};
use foodb_common::db::{open_database, upsert_food_macros, FoodMacros};
use foodb_common::{Error, PipelineConfig, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MacrosReport {
    /// Entries inserted or updated
    pub processed: u64,
    /// Canonical ids whose `usda_food_id` has no `food` row
    pub unresolved: Vec<String>,
}

/// Amount of one nutrient for one food, 0.0 when absent
pub async fn fetch_amount(pool: &SqlitePool, fdc_id: i64, nutrient_id: i64) -> Result<f64> {
    let amount: Option<Option<f64>> = sqlx::query_scalar(
        "SELECT amount FROM food_nutrient WHERE fdc_id = ? AND nutrient_id = ? LIMIT 1",
    )
    .bind(fdc_id)
    .bind(nutrient_id)
    .fetch_optional(pool)
    .await?;

    Ok(amount.flatten().unwrap_or(0.0))
}

pub async fn food_exists(pool: &SqlitePool, fdc_id: i64) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM food WHERE fdc_id = ? LIMIT 1")
        .bind(fdc_id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Look up the four macros for a USDA food
pub async fn derive_macros(pool: &SqlitePool, id: &str, fdc_id: i64) -> Result<FoodMacros> {
    Ok(FoodMacros {
        id: id.to_string(),
        calories: fetch_amount(pool, fdc_id, CALORIES).await?,
        protein: fetch_amount(pool, fdc_id, PROTEIN).await?,
        fat: fetch_amount(pool, fdc_id, FAT).await?,
        carbs: fetch_amount(pool, fdc_id, CARBS).await?,
    })
}

/// Derive and upsert macros for every mapping entry
///
/// Entries pointing at a missing USDA food produce all-zero macros and are
/// listed in the report. With `strict` set they fail the build instead,
/// before any row is written.
pub async fn build_macros(
    pool: &SqlitePool,
    mapping: &CanonicalMapping,
    strict: bool,
) -> Result<MacrosReport> {
    let mut report = MacrosReport::default();

    for (id, entry) in mapping.iter() {
        if !food_exists(pool, entry.usda_food_id).await? {
            report.unresolved.push(id.to_string());
        }
    }

    if !report.unresolved.is_empty() {
        if strict {
            return Err(Error::Config(format!(
                "mapping entries reference unknown USDA foods: {}",
                report.unresolved.join(", ")
            )));
        }
        for id in &report.unresolved {
            if let Some(entry) = mapping.get(id) {
                warn!(
                    "Canonical food '{}' maps to unknown usda_food_id {}; macros will be zero",
                    id, entry.usda_food_id
                );
            }
        }
    }

    for (id, entry) in mapping.iter() {
        let macros = derive_macros(pool, id, entry.usda_food_id).await?;
        upsert_food_macros(pool, &macros).await?;
        report.processed += 1;
    }

    info!("Inserted/updated {} macro rows", report.processed);
    Ok(report)
}

/// Macro step: reads the configured mapping file
pub async fn run_build_macros(config: &PipelineConfig) -> Result<MacrosReport> {
    let mapping = CanonicalMapping::load(&config.mapping_path);
    let pool = open_database(&config.database_path).await?;
    let result = build_macros(&pool, &mapping, config.strict_mapping).await;
    pool.close().await;
    result
}
