//! End-to-end tests for the rebuild pipeline against the fixture exports
//!
//! Fixture layout mirrors a data root:
//! - tests/fixtures/usda/csv/*.csv
//! - tests/fixtures/nutrition/mappings/canonical_foods.yaml

use foodb_common::config::{ConfigOverrides, PipelineConfig, ENV_STRICT_MAPPING};
use foodb_common::db::{list_food_macros, load_food_macros, open_database, FoodMacros};
use foodb_common::Error;
use foodb_etl::nutrition::MacrosReport;
use foodb_etl::pipeline::{run_pipeline, run_step, Step, StepReport};
use foodb_etl::usda::UsdaLoadReport;
use serial_test::serial;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// Fixture inputs with the database in a scratch directory
fn fixture_config(scratch: &TempDir) -> PipelineConfig {
    let mut config = PipelineConfig::from_data_root(&fixtures_root());
    config.database_path = scratch.path().join("food_app.db");
    config
}

/// Every table rendered as sorted text rows
async fn snapshot(pool: &SqlitePool) -> Vec<String> {
    let queries = [
        "SELECT 'food|' || fdc_id || '|' || IFNULL(description, '') FROM food",
        "SELECT 'nutrient|' || id || '|' || IFNULL(name, '') || '|' || IFNULL(unit_name, '') FROM nutrient",
        "SELECT 'food_nutrient|' || IFNULL(id, '') || '|' || fdc_id || '|' || nutrient_id || '|' || IFNULL(amount, '') FROM food_nutrient",
        "SELECT 'foundation_food|' || fdc_id || '|' || IFNULL(description, '') FROM foundation_food",
        "SELECT 'measure|' || id || '|' || fdc_id || '|' || IFNULL(label, '') || '|' || IFNULL(grams, '') FROM measure",
        "SELECT 'nutrition_food|' || id || '|' || usda_food_id || '|' || name FROM nutrition_food",
        "SELECT 'nutrition_food_macros|' || id || '|' || calories || '|' || protein || '|' || fat || '|' || carbs FROM nutrition_food_macros",
    ];

    let mut rows = Vec::new();
    for query in queries {
        let mut table_rows: Vec<String> = sqlx::query_scalar(query).fetch_all(pool).await.unwrap();
        rows.append(&mut table_rows);
    }
    rows.sort();
    rows
}

fn usda_report(steps: &[StepReport]) -> &UsdaLoadReport {
    steps
        .iter()
        .find_map(|s| match s {
            StepReport::LoadUsda(r) => Some(r),
            _ => None,
        })
        .expect("load_usda report present")
}

fn macros_report(steps: &[StepReport]) -> &MacrosReport {
    steps
        .iter()
        .find_map(|s| match s {
            StepReport::BuildMacros(r) => Some(r),
            _ => None,
        })
        .expect("build_macros report present")
}

#[tokio::test]
async fn test_full_rebuild_from_fixtures() {
    let scratch = TempDir::new().unwrap();
    let config = fixture_config(&scratch);

    let report = run_pipeline(&config).await.unwrap();
    assert!(!report.removed_existing);
    assert_eq!(report.steps.len(), 3);

    let usda = usda_report(&report.steps);
    let food_nutrient = usda.table("food_nutrient").unwrap();
    assert_eq!(food_nutrient.rows_read, 17);
    assert_eq!(food_nutrient.inserted, 14);
    assert_eq!(food_nutrient.missing_parent, 2);
    assert_eq!(food_nutrient.duplicates, 1);
    assert_eq!(usda.table("foundation_food").unwrap().missing_parent, 1);
    assert_eq!(usda.table("measure").unwrap().inserted, 3);
    assert_eq!(usda.foundation_descriptions_filled, 3);
    assert_eq!(usda.total_missing_parent(), 4);

    let pool = open_database(&config.database_path).await.unwrap();

    let apple = load_food_macros(&pool, "apple_raw").await.unwrap().unwrap();
    assert_eq!(
        apple,
        FoodMacros {
            id: "apple_raw".to_string(),
            calories: 52.0,
            protein: 0.3,
            fat: 0.0,
            carbs: 0.0,
        }
    );

    // First food_nutrient row for (1002, 1008) wins over the later duplicate
    let banana = load_food_macros(&pool, "banana_raw").await.unwrap().unwrap();
    assert_eq!(banana.calories, 89.0);
    assert_eq!(banana.carbs, 22.84);

    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM food_nutrient WHERE fdc_id = 9999")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orphans, 0);

    let description: String =
        sqlx::query_scalar("SELECT description FROM foundation_food WHERE fdc_id = 1003")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(description, "Rice, white, long-grain, cooked");

    assert_eq!(list_food_macros(&pool).await.unwrap().len(), 4);
    pool.close().await;
}

#[tokio::test]
async fn test_rebuild_is_deterministic() {
    let scratch = TempDir::new().unwrap();
    let config = fixture_config(&scratch);

    run_pipeline(&config).await.unwrap();
    let pool = open_database(&config.database_path).await.unwrap();
    let first = snapshot(&pool).await;
    pool.close().await;

    let report = run_pipeline(&config).await.unwrap();
    assert!(report.removed_existing);
    let pool = open_database(&config.database_path).await.unwrap();
    let second = snapshot(&pool).await;
    pool.close().await;

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_rerunning_steps_on_existing_database_changes_nothing() {
    let scratch = TempDir::new().unwrap();
    let config = fixture_config(&scratch);

    run_pipeline(&config).await.unwrap();
    let pool = open_database(&config.database_path).await.unwrap();
    let before = snapshot(&pool).await;
    pool.close().await;

    let StepReport::LoadUsda(usda) = run_step(Step::LoadUsda, &config).await.unwrap() else {
        panic!("unexpected report variant");
    };
    assert_eq!(usda.total_inserted(), 0);
    assert_eq!(usda.foundation_descriptions_filled, 0);

    run_step(Step::BuildFoods, &config).await.unwrap();
    run_step(Step::BuildMacros, &config).await.unwrap();

    let pool = open_database(&config.database_path).await.unwrap();
    let after = snapshot(&pool).await;
    pool.close().await;

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_missing_inputs_are_not_fatal() {
    let scratch = TempDir::new().unwrap();
    let config = PipelineConfig::from_data_root(scratch.path());

    let report = run_pipeline(&config).await.unwrap();

    let usda = usda_report(&report.steps);
    assert!(usda.tables.iter().all(|t| t.source_missing));
    assert_eq!(usda.total_inserted(), 0);
    assert_eq!(macros_report(&report.steps).processed, 0);
    assert!(config.database_path.exists());
}

#[tokio::test]
async fn test_unknown_usda_food_yields_zero_macros() {
    let scratch = TempDir::new().unwrap();
    let mut config = fixture_config(&scratch);
    config.mapping_path = scratch.path().join("mapping.yaml");
    std::fs::write(
        &config.mapping_path,
        "ghost_food:\n  usda_food_id: 424242\n  name: Ghost food\n",
    )
    .unwrap();

    let report = run_pipeline(&config).await.unwrap();
    assert_eq!(macros_report(&report.steps).unresolved, vec!["ghost_food".to_string()]);

    let pool = open_database(&config.database_path).await.unwrap();
    let ghost = load_food_macros(&pool, "ghost_food").await.unwrap().unwrap();
    assert_eq!(
        (ghost.calories, ghost.protein, ghost.fat, ghost.carbs),
        (0.0, 0.0, 0.0, 0.0)
    );
    pool.close().await;
}

#[tokio::test]
async fn test_strict_mapping_stops_pipeline_at_macro_step() {
    let scratch = TempDir::new().unwrap();
    let mut config = fixture_config(&scratch);
    config.strict_mapping = true;
    config.mapping_path = scratch.path().join("mapping.yaml");
    std::fs::write(
        &config.mapping_path,
        "apple_raw:\n  usda_food_id: 1001\n  name: Apple, raw\nghost_food:\n  usda_food_id: 424242\n  name: Ghost food\n",
    )
    .unwrap();

    let err = run_pipeline(&config).await.unwrap_err();
    assert!(matches!(err, Error::Step { step: "build_macros", .. }));
    assert_eq!(err.exit_code(), 78);

    // Earlier steps stay committed
    let pool = open_database(&config.database_path).await.unwrap();
    let canonical: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nutrition_food")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(canonical, 2);
    assert!(list_food_macros(&pool).await.unwrap().is_empty());
    pool.close().await;
}

#[tokio::test]
#[serial]
async fn test_strict_mapping_from_environment() {
    let scratch = TempDir::new().unwrap();
    let mapping_path = scratch.path().join("mapping.yaml");
    std::fs::write(&mapping_path, "ghost_food:\n  usda_food_id: 424242\n  name: Ghost\n").unwrap();

    std::env::set_var(ENV_STRICT_MAPPING, "1");
    let config = PipelineConfig::resolve(&ConfigOverrides {
        data_root: Some(fixtures_root()),
        database_path: Some(scratch.path().join("food_app.db")),
        mapping_path: Some(mapping_path),
        ..Default::default()
    });
    std::env::remove_var(ENV_STRICT_MAPPING);
    let config = config.unwrap();
    assert!(config.strict_mapping);

    let err = run_pipeline(&config).await.unwrap_err();
    assert_eq!(err.exit_code(), 78);
}
