//! Database initialization
//!
//! Opens the SQLite file with foreign-key enforcement and creates the USDA
//! layer and canonical nutrition tables. Table creation is idempotent.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open (creating if needed) the database file and ensure all tables exist
///
/// The pool holds a single connection: build steps are sequential and the
/// loaders keep temporary staging tables on that connection.
pub async fn open_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);
    let pool = connect(options).await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    Ok(pool)
}

/// Open a private in-memory database with the full schema
pub async fn open_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = connect(options).await?;
    create_schema(&pool).await?;
    Ok(pool)
}

async fn connect(options: SqliteConnectOptions) -> Result<SqlitePool> {
    // In-memory databases vanish with their connection, so never recycle it
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(options.foreign_keys(true))
        .await?;
    Ok(pool)
}

/// Create every table used by the pipeline (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // USDA layer
    create_food_table(pool).await?;
    create_nutrient_table(pool).await?;
    create_food_nutrient_table(pool).await?;
    create_foundation_food_table(pool).await?;
    create_measure_table(pool).await?;

    // Canonical nutrition layer
    create_nutrition_food_table(pool).await?;
    create_nutrition_food_macros_table(pool).await?;

    Ok(())
}

async fn create_food_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS food (
            fdc_id INTEGER PRIMARY KEY,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_nutrient_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS nutrient (
            id INTEGER PRIMARY KEY,
            name TEXT,
            unit_name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Amounts are per 100 g by USDA convention
async fn create_food_nutrient_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS food_nutrient (
            id INTEGER,
            fdc_id INTEGER,
            nutrient_id INTEGER,
            amount REAL,
            per_100g BOOLEAN DEFAULT 1,
            PRIMARY KEY (fdc_id, nutrient_id),
            FOREIGN KEY (fdc_id) REFERENCES food(fdc_id),
            FOREIGN KEY (nutrient_id) REFERENCES nutrient(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// `description` is filled from `food` after the ids are loaded
async fn create_foundation_food_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS foundation_food (
            fdc_id INTEGER PRIMARY KEY,
            description TEXT,
            FOREIGN KEY (fdc_id) REFERENCES food(fdc_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_measure_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS measure (
            id INTEGER PRIMARY KEY,
            fdc_id INTEGER,
            label TEXT,
            grams REAL,
            FOREIGN KEY (fdc_id) REFERENCES food(fdc_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// `usda_food_id` intentionally carries no foreign key
async fn create_nutrition_food_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS nutrition_food (
            id TEXT PRIMARY KEY,
            usda_food_id INTEGER NOT NULL,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_nutrition_food_macros_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS nutrition_food_macros (
            id TEXT PRIMARY KEY,
            calories REAL,
            protein REAL,
            fat REAL,
            carbs REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete the database file and any WAL/SHM siblings
///
/// Returns `true` if the main database file existed.
pub fn remove_database(db_path: &Path) -> Result<bool> {
    let existed = remove_if_exists(db_path)?;
    for suffix in ["-wal", "-shm", "-journal"] {
        let mut sibling = db_path.as_os_str().to_owned();
        sibling.push(suffix);
        remove_if_exists(&PathBuf::from(sibling))?;
    }
    if existed {
        info!("Removed existing database at {}", db_path.display());
    }
    Ok(existed)
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
