//! Foundation food description backfill

use foodb_common::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Copy `food.description` into `foundation_food` rows that have none
///
/// Rows that already carry a description are left alone, so running this
/// twice updates nothing the second time. Returns the number of rows updated.
pub async fn backfill_foundation_descriptions(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE foundation_food
        SET description = (
            SELECT food.description
            FROM food
            WHERE food.fdc_id = foundation_food.fdc_id
        )
        WHERE description IS NULL
        "#,
    )
    .execute(pool)
    .await?;

    let updated = result.rows_affected();
    info!("foundation_food descriptions populated from food table ({} rows)", updated);
    Ok(updated)
}
