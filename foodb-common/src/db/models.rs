//! Database models for the canonical nutrition layer

use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Row of `nutrition_food`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NutritionFood {
    pub id: String,
    pub usda_food_id: i64,
    pub name: String,
}

/// Row of `nutrition_food_macros` (amounts per 100 g)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FoodMacros {
    pub id: String,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

/// Insert or update a canonical food, keyed by `id`
pub async fn upsert_nutrition_food(pool: &SqlitePool, food: &NutritionFood) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO nutrition_food (id, usda_food_id, name)
        VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            usda_food_id = excluded.usda_food_id,
            name = excluded.name
        "#,
    )
    .bind(&food.id)
    .bind(food.usda_food_id)
    .bind(&food.name)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert or update a macro row, keyed by `id`
pub async fn upsert_food_macros(pool: &SqlitePool, macros: &FoodMacros) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO nutrition_food_macros (id, calories, protein, fat, carbs)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            calories = excluded.calories,
            protein = excluded.protein,
            fat = excluded.fat,
            carbs = excluded.carbs
        "#,
    )
    .bind(&macros.id)
    .bind(macros.calories)
    .bind(macros.protein)
    .bind(macros.fat)
    .bind(macros.carbs)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a canonical food by id
pub async fn load_nutrition_food(pool: &SqlitePool, id: &str) -> Result<Option<NutritionFood>> {
    let food = sqlx::query_as::<_, NutritionFood>(
        "SELECT id, usda_food_id, name FROM nutrition_food WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(food)
}

/// Load the macro row for a canonical food
pub async fn load_food_macros(pool: &SqlitePool, id: &str) -> Result<Option<FoodMacros>> {
    let macros = sqlx::query_as::<_, FoodMacros>(
        "SELECT id, calories, protein, fat, carbs FROM nutrition_food_macros WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(macros)
}

/// All macro rows ordered by id
pub async fn list_food_macros(pool: &SqlitePool) -> Result<Vec<FoodMacros>> {
    let rows = sqlx::query_as::<_, FoodMacros>(
        "SELECT id, calories, protein, fat, carbs FROM nutrition_food_macros ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[tokio::test]
    async fn test_upsert_nutrition_food_overwrites() {
        let pool = open_in_memory().await.unwrap();

        let mut food = NutritionFood {
            id: "apple_raw".to_string(),
            usda_food_id: 1001,
            name: "Apple".to_string(),
        };
        upsert_nutrition_food(&pool, &food).await.unwrap();

        food.usda_food_id = 1002;
        food.name = "Apple, raw".to_string();
        upsert_nutrition_food(&pool, &food).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nutrition_food")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(load_nutrition_food(&pool, "apple_raw").await.unwrap(), Some(food));
    }

    #[tokio::test]
    async fn test_list_food_macros_ordered() {
        let pool = open_in_memory().await.unwrap();
        for id in ["rice_white", "apple_raw"] {
            let macros = FoodMacros {
                id: id.to_string(),
                calories: 1.0,
                protein: 2.0,
                fat: 3.0,
                carbs: 4.0,
            };
            upsert_food_macros(&pool, &macros).await.unwrap();
        }

        let ids: Vec<String> = list_food_macros(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["apple_raw", "rice_white"]);
        assert!(load_food_macros(&pool, "missing").await.unwrap().is_none());
    }
}
