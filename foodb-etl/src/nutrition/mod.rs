//! Canonical nutrition layer built on top of the USDA tables

pub mod foods;
pub mod macros;
pub mod mapping;

pub use foods::{build_foods, run_build_foods, FoodsReport};
pub use macros::{build_macros, run_build_macros, MacrosReport};
pub use mapping::{CanonicalMapping, MappingEntry};

/// USDA nutrient ids for the four tracked macros
pub mod nutrient_ids {
    /// Energy (kcal)
    pub const CALORIES: i64 = 1008;
    /// Protein (g)
    pub const PROTEIN: i64 = 1003;
    /// Total lipid (fat) (g)
    pub const FAT: i64 = 1004;
    /// Carbohydrate, by difference (g)
    pub const CARBS: i64 = 1005;
}
