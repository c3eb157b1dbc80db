//! USDA FoodData Central table descriptions
//!
//! Each table names its CSV source, the typed columns to pick from it (by
//! header name), and the parent rows every record must reference.

/// Storage type a CSV field is converted to before binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

#[derive(Debug)]
pub struct CsvColumn {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// An empty field makes the row malformed instead of binding NULL
    pub required: bool,
}

impl CsvColumn {
    /// Integer primary key; SQLite would assign a rowid for NULL
    pub const fn key(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Integer, required: true }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Integer, required: false }
    }

    pub const fn real(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Real, required: false }
    }

    pub const fn text(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Text, required: false }
    }
}

/// `column` must match an existing `parent_table.parent_column`
#[derive(Debug)]
pub struct ParentKey {
    pub column: &'static str,
    pub parent_table: &'static str,
    pub parent_column: &'static str,
}

#[derive(Debug)]
pub struct UsdaTable {
    pub name: &'static str,
    pub source_file: &'static str,
    pub columns: &'static [CsvColumn],
    pub parents: &'static [ParentKey],
}

impl UsdaTable {
    /// Comma-separated column names, optionally qualified with a table alias
    pub fn column_list(&self, alias: Option<&str>) -> String {
        self.columns
            .iter()
            .map(|c| match alias {
                Some(a) => format!("{}.{}", a, c.name),
                None => c.name.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn placeholders(&self) -> String {
        vec!["?"; self.columns.len()].join(", ")
    }

    /// Temporary table that holds rows awaiting parent validation
    pub fn staging_name(&self) -> String {
        format!("staging_{}", self.name)
    }

    /// SQL condition, over staging alias `s`, that holds when every parent exists
    pub fn parents_exist_condition(&self) -> Option<String> {
        if self.parents.is_empty() {
            return None;
        }
        let clauses: Vec<String> = self
            .parents
            .iter()
            .map(|p| {
                format!(
                    "EXISTS (SELECT 1 FROM {} WHERE {}.{} = s.{})",
                    p.parent_table, p.parent_table, p.parent_column, p.column
                )
            })
            .collect();
        Some(clauses.join(" AND "))
    }
}

pub static FOOD: UsdaTable = UsdaTable {
    name: "food",
    source_file: "food.csv",
    columns: &[CsvColumn::key("fdc_id"), CsvColumn::text("description")],
    parents: &[],
};

pub static NUTRIENT: UsdaTable = UsdaTable {
    name: "nutrient",
    source_file: "nutrient.csv",
    columns: &[
        CsvColumn::key("id"),
        CsvColumn::text("name"),
        CsvColumn::text("unit_name"),
    ],
    parents: &[],
};

pub static FOOD_NUTRIENT: UsdaTable = UsdaTable {
    name: "food_nutrient",
    source_file: "food_nutrient.csv",
    columns: &[
        CsvColumn::integer("id"),
        CsvColumn::integer("fdc_id"),
        CsvColumn::integer("nutrient_id"),
        CsvColumn::real("amount"),
    ],
    parents: &[
        ParentKey {
            column: "fdc_id",
            parent_table: "food",
            parent_column: "fdc_id",
        },
        ParentKey {
            column: "nutrient_id",
            parent_table: "nutrient",
            parent_column: "id",
        },
    ],
};

/// Only ids are loaded; descriptions are backfilled from `food`
pub static FOUNDATION_FOOD: UsdaTable = UsdaTable {
    name: "foundation_food",
    source_file: "foundation_food.csv",
    columns: &[CsvColumn::key("fdc_id")],
    parents: &[ParentKey {
        column: "fdc_id",
        parent_table: "food",
        parent_column: "fdc_id",
    }],
};

pub static MEASURE: UsdaTable = UsdaTable {
    name: "measure",
    source_file: "measure.csv",
    columns: &[
        CsvColumn::key("id"),
        CsvColumn::integer("fdc_id"),
        CsvColumn::text("label"),
        CsvColumn::real("grams"),
    ],
    parents: &[ParentKey {
        column: "fdc_id",
        parent_table: "food",
        parent_column: "fdc_id",
    }],
};

/// Parents before children
pub static LOAD_ORDER: [&UsdaTable; 5] = [&FOOD, &NUTRIENT, &FOOD_NUTRIENT, &FOUNDATION_FOOD, &MEASURE];
