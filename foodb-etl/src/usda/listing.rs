//! Foundation food listing straight from the CSV exports
//!
//! Diagnostic helper that needs no database: collects the ids in
//! `foundation_food.csv` and reports the matching `food.csv` rows in file
//! order.

use super::tables::{FOOD, FOUNDATION_FOOD};
use foodb_common::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundationListing {
    pub fdc_id: i64,
    pub description: String,
}

impl fmt::Display for FoundationListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.fdc_id, self.description)
    }
}

/// List every foundation food with its description
pub fn list_foundation_foods(csv_dir: &Path) -> Result<Vec<FoundationListing>> {
    let foundation_path = csv_dir.join(FOUNDATION_FOOD.source_file);
    let food_path = csv_dir.join(FOOD.source_file);

    let mut foundation_ids = HashSet::new();
    let mut reader = open_reader(&foundation_path)?;
    let id_index = header_index(&mut reader, "fdc_id", &foundation_path)?;
    for record in reader.records() {
        let record = record?;
        if let Some(id) = parse_id(record.get(id_index), &foundation_path) {
            foundation_ids.insert(id);
        }
    }

    let mut reader = open_reader(&food_path)?;
    let id_index = header_index(&mut reader, "fdc_id", &food_path)?;
    let description_index = header_index(&mut reader, "description", &food_path)?;

    let mut listings = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(fdc_id) = parse_id(record.get(id_index), &food_path) else {
            continue;
        };
        if foundation_ids.contains(&fdc_id) {
            listings.push(FoundationListing {
                fdc_id,
                description: record.get(description_index).unwrap_or("").to_string(),
            });
        }
    }

    Ok(listings)
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    let file = std::fs::File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.display(), e),
        ))
    })?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn header_index(
    reader: &mut csv::Reader<std::fs::File>,
    column: &str,
    path: &Path,
) -> Result<usize> {
    reader
        .headers()?
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == column)
        .ok_or_else(|| {
            Error::InvalidInput(format!("{} has no '{}' column", path.display(), column))
        })
}

fn parse_id(raw: Option<&str>, path: &Path) -> Option<i64> {
    let raw = raw.unwrap_or("");
    match raw.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!("Skipping unparsable fdc_id '{}' in {}", raw, path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lists_foundation_foods_in_food_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("foundation_food.csv"),
            "fdc_id,NDB_number,footnote\n1003,9003,\n1001,9001,\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("food.csv"),
            "fdc_id,data_type,description\n\
             1001,foundation_food,\"Apple, raw\"\n\
             1002,sr_legacy_food,Bread\n\
             1003,foundation_food,Kale\n",
        )
        .unwrap();

        let listings = list_foundation_foods(dir.path()).unwrap();

        let lines: Vec<String> = listings.iter().map(|l| l.to_string()).collect();
        assert_eq!(lines, vec!["1001: Apple, raw", "1003: Kale"]);
    }

    #[test]
    fn test_unparsable_ids_are_skipped_in_both_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("foundation_food.csv"),
            "fdc_id\nabc\n1001\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("food.csv"),
            "fdc_id,description\n,Nameless\nxyz,Broken\n1001,Apple\n",
        )
        .unwrap();

        let listings = list_foundation_foods(dir.path()).unwrap();

        assert_eq!(
            listings,
            vec![FoundationListing {
                fdc_id: 1001,
                description: "Apple".to_string(),
            }]
        );
        assert_eq!(parse_id(Some("1001"), Path::new("food.csv")), Some(1001));
        assert_eq!(parse_id(None, Path::new("food.csv")), None);
    }

    #[test]
    fn test_missing_files_are_io_errors() {
        let dir = TempDir::new().unwrap();
        let result = list_foundation_foods(dir.path());
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
