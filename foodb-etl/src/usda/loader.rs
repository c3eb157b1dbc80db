//! CSV-to-table loader for the USDA layer
//!
//! Rows are inserted with `INSERT OR IGNORE`, so reloading an unchanged
//! export adds nothing. Tables with parent keys are loaded through a
//! temporary staging table: the whole file is staged, rows with missing
//! parents are counted with one anti-join, and the rest are copied into the
//! real table with one statement.

use super::tables::{ColumnKind, UsdaTable};
use foodb_common::{Error, Result};
use serde::Serialize;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqlitePool};
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of loading one CSV file into one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableLoadReport {
    pub table: String,
    pub source_file: String,
    /// CSV file was absent; the table was skipped
    pub source_missing: bool,
    pub rows_read: u64,
    pub inserted: u64,
    /// Rows whose primary key already existed
    pub duplicates: u64,
    /// Rows referencing a parent row that does not exist
    pub missing_parent: u64,
    /// Rows with a field that could not be converted to its column type
    pub malformed: u64,
}

impl TableLoadReport {
    fn new(table: &UsdaTable) -> Self {
        Self {
            table: table.name.to_string(),
            source_file: table.source_file.to_string(),
            ..Default::default()
        }
    }
}

/// A converted CSV field
#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// Load `table.source_file` from `csv_dir` into `table`
///
/// A missing file is not an error: it is logged and reported with
/// `source_missing` set.
pub async fn load_table(
    pool: &SqlitePool,
    csv_dir: &Path,
    table: &UsdaTable,
) -> Result<TableLoadReport> {
    let csv_path = csv_dir.join(table.source_file);
    let mut report = TableLoadReport::new(table);

    if !csv_path.exists() {
        warn!("CSV file not found: {}", csv_path.display());
        report.source_missing = true;
        return Ok(report);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(&csv_path)?;
    let indices = column_indices(reader.headers()?, table, &csv_path)?;

    let parents_exist = table.parents_exist_condition();
    let staging = table.staging_name();
    let target = match parents_exist {
        Some(_) => format!("temp.{}", staging),
        None => table.name.to_string(),
    };

    let mut tx = pool.begin().await?;

    if parents_exist.is_some() {
        sqlx::query(&format!("DROP TABLE IF EXISTS temp.{}", staging))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "CREATE TEMP TABLE {} AS SELECT {} FROM main.{} WHERE 0",
            staging,
            table.column_list(None),
            table.name
        ))
        .execute(&mut *tx)
        .await?;
    }

    let insert_sql = format!(
        "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
        target,
        table.column_list(None),
        table.placeholders()
    );

    for (line, record) in reader.records().enumerate() {
        report.rows_read += 1;

        let converted = match record {
            Ok(record) => convert_record(&record, &indices, table),
            Err(e) if matches!(e.kind(), csv::ErrorKind::UnequalLengths { .. }) => {
                Err(e.to_string())
            }
            Err(e) => return Err(e.into()),
        };
        let values = match converted {
            Ok(values) => values,
            Err(reason) => {
                // +2: header line, 1-based numbering
                warn!(
                    "Skipping malformed row {} in {}: {}",
                    line + 2,
                    table.source_file,
                    reason
                );
                report.malformed += 1;
                continue;
            }
        };

        let mut query = sqlx::query(&insert_sql);
        for value in &values {
            query = bind_field(query, value);
        }
        let result = query.execute(&mut *tx).await?;
        if parents_exist.is_none() {
            report.inserted += result.rows_affected();
        }
    }

    if let Some(condition) = &parents_exist {
        let missing: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM temp.{} s WHERE NOT ({})",
            staging, condition
        ))
        .fetch_one(&mut *tx)
        .await?;
        report.missing_parent = missing as u64;

        let result = sqlx::query(&format!(
            "INSERT OR IGNORE INTO main.{} ({}) SELECT {} FROM temp.{} s WHERE {} ORDER BY s.rowid",
            table.name,
            table.column_list(None),
            table.column_list(Some("s")),
            staging,
            condition
        ))
        .execute(&mut *tx)
        .await?;
        report.inserted = result.rows_affected();

        sqlx::query(&format!("DROP TABLE temp.{}", staging))
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    report.duplicates = report
        .rows_read
        .saturating_sub(report.malformed + report.missing_parent + report.inserted);

    info!(
        "{} rows inserted into {} from {} ({} duplicates, {} missing parents, {} malformed)",
        report.inserted,
        table.name,
        table.source_file,
        report.duplicates,
        report.missing_parent,
        report.malformed
    );
    if report.missing_parent > 0 {
        info!(
            "Skipped {} {} rows with missing parents",
            report.missing_parent, table.name
        );
    }

    Ok(report)
}

/// Position of each wanted column in the CSV header
fn column_indices(
    headers: &csv::StringRecord,
    table: &UsdaTable,
    csv_path: &Path,
) -> Result<Vec<usize>> {
    table
        .columns
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}') == column.name)
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "{} has no '{}' column (header: {})",
                        csv_path.display(),
                        column.name,
                        headers.iter().collect::<Vec<_>>().join(",")
                    ))
                })
        })
        .collect()
}

fn convert_record(
    record: &csv::StringRecord,
    indices: &[usize],
    table: &UsdaTable,
) -> std::result::Result<Vec<FieldValue>, String> {
    table
        .columns
        .iter()
        .zip(indices)
        .map(|(column, &index)| {
            let raw = record.get(index).unwrap_or("");
            match convert_field(raw, column.kind) {
                Ok(FieldValue::Null) if column.required => {
                    Err(format!("column '{}' is empty", column.name))
                }
                converted => converted
                    .map_err(|e| format!("column '{}' value '{}': {}", column.name, raw, e)),
            }
        })
        .collect()
}

fn convert_field(raw: &str, kind: ColumnKind) -> std::result::Result<FieldValue, String> {
    if raw.is_empty() {
        return Ok(FieldValue::Null);
    }
    match kind {
        ColumnKind::Text => Ok(FieldValue::Text(raw.to_string())),
        ColumnKind::Real => raw
            .parse::<f64>()
            .map(FieldValue::Real)
            .map_err(|e| e.to_string()),
        ColumnKind::Integer => match raw.parse::<i64>() {
            Ok(v) => Ok(FieldValue::Integer(v)),
            // Some exports write ids as "1001.0"
            Err(e) => match raw.parse::<f64>() {
                Ok(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Ok(FieldValue::Integer(f as i64))
                }
                _ => Err(e.to_string()),
            },
        },
    }
}

fn bind_field<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q FieldValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        FieldValue::Null => query.bind(None::<i64>),
        FieldValue::Integer(v) => query.bind(*v),
        FieldValue::Real(v) => query.bind(*v),
        FieldValue::Text(v) => query.bind(v.as_str()),
    }
}

/// Number of rows currently in `table`
pub async fn count_rows(pool: &SqlitePool, table: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    debug!("{} has {} rows", table, count);
    Ok(count)
}
