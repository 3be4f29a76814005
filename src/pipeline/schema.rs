//! Schema normalization for raw ledger tables
//!
//! Turns a loosely-typed ledger into a clean table: trimmed column names,
//! recovery of comma-collapsed single-column files, numeric coercion,
//! forward-filled transaction dates, zero-filled amounts and no exact
//! duplicate rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use super::columns::*;
use super::error::{PipelineWarning, Result};

/// Date formats accepted for `TransactionDate`, tried in order
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y"];

/// Timestamp formats accepted for `TransactionDate` (date part is kept)
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Output format for normalized dates
pub const ISO_DATE: &str = "%Y-%m-%d";

/// Result of normalizing a raw table
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    /// The cleaned table
    pub df: DataFrame,
    /// True when the single-column recovery path was taken
    pub resplit: bool,
    /// Number of exact duplicate rows removed
    pub duplicates_removed: usize,
    /// Non-fatal data quality notes
    pub warnings: Vec<PipelineWarning>,
}

/// Normalize a raw ledger table.
///
/// Canonical columns that are present are coerced to their types; any other
/// column is kept untouched apart from name trimming, except caller-supplied
/// ratio columns which are coerced like amounts. Absent canonical columns
/// are not invented here.
///
/// Edge case: if the first rows have no parseable date there is no earlier
/// row to forward-fill from, so their `TransactionDate` stays missing.
pub fn normalize_schema(raw: &DataFrame) -> Result<NormalizedTable> {
    let mut warnings = Vec::new();

    let mut df = trim_column_names(raw)?;

    let resplit = df.width() == 1;
    if resplit {
        tracing::warn!("Ledger parsed as a single column; re-splitting on ','");
        df = resplit_single_column(&df, &mut warnings)?;
    }

    for name in MONETARY_COLUMNS.iter().chain([PROFIT_MARGIN, COST_RATIO].iter()) {
        if !has_column(&df, name) {
            continue;
        }
        let values = numeric_values(&df, name)?;
        let missing = values.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            tracing::debug!(column = *name, missing, "Filling missing values with 0");
        }
        // Adding 0.0 folds -0.0 into 0.0
        let filled: Vec<f64> = values.into_iter().map(|v| v.unwrap_or(0.0) + 0.0).collect();
        df.with_column(Column::new((*name).into(), filled))?;
    }

    for name in IDENTIFIER_COLUMNS {
        if has_column(&df, name) {
            let values = string_values(&df, name)?;
            df.with_column(Column::new(name.into(), values))?;
        }
    }

    if has_column(&df, TRANSACTION_DATE) {
        let raw_dates = string_values(&df, TRANSACTION_DATE)?;
        let (dates, unfilled) = forward_fill_dates(&raw_dates);
        if unfilled > 0 {
            warnings.push(PipelineWarning::data_quality(
                TRANSACTION_DATE,
                format!(
                    "{} leading row(s) have no valid date and no earlier row to fill from",
                    unfilled
                ),
            ));
        }
        let formatted: Vec<Option<String>> = dates
            .into_iter()
            .map(|d| d.map(|d| d.format(ISO_DATE).to_string()))
            .collect();
        df.with_column(Column::new(TRANSACTION_DATE.into(), formatted))?;
    }

    let before = df.height();
    let df = drop_duplicate_rows(&df)?;
    let duplicates_removed = before - df.height();
    if duplicates_removed > 0 {
        tracing::info!(duplicates_removed, "Removed exact duplicate rows");
    }

    for warning in &warnings {
        warning.emit();
    }

    Ok(NormalizedTable {
        df,
        resplit,
        duplicates_removed,
        warnings,
    })
}

/// Return a copy of the table with surrounding whitespace trimmed from column names
pub fn trim_column_names(df: &DataFrame) -> Result<DataFrame> {
    let columns: Vec<Column> = df
        .get_columns()
        .iter()
        .map(|col| {
            let mut col = col.clone();
            let trimmed = col.name().as_str().trim().to_string();
            col.rename(trimmed.into());
            col
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Re-split a comma-collapsed single-column table into the canonical columns
fn resplit_single_column(
    df: &DataFrame,
    warnings: &mut Vec<PipelineWarning>,
) -> Result<DataFrame> {
    let source = df.get_columns()[0].name().to_string();
    let rows = string_values(df, &source)?;

    let mut fields: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(rows.len()); CANONICAL_COLUMNS.len()];
    let mut ragged = 0usize;

    for row in rows {
        let parts: Vec<String> = match row {
            Some(line) => line.split(',').map(|p| p.trim().to_string()).collect(),
            None => Vec::new(),
        };

        // A repeated header line inside the data carries no values
        if parts.len() == CANONICAL_COLUMNS.len()
            && parts.iter().zip(CANONICAL_COLUMNS.iter()).all(|(p, c)| p == c)
        {
            continue;
        }

        if parts.len() != CANONICAL_COLUMNS.len() {
            ragged += 1;
        }

        for (idx, values) in fields.iter_mut().enumerate() {
            let value = parts.get(idx).filter(|p| !p.is_empty()).cloned();
            values.push(value);
        }
    }

    if ragged > 0 {
        warnings.push(PipelineWarning::data_quality(
            source,
            format!(
                "{} row(s) did not split into {} fields; padded or truncated",
                ragged,
                CANONICAL_COLUMNS.len()
            ),
        ));
    }

    let columns: Vec<Column> = CANONICAL_COLUMNS
        .iter()
        .zip(fields)
        .map(|(name, values)| Column::new((*name).into(), values))
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// Parse a transaction date in any of the accepted formats
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

/// Parse dates and carry the most recent valid date forward over gaps.
///
/// Returns the filled dates and the number of leading rows left empty.
pub fn forward_fill_dates(values: &[Option<String>]) -> (Vec<Option<NaiveDate>>, usize) {
    let mut last: Option<NaiveDate> = None;
    let mut unfilled = 0usize;

    let dates = values
        .iter()
        .map(|v| {
            match v.as_deref().and_then(parse_date) {
                Some(date) => last = Some(date),
                None if last.is_none() => unfilled += 1,
                None => {}
            }
            last
        })
        .collect();

    (dates, unfilled)
}

/// Remove exact duplicate rows, keeping the first occurrence.
///
/// Rows are compared on their typed values, so a missing cell never equals
/// a present one.
pub fn drop_duplicate_rows(df: &DataFrame) -> Result<DataFrame> {
    if df.height() == 0 {
        return Ok(df.clone());
    }
    Ok(df.unique_stable(None, UniqueKeepStrategy::First, None)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15"), Some(expected));
        assert_eq!(parse_date("2024/03/15"), Some(expected));
        assert_eq!(parse_date("15/03/2024"), Some(expected));
        assert_eq!(parse_date("2024-03-15 10:30:00"), Some(expected));
        assert_eq!(parse_date(" 2024-03-15 "), Some(expected));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_forward_fill_dates() {
        let values = vec![
            None,
            Some("2024-01-01".to_string()),
            Some("garbage".to_string()),
            None,
            Some("2024-01-05".to_string()),
        ];
        let (dates, unfilled) = forward_fill_dates(&values);
        let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1);
        let jan5 = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(dates, vec![None, jan1, jan1, jan1, jan5]);
        assert_eq!(unfilled, 1);
    }

    #[test]
    fn test_drop_duplicate_rows_keeps_first() {
        let df = df! {
            "a" => [1.0f64, 1.0, 2.0, 1.0],
            "b" => ["x", "x", "x", "y"],
        }
        .unwrap();
        let deduped = drop_duplicate_rows(&df).unwrap();
        assert_eq!(deduped.height(), 3);
    }

    #[test]
    fn test_drop_duplicate_rows_compares_cells_not_joined_text() {
        let df = df! {
            "x" => ["a\u{1f}", "a"],
            "y" => ["b", "\u{1f}b"],
        }
        .unwrap();
        assert_eq!(drop_duplicate_rows(&df).unwrap().height(), 2);

        let df = df! {
            "x" => [None, Some("\0")],
            "y" => ["b", "b"],
        }
        .unwrap();
        assert_eq!(drop_duplicate_rows(&df).unwrap().height(), 2);
    }

    #[test]
    fn test_drop_duplicate_rows_keeps_first_occurrence_order() {
        let df = df! {
            "id" => ["T3", "T1", "T3", "T2", "T1"],
            "v" => [3.0f64, 1.0, 3.0, 2.0, 1.0],
        }
        .unwrap();
        let deduped = drop_duplicate_rows(&df).unwrap();
        let ids: Vec<Option<&str>> = deduped.column("id").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some("T3"), Some("T1"), Some("T2")]);
    }

    #[test]
    fn test_trim_column_names() {
        let df = df! {
            " Revenue " => [1.0f64],
            "NetProfit\t" => [2.0f64],
        }
        .unwrap();
        let trimmed = trim_column_names(&df).unwrap();
        assert!(has_column(&trimmed, "Revenue"));
        assert!(has_column(&trimmed, "NetProfit"));
    }
}
