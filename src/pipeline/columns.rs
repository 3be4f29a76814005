//! Column names and typed column access helpers

use polars::prelude::*;

use super::error::{HealthError, Result};

pub const TRANSACTION_ID: &str = "TransactionID";
pub const TRANSACTION_DATE: &str = "TransactionDate";
pub const ORDER_ID: &str = "OrderID";
pub const REVENUE: &str = "Revenue";
pub const COGS: &str = "COGS";
pub const GROSS_PROFIT: &str = "GrossProfit";
pub const OPERATING_EXPENSES: &str = "OperatingExpenses";
pub const NET_PROFIT: &str = "NetProfit";

pub const PROFIT_MARGIN: &str = "Profit_Margin";
pub const COST_RATIO: &str = "Cost_Ratio";
pub const LOSS_FLAG: &str = "Loss_Flag";
pub const YEAR: &str = "Year";
pub const MONTH: &str = "Month";
pub const DAY: &str = "Day";

pub const HEALTH_STATUS: &str = "Health_Status";
pub const CONFIDENCE: &str = "Confidence";
pub const HEALTH_SCORE: &str = "Health_Score";

/// The eight raw ledger columns in canonical order
pub const CANONICAL_COLUMNS: [&str; 8] = [
    TRANSACTION_ID,
    TRANSACTION_DATE,
    ORDER_ID,
    REVENUE,
    COGS,
    GROSS_PROFIT,
    OPERATING_EXPENSES,
    NET_PROFIT,
];

/// Signed monetary columns of the raw schema
pub const MONETARY_COLUMNS: [&str; 5] = [REVENUE, COGS, GROSS_PROFIT, OPERATING_EXPENSES, NET_PROFIT];

/// Opaque identifier columns, kept as strings
pub const IDENTIFIER_COLUMNS: [&str; 2] = [TRANSACTION_ID, ORDER_ID];

/// Default ordered feature list for the classifier
pub const DEFAULT_FEATURE_COLUMNS: [&str; 5] =
    [REVENUE, COGS, OPERATING_EXPENSES, GROSS_PROFIT, COST_RATIO];

/// Check whether a column exists in the DataFrame
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Read a column as nullable f64 values.
///
/// String columns are parsed after trimming; anything unparseable or
/// non-finite becomes `None`. Other dtypes are cast to Float64.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| HealthError::missing_columns([name]))?;

    let values: Vec<Option<f64>> = match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()))
            .collect(),
        _ => {
            let cast = column.cast(&DataType::Float64)?;
            cast.f64()?.into_iter().collect()
        }
    };

    Ok(values
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

/// Read a numeric column with missing values replaced by zero
pub fn numeric_values_or_zero(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    Ok(numeric_values(df, name)?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect())
}

/// Read a column as nullable strings, trimming surrounding whitespace
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| HealthError::missing_columns([name]))?;

    let cast = match column.dtype() {
        DataType::String => column.clone(),
        _ => column.cast(&DataType::String)?,
    };

    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()))
        .collect())
}
