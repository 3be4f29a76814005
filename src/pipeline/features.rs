//! Derived financial features
//!
//! Each derived column is declared as a [`DerivationRule`]: the source
//! columns it can be computed from (alternatives in preference order) and
//! what happens when none of them is available. The rules are resolved
//! against the table once into a [`DerivationPlan`], which either fails with
//! every missing column listed or is applied in a single pass.

use chrono::Datelike;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::columns::*;
use super::error::{HealthError, PipelineWarning, Result};
use super::schema::parse_date;

/// Which expense line the cost ratio is measured against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostRatioBasis {
    /// `OperatingExpenses / Revenue`
    #[default]
    OperatingExpenses,
    /// `COGS / Revenue`
    Cogs,
}

impl CostRatioBasis {
    /// Numerator column for this basis
    pub fn source_column(&self) -> &'static str {
        match self {
            CostRatioBasis::OperatingExpenses => OPERATING_EXPENSES,
            CostRatioBasis::Cogs => COGS,
        }
    }

    /// The other basis, used when this one's source column is absent
    pub fn alternate(&self) -> CostRatioBasis {
        match self {
            CostRatioBasis::OperatingExpenses => CostRatioBasis::Cogs,
            CostRatioBasis::Cogs => CostRatioBasis::OperatingExpenses,
        }
    }
}

impl std::fmt::Display for CostRatioBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CostRatioBasis::OperatingExpenses => write!(f, "opex"),
            CostRatioBasis::Cogs => write!(f, "cogs"),
        }
    }
}

impl std::str::FromStr for CostRatioBasis {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opex" | "operating_expenses" | "operatingexpenses" => {
                Ok(CostRatioBasis::OperatingExpenses)
            }
            "cogs" => Ok(CostRatioBasis::Cogs),
            _ => Err(format!(
                "Unknown cost ratio basis: '{}'. Use 'opex' or 'cogs'.",
                s
            )),
        }
    }
}

/// How `Cost_Ratio` was obtained for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostRatioDefinition {
    /// Computed from the given basis
    Computed(CostRatioBasis),
    /// Present in the input and used as-is
    Supplied,
}

impl std::fmt::Display for CostRatioDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CostRatioDefinition::Computed(CostRatioBasis::OperatingExpenses) => {
                write!(f, "OperatingExpenses / Revenue")
            }
            CostRatioDefinition::Computed(CostRatioBasis::Cogs) => write!(f, "COGS / Revenue"),
            CostRatioDefinition::Supplied => write!(f, "supplied by input"),
        }
    }
}

/// Feature derivation configuration
#[derive(Debug, Clone, Default)]
pub struct FeatureConfig {
    /// Preferred cost ratio basis
    pub cost_ratio_basis: CostRatioBasis,
}

/// What to do when no source alternative of a rule is available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Hard precondition failure
    Fail,
    /// Fill the column with zeros and raise a data quality warning
    DefaultZero,
    /// Leave the column out and raise a data quality warning
    Omit,
}

/// Computation attached to a derived column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Derivation {
    ProfitMargin,
    CostRatio,
    LossFlag,
    CalendarParts,
}

/// Declaration of one derived output
#[derive(Debug, Clone)]
pub struct DerivationRule {
    /// Output column names (calendar parts produce three)
    pub outputs: Vec<&'static str>,
    /// Alternative source column sets, most preferred first
    pub sources: Vec<Vec<&'static str>>,
    pub on_missing: MissingPolicy,
    derivation: Derivation,
}

/// Resolved action for one rule
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Outputs already present in the table
    Present,
    /// Compute from the source alternative at this index
    Compute(usize),
    /// Fill with zeros
    DefaultZero,
    /// Leave out
    Omit,
}

/// Rules resolved against one table
#[derive(Debug, Clone)]
pub struct DerivationPlan {
    pub steps: Vec<(DerivationRule, Resolution)>,
}

/// Outcome of feature derivation
#[derive(Debug, Clone)]
pub struct DerivedTable {
    pub df: DataFrame,
    /// Active cost ratio definition for this batch
    pub cost_ratio: CostRatioDefinition,
    /// Columns computed in this pass
    pub computed: Vec<String>,
    pub warnings: Vec<PipelineWarning>,
}

/// Division guarded against non-positive denominators.
///
/// Returns 0 whenever `denominator <= 0` or the quotient is not finite.
#[inline]
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// Declare the derivation rules for a configuration
pub fn derivation_rules(config: &FeatureConfig) -> Vec<DerivationRule> {
    let preferred = config.cost_ratio_basis;
    let alternate = preferred.alternate();

    vec![
        DerivationRule {
            outputs: vec![PROFIT_MARGIN],
            sources: vec![vec![NET_PROFIT, REVENUE]],
            on_missing: MissingPolicy::DefaultZero,
            derivation: Derivation::ProfitMargin,
        },
        DerivationRule {
            outputs: vec![COST_RATIO],
            sources: vec![
                vec![preferred.source_column(), REVENUE],
                vec![alternate.source_column(), REVENUE],
            ],
            on_missing: MissingPolicy::Fail,
            derivation: Derivation::CostRatio,
        },
        DerivationRule {
            outputs: vec![LOSS_FLAG],
            sources: vec![vec![NET_PROFIT]],
            on_missing: MissingPolicy::Fail,
            derivation: Derivation::LossFlag,
        },
        DerivationRule {
            outputs: vec![YEAR, MONTH, DAY],
            sources: vec![vec![TRANSACTION_DATE]],
            on_missing: MissingPolicy::Omit,
            derivation: Derivation::CalendarParts,
        },
    ]
}

/// Resolve rules against a table, failing with every unresolvable column
pub fn resolve_plan(df: &DataFrame, rules: Vec<DerivationRule>) -> Result<DerivationPlan> {
    let mut missing: Vec<String> = Vec::new();
    let mut steps = Vec::with_capacity(rules.len());

    for rule in rules {
        if rule.outputs.iter().all(|c| has_column(df, c)) {
            steps.push((rule, Resolution::Present));
            continue;
        }

        let available = rule
            .sources
            .iter()
            .position(|set| set.iter().all(|c| has_column(df, c)));

        let resolution = match (available, rule.on_missing) {
            (Some(idx), _) => Resolution::Compute(idx),
            (None, MissingPolicy::DefaultZero) => Resolution::DefaultZero,
            (None, MissingPolicy::Omit) => Resolution::Omit,
            (None, MissingPolicy::Fail) => {
                for set in &rule.sources {
                    for col in set {
                        if !has_column(df, col) && !missing.iter().any(|m| m == col) {
                            missing.push(col.to_string());
                        }
                    }
                }
                continue;
            }
        };
        steps.push((rule, resolution));
    }

    if !missing.is_empty() {
        return Err(HealthError::Schema { missing });
    }

    Ok(DerivationPlan { steps })
}

/// Add `Profit_Margin`, `Cost_Ratio`, `Loss_Flag` and calendar parts where absent.
///
/// Columns already present are never recomputed. A missing cost ratio source
/// is a schema error; a missing profit margin source falls back to 0 with a
/// warning.
pub fn derive_features(df: &DataFrame, config: &FeatureConfig) -> Result<DerivedTable> {
    let plan = resolve_plan(df, derivation_rules(config))?;
    apply_plan(df, &plan, config)
}

/// Apply a resolved plan to a table
pub fn apply_plan(df: &DataFrame, plan: &DerivationPlan, config: &FeatureConfig) -> Result<DerivedTable> {
    let mut out = df.clone();
    let mut computed = Vec::new();
    let mut warnings = Vec::new();
    let mut cost_ratio = CostRatioDefinition::Supplied;

    for (rule, resolution) in &plan.steps {
        match resolution {
            Resolution::Present => {}
            Resolution::Compute(idx) => {
                let columns = compute(&out, rule.derivation, *idx, config)?;
                if rule.derivation == Derivation::CostRatio {
                    let basis = if *idx == 0 {
                        config.cost_ratio_basis
                    } else {
                        config.cost_ratio_basis.alternate()
                    };
                    if basis != config.cost_ratio_basis {
                        warnings.push(PipelineWarning::data_quality(
                            COST_RATIO,
                            format!(
                                "{} not available; cost ratio computed from {}",
                                config.cost_ratio_basis.source_column(),
                                basis.source_column()
                            ),
                        ));
                    }
                    cost_ratio = CostRatioDefinition::Computed(basis);
                }
                for column in columns {
                    computed.push(column.name().to_string());
                    out.with_column(column)?;
                }
            }
            Resolution::DefaultZero => {
                for name in &rule.outputs {
                    warnings.push(PipelineWarning::data_quality(
                        *name,
                        format!(
                            "cannot be computed ({} missing); defaulted to 0",
                            rule.sources[0].join("/")
                        ),
                    ));
                    out.with_column(Column::new((*name).into(), vec![0.0f64; out.height()]))?;
                    computed.push(name.to_string());
                }
            }
            Resolution::Omit => {
                warnings.push(PipelineWarning::data_quality(
                    rule.outputs.join("/"),
                    format!("omitted ({} missing)", rule.sources[0].join("/")),
                ));
            }
        }
    }

    for warning in &warnings {
        warning.emit();
    }

    Ok(DerivedTable {
        df: out,
        cost_ratio,
        computed,
        warnings,
    })
}

fn compute(
    df: &DataFrame,
    derivation: Derivation,
    source_idx: usize,
    config: &FeatureConfig,
) -> Result<Vec<Column>> {
    match derivation {
        Derivation::ProfitMargin => {
            let net = numeric_values_or_zero(df, NET_PROFIT)?;
            let revenue = numeric_values_or_zero(df, REVENUE)?;
            let margin: Vec<f64> = net
                .iter()
                .zip(&revenue)
                .map(|(&n, &r)| safe_ratio(n, r))
                .collect();
            Ok(vec![Column::new(PROFIT_MARGIN.into(), margin)])
        }
        Derivation::CostRatio => {
            let basis = if source_idx == 0 {
                config.cost_ratio_basis
            } else {
                config.cost_ratio_basis.alternate()
            };
            let cost = numeric_values_or_zero(df, basis.source_column())?;
            let revenue = numeric_values_or_zero(df, REVENUE)?;
            let ratio: Vec<f64> = cost
                .iter()
                .zip(&revenue)
                .map(|(&c, &r)| safe_ratio(c, r))
                .collect();
            Ok(vec![Column::new(COST_RATIO.into(), ratio)])
        }
        Derivation::LossFlag => {
            let net = numeric_values_or_zero(df, NET_PROFIT)?;
            let flags: Vec<i32> = net.iter().map(|&n| i32::from(n < 0.0)).collect();
            Ok(vec![Column::new(LOSS_FLAG.into(), flags)])
        }
        Derivation::CalendarParts => {
            let dates: Vec<Option<chrono::NaiveDate>> = string_values(df, TRANSACTION_DATE)?
                .iter()
                .map(|v| v.as_deref().and_then(parse_date))
                .collect();
            let years: Vec<Option<i32>> = dates.iter().map(|d| d.map(|d| d.year())).collect();
            let months: Vec<Option<i32>> =
                dates.iter().map(|d| d.map(|d| d.month() as i32)).collect();
            let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(|d| d.day() as i32)).collect();
            Ok(vec![
                Column::new(YEAR.into(), years),
                Column::new(MONTH.into(), months),
                Column::new(DAY.into(), days),
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_ratio() {
        assert_eq!(safe_ratio(25.0, 100.0), 0.25);
        assert_eq!(safe_ratio(25.0, 0.0), 0.0);
        assert_eq!(safe_ratio(25.0, -10.0), 0.0);
        assert_eq!(safe_ratio(f64::INFINITY, 1.0), 0.0);
    }

    #[test]
    fn test_cost_ratio_basis_from_str() {
        assert_eq!("opex".parse::<CostRatioBasis>().unwrap(), CostRatioBasis::OperatingExpenses);
        assert_eq!("COGS".parse::<CostRatioBasis>().unwrap(), CostRatioBasis::Cogs);
        assert!("revenue".parse::<CostRatioBasis>().is_err());
    }

    #[test]
    fn test_plan_prefers_configured_basis() {
        let df = df! {
            "Revenue" => [100.0f64],
            "COGS" => [40.0f64],
            "OperatingExpenses" => [35.0f64],
            "NetProfit" => [25.0f64],
        }
        .unwrap();

        let config = FeatureConfig {
            cost_ratio_basis: CostRatioBasis::Cogs,
        };
        let plan = resolve_plan(&df, derivation_rules(&config)).unwrap();
        let cost_step = plan
            .steps
            .iter()
            .find(|(rule, _)| rule.outputs == vec![COST_RATIO])
            .unwrap();
        assert_eq!(cost_step.1, Resolution::Compute(0));
    }

    #[test]
    fn test_plan_collects_all_missing_columns() {
        let df = df! {
            "Revenue" => [100.0f64],
        }
        .unwrap();

        let err = resolve_plan(&df, derivation_rules(&FeatureConfig::default())).unwrap_err();
        match err {
            HealthError::Schema { missing } => {
                assert!(missing.contains(&"OperatingExpenses".to_string()));
                assert!(missing.contains(&"COGS".to_string()));
                assert!(missing.contains(&"NetProfit".to_string()));
            }
            other => panic!("Expected schema error, got {:?}", other),
        }
    }
}
