//! Configuration types for the cleaning pipeline.
//!
//! The defaults reproduce the reference cleaning of the Lending Club loan
//! export. Every list the pipeline acts on (columns to drop, columns to
//! impute, features to bucket) is data here rather than code, so the same
//! stages can be pointed at a differently shaped export.

use crate::schema::columns;
use serde::{Deserialize, Serialize};

/// Columns of the reference export whose missing ratio is at or above 50%.
pub const DEFAULT_HIGH_MISSING_COLUMNS: [&str; 3] =
    ["mths_since_last_delinq", "mths_since_last_record", "next_pymnt_d"];

/// Default missing ratio for [`HighMissingPolicy::Threshold`].
pub const DEFAULT_HIGH_MISSING_THRESHOLD: f64 = 0.5;

/// Identifiers, free text, post-origination payment fields, constants and
/// outcome-leaking columns. None of them carries signal about default risk
/// at application time.
pub const DEFAULT_NON_ANALYTICAL_COLUMNS: [&str; 31] = [
    "member_id",
    "id",
    "funded_amnt_inv",
    "pymnt_plan",
    "url",
    "desc",
    "title",
    "zip_code",
    "earliest_cr_line",
    "revol_bal",
    "initial_list_status",
    "out_prncp",
    "out_prncp_inv",
    "total_pymnt",
    "total_pymnt_inv",
    "total_rec_prncp",
    "total_rec_int",
    "total_rec_late_fee",
    "recoveries",
    "collection_recovery_fee",
    "last_pymnt_d",
    "last_pymnt_amnt",
    "last_credit_pull_d",
    "collections_12_mths_ex_med",
    "policy_code",
    "application_type",
    "acc_now_delinq",
    "chargeoff_within_12_mths",
    "delinq_amnt",
    "tax_liens",
    "total_acc",
];

/// How the high-missing column set is determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HighMissingPolicy {
    /// Drop exactly these columns.
    Fixed(Vec<String>),
    /// Drop every column whose missing ratio is at or above this value,
    /// measured on the frame that reaches the stage.
    Threshold(f64),
}

impl Default for HighMissingPolicy {
    fn default() -> Self {
        Self::Fixed(to_strings(&DEFAULT_HIGH_MISSING_COLUMNS))
    }
}

/// What to do when two quantile edges of a slab feature are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SlabEdgePolicy {
    /// Fail with [`crate::CleaningError::SlabEdgeCollision`].
    #[default]
    Reject,
    /// Keep the repeated edges; the collapsed bin is absorbed by the bin
    /// below it and its label stays without rows.
    Merge,
}

/// Statistic used to fill missing numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NumericImputation {
    /// Use the mean of non-null values
    Mean,
    /// Use the median of non-null values
    #[default]
    Median,
    /// Use the most frequent value; ties resolve to the smallest value
    Mode,
}

impl NumericImputation {
    /// Lowercase name used in logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Mode => "mode",
        }
    }
}

/// A column and the statistic used to fill its missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationRule {
    pub column: String,
    pub strategy: NumericImputation,
}

impl ImputationRule {
    pub fn new(column: impl Into<String>, strategy: NumericImputation) -> Self {
        Self {
            column: column.into(),
            strategy,
        }
    }
}

/// A numeric source column and the name of the slab column derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlabFeature {
    pub source: String,
    pub target: String,
}

impl SlabFeature {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Configuration for the cleaning pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use loan_processing::config::{HighMissingPolicy, PipelineConfig, SlabEdgePolicy};
///
/// let config = PipelineConfig::builder()
///     .high_missing_policy(HighMissingPolicy::Threshold(0.5))
///     .slab_edge_policy(SlabEdgePolicy::Merge)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Column holding the loan outcome.
    /// Default: "loan_status"
    pub outcome_column: String,

    /// Outcome label of loans that are still running. Rows carrying it are removed.
    /// Default: "Current"
    pub unresolved_status: String,

    /// How columns with too many missing values are chosen.
    /// Default: the fixed list [`DEFAULT_HIGH_MISSING_COLUMNS`]
    pub high_missing_policy: HighMissingPolicy,

    /// Columns removed because they carry no analytical signal.
    /// Default: [`DEFAULT_NON_ANALYTICAL_COLUMNS`]
    pub non_analytical_columns: Vec<String>,

    /// Whether a name in a drop list that is absent from the frame is an error.
    /// Default: false (absent names are skipped and reported)
    pub strict_column_drops: bool,

    /// Columns stored as percentage strings such as "13.5%".
    /// Default: ["int_rate", "revol_util"]
    pub percentage_columns: Vec<String>,

    /// Columns imputed after percentage normalization, in order.
    /// Default: revol_util by median, pub_rec_bankruptcies by mode
    pub imputations: Vec<ImputationRule>,

    /// Column holding textual employment length ("10+ years").
    /// Default: "emp_length"
    pub employment_length_column: String,

    /// Statistic used to fill employment length after parsing.
    /// Default: Mode
    pub employment_length_imputation: NumericImputation,

    /// Column holding the issue date as "<Month>-<Year>".
    /// Default: "issue_d"
    pub issue_date_column: String,

    /// Name of the derived issue month column.
    /// Default: "issue_month"
    pub issue_month_column: String,

    /// Numeric features bucketed into five equal-frequency slabs.
    /// Default: int_rate, loan_amnt, dti, annual_inc, open_acc
    pub slab_features: Vec<SlabFeature>,

    /// Handling of colliding quantile edges, shared by every slab feature.
    /// Default: Reject
    pub slab_edge_policy: SlabEdgePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            outcome_column: columns::LOAN_STATUS.to_string(),
            unresolved_status: "Current".to_string(),
            high_missing_policy: HighMissingPolicy::default(),
            non_analytical_columns: to_strings(&DEFAULT_NON_ANALYTICAL_COLUMNS),
            strict_column_drops: false,
            percentage_columns: default_percentage_columns(),
            imputations: default_imputations(),
            employment_length_column: columns::EMP_LENGTH.to_string(),
            employment_length_imputation: NumericImputation::Mode,
            issue_date_column: columns::ISSUE_D.to_string(),
            issue_month_column: columns::ISSUE_MONTH.to_string(),
            slab_features: default_slab_features(),
            slab_edge_policy: SlabEdgePolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Columns that must be present in the raw frame before any stage runs.
    ///
    /// Drop lists are not included: they name columns to get rid of.
    pub fn required_columns(&self) -> Vec<String> {
        let mut required = vec![self.outcome_column.clone()];
        required.extend(self.percentage_columns.iter().cloned());
        required.extend(self.imputations.iter().map(|rule| rule.column.clone()));
        required.push(self.employment_length_column.clone());
        required.push(self.issue_date_column.clone());
        required.extend(self.slab_features.iter().map(|f| f.source.clone()));

        let mut seen = std::collections::HashSet::new();
        required.retain(|name| seen.insert(name.clone()));
        required
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if let HighMissingPolicy::Threshold(ratio) = self.high_missing_policy
            && !(0.0..=1.0).contains(&ratio)
        {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "high_missing_policy".to_string(),
                value: ratio,
            });
        }

        let named = [
            ("outcome_column", &self.outcome_column),
            ("unresolved_status", &self.unresolved_status),
            ("employment_length_column", &self.employment_length_column),
            ("issue_date_column", &self.issue_date_column),
            ("issue_month_column", &self.issue_month_column),
        ];
        for (field, value) in named {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyName(field.to_string()));
            }
        }

        let mut imputed = std::collections::HashSet::new();
        for rule in &self.imputations {
            if rule.column.trim().is_empty() {
                return Err(ConfigValidationError::EmptyName("imputations".to_string()));
            }
            if !imputed.insert(rule.column.as_str()) {
                return Err(ConfigValidationError::DuplicateImputation(
                    rule.column.clone(),
                ));
            }
        }

        let mut targets = std::collections::HashSet::new();
        for feature in &self.slab_features {
            if feature.source.trim().is_empty() || feature.target.trim().is_empty() {
                return Err(ConfigValidationError::EmptyName("slab_features".to_string()));
            }
            if !targets.insert(feature.target.as_str()) {
                return Err(ConfigValidationError::DuplicateSlabColumn(
                    feature.target.clone(),
                ));
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Configuration field '{0}' must not be empty")]
    EmptyName(String),

    #[error("Column '{0}' has more than one imputation rule")]
    DuplicateImputation(String),

    #[error("Slab column '{0}' is derived more than once")]
    DuplicateSlabColumn(String),
}

impl From<ConfigValidationError> for crate::error::CleaningError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::CleaningError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    outcome_column: Option<String>,
    unresolved_status: Option<String>,
    high_missing_policy: Option<HighMissingPolicy>,
    non_analytical_columns: Option<Vec<String>>,
    strict_column_drops: Option<bool>,
    percentage_columns: Option<Vec<String>>,
    imputations: Option<Vec<ImputationRule>>,
    employment_length_column: Option<String>,
    employment_length_imputation: Option<NumericImputation>,
    issue_date_column: Option<String>,
    issue_month_column: Option<String>,
    slab_features: Option<Vec<SlabFeature>>,
    slab_edge_policy: Option<SlabEdgePolicy>,
}

impl PipelineConfigBuilder {
    /// Set the outcome column.
    pub fn outcome_column(mut self, column: impl Into<String>) -> Self {
        self.outcome_column = Some(column.into());
        self
    }

    /// Set the outcome label of loans that have not finished yet.
    pub fn unresolved_status(mut self, status: impl Into<String>) -> Self {
        self.unresolved_status = Some(status.into());
        self
    }

    /// Set how high-missing columns are chosen.
    pub fn high_missing_policy(mut self, policy: HighMissingPolicy) -> Self {
        self.high_missing_policy = Some(policy);
        self
    }

    /// Replace the list of non-analytical columns.
    pub fn non_analytical_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_analytical_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Treat absent drop-list names as schema errors.
    pub fn strict_column_drops(mut self, strict: bool) -> Self {
        self.strict_column_drops = Some(strict);
        self
    }

    /// Replace the list of percentage columns.
    pub fn percentage_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.percentage_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the imputation rules.
    pub fn imputations(mut self, rules: Vec<ImputationRule>) -> Self {
        self.imputations = Some(rules);
        self
    }

    /// Set the employment length column.
    pub fn employment_length_column(mut self, column: impl Into<String>) -> Self {
        self.employment_length_column = Some(column.into());
        self
    }

    /// Set the statistic used to fill employment length.
    pub fn employment_length_imputation(mut self, strategy: NumericImputation) -> Self {
        self.employment_length_imputation = Some(strategy);
        self
    }

    /// Set the issue date column.
    pub fn issue_date_column(mut self, column: impl Into<String>) -> Self {
        self.issue_date_column = Some(column.into());
        self
    }

    /// Set the name of the derived issue month column.
    pub fn issue_month_column(mut self, column: impl Into<String>) -> Self {
        self.issue_month_column = Some(column.into());
        self
    }

    /// Replace the slab features.
    pub fn slab_features(mut self, features: Vec<SlabFeature>) -> Self {
        self.slab_features = Some(features);
        self
    }

    /// Set the policy for colliding quantile edges.
    pub fn slab_edge_policy(mut self, policy: SlabEdgePolicy) -> Self {
        self.slab_edge_policy = Some(policy);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            outcome_column: self.outcome_column.unwrap_or(defaults.outcome_column),
            unresolved_status: self.unresolved_status.unwrap_or(defaults.unresolved_status),
            high_missing_policy: self
                .high_missing_policy
                .unwrap_or(defaults.high_missing_policy),
            non_analytical_columns: self
                .non_analytical_columns
                .unwrap_or(defaults.non_analytical_columns),
            strict_column_drops: self
                .strict_column_drops
                .unwrap_or(defaults.strict_column_drops),
            percentage_columns: self
                .percentage_columns
                .unwrap_or(defaults.percentage_columns),
            imputations: self.imputations.unwrap_or(defaults.imputations),
            employment_length_column: self
                .employment_length_column
                .unwrap_or(defaults.employment_length_column),
            employment_length_imputation: self
                .employment_length_imputation
                .unwrap_or(defaults.employment_length_imputation),
            issue_date_column: self.issue_date_column.unwrap_or(defaults.issue_date_column),
            issue_month_column: self
                .issue_month_column
                .unwrap_or(defaults.issue_month_column),
            slab_features: self.slab_features.unwrap_or(defaults.slab_features),
            slab_edge_policy: self.slab_edge_policy.unwrap_or(defaults.slab_edge_policy),
        };

        config.validate()?;
        Ok(config)
    }
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn default_percentage_columns() -> Vec<String> {
    to_strings(&[columns::INT_RATE, columns::REVOL_UTIL])
}

fn default_imputations() -> Vec<ImputationRule> {
    vec![
        ImputationRule::new(columns::REVOL_UTIL, NumericImputation::Median),
        ImputationRule::new(columns::PUB_REC_BANKRUPTCIES, NumericImputation::Mode),
    ]
}

fn default_slab_features() -> Vec<SlabFeature> {
    vec![
        SlabFeature::new(columns::INT_RATE, "int_slab"),
        SlabFeature::new(columns::LOAN_AMNT, "loan_amnt_slab"),
        SlabFeature::new(columns::DTI, "dti_slab"),
        SlabFeature::new(columns::ANNUAL_INC, "annual_inc_slab"),
        SlabFeature::new(columns::OPEN_ACC, "open_acc_slab"),
    ]
}
