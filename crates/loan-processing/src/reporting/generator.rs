use crate::aggregate::{GroupOutcome, group_outcome_rate, highest_default_groups};
use crate::error::Result;
use crate::pipeline::CleanedDataset;
use crate::types::CleaningReport;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::info;

// ============================================================================
// Run Report Types
// ============================================================================

/// Everything the CLI reports about one run.
///
/// Use this for both JSON output (`--json`) and the text summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input file
    pub input_file: String,
    /// Path to the output file (if written)
    pub output_file: Option<String>,
    /// Audit trail of the cleaning run
    pub cleaning: CleaningReport,
    /// Outcome rates per requested grouping column
    pub group_analyses: Vec<GroupAnalysis>,
}

/// Outcome rates of one grouping column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupAnalysis {
    pub column: String,
    pub groups: Vec<GroupOutcome>,
    /// Groups with the highest charged-off share, riskiest first.
    pub highest_default: Vec<GroupOutcome>,
}

/// Builds, renders and writes [`RunReport`]s.
pub struct ReportGenerator;

impl ReportGenerator {
    /// Build the report of a finished run.
    ///
    /// `group_by` names the columns of the cleaned frame to break the outcome
    /// down by; `top` bounds the riskiest-groups list of each.
    pub fn build_run_report(
        input_file: &str,
        output_file: Option<&str>,
        cleaned: &CleanedDataset,
        group_by: &[String],
        top: usize,
    ) -> Result<RunReport> {
        let group_analyses = group_by
            .iter()
            .map(|column| {
                let groups = group_outcome_rate(&cleaned.frame, column)?;
                let highest_default = highest_default_groups(&groups, top);
                Ok(GroupAnalysis {
                    column: column.clone(),
                    groups,
                    highest_default,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RunReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            output_file: output_file.map(str::to_string),
            cleaning: cleaned.report.clone(),
            group_analyses,
        })
    }

    /// Human-readable summary of a run.
    pub fn render_text(report: &RunReport) -> String {
        let cleaning = &report.cleaning;
        let mut out = String::new();

        let _ = writeln!(out, "Loan cleaning report ({})", report.generated_at);
        let _ = writeln!(out, "Input:  {}", report.input_file);
        if let Some(output) = &report.output_file {
            let _ = writeln!(out, "Output: {}", output);
        }
        let _ = writeln!(
            out,
            "Rows:    {} -> {} ({:.1}% removed)",
            cleaning.rows_before,
            cleaning.rows_after,
            cleaning.rows_removed_percentage()
        );
        let _ = writeln!(
            out,
            "Columns: {} -> {}",
            cleaning.columns_before, cleaning.columns_after
        );
        let _ = writeln!(out, "Duration: {}ms", cleaning.duration_ms);

        let missing: Vec<_> = cleaning
            .missing_before
            .columns
            .iter()
            .filter(|c| c.missing > 0)
            .take(5)
            .collect();
        if !missing.is_empty() {
            let _ = writeln!(out, "\nMost incomplete input columns:");
            for column in missing {
                let _ = writeln!(out, "  {:<28} {:>6.1}%", column.name, column.ratio * 100.0);
            }
        }

        let _ = writeln!(out, "\nStages:");
        for stage in &cleaning.stages {
            let _ = writeln!(
                out,
                "  {:<32} rows {:>7} -> {:<7} columns {:>3} -> {}",
                stage.stage.display_name(),
                stage.rows_before,
                stage.rows_after,
                stage.columns_before,
                stage.columns_after
            );
            for action in &stage.actions {
                let _ = writeln!(out, "    - {}: {}", action.target, action.description);
            }
        }

        if !cleaning.warnings.is_empty() {
            let _ = writeln!(out, "\nWarnings:");
            for warning in &cleaning.warnings {
                let _ = writeln!(out, "  ! {}", warning);
            }
        }

        for analysis in &report.group_analyses {
            let _ = writeln!(out, "\nOutcome by {}:", analysis.column);
            let _ = writeln!(
                out,
                "  {:<16} {:>7} {:>11} {:>12}",
                "group", "loans", "fully paid", "charged off"
            );
            for group in &analysis.groups {
                let _ = writeln!(
                    out,
                    "  {:<16} {:>7} {:>10.1}% {:>11.1}%",
                    group.key,
                    group.count,
                    group.fully_paid * 100.0,
                    group.charged_off * 100.0
                );
            }
            let riskiest: Vec<&str> = analysis
                .highest_default
                .iter()
                .map(|g| g.key.as_str())
                .collect();
            let _ = writeln!(out, "  Highest default rate: {}", riskiest.join(", "));
        }

        out
    }

    /// Write the report as pretty JSON to `path`, creating parent directories.
    pub fn write_report_to_file(report: &RunReport, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", path.display());
        Ok(())
    }
}
