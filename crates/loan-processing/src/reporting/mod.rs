//! Report generation module.
//!
//! Bundles the audit trail of a cleaning run with the outcome-rate analyses
//! requested for it, and renders the result as JSON or plain text.
//!
//! # Example
//!
//! ```rust,ignore
//! use loan_processing::reporting::ReportGenerator;
//!
//! let cleaned = Pipeline::builder().build()?.clean(&raw)?;
//! let report = ReportGenerator::build_run_report(
//!     "data/loan.csv",
//!     Some("output/cleaned.csv"),
//!     &cleaned,
//!     &["int_slab".to_string(), "addr_state".to_string()],
//!     5,
//! )?;
//!
//! println!("{}", ReportGenerator::render_text(&report));
//! ```

mod generator;

pub use generator::{GroupAnalysis, ReportGenerator, RunReport};
