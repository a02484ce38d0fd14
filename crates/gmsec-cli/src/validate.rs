//! # Validate Subcommand
//!
//! Validates JSON-encoded messages against the loaded specification.
//! Exit code 0 when every message passes, 2 when any is rejected.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use gmsec_core::{Config, Message};
use gmsec_spec::{Specification, SpecificationError, Violation};
use serde::Serialize;

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// JSON message files.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Also enforce the tracking-field policy, as on publish. Connection
    /// tracking keys come from the configuration options.
    #[arg(long)]
    pub publish: bool,

    /// Emit one JSON report per line instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Outcome for one file.
#[derive(Debug, Serialize)]
pub struct Report {
    /// File that was checked.
    pub file: String,
    /// Resolved schema ID, when classification succeeded.
    pub schema_id: Option<String>,
    /// True if the message was accepted.
    pub valid: bool,
    /// Field-level violations.
    pub violations: Vec<Violation>,
    /// Failure not tied to a field (classification, custom validator).
    pub error: Option<String>,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs, spec: &Specification, connection: &Config) -> Result<u8> {
    let mut rejected = 0usize;
    for path in &args.files {
        let message = read_message(path)?;
        let outcome = if args.publish {
            spec.validate_for_publish(&message, connection)
        } else {
            spec.validate_message(&message)
        };
        let report = build_report(path, spec, &message, outcome);
        if !report.valid {
            rejected += 1;
        }

        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            print_report(&report);
        }
    }

    tracing::info!(files = args.files.len(), rejected, "validation finished");
    Ok(if rejected == 0 { 0 } else { 2 })
}

fn read_message(path: &Path) -> Result<Message> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read message: {}", path.display()))?;
    Message::from_json(&text).with_context(|| format!("failed to decode message: {}", path.display()))
}

/// Fold a validation outcome into a report.
pub fn build_report(
    path: &Path,
    spec: &Specification,
    message: &Message,
    outcome: Result<(), SpecificationError>,
) -> Report {
    let mut report = Report {
        file: path.display().to_string(),
        schema_id: spec.lookup_schema_id(message).ok(),
        valid: outcome.is_ok(),
        violations: Vec::new(),
        error: None,
    };
    match outcome {
        Ok(()) => {}
        Err(SpecificationError::ValidationFailed { schema_id, violations }) => {
            report.schema_id = Some(schema_id);
            report.violations = violations.into_iter().collect();
        }
        Err(other) => report.error = Some(format!("{} ({}): {other}", other.class(), other.code())),
    }
    report
}

fn print_report(report: &Report) {
    let id = report.schema_id.as_deref().unwrap_or("unresolved");
    if report.valid {
        println!("PASS {} [{id}]", report.file);
        return;
    }
    println!("FAIL {} [{id}]", report.file);
    for v in &report.violations {
        println!("    {v}");
    }
    if let Some(error) = &report.error {
        println!("    {error}");
    }
}
