//! Namespace up/down commands

use anyhow::Result;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use crate::client::{ApiClient, Outcome, ScaleReport, UpRequest};
use crate::output::{color_outcome, print_info, print_json, print_success, print_warning, OutputFormat};

/// Row for the per-workload table
#[derive(Tabled)]
struct WorkloadRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Replicas")]
    replicas: String,
}

impl WorkloadRow {
    fn from_report(w: &crate::client::WorkloadReport) -> Self {
        let (result, replicas) = match &w.outcome {
            Outcome::Intact { replicas } => ("intact", replicas.to_string()),
            Outcome::Scaled { from, to } => ("scaled", format!("{} → {}", from, to)),
            Outcome::Failed { error } => ("failed", error.clone()),
        };
        Self {
            namespace: w.namespace.clone(),
            kind: w.kind.clone(),
            name: w.name.clone(),
            result: color_outcome(result),
            replicas,
        }
    }
}

/// Start up the namespaces matched by `patterns`
pub async fn up(
    client: &ApiClient,
    patterns: Vec<String>,
    batch_size: Option<u32>,
    batch_interval_secs: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let request = UpRequest {
        namespaces: patterns,
        batch_size,
        batch_interval_secs,
    };
    let report = client.up(&request).await?;
    print_report(&report, format)
}

/// Shut down the namespaces matched by `patterns`
pub async fn down(client: &ApiClient, patterns: Vec<String>, format: OutputFormat) -> Result<()> {
    let report = client.down(patterns).await?;
    print_report(&report, format)
}

fn print_report(report: &ScaleReport, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }

    if report.namespaces.is_empty() {
        print_warning("No namespace matched the given patterns");
        return Ok(());
    }

    println!(
        "{} {}",
        "Namespaces:".bold(),
        report.namespaces.join(", ").cyan()
    );

    if !report.workloads.is_empty() {
        let rows: Vec<WorkloadRow> = report.workloads.iter().map(WorkloadRow::from_report).collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    if report.pauses > 0 {
        print_info(&format!("Paused {} time(s) between batches", report.pauses));
    }

    let summary = format!(
        "{}: {} scaled, {} intact, {} failed",
        report.action, report.scaled, report.intact, report.failed
    );
    if report.failed > 0 {
        print_warning(&summary);
    } else {
        print_success(&summary);
    }

    Ok(())
}
