//! Namespace state command

use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

use crate::client::ApiClient;
use crate::output::{format_bytes, format_cpu, print_json, print_warning, OutputFormat};

#[derive(Tabled)]
struct StateRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Pods")]
    pods: i64,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
}

/// Show requested resources of the namespaces matched by `patterns`
pub async fn show_state(client: &ApiClient, patterns: Vec<String>, format: OutputFormat) -> Result<()> {
    let state = client.state(patterns).await?;

    if format == OutputFormat::Json {
        return print_json(&state);
    }

    if state.is_empty() {
        print_warning("No namespace matched the given patterns");
        return Ok(());
    }

    let rows: Vec<StateRow> = state
        .iter()
        .map(|(namespace, s)| StateRow {
            namespace: namespace.clone(),
            pods: s.pods,
            cpu: format_cpu(s.cpu),
            memory: format_bytes(s.memory),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));

    Ok(())
}
