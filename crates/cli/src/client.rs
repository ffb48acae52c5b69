//! API client for communicating with the ns-scheduler daemon

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// API client for the ns-scheduler daemon
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// Batched scale-ups can take minutes, so the request timeout is generous.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(3600))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn up(&self, request: &UpRequest) -> Result<ScaleReport> {
        self.post("api/v1/up", request).await
    }

    pub async fn down(&self, namespaces: Vec<String>) -> Result<ScaleReport> {
        self.post("api/v1/down", &NamespacesRequest { namespaces })
            .await
    }

    pub async fn state(&self, namespaces: Vec<String>) -> Result<StateResponse> {
        self.post("api/v1/state", &NamespacesRequest { namespaces })
            .await
    }
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpRequest {
    pub namespaces: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespacesRequest {
    pub namespaces: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Intact { replicas: i32 },
    Scaled { from: i32, to: i32 },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadReport {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleReport {
    pub action: String,
    pub namespaces: Vec<String>,
    pub workloads: Vec<WorkloadReport>,
    pub scaled: usize,
    pub intact: usize,
    pub failed: usize,
    pub pauses: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NamespaceState {
    pub pods: i64,
    pub cpu: f64,
    pub memory: f64,
}

pub type StateResponse = BTreeMap<String, NamespaceState>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
