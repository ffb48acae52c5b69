//! Scheduler daemon configuration

use anyhow::{Context, Result};
use scheduler_lib::resolver::NamespaceGuard;
use scheduler_lib::{BatchPolicy, ClusterTarget};
use serde::Deserialize;
use std::time::Duration;

/// Daemon configuration, read from `NSSCHED_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// API server port for up/down/state, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Use the mounted service account instead of a kubeconfig
    #[serde(default)]
    pub in_cluster: bool,

    /// Kubeconfig context; the current context when unset
    #[serde(default)]
    pub kube_context: Option<String>,

    /// Workloads scaled up before each pause; 0 disables batching
    #[serde(default)]
    pub default_batch_size: u32,

    #[serde(default = "default_batch_interval")]
    pub default_batch_interval_secs: u64,

    /// Refuse to act on kube-system
    #[serde(default)]
    pub enforce_protected_namespaces: bool,
}

fn default_api_port() -> u16 {
    8080
}

fn default_batch_interval() -> u64 {
    10
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            in_cluster: false,
            kube_context: None,
            default_batch_size: 0,
            default_batch_interval_secs: default_batch_interval(),
            enforce_protected_namespaces: false,
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("NSSCHED"))
            .build()
            .context("Failed to read scheduler configuration")?;

        config
            .try_deserialize()
            .context("Invalid scheduler configuration")
    }

    pub fn cluster_target(&self) -> ClusterTarget {
        if self.in_cluster {
            ClusterTarget::InCluster
        } else {
            ClusterTarget::Kubeconfig {
                context: self.kube_context.clone(),
            }
        }
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy::new(
            self.default_batch_size,
            Duration::from_secs(self.default_batch_interval_secs),
        )
    }

    pub fn namespace_guard(&self) -> NamespaceGuard {
        if self.enforce_protected_namespaces {
            NamespaceGuard::protected()
        } else {
            NamespaceGuard::Disabled
        }
    }
}
