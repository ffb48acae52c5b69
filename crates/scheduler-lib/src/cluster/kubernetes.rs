//! kube-rs backed cluster client

use super::ClusterClient;
use crate::error::ClusterError;
use crate::models::{ContainerRequests, Workload, WorkloadKind, WorkloadPatch};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Namespace, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{ListParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use tracing::{debug, info};

/// Where cluster credentials come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterTarget {
    /// Service account mounted into the pod
    InCluster,
    /// Local kubeconfig, optionally pinned to a named context
    Kubeconfig { context: Option<String> },
}

/// [`ClusterClient`] talking to a Kubernetes API server
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from in-cluster or kubeconfig credentials
    pub async fn connect(target: &ClusterTarget) -> Result<Self, ClusterError> {
        let config = match target {
            ClusterTarget::InCluster => {
                info!("Loading in-cluster configuration");
                Config::incluster()?
            }
            ClusterTarget::Kubeconfig { context } => {
                info!(context = ?context, "Loading kubeconfig");
                let options = KubeConfigOptions {
                    context: context.clone(),
                    ..Default::default()
                };
                Config::from_custom_kubeconfig(Kubeconfig::read()?, &options).await?
            }
        };

        Ok(Self::new(Client::try_from(config)?))
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespaces = api.list(&ListParams::default()).await?;

        Ok(namespaces
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    async fn list_workloads(
        &self,
        kind: WorkloadKind,
        namespace: &str,
    ) -> Result<Vec<Workload>, ClusterError> {
        let params = ListParams::default();
        let workloads: Vec<Workload> = match kind {
            WorkloadKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                api.list(&params)
                    .await?
                    .items
                    .into_iter()
                    .map(|d| {
                        let spec = d.spec.unwrap_or_default();
                        to_workload(
                            kind,
                            namespace,
                            d.metadata,
                            spec.replicas,
                            spec.template.spec.as_ref(),
                        )
                    })
                    .collect()
            }
            WorkloadKind::StatefulSet => {
                let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
                api.list(&params)
                    .await?
                    .items
                    .into_iter()
                    .map(|s| {
                        let spec = s.spec.unwrap_or_default();
                        to_workload(
                            kind,
                            namespace,
                            s.metadata,
                            spec.replicas,
                            spec.template.spec.as_ref(),
                        )
                    })
                    .collect()
            }
        };

        Ok(workloads)
    }

    async fn patch_workload(
        &self,
        kind: WorkloadKind,
        name: &str,
        namespace: &str,
        patch: &WorkloadPatch,
    ) -> Result<(), ClusterError> {
        let body = patch.to_merge_patch();
        let params = PatchParams::default();
        debug!(kind = %kind, namespace = %namespace, name = %name, patch = %body, "Patching workload");

        match kind {
            WorkloadKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                api.patch(name, &params, &Patch::Merge(&body)).await?;
            }
            WorkloadKind::StatefulSet => {
                let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
                api.patch(name, &params, &Patch::Merge(&body)).await?;
            }
        }

        Ok(())
    }
}

/// Flatten a Deployment or StatefulSet into the scheduler's view of it.
/// An unset `spec.replicas` reads as 1, the API server default.
fn to_workload(
    kind: WorkloadKind,
    namespace: &str,
    metadata: ObjectMeta,
    replicas: Option<i32>,
    pod_spec: Option<&PodSpec>,
) -> Workload {
    let containers = pod_spec
        .map(|spec| {
            spec.containers
                .iter()
                .map(|c| {
                    let requests = c.resources.as_ref().and_then(|r| r.requests.as_ref());
                    ContainerRequests {
                        cpu: requests.and_then(|r| r.get("cpu")).map(|q| q.0.clone()),
                        memory: requests.and_then(|r| r.get("memory")).map(|q| q.0.clone()),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    Workload {
        kind,
        namespace: metadata.namespace.unwrap_or_else(|| namespace.to_string()),
        name: metadata.name.unwrap_or_default(),
        replicas: replicas.unwrap_or(1),
        annotations: metadata.annotations.unwrap_or_default(),
        containers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::DeploymentSpec;
    use k8s_openapi::api::core::v1::{Container, PodTemplateSpec, ResourceRequirements};
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use std::collections::BTreeMap;

    fn deployment(replicas: Option<i32>) -> Deployment {
        let mut requests = BTreeMap::new();
        requests.insert("cpu".to_string(), Quantity("500m".to_string()));
        requests.insert("memory".to_string(), Quantity("256Mi".to_string()));

        let mut annotations = BTreeMap::new();
        annotations.insert("ns.scheduler/replicas".to_string(), "3".to_string());

        Deployment {
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                namespace: Some("team-a".to_string()),
                annotations: Some(annotations),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas,
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![
                            Container {
                                name: "app".to_string(),
                                resources: Some(ResourceRequirements {
                                    requests: Some(requests),
                                    ..Default::default()
                                }),
                                ..Default::default()
                            },
                            Container {
                                name: "sidecar".to_string(),
                                ..Default::default()
                            },
                        ],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_to_workload_reads_requests_and_annotations() {
        let d = deployment(Some(3));
        let spec = d.spec.clone().unwrap();
        let workload = to_workload(
            WorkloadKind::Deployment,
            "team-a",
            d.metadata,
            spec.replicas,
            spec.template.spec.as_ref(),
        );

        assert_eq!(workload.name, "web");
        assert_eq!(workload.namespace, "team-a");
        assert_eq!(workload.replicas, 3);
        assert_eq!(
            workload.annotations.get("ns.scheduler/replicas").map(String::as_str),
            Some("3")
        );
        assert_eq!(workload.containers.len(), 2);
        assert_eq!(workload.containers[0].cpu.as_deref(), Some("500m"));
        assert_eq!(workload.containers[0].memory.as_deref(), Some("256Mi"));
        assert_eq!(workload.containers[1], ContainerRequests::default());
    }

    #[test]
    fn test_to_workload_defaults_unset_replicas() {
        let d = deployment(None);
        let workload = to_workload(WorkloadKind::Deployment, "team-a", d.metadata, None, None);

        assert_eq!(workload.replicas, 1);
        assert!(workload.containers.is_empty());
    }
}
