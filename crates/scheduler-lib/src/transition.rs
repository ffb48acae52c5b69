//! Per-workload scale transitions
//!
//! A workload is RUNNING while its desired replica count is above zero and
//! STOPPED at zero. DOWN moves it to STOPPED and records the count it had in
//! the restore annotation; UP moves a STOPPED workload back to the recorded
//! count. Both directions are idempotent.

use crate::annotation::SavedReplicas;
use crate::cluster::ClusterClient;
use crate::models::{ScaleAction, TransitionOutcome, Workload, WorkloadPatch};
use crate::observability::SchedulerMetrics;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Replica decision and the patch that realizes it
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    pub current: i32,
    pub desired: i32,
    pub patch: WorkloadPatch,
}

/// Decide the target replica count and patch for `workload`.
///
/// The restore annotation is only written when leaving a non-zero count, so
/// a repeated DOWN never replaces a stored value with "0". Any non-empty
/// patch therefore changes the replica count.
pub fn plan(action: ScaleAction, workload: &Workload) -> TransitionPlan {
    let current = workload.replicas;

    let desired = match action {
        ScaleAction::Down => 0,
        ScaleAction::Up if current == 0 => {
            let saved = SavedReplicas::read(&workload.annotations);
            if let SavedReplicas::Malformed(raw) = &saved {
                warn!(
                    kind = %workload.kind,
                    workload = %workload.qualified_name(),
                    value = %raw,
                    "Malformed saved replica count, restoring default"
                );
            }
            saved.restore_target()
        }
        ScaleAction::Up => current,
    };

    let annotations = (action == ScaleAction::Down && current > 0).then(|| SavedReplicas::stamp(current));
    let replicas = (desired != current).then_some(desired);

    TransitionPlan {
        current,
        desired,
        patch: WorkloadPatch {
            annotations,
            replicas,
        },
    }
}

/// Applies transition plans through the cluster client
#[derive(Clone)]
pub struct TransitionEngine {
    client: Arc<dyn ClusterClient>,
    metrics: SchedulerMetrics,
}

impl TransitionEngine {
    pub fn new(client: Arc<dyn ClusterClient>, metrics: SchedulerMetrics) -> Self {
        Self { client, metrics }
    }

    /// Plan and apply a transition. Patch failures are logged and reported
    /// in the outcome, never returned as errors.
    pub async fn transition(&self, action: ScaleAction, workload: &Workload) -> TransitionOutcome {
        let plan = plan(action, workload);
        let outcome = self.apply(workload, plan).await;
        self.metrics
            .record_transition(action.as_str(), workload.kind, &outcome);
        outcome
    }

    async fn apply(&self, workload: &Workload, plan: TransitionPlan) -> TransitionOutcome {
        if plan.patch.is_empty() {
            info!(
                kind = %workload.kind,
                workload = %workload.qualified_name(),
                replicas = plan.current,
                "{} '{}' was left intact ({} replicas)",
                workload.kind,
                workload.qualified_name(),
                plan.current
            );
            return TransitionOutcome::Intact {
                replicas: plan.current,
            };
        }

        let result = self
            .client
            .patch_workload(workload.kind, &workload.name, &workload.namespace, &plan.patch)
            .await;

        match result {
            Ok(()) => {
                info!(
                    kind = %workload.kind,
                    workload = %workload.qualified_name(),
                    from = plan.current,
                    to = plan.desired,
                    "{} '{}' was scaled to {} replicas",
                    workload.kind,
                    workload.qualified_name(),
                    plan.desired
                );
                TransitionOutcome::Scaled {
                    from: plan.current,
                    to: plan.desired,
                }
            }
            Err(e) => {
                error!(
                    kind = %workload.kind,
                    workload = %workload.qualified_name(),
                    error = %e,
                    "Failed to update {} '{}'",
                    workload.kind,
                    workload.qualified_name()
                );
                TransitionOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::REPLICAS_ANNOTATION;
    use crate::cluster::FakeCluster;
    use crate::models::WorkloadKind;

    fn deployment(replicas: i32) -> Workload {
        Workload::new(WorkloadKind::Deployment, "team-a", "web", replicas)
    }

    fn saved(workload: &Workload) -> Option<&str> {
        workload.annotations.get(REPLICAS_ANNOTATION).map(String::as_str)
    }

    #[test]
    fn test_down_from_running_stamps_current_count() {
        let plan = plan(ScaleAction::Down, &deployment(3));

        assert_eq!(plan.desired, 0);
        assert_eq!(plan.patch.replicas, Some(0));
        assert_eq!(plan.patch.annotations, Some(SavedReplicas::stamp(3)));
    }

    #[test]
    fn test_every_non_empty_plan_changes_replicas() {
        let workloads = [
            deployment(0),
            deployment(3),
            deployment(0).with_annotation(REPLICAS_ANNOTATION, "4"),
            deployment(2).with_annotation(REPLICAS_ANNOTATION, "2"),
            deployment(0).with_annotation(REPLICAS_ANNOTATION, "bogus"),
        ];

        for workload in &workloads {
            for action in [ScaleAction::Up, ScaleAction::Down] {
                let plan = plan(action, workload);
                if !plan.patch.is_empty() {
                    assert_ne!(plan.desired, plan.current, "{action} on {:?}", workload);
                    assert_eq!(plan.patch.replicas, Some(plan.desired));
                }
            }
        }
    }

    #[test]
    fn test_down_from_running_overwrites_stale_annotation() {
        let workload = deployment(4).with_annotation(REPLICAS_ANNOTATION, "2");
        let plan = plan(ScaleAction::Down, &workload);

        assert_eq!(plan.patch.annotations, Some(SavedReplicas::stamp(4)));
    }

    #[test]
    fn test_down_when_stopped_never_stamps_zero() {
        let with_value = deployment(0).with_annotation(REPLICAS_ANNOTATION, "3");
        assert!(plan(ScaleAction::Down, &with_value).patch.is_empty());

        let without_value = deployment(0);
        assert!(plan(ScaleAction::Down, &without_value).patch.is_empty());
    }

    #[test]
    fn test_up_restores_saved_count() {
        let workload = deployment(0).with_annotation(REPLICAS_ANNOTATION, "5");
        let plan = plan(ScaleAction::Up, &workload);

        assert_eq!(plan.desired, 5);
        assert_eq!(plan.patch.replicas, Some(5));
        assert_eq!(plan.patch.annotations, None);
    }

    #[test]
    fn test_up_defaults_to_one_replica() {
        assert_eq!(plan(ScaleAction::Up, &deployment(0)).desired, 1);

        let malformed = deployment(0).with_annotation(REPLICAS_ANNOTATION, "three");
        assert_eq!(plan(ScaleAction::Up, &malformed).desired, 1);

        let zero = deployment(0).with_annotation(REPLICAS_ANNOTATION, "0");
        assert_eq!(plan(ScaleAction::Up, &zero).desired, 1);
    }

    #[test]
    fn test_up_when_running_is_noop() {
        let workload = deployment(2).with_annotation(REPLICAS_ANNOTATION, "7");
        let plan = plan(ScaleAction::Up, &workload);

        assert_eq!(plan.desired, 2);
        assert!(plan.patch.is_empty());
    }

    #[tokio::test]
    async fn test_down_then_up_restores_replicas() {
        let cluster = Arc::new(FakeCluster::with_namespaces(["team-a"]));
        cluster.add_workload(deployment(3));
        let engine = TransitionEngine::new(cluster.clone(), SchedulerMetrics::new());

        let current = cluster.workload(WorkloadKind::Deployment, "team-a", "web").unwrap();
        assert_eq!(
            engine.transition(ScaleAction::Down, &current).await,
            TransitionOutcome::Scaled { from: 3, to: 0 }
        );

        let stopped = cluster.workload(WorkloadKind::Deployment, "team-a", "web").unwrap();
        assert_eq!(stopped.replicas, 0);
        assert_eq!(saved(&stopped), Some("3"));

        assert_eq!(
            engine.transition(ScaleAction::Up, &stopped).await,
            TransitionOutcome::Scaled { from: 0, to: 3 }
        );
        let restored = cluster.workload(WorkloadKind::Deployment, "team-a", "web").unwrap();
        assert_eq!(restored.replicas, 3);
    }

    #[tokio::test]
    async fn test_repeated_down_keeps_saved_value() {
        let cluster = Arc::new(FakeCluster::with_namespaces(["team-a"]));
        cluster.add_workload(deployment(4));
        let engine = TransitionEngine::new(cluster.clone(), SchedulerMetrics::new());

        for _ in 0..3 {
            let current = cluster.workload(WorkloadKind::Deployment, "team-a", "web").unwrap();
            engine.transition(ScaleAction::Down, &current).await;
        }

        let stopped = cluster.workload(WorkloadKind::Deployment, "team-a", "web").unwrap();
        assert_eq!(saved(&stopped), Some("4"));
        assert_eq!(cluster.patches().len(), 1);
    }

    #[tokio::test]
    async fn test_up_on_running_workload_makes_no_call() {
        let cluster = Arc::new(FakeCluster::with_namespaces(["team-a"]));
        cluster.add_workload(deployment(2));
        let engine = TransitionEngine::new(cluster.clone(), SchedulerMetrics::new());

        let outcome = engine.transition(ScaleAction::Up, &deployment(2)).await;

        assert_eq!(outcome, TransitionOutcome::Intact { replicas: 2 });
        assert!(cluster.patches().is_empty());
    }

    #[tokio::test]
    async fn test_patch_failure_is_reported_not_raised() {
        let cluster = Arc::new(FakeCluster::with_namespaces(["team-a"]));
        cluster.add_workload(deployment(2));
        cluster.reject_patches_for("web");
        let engine = TransitionEngine::new(cluster.clone(), SchedulerMetrics::new());

        let outcome = engine.transition(ScaleAction::Down, &deployment(2)).await;

        assert!(matches!(outcome, TransitionOutcome::Failed { ref error } if error.contains("forbidden")));
    }
}
