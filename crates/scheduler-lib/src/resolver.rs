//! Namespace pattern resolution
//!
//! Expands namespace patterns (full-match regular expressions) into the
//! namespaces that currently exist in the cluster.

use crate::cluster::ClusterClient;
use crate::error::{Result, SchedulerError};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, error};

/// Namespaces that must never be powered down
pub const PROTECTED_NAMESPACES: &[&str] = &["kube-system"];

/// Filter applied to resolved namespaces. Disabled unless configured.
#[derive(Debug, Clone, Default)]
pub enum NamespaceGuard {
    #[default]
    Disabled,
    Protected(Vec<String>),
}

impl NamespaceGuard {
    /// Guard rejecting [`PROTECTED_NAMESPACES`]
    pub fn protected() -> Self {
        NamespaceGuard::Protected(PROTECTED_NAMESPACES.iter().map(|s| s.to_string()).collect())
    }

    pub fn allows(&self, namespace: &str) -> bool {
        match self {
            NamespaceGuard::Disabled => true,
            NamespaceGuard::Protected(blocked) => !blocked.iter().any(|b| b == namespace),
        }
    }
}

/// Resolves namespace patterns against the live namespace list
#[derive(Clone)]
pub struct NamespaceResolver {
    client: Arc<dyn ClusterClient>,
    guard: NamespaceGuard,
}

impl NamespaceResolver {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self {
            client,
            guard: NamespaceGuard::Disabled,
        }
    }

    pub fn with_guard(mut self, guard: NamespaceGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Resolve `patterns` into existing namespace names.
    ///
    /// Matches are grouped by pattern, in pattern order, and keep the cluster
    /// listing order within a group. A namespace matched by several patterns
    /// is returned once per matching pattern. Any invalid pattern fails the
    /// call before the cluster is queried.
    pub async fn resolve<S: AsRef<str>>(&self, patterns: &[S]) -> Result<Vec<String>> {
        let patterns: Vec<&str> = patterns.iter().map(|p| p.as_ref()).collect();
        let compiled = patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>>>()?;

        let existing = self
            .client
            .list_namespaces()
            .await
            .map_err(SchedulerError::ListNamespaces)?;

        let mut resolved = Vec::new();
        for (pattern, regex) in patterns.iter().zip(&compiled) {
            let before = resolved.len();
            for namespace in existing.iter().filter(|ns| regex.is_match(ns)) {
                if self.guard.allows(namespace) {
                    resolved.push(namespace.clone());
                } else {
                    error!(
                        namespace = %namespace,
                        pattern = %pattern,
                        "Namespace is protected and not allowed for up/down"
                    );
                }
            }
            if resolved.len() == before {
                debug!(pattern = %pattern, "Namespace pattern does not match any namespace");
            }
        }

        Ok(resolved)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| SchedulerError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::FakeCluster;

    fn resolver(namespaces: &[&str]) -> NamespaceResolver {
        NamespaceResolver::new(Arc::new(FakeCluster::with_namespaces(namespaces.iter().copied())))
    }

    #[tokio::test]
    async fn test_overlapping_patterns_duplicate_namespaces() {
        let resolver = resolver(&["team-a-dev", "team-a-prod", "team-b"]);

        let resolved = resolver.resolve(&["team-a-.*", "team-a-prod"]).await.unwrap();

        assert_eq!(resolved, vec!["team-a-dev", "team-a-prod", "team-a-prod"]);
    }

    #[tokio::test]
    async fn test_patterns_match_full_name_only() {
        let resolver = resolver(&["team-a", "team-a-dev", "xteam-a"]);

        assert_eq!(resolver.resolve(&["team-a"]).await.unwrap(), vec!["team-a"]);
        assert_eq!(
            resolver.resolve(&["team-a|xteam-a"]).await.unwrap(),
            vec!["team-a", "xteam-a"]
        );
    }

    #[tokio::test]
    async fn test_results_follow_pattern_then_listing_order() {
        let resolver = resolver(&["b-1", "a-1", "b-2", "a-2"]);

        let resolved = resolver.resolve(&["a-.*", "b-.*"]).await.unwrap();

        assert_eq!(resolved, vec!["a-1", "a-2", "b-1", "b-2"]);
    }

    #[tokio::test]
    async fn test_unmatched_pattern_yields_nothing() {
        let resolver = resolver(&["default"]);
        assert!(resolver.resolve(&["missing-.*"]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_pattern_fails_before_listing() {
        let cluster = FakeCluster::with_namespaces(["default"]);
        cluster.fail_namespace_listing();
        let resolver = NamespaceResolver::new(Arc::new(cluster));

        let err = resolver.resolve(&["default", "team-(a"]).await.unwrap_err();

        assert!(matches!(err, SchedulerError::InvalidPattern { ref pattern, .. } if pattern == "team-(a"));
    }

    #[tokio::test]
    async fn test_listing_failure_is_reported() {
        let cluster = FakeCluster::with_namespaces(["default"]);
        cluster.fail_namespace_listing();
        let resolver = NamespaceResolver::new(Arc::new(cluster));

        let err = resolver.resolve(&["default"]).await.unwrap_err();
        assert!(matches!(err, SchedulerError::ListNamespaces(_)));
    }

    #[tokio::test]
    async fn test_protected_namespaces_are_not_filtered_by_default() {
        let resolver = resolver(&["kube-system", "default"]);
        assert_eq!(
            resolver.resolve(&[".*"]).await.unwrap(),
            vec!["kube-system", "default"]
        );
    }

    #[tokio::test]
    async fn test_protected_guard_drops_kube_system() {
        let resolver = resolver(&["kube-system", "default"]).with_guard(NamespaceGuard::protected());
        assert_eq!(resolver.resolve(&[".*"]).await.unwrap(), vec!["default"]);
    }
}
