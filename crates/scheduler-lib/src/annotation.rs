//! Typed access to the replica-restore annotation
//!
//! The replica count a workload had before being scaled down is stored on the
//! workload itself, as the decimal string annotation [`REPLICAS_ANNOTATION`].
//! All reads and writes of that annotation go through [`SavedReplicas`].

use std::collections::BTreeMap;

/// Annotation holding the replica count to restore on the next scale-up
pub const REPLICAS_ANNOTATION: &str = "ns.scheduler/replicas";

/// Replica count restored when no usable value is stored
pub const DEFAULT_RESTORE_REPLICAS: i32 = 1;

/// Saved replica count as found on a workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedReplicas {
    Missing,
    Valid(i32),
    Malformed(String),
}

impl SavedReplicas {
    /// Read the annotation from a workload's annotations
    pub fn read(annotations: &BTreeMap<String, String>) -> Self {
        match annotations.get(REPLICAS_ANNOTATION) {
            None => SavedReplicas::Missing,
            Some(raw) => match raw.trim().parse::<i32>() {
                Ok(replicas) => SavedReplicas::Valid(replicas),
                Err(_) => SavedReplicas::Malformed(raw.clone()),
            },
        }
    }

    /// Replica count a scale-up should restore.
    ///
    /// Stored values that cannot bring the workload back (non-positive or
    /// unparsable) fall back to [`DEFAULT_RESTORE_REPLICAS`].
    pub fn restore_target(&self) -> i32 {
        match self {
            SavedReplicas::Valid(replicas) if *replicas > 0 => *replicas,
            _ => DEFAULT_RESTORE_REPLICAS,
        }
    }

    /// Annotation map recording `replicas` as the restore value
    pub fn stamp(replicas: i32) -> BTreeMap<String, String> {
        let mut annotations = BTreeMap::new();
        annotations.insert(REPLICAS_ANNOTATION.to_string(), replicas.to_string());
        annotations
    }
}
