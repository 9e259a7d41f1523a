//! Job registry: the concurrency-safe index of all known jobs
//!
//! The registry is a plain value the embedder constructs and shares behind an
//! `Arc`; tests build isolated instances. Jobs are transient supervision
//! records, held in memory only.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};

use super::job::{JobRecord, JobSnapshot};

/// Thread-safe store of job records, keyed by job id.
///
/// Many readers and one status-writer per job; the map itself tolerates
/// concurrent insert/lookup/removal without a global lock.
pub struct JobRegistry {
    jobs: DashMap<String, Arc<JobRecord>>,
    next_id: AtomicU64,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a new job in Pending state and register it.
    pub fn create(&self, kind: &str, log_capacity: usize) -> Arc<JobRecord> {
        let id = format!("job-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = Arc::new(JobRecord::new(id.clone(), kind.to_string(), log_capacity));
        self.jobs.insert(id.clone(), record.clone());
        debug!(job = %id, kind, "registered job");
        record
    }

    /// Look up a job by id.
    pub fn get(&self, id: &str) -> Option<Arc<JobRecord>> {
        self.jobs.get(id).map(|entry| entry.clone())
    }

    /// Immutable snapshot of a job, or `None` for an unknown id.
    pub fn snapshot(&self, id: &str) -> Option<JobSnapshot> {
        self.get(id).map(|record| record.snapshot())
    }

    /// Snapshots of every known job, oldest first.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<JobSnapshot> = self
            .jobs
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        snapshots
    }

    /// All live records. Used by shutdown paths that need the records
    /// themselves rather than copies.
    pub(crate) fn records(&self) -> Vec<Arc<JobRecord>> {
        self.jobs.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Remove a job from the index. Outstanding `Arc`s stay valid.
    pub fn remove(&self, id: &str) -> Option<Arc<JobRecord>> {
        self.jobs.remove(id).map(|(_, record)| record)
    }

    /// Number of registered jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// True if no jobs are registered.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Drop terminal jobs that finished more than `max_age` ago.
    ///
    /// Running and pending jobs are never touched. Returns how many records
    /// were removed.
    pub fn prune_finished(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::zero());
        let expired: Vec<String> = self
            .jobs
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .finished_at()
                    .map(|at| at < cutoff)
                    .unwrap_or(false)
            })
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for id in expired {
            if self.jobs.remove(&id).is_some() {
                info!(job = %id, "pruned finished job");
                removed += 1;
            }
        }
        removed
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;

    #[test]
    fn test_create_assigns_sequential_ids() {
        let registry = JobRegistry::new();
        let a = registry.create("one", 16);
        let b = registry.create("two", 16);

        assert_eq!(a.id(), "job-1");
        assert_eq!(b.id(), "job-2");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_get_unknown_id_is_none() {
        let registry = JobRegistry::new();
        assert!(registry.get("job-99").is_none());
        assert!(registry.snapshot("job-99").is_none());
    }

    #[test]
    fn test_snapshot_reflects_record() {
        let registry = JobRegistry::new();
        let record = registry.create("echo", 16);
        record.mark_running();
        record.append_line("hello");

        let snapshot = registry.snapshot(record.id()).unwrap();
        assert_eq!(snapshot.status, JobStatus::Running);
        assert_eq!(snapshot.log, vec!["hello"]);
        assert_eq!(snapshot.kind, "echo");
    }

    #[test]
    fn test_list_is_creation_ordered() {
        let registry = JobRegistry::new();
        registry.create("a", 16);
        registry.create("b", 16);
        registry.create("c", 16);

        let kinds: Vec<String> = registry.list().into_iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_prune_finished_skips_live_jobs() {
        let registry = JobRegistry::new();
        let done = registry.create("done", 16);
        done.mark_running();
        done.complete(Some(0), true);
        let live = registry.create("live", 16);
        live.mark_running();

        let removed = registry.prune_finished(Duration::ZERO);
        assert_eq!(removed, 1);
        assert!(registry.get(done.id()).is_none());
        assert!(registry.get(live.id()).is_some());
    }

    #[test]
    fn test_prune_respects_age() {
        let registry = JobRegistry::new();
        let record = registry.create("recent", 16);
        record.mark_running();
        record.complete(Some(0), true);

        // Finished just now; an hour-long retention keeps it
        assert_eq!(registry.prune_finished(Duration::from_secs(3600)), 0);
        assert!(registry.get(record.id()).is_some());
    }
}
