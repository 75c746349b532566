//! Refreshes external project state after the assistant mutated it

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::{error::Result, events::ProjectDataChanged};

/// Wait before re-reading server state after a write
pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Source of authoritative project and story data.
///
/// Both calls must be idempotent and safe to call with stale local state.
#[async_trait]
pub trait ProjectRefresher: Send + Sync {
    async fn refresh_projects(&self) -> Result<()>;

    async fn refresh_stories(&self, project_id: &str) -> Result<()>;
}

/// Runs the settle-then-refresh sequence and announces the change
pub struct Reconciler {
    refresher: Arc<dyn ProjectRefresher>,
    settle_delay: Duration,
    change_tx: broadcast::Sender<ProjectDataChanged>,
}

impl Reconciler {
    pub fn new(refresher: Arc<dyn ProjectRefresher>, settle_delay: Duration) -> Self {
        let (change_tx, _) = broadcast::channel(16);
        Self {
            refresher,
            settle_delay,
            change_tx,
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ProjectDataChanged> {
        self.change_tx.subscribe()
    }

    /// Settle, refresh projects then stories, then notify once.
    ///
    /// Failures are logged and end the sequence; nothing is retried.
    pub async fn reconcile(&self, project_id: &str) {
        tokio::time::sleep(self.settle_delay).await;

        if let Err(e) = self.refresher.refresh_projects().await {
            tracing::warn!(project_id, error = %e, "Project refresh failed");
            return;
        }
        if let Err(e) = self.refresher.refresh_stories(project_id).await {
            tracing::warn!(project_id, error = %e, "Story refresh failed");
            return;
        }

        tracing::debug!(project_id, "Project data reconciled");
        // No subscribers is fine
        let _ = self.change_tx.send(ProjectDataChanged);
    }

    /// Run [`reconcile`](Self::reconcile) on a detached task
    pub fn spawn(self: &Arc<Self>, project_id: impl Into<String>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let project_id = project_id.into();
        tokio::spawn(async move { this.reconcile(&project_id).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use parking_lot::Mutex;

    /// Records calls in order; optionally fails one of them
    #[derive(Default)]
    struct RecordingRefresher {
        calls: Mutex<Vec<String>>,
        fail_projects: bool,
        fail_stories: bool,
    }

    #[async_trait]
    impl ProjectRefresher for RecordingRefresher {
        async fn refresh_projects(&self) -> Result<()> {
            self.calls.lock().push("projects".to_string());
            if self.fail_projects {
                return Err(Error::Refresh("projects unavailable".into()));
            }
            Ok(())
        }

        async fn refresh_stories(&self, project_id: &str) -> Result<()> {
            self.calls.lock().push(format!("stories:{}", project_id));
            if self.fail_stories {
                return Err(Error::Refresh("stories unavailable".into()));
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_in_order_then_notifies() {
        let refresher = Arc::new(RecordingRefresher::default());
        let reconciler = Arc::new(Reconciler::new(refresher.clone(), SETTLE_DELAY));
        let mut changes = reconciler.subscribe();

        let started = tokio::time::Instant::now();
        reconciler.spawn("p-1").await.unwrap();

        assert!(started.elapsed() >= SETTLE_DELAY);
        assert_eq!(*refresher.calls.lock(), vec!["projects", "stories:p-1"]);
        assert_eq!(changes.try_recv().unwrap(), ProjectDataChanged);
        assert!(changes.try_recv().is_err(), "exactly one notification");
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_happens_before_settle_delay() {
        let refresher = Arc::new(RecordingRefresher::default());
        let reconciler = Arc::new(Reconciler::new(refresher.clone(), SETTLE_DELAY));

        let handle = reconciler.spawn("p-1");
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(refresher.calls.lock().is_empty());

        handle.await.unwrap();
        assert_eq!(refresher.calls.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_project_failure_is_swallowed_and_stops() {
        let refresher = Arc::new(RecordingRefresher {
            fail_projects: true,
            ..Default::default()
        });
        let reconciler = Arc::new(Reconciler::new(refresher.clone(), SETTLE_DELAY));
        let mut changes = reconciler.subscribe();

        reconciler.spawn("p-1").await.unwrap();

        assert_eq!(*refresher.calls.lock(), vec!["projects"]);
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_story_failure_is_not_retried() {
        let refresher = Arc::new(RecordingRefresher {
            fail_stories: true,
            ..Default::default()
        });
        let reconciler = Arc::new(Reconciler::new(refresher.clone(), SETTLE_DELAY));
        let mut changes = reconciler.subscribe();

        reconciler.spawn("p-1").await.unwrap();

        assert_eq!(*refresher.calls.lock(), vec!["projects", "stories:p-1"]);
        assert!(changes.try_recv().is_err());
    }
}
