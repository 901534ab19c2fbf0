use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{FailureReason, JobOutcome, JobState};

#[derive(Debug, Default)]
struct Detail {
    endpoint_id: Option<String>,
    payload: Option<Vec<u8>>,
    bytes: usize,
}

/// Shared record of one job. Every state change goes through here, which
/// is what keeps a job to a single terminal transition.
#[derive(Debug)]
pub(crate) struct JobTracker {
    id: Uuid,
    state: watch::Sender<JobState>,
    detail: Mutex<Detail>,
}

impl JobTracker {
    pub(crate) fn new(id: Uuid, endpoint_id: Option<String>) -> Self {
        let (state, _) = watch::channel(JobState::Pending);
        Self {
            id,
            state,
            detail: Mutex::new(Detail {
                endpoint_id,
                ..Detail::default()
            }),
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    fn detail(&self) -> MutexGuard<'_, Detail> {
        self.detail.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move to a non-terminal state. Ignored once the job has finished.
    pub(crate) fn advance(&self, next: JobState) -> bool {
        debug_assert!(!next.is_terminal());
        let changed = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = next.clone();
            true
        });
        if changed {
            debug!(job = %self.id, state = %next, "Job advanced");
        }
        changed
    }

    /// Park the encoded stream until the endpoint worker takes it.
    pub(crate) fn store_payload(&self, payload: Vec<u8>) {
        let mut detail = self.detail();
        if self.state.borrow().is_terminal() {
            return;
        }
        detail.bytes = payload.len();
        detail.payload = Some(payload);
    }

    /// Enter `Submitting` and take the stream, unless the job already
    /// finished (cancelled or failed while queued).
    pub(crate) fn begin_submit(&self) -> Option<Vec<u8>> {
        let mut detail = self.detail();
        let changed = self.state.send_if_modified(|state| {
            if !state.is_cancellable() {
                return false;
            }
            *state = JobState::Submitting;
            true
        });
        if !changed {
            return None;
        }
        debug!(job = %self.id, "Job submitting");
        detail.payload.take()
    }

    /// Record the terminal state. Returns `false` if the job had already
    /// finished; the first outcome wins.
    pub(crate) fn finish(&self, outcome: JobState) -> bool {
        debug_assert!(outcome.is_terminal());
        let mut detail = self.detail();
        let changed = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = outcome.clone();
            true
        });
        if changed {
            detail.payload = None;
            match &outcome {
                JobState::Failed(reason) => warn!(job = %self.id, %reason, "Job failed"),
                _ => info!(job = %self.id, bytes = detail.bytes, "Job succeeded"),
            }
        }
        changed
    }

    /// Fail the job with `Cancelled` if it has not started submitting.
    pub(crate) fn cancel(&self) -> bool {
        let mut detail = self.detail();
        let changed = self.state.send_if_modified(|state| {
            if !state.is_cancellable() {
                return false;
            }
            *state = JobState::Failed(FailureReason::Cancelled);
            true
        });
        if changed {
            detail.payload = None;
            info!(job = %self.id, "Job cancelled");
        }
        changed
    }

    fn outcome(&self) -> JobOutcome {
        let detail = self.detail();
        JobOutcome {
            id: self.id,
            endpoint_id: detail.endpoint_id.clone(),
            state: self.state.borrow().clone(),
            bytes: detail.bytes,
        }
    }

    #[cfg(test)]
    pub(crate) fn has_payload(&self) -> bool {
        self.detail().payload.is_some()
    }
}

/// Caller's view of a submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    tracker: Arc<JobTracker>,
    state: watch::Receiver<JobState>,
    cancel: CancellationToken,
}

impl JobHandle {
    pub(crate) fn new(tracker: Arc<JobTracker>, cancel: CancellationToken) -> Self {
        let state = tracker.state.subscribe();
        Self {
            tracker,
            state,
            cancel,
        }
    }

    pub fn id(&self) -> Uuid {
        self.tracker.id
    }

    pub fn endpoint_id(&self) -> Option<String> {
        self.tracker.detail().endpoint_id.clone()
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    /// Receiver for every state change.
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }

    /// Request cancellation. Returns `true` if the job was stopped before
    /// anything was sent; once `Submitting`, the write runs to completion.
    pub fn cancel(&self) -> bool {
        self.cancel.cancel();
        self.tracker.cancel()
    }

    /// Wait for the terminal state.
    pub async fn wait(&self) -> JobOutcome {
        let mut state = self.state.clone();
        // The sender lives in the tracker we hold, so the channel stays open
        let _ = state.wait_for(JobState::is_terminal).await;
        self.tracker.outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn handle() -> (Arc<JobTracker>, JobHandle) {
        let tracker = Arc::new(JobTracker::new(Uuid::new_v4(), Some("front".into())));
        let handle = JobHandle::new(tracker.clone(), CancellationToken::new());
        (tracker, handle)
    }

    #[test]
    fn test_first_terminal_state_wins() {
        let (tracker, handle) = handle();
        assert!(tracker.advance(JobState::Rendering));
        assert!(tracker.finish(JobState::Failed(FailureReason::Render("x".into()))));
        assert!(!tracker.finish(JobState::Succeeded));
        assert!(!tracker.advance(JobState::Encoding));
        assert_eq!(handle.state(), JobState::Failed(FailureReason::Render("x".into())));
    }

    #[test]
    fn test_cancel_discards_payload() {
        let (tracker, handle) = handle();
        tracker.advance(JobState::Encoding);
        tracker.store_payload(vec![1, 2, 3]);
        assert!(tracker.has_payload());

        assert!(handle.cancel());
        assert!(!tracker.has_payload());
        assert_eq!(tracker.begin_submit(), None);
        assert_eq!(handle.state(), JobState::Failed(FailureReason::Cancelled));
    }

    #[test]
    fn test_cancel_after_submit_started_is_recorded_only() {
        let (tracker, handle) = handle();
        tracker.advance(JobState::Encoding);
        tracker.store_payload(vec![9]);
        assert_eq!(tracker.begin_submit(), Some(vec![9]));

        assert!(!handle.cancel());
        assert_eq!(handle.state(), JobState::Submitting);
        assert!(tracker.finish(JobState::Succeeded));
    }

    #[tokio::test]
    async fn test_wait_reports_outcome() {
        let (tracker, handle) = handle();
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.wait().await })
        };

        tracker.advance(JobState::Encoding);
        tracker.store_payload(vec![0; 42]);
        let payload = tracker.begin_submit().unwrap();
        assert_eq!(payload.len(), 42);
        tracker.finish(JobState::Succeeded);

        let outcome = waiter.await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.bytes, 42);
        assert_eq!(outcome.endpoint_id.as_deref(), Some("front"));
        assert_eq!(outcome.id, handle.id());
    }
}
