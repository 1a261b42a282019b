//! Debounced autosave scheduling.
//!
//! The policy is a pure function of three signals: whether a workflow is
//! open, whether the graph is dirty, and whether an unresolved version
//! conflict exists. The scheduler owns an explicit timer handle; a fired
//! timer emits one [`SaveRequest`] on the request channel, and
//! rescheduling aborts the previous timer so that only the most recent
//! request for a dirty period is ever sent.
//!
//! Cancellation is synchronous: aborting the timer task happens before
//! `cancel` returns, so a stale autosave can never fire after the caller
//! has moved on to another workflow.

use crate::persist::SaveRequest;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Delay between the last dirtying edit and the autosave request.
pub const AUTOSAVE_DEBOUNCE: Duration = Duration::from_secs(2);

/// The scheduler's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutosaveSignals {
    /// A workflow is open in the session.
    pub has_current_workflow: bool,
    /// The graph differs from the last persisted snapshot.
    pub dirty: bool,
    /// The persisted workflow diverged from this session.
    pub has_version_conflict: bool,
}

/// What the policy wants done with the pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveDecision {
    /// (Re)arm the debounce timer.
    Schedule,
    /// Drop any pending timer.
    Cancel,
}

impl AutosaveSignals {
    /// Evaluates the autosave policy.
    ///
    /// Never schedules without a workflow or over an unresolved conflict;
    /// otherwise schedules exactly when dirty.
    #[must_use]
    pub fn decide(&self) -> AutosaveDecision {
        if !self.has_current_workflow {
            AutosaveDecision::Cancel
        } else if self.has_version_conflict {
            AutosaveDecision::Cancel
        } else if self.dirty {
            AutosaveDecision::Schedule
        } else {
            AutosaveDecision::Cancel
        }
    }
}

/// Owner of the debounce timer and the save-request channel.
#[derive(Debug)]
pub struct AutosaveScheduler {
    delay: Duration,
    requests: mpsc::UnboundedSender<SaveRequest>,
    pending: Option<JoinHandle<()>>,
}

impl AutosaveScheduler {
    /// Creates a scheduler with the default debounce delay.
    ///
    /// Returns the scheduler and the receiving end of its request
    /// channel; the persistence collaborator drains the receiver.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SaveRequest>) {
        Self::with_delay(AUTOSAVE_DEBOUNCE)
    }

    /// Creates a scheduler with a specific debounce delay.
    #[must_use]
    pub fn with_delay(delay: Duration) -> (Self, mpsc::UnboundedReceiver<SaveRequest>) {
        let (requests, receiver) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                requests,
                pending: None,
            },
            receiver,
        )
    }

    /// Applies a policy decision for the given signals.
    pub fn apply(&mut self, signals: AutosaveSignals) {
        match signals.decide() {
            AutosaveDecision::Schedule => self.schedule(),
            AutosaveDecision::Cancel => self.cancel(),
        }
    }

    /// (Re)arms the debounce timer.
    ///
    /// Idempotent: an already-armed timer is reset, not stacked. Must be
    /// called from within a tokio runtime.
    pub fn schedule(&mut self) {
        self.cancel();
        let requests = self.requests.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver may already be gone during shutdown.
            let _ = requests.send(SaveRequest::autosave());
        }));
    }

    /// Drops the pending timer, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Returns whether a timer is currently armed.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Sends a request immediately, bypassing the debounce.
    ///
    /// Returns false when the receiver has been dropped.
    pub fn send_now(&self, request: SaveRequest) -> bool {
        self.requests.send(request).is_ok()
    }
}

impl Drop for AutosaveScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::SaveSource;

    fn signals(workflow: bool, dirty: bool, conflict: bool) -> AutosaveSignals {
        AutosaveSignals {
            has_current_workflow: workflow,
            dirty,
            has_version_conflict: conflict,
        }
    }

    #[test]
    fn policy_truth_table() {
        use AutosaveDecision::{Cancel, Schedule};

        assert_eq!(signals(false, false, false).decide(), Cancel);
        assert_eq!(signals(false, true, false).decide(), Cancel);
        assert_eq!(signals(false, true, true).decide(), Cancel);
        assert_eq!(signals(true, false, false).decide(), Cancel);
        assert_eq!(signals(true, true, true).decide(), Cancel);
        assert_eq!(signals(true, false, true).decide(), Cancel);
        assert_eq!(signals(true, true, false).decide(), Schedule);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_timer_emits_one_autosave_request() {
        let (mut scheduler, mut requests) = AutosaveScheduler::with_delay(Duration::from_secs(2));
        scheduler.schedule();
        tokio::task::yield_now().await;

        let request = requests.recv().await.expect("request fires");
        assert_eq!(request.source, SaveSource::Autosave);
        assert_eq!(request.change_description, "Autosave");
        assert!(requests.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_request() {
        let (mut scheduler, mut requests) = AutosaveScheduler::with_delay(Duration::from_secs(2));
        scheduler.schedule();
        tokio::task::yield_now().await;
        scheduler.cancel();

        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert!(requests.try_recv().is_err());
        assert!(!scheduler.is_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_resets_the_timer() {
        let (mut scheduler, mut requests) = AutosaveScheduler::with_delay(Duration::from_secs(2));
        scheduler.schedule();
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_secs(1)).await;
        scheduler.schedule();
        tokio::task::yield_now().await;

        // Two seconds after the first schedule: the superseded timer
        // would have fired, the reset one has not.
        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert!(requests.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        let request = requests.try_recv().expect("reset timer fires");
        assert_eq!(request.source, SaveSource::Autosave);
        assert!(requests.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn apply_follows_the_policy() {
        let (mut scheduler, mut requests) = AutosaveScheduler::with_delay(Duration::from_secs(2));

        scheduler.apply(signals(true, true, true));
        assert!(!scheduler.is_scheduled());

        scheduler.apply(signals(true, true, false));
        assert!(scheduler.is_scheduled());

        // Conflict appears before the timer fires: request is cancelled.
        scheduler.apply(signals(true, true, true));
        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert!(requests.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn send_now_bypasses_the_debounce() {
        let (scheduler, mut requests) = AutosaveScheduler::with_delay(Duration::from_secs(2));
        assert!(scheduler.send_now(SaveRequest::manual("Renamed step")));

        let request = requests.try_recv().expect("immediate request");
        assert_eq!(request.source, SaveSource::Manual);
        assert_eq!(request.change_description, "Renamed step");
    }
}
