// src/client/proctor.rs

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Why the proctor pulled the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSubmitReason {
    TimeExpired,
    ViolationLimit,
}

struct Inner {
    violations: u32,
    max_violations: u32,
    trigger: Option<oneshot::Sender<AutoSubmitReason>>,
}

impl Inner {
    fn fire(&mut self, reason: AutoSubmitReason) {
        if let Some(sender) = self.trigger.take() {
            let _ = sender.send(reason);
        }
    }
}

/// Client-side exam supervisor.
///
/// Owns the countdown for the exam duration and the focus-violation
/// counter. Whichever limit is hit first fires the auto-submit signal,
/// and the signal fires at most once no matter how the two race.
pub struct ExamProctor {
    inner: Arc<Mutex<Inner>>,
    timer: JoinHandle<()>,
}

impl ExamProctor {
    /// Starts proctoring. The returned receiver resolves when the exam
    /// must be auto-submitted; it errors if the proctor is cancelled.
    pub fn start(
        duration: Duration,
        max_violations: u32,
    ) -> (Self, oneshot::Receiver<AutoSubmitReason>) {
        let (tx, rx) = oneshot::channel();
        let inner = Arc::new(Mutex::new(Inner {
            violations: 0,
            max_violations,
            trigger: Some(tx),
        }));

        let timer_inner = Arc::clone(&inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Ok(mut guard) = timer_inner.lock() {
                guard.fire(AutoSubmitReason::TimeExpired);
            }
        });

        (ExamProctor { inner, timer }, rx)
    }

    /// Records one focus violation and returns the running count.
    /// Hitting the configured limit fires the auto-submit signal.
    pub fn record_violation(&self) -> u32 {
        let Ok(mut guard) = self.inner.lock() else {
            return 0;
        };
        guard.violations += 1;
        let count = guard.violations;
        if count >= guard.max_violations {
            guard.fire(AutoSubmitReason::ViolationLimit);
        }
        count
    }

    pub fn violations(&self) -> u32 {
        self.inner.lock().map(|g| g.violations).unwrap_or(0)
    }

    /// Stands down after a normal submission. The timer task stops and
    /// the signal can no longer fire.
    pub fn cancel(self) {
        self.timer.abort();
        if let Ok(mut guard) = self.inner.lock() {
            guard.trigger.take();
        }
    }
}

impl Drop for ExamProctor {
    fn drop(&mut self) {
        self.timer.abort();
    }
}
