//! Soft and hard cancellation.
//!
//! Every job runs under a child of the current *soft generation* token,
//! which is itself a child of the *hard* token:
//!
//! ```text
//! hard ──► soft generation N ──► job token
//! ```
//!
//! A soft cancel fires generation N (stopping the jobs in flight) and
//! installs generation N+1 for the jobs that start afterwards. A hard
//! cancel fires the root, reaching every job, and tells the scheduler to
//! stop taking work.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// A second interrupt within this window escalates to a hard cancel.
pub const ESCALATION_WINDOW: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelMode {
    Soft,
    Hard,
}

#[derive(Debug)]
pub struct CancelController {
    hard: CancellationToken,
    soft: Mutex<CancellationToken>,
    last_interrupt: Mutex<Option<Instant>>,
    /// Treat the first interrupt as hard.
    hard_on_interrupt: bool,
}

impl CancelController {
    pub fn new(hard_on_interrupt: bool) -> Self {
        let hard = CancellationToken::new();
        let soft = Mutex::new(hard.child_token());
        Self {
            hard,
            soft,
            last_interrupt: Mutex::new(None),
            hard_on_interrupt,
        }
    }

    /// Token for a job that is about to start.
    pub fn job_token(&self) -> CancellationToken {
        self.soft.lock().child_token()
    }

    /// Cancel the jobs currently in flight; later jobs are unaffected.
    pub fn cancel_soft(&self) {
        let mut current = self.soft.lock();
        let previous = std::mem::replace(&mut *current, self.hard.child_token());
        previous.cancel();
    }

    /// Cancel everything and stop intake.
    pub fn cancel_hard(&self) {
        self.hard.cancel();
    }

    pub fn is_hard_cancelled(&self) -> bool {
        self.hard.is_cancelled()
    }

    /// Handle a user interrupt, escalating repeated ones.
    pub fn interrupt(&self) -> CancelMode {
        let now = Instant::now();
        let mut last = self.last_interrupt.lock();
        let repeated = last.is_some_and(|at| now.duration_since(at) <= ESCALATION_WINDOW);
        *last = Some(now);

        if self.hard_on_interrupt || repeated {
            self.cancel_hard();
            CancelMode::Hard
        } else {
            self.cancel_soft();
            CancelMode::Soft
        }
    }
}

/// Translate process signals into cancellations until `stop` fires or a
/// hard cancel happens. Ctrl+C goes through [`CancelController::interrupt`];
/// SIGTERM is always hard.
pub async fn listen_for_signals(controller: Arc<CancelController>, stop: CancellationToken) {
    #[cfg(unix)]
    let mut terminate =
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                None
            }
        };

    loop {
        #[cfg(unix)]
        let terminated = async {
            match terminate.as_mut() {
                Some(signal) => {
                    signal.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        #[cfg(not(unix))]
        let terminated = std::future::pending::<()>();

        tokio::select! {
            _ = stop.cancelled() => break,
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!("Failed to listen for Ctrl+C: {e}");
                    break;
                }
                match controller.interrupt() {
                    CancelMode::Soft => tracing::warn!(
                        "Interrupted: cancelling running jobs (press Ctrl+C again to stop all)"
                    ),
                    CancelMode::Hard => tracing::warn!("Interrupted: cancelling all jobs"),
                }
            }
            _ = terminated => {
                tracing::warn!("Terminated: cancelling all jobs");
                controller.cancel_hard();
            }
        }

        if controller.is_hard_cancelled() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_cancel_only_reaches_current_jobs() {
        let controller = CancelController::new(false);
        let running = controller.job_token();

        controller.cancel_soft();
        assert!(running.is_cancelled());

        let next = controller.job_token();
        assert!(!next.is_cancelled());
        assert!(!controller.is_hard_cancelled());
    }

    #[test]
    fn hard_cancel_reaches_every_job() {
        let controller = CancelController::new(false);
        let running = controller.job_token();
        controller.cancel_hard();

        assert!(running.is_cancelled());
        assert!(controller.job_token().is_cancelled());
        assert!(controller.is_hard_cancelled());
    }

    #[test]
    fn repeated_interrupt_escalates() {
        let controller = CancelController::new(false);
        assert_eq!(controller.interrupt(), CancelMode::Soft);
        assert!(!controller.is_hard_cancelled());
        assert_eq!(controller.interrupt(), CancelMode::Hard);
        assert!(controller.is_hard_cancelled());
    }

    #[test]
    fn first_interrupt_hard_when_configured() {
        let controller = CancelController::new(true);
        assert_eq!(controller.interrupt(), CancelMode::Hard);
        assert!(controller.is_hard_cancelled());
    }

    #[tokio::test]
    async fn listener_stops_on_request() {
        let controller = Arc::new(CancelController::new(false));
        let stop = CancellationToken::new();
        let handle = tokio::spawn(listen_for_signals(controller, stop.clone()));
        stop.cancel();
        handle.await.unwrap();
    }
}
