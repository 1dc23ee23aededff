//! Single-slot FIFO queue that throttles outbound AI calls.
//!
//! One worker task drains an unbounded channel and runs at most one job at a
//! time. After every job that actually ran it sleeps the base delay, longer
//! after consecutive failures when backoff is enabled. Jobs cancelled while
//! still queued are skipped without consuming a delay.

use crate::error::GatewayError;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Spacing between executed jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottlePolicy {
    /// Minimum gap after every executed job.
    pub delay: Duration,
    pub backoff_enabled: bool,
    pub backoff_factor: f64,
    /// Upper bound for the backed-off delay.
    pub max_delay: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(2000),
            backoff_enabled: true,
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ThrottlePolicy {
    /// Fixed spacing, no backoff.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            backoff_enabled: false,
            ..Self::default()
        }
    }

    /// Delay to apply after a job, given the failure streak including that job.
    pub fn delay_after(&self, consecutive_failures: u32) -> Duration {
        if !self.backoff_enabled || consecutive_failures == 0 {
            return self.delay;
        }
        let factor = self.backoff_factor.max(1.0).powi(consecutive_failures.min(64) as i32);
        let secs = self.delay.as_secs_f64() * factor;
        let cap = self.max_delay.max(self.delay);
        if !secs.is_finite() || secs >= cap.as_secs_f64() {
            cap
        } else {
            Duration::from_secs_f64(secs).max(self.delay)
        }
    }
}

enum Outcome {
    Skipped,
    Completed,
    Failed,
}

type Job = Box<dyn FnOnce() -> BoxFuture<'static, Outcome> + Send>;

/// Owner of the queue and its worker. Dropping the queue stops the worker once
/// the remaining jobs have drained.
pub struct ThrottledQueue {
    tx: mpsc::UnboundedSender<Job>,
    queued: Arc<AtomicUsize>,
    policy: ThrottlePolicy,
}

impl ThrottledQueue {
    /// Spawn the worker on the current tokio runtime.
    pub fn new(policy: ThrottlePolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let queued = Arc::new(AtomicUsize::new(0));
        tokio::spawn(run_worker(rx, policy.clone(), Arc::clone(&queued)));
        Self { tx, queued, policy }
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    /// Jobs submitted but not yet started.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    /// Enqueue `task`. The job is in the queue when this returns, so
    /// submission order is execution order.
    pub fn submit<T, F, Fut>(&self, cancel: CancellationToken, task: F) -> QueuedCall<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, GatewayError>> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let token = cancel.clone();
        let queued = Arc::clone(&self.queued);
        let job: Job = Box::new(move || {
            Box::pin(async move {
                queued.fetch_sub(1, Ordering::Relaxed);
                if token.is_cancelled() {
                    let _ = result_tx.send(Err(GatewayError::Cancelled));
                    return Outcome::Skipped;
                }
                let result = tokio::select! {
                    _ = token.cancelled() => Err(GatewayError::Cancelled),
                    r = task() => r,
                };
                let outcome = match &result {
                    Ok(_) | Err(GatewayError::Cancelled) => Outcome::Completed,
                    Err(_) => Outcome::Failed,
                };
                let _ = result_tx.send(result);
                outcome
            })
        });

        self.queued.fetch_add(1, Ordering::Relaxed);
        if self.tx.send(job).is_err() {
            // The rejected job (and its result sender) is dropped here, so the
            // caller observes QueueClosed.
            self.queued.fetch_sub(1, Ordering::Relaxed);
        }
        QueuedCall {
            rx: result_rx,
            cancel,
        }
    }
}

/// Handle to a submitted job.
pub struct QueuedCall<T> {
    rx: oneshot::Receiver<Result<T, GatewayError>>,
    cancel: CancellationToken,
}

impl<T> QueuedCall<T> {
    /// Token that cancels this call, whether queued or running.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the job's result. Returns `Cancelled` as soon as the token fires.
    pub async fn wait(self) -> Result<T, GatewayError> {
        let QueuedCall { rx, cancel } = self;
        tokio::select! {
            biased;
            r = rx => r.unwrap_or(Err(GatewayError::QueueClosed)),
            _ = cancel.cancelled() => Err(GatewayError::Cancelled),
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Job>,
    policy: ThrottlePolicy,
    queued: Arc<AtomicUsize>,
) {
    let mut consecutive_failures: u32 = 0;
    while let Some(job) = rx.recv().await {
        match job().await {
            Outcome::Skipped => continue,
            Outcome::Completed => consecutive_failures = 0,
            Outcome::Failed => {
                consecutive_failures = consecutive_failures.saturating_add(1);
            }
        }
        let pause = policy.delay_after(consecutive_failures);
        if consecutive_failures > 0 && pause > policy.delay {
            tracing::warn!(
                failures = consecutive_failures,
                delay_ms = pause.as_millis() as u64,
                "AI gateway backing off after failure"
            );
        }
        tracing::debug!(
            queued = queued.load(Ordering::Relaxed),
            delay_ms = pause.as_millis() as u64,
            "AI gateway throttling"
        );
        tokio::time::sleep(pause).await;
    }
    tracing::debug!("AI gateway worker stopped");
}
