use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::core::config::AttemptSettings;
use crate::services::attempt_session::{ExamAttemptSession, SubmitMode, SubmitOutcome, TickOutcome};

/// Timing of the countdown task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownPolicy {
    pub period: Duration,
    /// Delay before the first retry of a failed automatic submission.
    pub retry_base: Duration,
    pub retry_max: Duration,
}

impl CountdownPolicy {
    pub fn from_settings(settings: &AttemptSettings) -> Self {
        Self {
            period: Duration::from_millis(settings.tick_millis),
            retry_base: Duration::from_secs(settings.auto_submit_retry_seconds),
            retry_max: Duration::from_secs(settings.auto_submit_retry_max_seconds),
        }
    }

    fn backoff(&self, failures: u32) -> Duration {
        let factor = 2_u32.saturating_pow(failures.saturating_sub(1));
        self.retry_base.saturating_mul(factor).min(self.retry_max)
    }
}

impl Default for CountdownPolicy {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            retry_base: Duration::from_secs(1),
            retry_max: Duration::from_secs(30),
        }
    }
}

/// Drives the session's countdown once per period and submits when time runs out.
///
/// The task only holds a weak reference, so dropping the session stops it. It also stops on
/// teardown and once the attempt is submitted or failed.
pub fn spawn(session: &Arc<ExamAttemptSession>, policy: CountdownPolicy) -> JoinHandle<()> {
    let cancelled = session.cancelled();
    tokio::spawn(run(Arc::downgrade(session), cancelled, policy))
}

async fn run(
    session: Weak<ExamAttemptSession>,
    mut cancelled: watch::Receiver<bool>,
    policy: CountdownPolicy,
) {
    let mut ticker = interval_at(Instant::now() + policy.period, policy.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut failures = 0_u32;
    let mut retry_at: Option<Instant> = None;

    loop {
        if *cancelled.borrow() {
            break;
        }

        tokio::select! {
            changed = cancelled.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        let Some(session) = session.upgrade() else {
            break;
        };

        match session.tick().await {
            TickOutcome::Remaining(_) => {}
            TickOutcome::Ignored => {
                if session.phase().await.is_terminal() {
                    break;
                }
            }
            TickOutcome::Expired => {
                if retry_at.is_some_and(|at| Instant::now() < at) {
                    continue;
                }

                match session.submit(SubmitMode::Auto).await {
                    Ok(SubmitOutcome::Submitted(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        failures += 1;
                        let delay = policy.backoff(failures);
                        retry_at = Some(Instant::now() + delay);
                        tracing::warn!(
                            exam_id = %session.exam_id(),
                            error = %err,
                            failures,
                            retry_in_ms = delay.as_millis() as u64,
                            "Automatic submission failed; retrying"
                        );
                    }
                }
            }
        }
    }

    tracing::debug!("Countdown task stopped");
}
