use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::info;

/// Fixed-interval polling bounded by a wall-clock deadline. No backoff and no
/// jitter: the remote side drives the state transition, this side only
/// observes it.
#[derive(Clone, Copy, Debug)]
pub struct PollSchedule {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        PollSchedule {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Probes on the schedule until `is_terminal` accepts an observation, which is
/// returned as `Ok(Some(..))`. Once the deadline passes, returns `Ok(None)`
/// without issuing another probe. A probe error aborts the loop immediately.
pub async fn poll_until<T, E, F, Fut, P>(
    schedule: PollSchedule,
    mut probe: F,
    is_terminal: P,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let started = Instant::now();
    let mut attempt = 0u32;
    while started.elapsed() < schedule.timeout {
        attempt += 1;
        info!("poll attempt {}", attempt);
        let observation = probe().await?;
        if is_terminal(&observation) {
            return Ok(Some(observation));
        }
        sleep(schedule.interval).await;
    }
    info!(
        "gave up polling after {} attempts, deadline of {}s passed",
        attempt,
        schedule.timeout.as_secs()
    );
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn short_schedule() -> PollSchedule {
        PollSchedule {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(25),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_terminal_observation() {
        let calls = AtomicU32::new(0);
        let result: Result<Option<&str>, Infallible> = poll_until(
            short_schedule(),
            || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 1 {
                        Ok("pending")
                    } else {
                        Ok("succeeded")
                    }
                }
            },
            |status| *status != "pending",
        )
        .await;
        assert_eq!(result.unwrap(), Some("succeeded"));
        // no probe after the terminal one
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_terminal_status_polls_once() {
        let calls = AtomicU32::new(0);
        let result: Result<Option<&str>, Infallible> = poll_until(
            short_schedule(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok("succeeded") }
            },
            |status| *status != "pending",
        )
        .await;
        assert_eq!(result.unwrap(), Some("succeeded"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn always_pending_times_out_within_the_deadline() {
        let calls = AtomicU32::new(0);
        let result: Result<Option<&str>, Infallible> = poll_until(
            short_schedule(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok("pending") }
            },
            |status| *status != "pending",
        )
        .await;
        assert_eq!(result.unwrap(), None);
        // probes at t=0, 10 and 20; the deadline cuts the loop before t=30
        let observed = calls.load(Ordering::SeqCst);
        assert!((2..=3).contains(&observed), "polled {} times", observed);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_error_aborts_the_loop() {
        let calls = AtomicU32::new(0);
        let result: Result<Option<&str>, &str> = poll_until(
            short_schedule(),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("boom") }
            },
            |_| false,
        )
        .await;
        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
