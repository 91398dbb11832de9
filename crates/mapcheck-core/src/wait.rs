//! Wait-condition evaluator: polls the page until a condition holds or a
//! deadline elapses. This is the only place (besides explicit pauses) where
//! a scenario blocks, and it always carries a timeout.

use std::time::{Duration, Instant};

use crate::condition::Condition;
use crate::error::CheckError;
use crate::traits::PageDriver;

/// Default gap between condition probes. Short enough that a satisfied
/// condition is noticed without perceptible delay.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Poll `condition` against `page` until it holds or `timeout` elapses.
///
/// On timeout the returned [`CheckError::Timeout`] carries the condition's
/// description and the elapsed time — a condition that never becomes true
/// is reported, never silently skipped.
pub async fn wait_for<P: PageDriver>(
    page: &P,
    condition: &Condition,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), CheckError> {
    let start = Instant::now();
    loop {
        if condition.probe(page).await? {
            tracing::debug!(%condition, elapsed_ms = start.elapsed().as_millis() as u64, "Condition met");
            return Ok(());
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(CheckError::Timeout {
                condition: condition.to_string(),
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }

        // Never sleep past the deadline.
        tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockPage;

    const FAST_POLL: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn never_true_condition_times_out() {
        let page = MockPage::new();
        let cond = Condition::Exists {
            selector: ".marker".into(),
        };

        let err = wait_for(&page, &cond, Duration::from_millis(60), FAST_POLL)
            .await
            .unwrap_err();

        match err {
            CheckError::Timeout {
                condition,
                elapsed_ms,
            } => {
                assert!(condition.contains(".marker"));
                assert!(elapsed_ms >= 60);
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn condition_met_after_a_few_polls() {
        let page = MockPage::new();
        // Element appears on the third probe, as when data loads async.
        page.count_sequence(".place-item", vec![0, 0, 3]);

        let cond = Condition::CountAtLeast {
            selector: ".place-item".into(),
            min: 1,
        };

        wait_for(&page, &cond, Duration::from_secs(1), FAST_POLL)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn immediately_true_condition_returns_without_sleeping() {
        let page = MockPage::new();
        page.set_count("#map", 1);

        let cond = Condition::Exists {
            selector: "#map".into(),
        };

        let start = Instant::now();
        wait_for(&page, &cond, Duration::from_secs(10), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn probe_error_propagates_instead_of_spinning() {
        let page = MockPage::new();
        page.fail_on("count", CheckError::Interaction("page crashed".into()));

        let cond = Condition::Exists {
            selector: ".marker".into(),
        };

        let err = wait_for(&page, &cond, Duration::from_secs(1), FAST_POLL)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Interaction(_)));
    }
}
