//! Scroll-to-load driver for infinite result lists.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::scope::DocumentScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The count reached the target.
    TargetReached,
    /// A scroll produced no new rows.
    Plateau,
    /// Every attempt was used without reaching the target.
    Exhausted,
    /// Scrolling or counting failed; the last good count is kept.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    pub count: usize,
    pub attempts: u32,
    pub reason: StopReason,
}

/// Decides whether another scroll is worthwhile after one attempt.
///
/// Checked in order: target reached, plateau, budget exhausted.
pub fn stop_condition(
    previous: usize,
    current: usize,
    target: usize,
    attempt: u32,
    max_attempts: u32,
) -> Option<StopReason> {
    if current >= target {
        Some(StopReason::TargetReached)
    } else if current == previous {
        Some(StopReason::Plateau)
    } else if attempt >= max_attempts {
        Some(StopReason::Exhausted)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScrollDriver {
    pub max_attempts: u32,
    pub pause: Duration,
}

impl Default for ScrollDriver {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            pause: Duration::from_secs(2),
        }
    }
}

impl ScrollDriver {
    pub fn new(max_attempts: u32, pause: Duration) -> Self {
        Self { max_attempts, pause }
    }

    /// Scrolls until `selector` matches at least `target` elements, the count
    /// stops growing, or the attempt budget runs out.
    pub async fn run<S>(&self, scope: &S, selector: &str, start: usize, target: usize) -> ScrollOutcome
    where
        S: DocumentScope + ?Sized,
    {
        let mut count = start;
        if count >= target {
            return ScrollOutcome {
                count,
                attempts: 0,
                reason: StopReason::TargetReached,
            };
        }

        info!("loading more results (have {}, want {})", count, target);
        let mut attempt = 0;
        loop {
            if attempt >= self.max_attempts {
                return ScrollOutcome {
                    count,
                    attempts: attempt,
                    reason: StopReason::Exhausted,
                };
            }
            attempt += 1;

            let next = match scope.scroll_to_bottom() {
                Ok(()) => {
                    sleep(self.pause).await;
                    scope.count(selector)
                }
                Err(e) => Err(e),
            };

            let next = match next {
                Ok(n) => n,
                Err(e) => {
                    warn!("   scroll {} failed: {}", attempt, e);
                    return ScrollOutcome {
                        count,
                        attempts: attempt,
                        reason: StopReason::Interrupted,
                    };
                }
            };
            info!("   after scroll {}: {} rows", attempt, next);

            let previous = count;
            count = next;
            if let Some(reason) = stop_condition(previous, next, target, attempt, self.max_attempts) {
                return ScrollOutcome {
                    count,
                    attempts: attempt,
                    reason,
                };
            }
        }
    }
}
