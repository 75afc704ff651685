// SPDX-License-Identifier: Apache-2.0
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::LlmError;

const WINDOW: Duration = Duration::from_secs(60);

/// Sliding 60-second window of request timestamps with a configured cap
/// (§3 `RateBudget`, §4.3 "Rate limiting"). On overflow the caller is
/// expected to wait until the oldest timestamp ages out of the window;
/// [`RateBudget::acquire`] does that waiting internally.
pub struct RateBudget {
    cap: usize,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateBudget {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            timestamps: Mutex::new(VecDeque::with_capacity(cap)),
        }
    }

    fn evict_expired(timestamps: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&front) = timestamps.front() {
            if now.duration_since(front) >= WINDOW {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Blocks until a slot is free, then records the new timestamp.
    /// A `cancel` future resolving first unblocks the caller with
    /// `LlmError::Cancelled` instead of a permit (§4.3).
    pub async fn acquire(&self, cancel: impl std::future::Future<Output = ()>) -> Result<(), LlmError> {
        tokio::pin!(cancel);
        loop {
            let wait = {
                let mut timestamps = self.timestamps.lock().await;
                let now = Instant::now();
                Self::evict_expired(&mut timestamps, now);

                if timestamps.len() < self.cap {
                    timestamps.push_back(now);
                    return Ok(());
                }
                let oldest = *timestamps.front().expect("len >= cap > 0");
                WINDOW.saturating_sub(now.duration_since(oldest))
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => continue,
                _ = &mut cancel => return Err(LlmError::Cancelled),
            }
        }
    }

    pub async fn in_flight_count(&self) -> usize {
        let mut timestamps = self.timestamps.lock().await;
        Self::evict_expired(&mut timestamps, Instant::now());
        timestamps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    #[tokio::test]
    async fn acquires_freely_under_cap() {
        let budget = RateBudget::new(3);
        for _ in 0..3 {
            budget.acquire(pending()).await.unwrap();
        }
        assert_eq!(budget.in_flight_count().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn blocks_until_oldest_ages_out_then_proceeds() {
        let budget = RateBudget::new(1);
        budget.acquire(pending()).await.unwrap();

        let acquire_fut = budget.acquire(pending());
        tokio::pin!(acquire_fut);

        tokio::select! {
            _ = &mut acquire_fut => panic!("should not have acquired before window elapsed"),
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }

        tokio::time::advance(Duration::from_secs(60)).await;
        acquire_fut.await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_unblocks_with_cancelled_error() {
        let budget = RateBudget::new(1);
        budget.acquire(pending()).await.unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let cancel = async move {
            let _ = rx.await;
        };
        tx.send(()).unwrap();

        let result = budget.acquire(cancel).await;
        assert!(matches!(result, Err(LlmError::Cancelled)));
    }
}
