// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Jittered polling for timed sensor updates

use std::future::Future;
use std::time::Duration;
use async_trait::async_trait;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Shortest delay a jittered tick may be clamped to.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Something that refreshes sensors when a poll tick fires.
///
/// `elapsed` is the time since the previous invocation, which rate-based
/// sensors use to turn counters into per-second values.
#[async_trait]
pub trait Updater: Send {
    async fn update(&mut self, elapsed: Duration);
}

#[async_trait]
impl<F, Fut> Updater for F
where
    F: FnMut(Duration) -> Fut + Send,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn update(&mut self, elapsed: Duration) {
        (self)(elapsed).await
    }
}

/// Repeatedly invoke `updater` every `interval`, perturbed by normally
/// distributed jitter with standard deviation `stdev`.
///
/// The updater runs once immediately, then on every tick until `token` is
/// cancelled. Each deadline is measured from the start of the previous
/// update, so a slow updater does not push later ticks back; one that overruns
/// its deadline is invoked again straight away. Runs on the calling task;
/// spawn it for concurrency. A zero interval is refused after the initial
/// update.
pub async fn poll_sensors<U>(
    token: &CancellationToken,
    updater: &mut U,
    interval: Duration,
    stdev: Duration,
) where
    U: Updater + ?Sized,
{
    if token.is_cancelled() {
        return;
    }

    let reference = Instant::now();
    updater.update(reference.elapsed()).await;

    if interval.is_zero() {
        warn!("Refusing to poll with a zero interval, sensors updated once");
        return;
    }

    let mut last_tick = reference;
    loop {
        let deadline = match last_tick.checked_add(jittered_interval(interval, stdev)) {
            Some(deadline) => deadline,
            None => {
                // Too far out to ever fire.
                token.cancelled().await;
                debug!("Polling stopped");
                break;
            }
        };
        tokio::select! {
            _ = token.cancelled() => {
                debug!("Polling stopped");
                break;
            }
            _ = tokio::time::sleep_until(deadline) => {
                let now = Instant::now();
                let elapsed = now.duration_since(last_tick);
                last_tick = now;
                updater.update(elapsed).await;
            }
        }
    }
}

/// Next delay for a poll of `interval` with jitter `stdev`.
pub fn jittered_interval(interval: Duration, stdev: Duration) -> Duration {
    jittered_interval_with(&mut rand::thread_rng(), interval, stdev)
}

/// Next delay drawn from `rng`.
///
/// The offset is clamped symmetrically to `±(interval - floor)`, where
/// `floor` is a tenth of the interval but at least [`MIN_TICK`], so the delay
/// is always positive and its mean stays at `interval`.
pub fn jittered_interval_with<R: Rng + ?Sized>(
    rng: &mut R,
    interval: Duration,
    stdev: Duration,
) -> Duration {
    if interval.is_zero() || stdev.is_zero() {
        return interval;
    }

    let floor = (interval / 10).max(MIN_TICK);
    let bound = interval.saturating_sub(floor).as_secs_f64();

    let normal = match Normal::new(0.0, stdev.as_secs_f64()) {
        Ok(n) => n,
        Err(_) => return interval,
    };
    let offset = normal.sample(rng).clamp(-bound, bound);

    // Intervals close to Duration::MAX can't take a positive offset.
    Duration::try_from_secs_f64(interval.as_secs_f64() + offset).unwrap_or(interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_stdev_is_exact() {
        let interval = Duration::from_secs(60);
        assert_eq!(jittered_interval(interval, Duration::ZERO), interval);
    }

    #[test]
    fn test_jitter_mean_and_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let interval = Duration::from_millis(100);
        let stdev = Duration::from_millis(20);
        let samples = 10_000;

        let mut total = 0.0;
        for _ in 0..samples {
            let d = jittered_interval_with(&mut rng, interval, stdev);
            assert!(d >= Duration::from_millis(10) - Duration::from_micros(1));
            assert!(d <= Duration::from_millis(190) + Duration::from_micros(1));
            total += d.as_secs_f64();
        }

        let mean = total / samples as f64;
        assert!((mean - 0.1).abs() < 0.002, "mean was {mean}");
    }

    #[test]
    fn test_large_stdev_never_goes_negative() {
        let mut rng = StdRng::seed_from_u64(7);
        let interval = Duration::from_millis(10);
        let stdev = Duration::from_secs(10);

        for _ in 0..1_000 {
            let d = jittered_interval_with(&mut rng, interval, stdev);
            assert!(d > Duration::ZERO);
            assert!(d < interval * 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_ticks_until_cancelled() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let mut updater = move |_elapsed: Duration| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        };

        let poll_token = token.clone();
        let handle = tokio::spawn(async move {
            poll_sensors(&poll_token, &mut updater, Duration::from_secs(1), Duration::ZERO).await;
        });

        tokio::time::sleep(Duration::from_millis(9500)).await;
        token.cancel();
        handle.await.unwrap();

        // Immediate update plus ticks at 1..=9s.
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_huge_interval_does_not_overflow() {
        let mut rng = StdRng::seed_from_u64(3);
        let interval = Duration::from_secs(u64::MAX);

        for _ in 0..100 {
            let d = jittered_interval_with(&mut rng, interval, Duration::from_secs(5));
            assert!(d > Duration::ZERO);
        }
        assert!(jittered_interval(interval, Duration::from_secs(5)) > Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_waits_for_cancel() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let mut updater = move |_elapsed: Duration| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {}
        };

        let poll_token = token.clone();
        let handle = tokio::spawn(async move {
            poll_sensors(&poll_token, &mut updater, Duration::from_secs(u64::MAX), Duration::from_secs(5)).await;
        });

        tokio::time::sleep(Duration::from_secs(60)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_updates_do_not_drift() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let mut updater = move |_elapsed: Duration| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(400)).await;
            }
        };

        let poll_token = token.clone();
        let handle = tokio::spawn(async move {
            poll_sensors(&poll_token, &mut updater, Duration::from_secs(1), Duration::ZERO).await;
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        token.cancel();
        handle.await.unwrap();

        // Ticks at 0, 1, 2 and 3s. Sleeping after each update would only
        // reach 0, 1.4 and 2.8s.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_reports_elapsed_since_last_tick() {
        let token = CancellationToken::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let recorded = seen.clone();
        let mut updater = move |elapsed: Duration| {
            recorded.lock().push(elapsed);
            async {}
        };

        let poll_token = token.clone();
        let handle = tokio::spawn(async move {
            poll_sensors(&poll_token, &mut updater, Duration::from_secs(1), Duration::ZERO).await;
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        token.cancel();
        handle.await.unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 4);
        assert!(seen[0] < Duration::from_millis(1));
        for elapsed in &seen[1..] {
            assert!(*elapsed >= Duration::from_secs(1));
            assert!(*elapsed < Duration::from_millis(1010));
        }
    }

    #[tokio::test]
    async fn test_zero_interval_updates_once() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let mut updater = move |_elapsed: Duration| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {}
        };

        poll_sensors(&token, &mut updater, Duration::ZERO, Duration::ZERO).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_updates() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let mut updater = move |_elapsed: Duration| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {}
        };

        poll_sensors(&token, &mut updater, Duration::from_secs(1), Duration::ZERO).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
