//! Periodic sampling with overlap coalescing
//!
//! The timer fires at a fixed period. If the previous tick's handler is still
//! running when the timer fires, that tick is dropped rather than queued, so
//! a slow handler lowers the effective rate without building a backlog.
//!
//! Jitter shifts only the first deadline after each (re)start; the period
//! itself is fixed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{Error, Result};

pub const MIN_INTERVAL: Duration = Duration::from_millis(50);
pub const MAX_JITTER_FRACTION: f64 = 0.2;

/// Work performed on every tick
#[async_trait]
pub trait TickHandler: Send + Sync + 'static {
    async fn on_tick(&self);
}

/// Offset of the first deadline from now.
///
/// `unit` in `[-1, 1]` selects where inside `interval ± interval * jitter`
/// the deadline lands.
pub fn first_deadline_offset(interval: Duration, jitter_fraction: f64, unit: f64) -> Duration {
    let spread = interval.as_secs_f64() * jitter_fraction * unit.clamp(-1.0, 1.0);
    Duration::from_secs_f64((interval.as_secs_f64() + spread).max(0.0))
}

fn clamp_interval(interval: Duration) -> Duration {
    interval.max(MIN_INTERVAL)
}

fn clamp_jitter(fraction: f64) -> f64 {
    if fraction.is_nan() {
        return 0.0;
    }
    fraction.clamp(0.0, MAX_JITTER_FRACTION)
}

#[derive(Debug, Default)]
struct TickStats {
    completed: AtomicU64,
    dropped: AtomicU64,
}

pub struct SamplingScheduler {
    interval: Mutex<Duration>,
    jitter_fraction: f64,
    handler: Arc<dyn TickHandler>,
    timer: Mutex<Option<JoinHandle<()>>>,
    // Shared across restarts; cleared only by `stop`
    in_flight: Arc<AtomicBool>,
    stats: Arc<TickStats>,
}

impl SamplingScheduler {
    /// `interval` is raised to at least 50 ms, `jitter_fraction` clamped to `[0, 0.2]`
    pub fn new(interval: Duration, jitter_fraction: f64, handler: Arc<dyn TickHandler>) -> Self {
        Self {
            interval: Mutex::new(clamp_interval(interval)),
            jitter_fraction: clamp_jitter(jitter_fraction),
            handler,
            timer: Mutex::new(None),
            in_flight: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(TickStats::default()),
        }
    }

    pub fn interval(&self) -> Duration {
        *self.interval.lock()
    }

    pub fn jitter_fraction(&self) -> f64 {
        self.jitter_fraction
    }

    pub fn is_running(&self) -> bool {
        self.timer.lock().is_some()
    }

    /// Handler invocations that ran to completion
    pub fn completed_ticks(&self) -> u64 {
        self.stats.completed.load(Ordering::Relaxed)
    }

    /// Timer firings skipped because a handler was still running
    pub fn dropped_ticks(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }

    /// Start (or restart) the timer on the current tokio runtime
    pub fn start(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| Error::not_available("sampling requires a tokio runtime"))?;

        let mut running = self.timer.lock();
        if let Some(previous) = running.take() {
            previous.abort();
        }

        let interval = self.interval();
        let unit = if self.jitter_fraction > 0.0 { rand::thread_rng().gen_range(-1.0..=1.0) } else { 0.0 };
        let first = Instant::now() + first_deadline_offset(interval, self.jitter_fraction, unit);

        let timer = runtime.spawn(run_timer(
            first,
            interval,
            self.handler.clone(),
            self.in_flight.clone(),
            self.stats.clone(),
        ));

        tracing::info!(interval_ms = interval.as_millis() as u64, "sampling started");
        *running = Some(timer);
        Ok(())
    }

    /// Change the period; a running timer is restarted with a new first deadline.
    /// A handler still running from before the restart keeps later ticks dropped.
    pub fn update_interval(&self, interval: Duration) -> Result<()> {
        *self.interval.lock() = clamp_interval(interval);
        if self.is_running() {
            self.start()?;
        }
        Ok(())
    }

    /// Cancel the timer. Handlers already running finish on their own.
    pub fn stop(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
            self.in_flight.store(false, Ordering::Release);
            tracing::info!("sampling stopped");
        }
    }
}

impl Drop for SamplingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_timer(
    first: Instant,
    period: Duration,
    handler: Arc<dyn TickHandler>,
    in_flight: Arc<AtomicBool>,
    stats: Arc<TickStats>,
) {
    let mut ticker = tokio::time::interval_at(first, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        if in_flight.swap(true, Ordering::AcqRel) {
            stats.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("previous tick still running, dropping");
            continue;
        }

        let handler = handler.clone();
        let in_flight = in_flight.clone();
        let stats = stats.clone();
        tokio::spawn(async move {
            let _release = scopeguard::guard((), |_| in_flight.store(false, Ordering::Release));
            handler.on_tick().await;
            stats.completed.fetch_add(1, Ordering::Relaxed);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowHandler {
        duration: Duration,
        started: AtomicU64,
        active: AtomicU64,
        max_active: AtomicU64,
    }

    #[async_trait]
    impl TickHandler for SlowHandler {
        async fn on_tick(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            tokio::time::sleep(self.duration).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn slow(duration: Duration) -> Arc<SlowHandler> {
        Arc::new(SlowHandler {
            duration,
            started: AtomicU64::new(0),
            active: AtomicU64::new(0),
            max_active: AtomicU64::new(0),
        })
    }

    #[test]
    fn test_first_deadline_offset() {
        let interval = Duration::from_secs(1);
        assert_eq!(first_deadline_offset(interval, 0.1, 0.0), interval);
        assert_eq!(first_deadline_offset(interval, 0.1, 1.0), Duration::from_millis(1100));
        assert_eq!(first_deadline_offset(interval, 0.2, -1.0), Duration::from_millis(800));
        assert_eq!(first_deadline_offset(interval, 0.2, -5.0), Duration::from_millis(800));
    }

    #[test]
    fn test_interval_and_jitter_clamped() {
        let scheduler = SamplingScheduler::new(Duration::from_millis(5), 0.9, slow(Duration::ZERO));
        assert_eq!(scheduler.interval(), MIN_INTERVAL);
        assert_eq!(scheduler.jitter_fraction(), MAX_JITTER_FRACTION);

        let scheduler = SamplingScheduler::new(Duration::from_secs(1), -0.5, slow(Duration::ZERO));
        assert_eq!(scheduler.jitter_fraction(), 0.0);
    }

    #[test]
    fn test_start_without_runtime_fails() {
        let scheduler = SamplingScheduler::new(Duration::from_secs(1), 0.0, slow(Duration::ZERO));
        assert!(matches!(scheduler.start(), Err(Error::NotAvailable(_))));
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_handler_ticks_are_dropped() {
        let handler = slow(Duration::from_millis(250));
        let scheduler = SamplingScheduler::new(Duration::from_millis(50), 0.0, handler.clone());
        scheduler.start().unwrap();

        let run = Duration::from_secs(1);
        tokio::time::sleep(run).await;
        scheduler.stop();

        let bound = (run.as_millis() / 250) as u64 + 1;
        assert!(scheduler.completed_ticks() >= 1);
        assert!(scheduler.completed_ticks() <= bound, "{} completions", scheduler.completed_ticks());
        assert!(handler.started.load(Ordering::SeqCst) <= bound);
        assert!(scheduler.dropped_ticks() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_handler_runs_every_period() {
        let handler = slow(Duration::ZERO);
        let scheduler = SamplingScheduler::new(Duration::from_millis(100), 0.0, handler.clone());
        scheduler.start().unwrap();

        tokio::time::sleep(Duration::from_millis(550)).await;
        scheduler.stop();
        tokio::task::yield_now().await;

        assert_eq!(handler.started.load(Ordering::SeqCst), 5);
        assert_eq!(scheduler.dropped_ticks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_and_halts_ticks() {
        let handler = slow(Duration::ZERO);
        let scheduler = SamplingScheduler::new(Duration::from_millis(100), 0.1, handler.clone());
        scheduler.start().unwrap();
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(350)).await;
        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_running());

        let after_stop = handler.started.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handler.started.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_interval_restarts_running_timer() {
        let handler = slow(Duration::ZERO);
        let scheduler = SamplingScheduler::new(Duration::from_secs(1), 0.0, handler.clone());
        scheduler.update_interval(Duration::from_millis(200)).unwrap();
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.interval(), Duration::from_millis(200));

        scheduler.start().unwrap();
        scheduler.update_interval(Duration::from_millis(100)).unwrap();
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(450)).await;
        scheduler.stop();
        tokio::task::yield_now().await;
        assert_eq!(handler.started.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_interval_keeps_slow_handler_exclusive() {
        let handler = slow(Duration::from_millis(1000));
        let scheduler = SamplingScheduler::new(Duration::from_millis(100), 0.0, handler.clone());
        scheduler.start().unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(handler.started.load(Ordering::SeqCst), 1);
        scheduler.update_interval(Duration::from_millis(100)).unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        scheduler.stop();

        assert_eq!(handler.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(handler.started.load(Ordering::SeqCst), 1);
        assert!(scheduler.dropped_ticks() >= 2);
    }
}
