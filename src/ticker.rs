//! Fixed-step ticker
//!
//! A background frame loop accumulates elapsed time and calls the tick
//! callback once per whole interval accumulated, so ticks keep a steady rate
//! even when frames arrive late.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::warn;

/// Default tick interval: 60 ticks per second
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// How often the frame loop wakes up to accumulate time
const FRAME_INTERVAL: Duration = Duration::from_millis(4);

/// Data passed to every tick callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEvent {
    /// Time since the ticker was started, as of the current frame
    pub total: Duration,
    /// Interval between ticks at the time of this tick
    pub interval: Duration,
}

/// Time accumulator behind the ticker
#[derive(Debug, Default, Clone)]
pub struct FixedStep {
    accumulated: Duration,
}

impl FixedStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `elapsed` and returns how many whole intervals are now due
    pub fn advance(&mut self, elapsed: Duration, interval: Duration) -> u32 {
        if interval.is_zero() {
            return 0;
        }
        self.accumulated += elapsed;
        let mut due = 0;
        while self.accumulated >= interval {
            self.accumulated -= interval;
            due += 1;
        }
        due
    }

    /// Time accumulated towards the next tick
    pub fn remainder(&self) -> Duration {
        self.accumulated
    }
}

/// Calls a callback at a fixed rate on a background task
#[derive(Debug)]
pub struct Ticker {
    interval_nanos: Arc<AtomicU64>,
    running: Option<Running>,
}

#[derive(Debug)]
struct Running {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl Ticker {
    /// Creates a stopped ticker with the given minimum time between ticks
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_nanos: Arc::new(AtomicU64::new(duration_nanos(interval))),
            running: None,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_nanos.load(Ordering::Relaxed))
    }

    /// Changes the interval; a running ticker picks it up on its next frame.
    ///
    /// A zero interval never ticks.
    pub fn set_interval(&self, interval: Duration) {
        self.interval_nanos
            .store(duration_nanos(interval), Ordering::Relaxed);
    }

    /// Ticks per second; 0 when the ticker never ticks
    pub fn tps(&self) -> f64 {
        let interval = self.interval();
        if interval.is_zero() {
            return 0.0;
        }
        1.0 / interval.as_secs_f64()
    }

    /// Sets the ticks per second by changing the interval.
    ///
    /// `0` stops ticks from being emitted. Negative or non-finite rates are
    /// rejected and leave the interval unchanged.
    pub fn set_tps(&self, tps: f64) -> bool {
        if !tps.is_finite() || tps < 0.0 {
            warn!(tps, "Ignoring invalid tick rate");
            return false;
        }
        let interval = if tps == 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(1.0 / tps).unwrap_or(Duration::MAX)
        };
        self.set_interval(interval);
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Starts ticking; returns false and does nothing if already running
    pub fn start<F>(&mut self, mut on_tick: F) -> bool
    where
        F: FnMut(TickEvent) + Send + 'static,
    {
        if self.running.is_some() {
            warn!("Ticker is already running. Ignoring call.");
            return false;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let interval_nanos = Arc::clone(&self.interval_nanos);

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut previous = started;
            let mut step = FixedStep::new();
            let mut frames = tokio::time::interval(FRAME_INTERVAL);
            frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    now = frames.tick() => {
                        let interval = Duration::from_nanos(interval_nanos.load(Ordering::Relaxed));
                        let due = step.advance(now - previous, interval);
                        previous = now;

                        let event = TickEvent { total: now - started, interval };
                        for _ in 0..due {
                            on_tick(event);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        self.running = Some(Running {
            shutdown_tx,
            handle,
        });
        true
    }

    /// Stops the ticker and waits for the frame loop to exit
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown_tx.send(()).await;
            let _ = running.handle.await;
        }
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_fixed_step_emits_whole_intervals() {
        let mut step = FixedStep::new();
        let interval = Duration::from_millis(10);

        assert_eq!(step.advance(Duration::from_millis(4), interval), 0);
        assert_eq!(step.advance(Duration::from_millis(7), interval), 1);
        assert_eq!(step.remainder(), Duration::from_millis(1));
        assert_eq!(step.advance(Duration::from_millis(29), interval), 3);
        assert_eq!(step.remainder(), Duration::ZERO);
    }

    #[test]
    fn test_fixed_step_zero_interval_never_ticks() {
        let mut step = FixedStep::new();
        assert_eq!(step.advance(Duration::from_secs(1), Duration::ZERO), 0);
    }

    #[test]
    fn test_tps_round_trips_interval() {
        let ticker = Ticker::new(Duration::from_millis(20));
        assert!((ticker.tps() - 50.0).abs() < 1e-9);

        assert!(ticker.set_tps(100.0));
        assert_eq!(ticker.interval(), Duration::from_millis(10));
    }

    #[test]
    fn test_zero_tps_never_ticks() {
        let ticker = Ticker::default();
        assert!(ticker.set_tps(0.0));
        assert_eq!(ticker.interval(), Duration::ZERO);
        assert_eq!(ticker.tps(), 0.0);

        let mut step = FixedStep::new();
        assert_eq!(step.advance(Duration::from_secs(10), ticker.interval()), 0);
    }

    #[test]
    fn test_invalid_tps_is_rejected() {
        let ticker = Ticker::new(Duration::from_millis(20));
        assert!(!ticker.set_tps(-5.0));
        assert!(!ticker.set_tps(f64::NAN));
        assert!(!ticker.set_tps(f64::INFINITY));
        assert_eq!(ticker.interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_huge_intervals_saturate() {
        let ticker = Ticker::new(Duration::MAX);
        assert_eq!(ticker.interval(), Duration::from_nanos(u64::MAX));

        assert!(ticker.set_tps(1e-300));
        assert_eq!(ticker.interval(), Duration::from_nanos(u64::MAX));
    }

    #[test]
    fn test_default_is_sixty_tps() {
        let ticker = Ticker::default();
        assert!((ticker.tps() - 60.0).abs() < 1e-6);
        assert!(!ticker.is_running());
    }

    #[tokio::test]
    async fn test_start_ticks_until_stopped() {
        let mut ticker = Ticker::new(Duration::from_millis(5));
        let ticks = Arc::new(AtomicUsize::new(0));

        let t = Arc::clone(&ticks);
        assert!(ticker.start(move |event| {
            assert_eq!(event.interval, Duration::from_millis(5));
            t.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(ticker.is_running());
        assert!(!ticker.start(|_| {}), "second start should be ignored");

        tokio::time::sleep(Duration::from_millis(100)).await;
        ticker.stop().await;
        assert!(!ticker.is_running());

        let after_stop = ticks.load(Ordering::SeqCst);
        assert!(after_stop > 0, "ticker should have ticked");

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let mut ticker = Ticker::default();
        ticker.stop().await;
        assert!(!ticker.is_running());
    }
}
