//! # Scheduled Clock
//!
//! Emits "now" timestamps at a configurable cadence on a background tokio task.
//!
//! Two strategies, picked from the interval alone:
//! - **FrameThrottled** (interval < 1000 ms): wakes once per display frame
//!   (60 Hz) and only surfaces a timestamp once `interval` has elapsed since
//!   the previous one.
//! - **Timer** (interval >= 1000 ms): sleeps until the next deadline, with
//!   deadlines laid out on a fixed grid so the cadence does not drift.
//!
//! Callers only see `start`/`stop`. Stopping aborts the task at once; the
//! sink is never called after `stop` returns or after the clock is dropped.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate, Utc};
use log::{debug, info, trace};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Default cadence for the primary live counter
pub const DEFAULT_INTERVAL_MS: u64 = 50;

/// Cadence for low-frequency displays such as the week grid
pub const LOW_FREQUENCY_INTERVAL_MS: u64 = 60_000;

/// Intervals at or above this use the timer strategy
pub const TIMER_THRESHOLD_MS: u64 = 1000;

/// One display frame at 60 Hz
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Source of wall-clock "now" values
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date of `now` in the system local timezone
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

/// Wall clock anchored to a monotonic instant.
///
/// Readings never go backwards even if the system clock is adjusted, and they
/// follow tokio's paused clock in tests.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTimeSource {
    anchor_wall: DateTime<Utc>,
    anchor: Instant,
}

impl MonotonicTimeSource {
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    pub fn anchored_at(anchor_wall: DateTime<Utc>) -> Self {
        Self {
            anchor_wall,
            anchor: Instant::now(),
        }
    }
}

impl Default for MonotonicTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTimeSource {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = ChronoDuration::from_std(self.anchor.elapsed()).unwrap_or_else(|_| ChronoDuration::zero());
        self.anchor_wall + elapsed
    }
}

/// Always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub DateTime<Utc>);

impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStrategy {
    FrameThrottled,
    Timer,
}

impl ClockStrategy {
    pub fn for_interval(interval_ms: u64) -> Self {
        if interval_ms < TIMER_THRESHOLD_MS {
            ClockStrategy::FrameThrottled
        } else {
            ClockStrategy::Timer
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("Clock already running - call stop() first")]
    AlreadyRunning,
    #[error("Clock not running - call start() first")]
    NotRunning,
    #[error("Clock needs a tokio runtime to schedule ticks")]
    NoRuntime,
}

/// Periodic "now" emitter with frame-throttled and timer strategies
pub struct ScheduledClock {
    interval: Duration,
    time_source: Arc<dyn TimeSource>,
    active: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ScheduledClock {
    pub fn new(interval_ms: u64, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            time_source,
            active: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }

    pub fn strategy(&self) -> ClockStrategy {
        ClockStrategy::for_interval(self.interval_ms())
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst) && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start emitting into `sink`. Must be called from within a tokio runtime.
    pub fn start<F>(&mut self, sink: F) -> Result<(), ClockError>
    where
        F: Fn(DateTime<Utc>) + Send + Sync + 'static,
    {
        if self.is_running() {
            return Err(ClockError::AlreadyRunning);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ClockError::NoRuntime)?;

        // fresh flag so a previously aborted task can never see it flip back on
        self.active = Arc::new(AtomicBool::new(true));

        let ticker = Ticker {
            interval: self.interval,
            time_source: Arc::clone(&self.time_source),
            active: Arc::clone(&self.active),
            last_emitted: None,
            sink: Box::new(sink),
        };

        let strategy = self.strategy();
        self.task = Some(match strategy {
            ClockStrategy::FrameThrottled => runtime.spawn(ticker.run_frames()),
            ClockStrategy::Timer => runtime.spawn(ticker.run_timer()),
        });

        info!("Clock started: interval={}ms strategy={:?}", self.interval_ms(), strategy);
        Ok(())
    }

    /// Cancel all pending ticks immediately
    pub fn stop(&mut self) -> Result<(), ClockError> {
        if self.task.is_none() {
            return Err(ClockError::NotRunning);
        }
        self.cancel();
        info!("Clock stopped: interval={}ms", self.interval_ms());
        Ok(())
    }

    fn cancel(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ScheduledClock {
    fn drop(&mut self) {
        if self.task.is_some() {
            debug!("Clock dropped while running, cancelling");
            self.cancel();
        }
    }
}

/// State owned by the background task
struct Ticker {
    interval: Duration,
    time_source: Arc<dyn TimeSource>,
    active: Arc<AtomicBool>,
    last_emitted: Option<DateTime<Utc>>,
    sink: Box<dyn Fn(DateTime<Utc>) + Send + Sync>,
}

impl Ticker {
    async fn run_frames(mut self) {
        let mut frames = tokio::time::interval(FRAME_INTERVAL);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_surfaced = Instant::now();

        loop {
            frames.tick().await;
            if !self.active.load(Ordering::SeqCst) {
                break;
            }
            let frame_at = Instant::now();
            if frame_at.duration_since(last_surfaced) >= self.interval {
                last_surfaced = frame_at;
                self.emit();
            }
        }
    }

    async fn run_timer(mut self) {
        let mut deadline = Instant::now() + self.interval;

        loop {
            tokio::time::sleep_until(deadline).await;
            if !self.active.load(Ordering::SeqCst) {
                break;
            }
            self.emit();

            deadline += self.interval;
            let now = Instant::now();
            if deadline <= now {
                // woke up late (e.g. after suspend): resume from here
                deadline = now + self.interval;
            }
        }
    }

    fn emit(&mut self) {
        let reading = self.time_source.now();
        let now = match self.last_emitted {
            Some(previous) if reading < previous => previous,
            _ => reading,
        };
        self.last_emitted = Some(now);
        trace!("tick {}", now);
        (self.sink)(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn recording_sink() -> (Arc<Mutex<Vec<DateTime<Utc>>>>, impl Fn(DateTime<Utc>) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        (seen, move |now| sink_seen.lock().unwrap().push(now))
    }

    fn monotonic() -> Arc<dyn TimeSource> {
        Arc::new(MonotonicTimeSource::new())
    }

    #[test]
    fn test_strategy_threshold() {
        assert_eq!(ClockStrategy::for_interval(50), ClockStrategy::FrameThrottled);
        assert_eq!(ClockStrategy::for_interval(999), ClockStrategy::FrameThrottled);
        assert_eq!(ClockStrategy::for_interval(1000), ClockStrategy::Timer);
        assert_eq!(ClockStrategy::for_interval(60_000), ClockStrategy::Timer);
    }

    #[test]
    fn test_start_without_runtime_fails() {
        let mut clock = ScheduledClock::new(50, monotonic());
        let (_seen, sink) = recording_sink();

        assert!(matches!(clock.start(sink), Err(ClockError::NoRuntime)));
        assert!(!clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_strategy_is_throttled_to_interval() {
        let mut clock = ScheduledClock::new(50, monotonic());
        let (seen, sink) = recording_sink();

        clock.start(sink).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        clock.stop().unwrap();

        let seen = seen.lock().unwrap().clone();
        assert!(
            (8..=15).contains(&seen.len()),
            "expected 8..=15 emissions in 500ms, got {}",
            seen.len()
        );
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]), "timestamps must be distinct and increasing");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_strategy_emits_once_per_interval() {
        let mut clock = ScheduledClock::new(1000, monotonic());
        let (seen, sink) = recording_sink();

        clock.start(sink).unwrap();
        assert_eq!(clock.strategy(), ClockStrategy::Timer);
        tokio::time::sleep(Duration::from_millis(3500)).await;
        clock.stop().unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        let gaps: Vec<_> = seen.windows(2).map(|pair| (pair[1] - pair[0]).num_milliseconds()).collect();
        assert_eq!(gaps, vec![1000, 1000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_emissions() {
        let mut clock = ScheduledClock::new(50, monotonic());
        let (seen, sink) = recording_sink();

        clock.start(sink).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        clock.stop().unwrap();
        let before = seen.lock().unwrap().len();
        assert!(before > 0);
        assert!(!clock.is_running());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(seen.lock().unwrap().len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_ticks() {
        let (seen, sink) = recording_sink();
        {
            let mut clock = ScheduledClock::new(1000, monotonic());
            clock.start(sink).unwrap();
            tokio::time::sleep(Duration::from_millis(1500)).await;
        }
        let before = seen.lock().unwrap().len();
        assert_eq!(before, 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(seen.lock().unwrap().len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_is_rejected_and_restart_works() {
        let mut clock = ScheduledClock::new(50, monotonic());
        let (_seen, sink) = recording_sink();
        let (_other, other_sink) = recording_sink();

        clock.start(sink).unwrap();
        assert!(clock.is_running());
        assert!(matches!(clock.start(other_sink), Err(ClockError::AlreadyRunning)));

        clock.stop().unwrap();
        assert!(matches!(clock.stop(), Err(ClockError::NotRunning)));

        let (seen, sink) = recording_sink();
        clock.start(sink).unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_emissions_never_go_backwards() {
        struct Jumpy(Mutex<Vec<DateTime<Utc>>>);
        impl TimeSource for Jumpy {
            fn now(&self) -> DateTime<Utc> {
                self.0.lock().unwrap().pop().unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap())
            }
        }
        let base = Utc.timestamp_opt(0, 0).unwrap() + ChronoDuration::days(10);
        // popped from the back: base+2s, then base (backwards), then base+3s
        let readings = vec![base + ChronoDuration::seconds(3), base, base + ChronoDuration::seconds(2)];
        let mut clock = ScheduledClock::new(1000, Arc::new(Jumpy(Mutex::new(readings))));
        let (seen, sink) = recording_sink();

        clock.start(sink).unwrap();
        tokio::time::sleep(Duration::from_millis(3100)).await;
        clock.stop().unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                base + ChronoDuration::seconds(2),
                base + ChronoDuration::seconds(2),
                base + ChronoDuration::seconds(3)
            ]
        );
    }
}
