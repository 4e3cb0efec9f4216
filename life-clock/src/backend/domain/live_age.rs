//! Live age state: a clock driving the age calculator and insights.
//!
//! Subscribers get a `watch` channel that only wakes when the displayed
//! instant actually moves.

use super::age::{compute_age_in, compute_age_local};
use super::clock::{ClockError, ScheduledClock, TimeSource, DEFAULT_INTERVAL_MS};
use super::insights::compute_insights;
use chrono::{DateTime, FixedOffset, Utc};
use log::{debug, info};
use shared::{AgeBreakdown, BirthInstant, LifeInsights, TargetAge};
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// One consistent reading of the live counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveAge {
    pub now: DateTime<Utc>,
    pub age: AgeBreakdown,
    pub insights: LifeInsights,
}

/// Derive age and insights for `now` in the local timezone
pub fn derive_live_age(birth: &BirthInstant, target_age: TargetAge, now: DateTime<Utc>) -> LiveAge {
    let age = compute_age_local(birth, now);
    LiveAge {
        now,
        age,
        insights: compute_insights(&age, target_age),
    }
}

/// Same as [`derive_live_age`] but in a fixed offset
pub fn derive_live_age_in(birth: &BirthInstant, target_age: TargetAge, now: DateTime<Utc>, offset: &FixedOffset) -> LiveAge {
    let age = compute_age_in(birth, now, offset);
    LiveAge {
        now,
        age,
        insights: compute_insights(&age, target_age),
    }
}

/// Zero-pad a counter for display, e.g. `pad(7, 2) == "07"`
pub fn pad(value: impl Display, width: usize) -> String {
    format!("{:0>width$}", value.to_string(), width = width)
}

/// Owns the scheduled clock and the current [`LiveAge`].
///
/// Changing birth, target age or interval stops the running clock before a
/// new one is started, so at most one clock feeds the state at any time.
pub struct LiveAgeController {
    birth: Option<BirthInstant>,
    target_age: TargetAge,
    interval_ms: u64,
    offset: Option<FixedOffset>,
    time_source: Arc<dyn TimeSource>,
    state: Arc<watch::Sender<Option<LiveAge>>>,
    generation: Arc<AtomicU64>,
    clock: Option<ScheduledClock>,
}

impl LiveAgeController {
    pub fn new(time_source: Arc<dyn TimeSource>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            birth: None,
            target_age: TargetAge::default(),
            interval_ms: DEFAULT_INTERVAL_MS,
            offset: None,
            time_source,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            clock: None,
        }
    }

    pub fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Compute in a fixed offset instead of the system local timezone
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn birth(&self) -> Option<BirthInstant> {
        self.birth
    }

    pub fn target_age(&self) -> TargetAge {
        self.target_age
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn is_ticking(&self) -> bool {
        self.clock.as_ref().is_some_and(|clock| clock.is_running())
    }

    /// Set or clear the birth instant. Clearing stops the clock and empties the state.
    pub fn set_birth(&mut self, birth: Option<BirthInstant>) -> Result<(), ClockError> {
        self.birth = birth;
        self.restart()
    }

    pub fn set_target_age(&mut self, target_age: TargetAge) -> Result<(), ClockError> {
        self.target_age = target_age;
        self.restart()
    }

    pub fn set_interval(&mut self, interval_ms: u64) -> Result<(), ClockError> {
        self.interval_ms = interval_ms;
        self.restart()
    }

    /// Stop ticking but keep the last snapshot
    pub fn stop(&mut self) {
        self.halt();
    }

    pub fn snapshot(&self) -> Option<LiveAge> {
        *self.state.borrow()
    }

    pub fn age(&self) -> Option<AgeBreakdown> {
        self.snapshot().map(|live| live.age)
    }

    pub fn insights(&self) -> Option<LifeInsights> {
        self.snapshot().map(|live| live.insights)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<LiveAge>> {
        self.state.subscribe()
    }

    fn halt(&mut self) {
        // invalidate any sink still in flight before aborting its task
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(mut clock) = self.clock.take() {
            if clock.stop().is_err() {
                debug!("Live age clock was already stopped");
            }
        }
    }

    fn restart(&mut self) -> Result<(), ClockError> {
        self.halt();

        let Some(birth) = self.birth else {
            self.state.send_replace(None);
            debug!("No birth instant set, live age cleared");
            return Ok(());
        };

        let target_age = self.target_age;
        let offset = self.offset;
        let derive = move |now: DateTime<Utc>| match offset {
            Some(offset) => derive_live_age_in(&birth, target_age, now, &offset),
            None => derive_live_age(&birth, target_age, now),
        };

        self.state.send_replace(Some(derive(self.time_source.now())));

        let generation = self.generation.load(Ordering::SeqCst);
        let current_generation = Arc::clone(&self.generation);
        let state = Arc::clone(&self.state);
        let sink = move |now: DateTime<Utc>| {
            if current_generation.load(Ordering::SeqCst) != generation {
                return;
            }
            state.send_if_modified(|current| {
                if current.is_some_and(|live| live.now == now) {
                    return false;
                }
                *current = Some(derive(now));
                true
            });
        };

        let mut clock = ScheduledClock::new(self.interval_ms, Arc::clone(&self.time_source));
        clock.start(sink)?;
        self.clock = Some(clock);

        info!(
            "Live age ticking: birth={} target_age={} interval={}ms",
            birth.naive(),
            target_age,
            self.interval_ms
        );
        Ok(())
    }
}

impl Drop for LiveAgeController {
    fn drop(&mut self) {
        self.halt();
    }
}
