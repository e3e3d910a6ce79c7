//! Local wall-clock derived from a place's UTC offset.
//!
//! [`start_clock`] delivers one formatted tick right away and then one per
//! [`TICK_PERIOD`] until the returned [`ClockHandle`] is cancelled or dropped.
//! [`ClockSlot`] keeps at most one clock alive at a time.

use std::{fmt::Debug, sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Where "now" comes from.
pub trait TimeSource: Send + Sync + Debug {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A time source frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedTime(pub DateTime<Utc>);

impl TimeSource for FixedTime {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// `HH:MM:SS` of `now + offset`.
pub fn format_time_of_day(now: DateTime<Utc>, offset_seconds: i32) -> String {
    (now + TimeDelta::seconds(i64::from(offset_seconds)))
        .format("%H:%M:%S")
        .to_string()
}

/// `HH:MM` of a UTC epoch shifted by `offset`; used for sunrise and sunset.
pub fn format_hour_minute(epoch_seconds: i64, offset_seconds: i32) -> String {
    DateTime::from_timestamp(epoch_seconds.saturating_add(i64::from(offset_seconds)), 0)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// Handle to a running clock. Cancelling (or dropping) it stops the ticks.
#[derive(Debug)]
pub struct ClockHandle {
    offset_seconds: i32,
    cancelled: Arc<Mutex<bool>>,
    task: AbortHandle,
}

impl ClockHandle {
    pub fn offset_seconds(&self) -> i32 {
        self.offset_seconds
    }

    /// Once this returns the sink is not called again, even from another worker thread.
    pub fn cancel(&self) {
        *self.cancelled.lock() = true;
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock()
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start ticking local time for `offset_seconds`.
///
/// The first tick is passed to `sink` before this function returns. The sink
/// runs under the clock's cancel lock, so it must not cancel its own clock.
/// Must be called from within a tokio runtime.
pub fn start_clock<F>(offset_seconds: i32, time: Arc<dyn TimeSource>, sink: F) -> ClockHandle
where
    F: Fn(String) + Send + 'static,
{
    sink(format_time_of_day(time.now_utc(), offset_seconds));

    let cancelled = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&cancelled);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let text = format_time_of_day(time.now_utc(), offset_seconds);

            let stopped = flag.lock();
            if *stopped {
                break;
            }
            sink(text);
        }
    });

    ClockHandle {
        offset_seconds,
        cancelled,
        task: task.abort_handle(),
    }
}

/// Holds the single active clock.
#[derive(Debug, Default)]
pub struct ClockSlot {
    current: Option<ClockHandle>,
}

impl ClockSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the running clock, if any, then start a new one.
    pub fn restart<F>(&mut self, offset_seconds: i32, time: Arc<dyn TimeSource>, sink: F)
    where
        F: Fn(String) + Send + 'static,
    {
        self.cancel();
        self.current = Some(start_clock(offset_seconds, time, sink));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.cancel();
        }
    }

    pub fn offset_seconds(&self) -> Option<i32> {
        self.current.as_ref().map(ClockHandle::offset_seconds)
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }
}
