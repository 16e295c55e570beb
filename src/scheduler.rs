use crate::config::ConfigError;
use anyhow::Result;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use log::{debug, error, info};
use std::future::Future;
use tokio::select;
use tokio_util::sync::CancellationToken;

/// Minutes between two refreshes. Always divides an hour, so every hour starts
/// with a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateInterval(u32);

impl UpdateInterval {
    pub fn new(minutes: u32) -> Result<Self, ConfigError> {
        if minutes == 0 || 60 % minutes != 0 {
            return Err(ConfigError::InvalidInterval(minutes));
        }

        Ok(Self(minutes))
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }
}

/// When the next refresh is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTick {
    pub scheduled_time: NaiveDateTime,
    pub interval_minutes: u32,
}

impl RefreshTick {
    pub fn after(now: NaiveDateTime, interval: UpdateInterval) -> Self {
        Self {
            scheduled_time: next_wake(now, interval),
            interval_minutes: interval.minutes(),
        }
    }
}

/// The first interval boundary strictly after `now`, seconds zeroed.
pub fn next_wake(now: NaiveDateTime, interval: UpdateInterval) -> NaiveDateTime {
    let interval = interval.minutes() as i64;
    let minutes_since_midnight = (now.hour() * 60 + now.minute()) as i64;
    let next_slot = (minutes_since_midnight / interval + 1) * interval;

    // Past 23:xx this lands on midnight of the following day
    now.date().and_time(NaiveTime::MIN) + Duration::minutes(next_slot)
}

/// Source of wall clock time and the one place the scheduler suspends.
pub trait Clock {
    /// Local wall clock time
    fn now(&self) -> NaiveDateTime;

    /// Suspends until the wall clock shows `deadline`.
    fn sleep_until(&self, deadline: NaiveDateTime) -> impl Future<Output = ()> + Send;
}

/// Real time left until the wall clock of `now`'s zone shows `deadline`.
///
/// Daylight saving changes between the two are accounted for. A deadline
/// skipped by the clock moving forward falls back to the wall clock difference.
pub fn time_until<Z: TimeZone>(deadline: NaiveDateTime, now: &DateTime<Z>) -> std::time::Duration {
    let remaining = now
        .timezone()
        .from_local_datetime(&deadline)
        .earliest()
        .map(|deadline| deadline.signed_duration_since(now.clone()))
        .unwrap_or_else(|| deadline - now.naive_local());

    remaining.to_std().unwrap_or(std::time::Duration::ZERO)
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep_until(&self, deadline: NaiveDateTime) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(time_until(deadline, &Local::now()))
    }
}

/// Decides which cycles flush the panel before drawing. Each configured hour
/// calibrates at most once per day.
#[derive(Debug, Clone)]
pub struct CalibrationPolicy {
    hours: Vec<u32>,
    last: Option<(NaiveDate, u32)>,
}

impl CalibrationPolicy {
    pub fn new(hours: Vec<u32>) -> Self {
        Self { hours, last: None }
    }

    /// Whether the cycle starting at `now` calibrates. A `true` answer is
    /// remembered, so the same hour is not calibrated again.
    pub fn due(&mut self, now: NaiveDateTime) -> bool {
        let slot = (now.date(), now.hour());

        if !self.hours.contains(&now.hour()) || self.last == Some(slot) {
            return false;
        }

        self.last = Some(slot);
        true
    }
}

/// A full refresh of the dashboard.
pub trait Cycle {
    /// Runs one cycle. Blocks for network and panel IO.
    fn run(&mut self, now: NaiveDateTime, calibrate: bool) -> Result<()>;
}

pub struct Scheduler<C, Y> {
    clock: C,
    interval: UpdateInterval,
    calibration: CalibrationPolicy,
    cycle: Y,

    /// Successful cycles since the last failure
    streak: usize,
}

impl<C: Clock, Y: Cycle> Scheduler<C, Y> {
    pub fn new(clock: C, interval: UpdateInterval, calibration: CalibrationPolicy, cycle: Y) -> Self {
        Self {
            clock,
            interval,
            calibration,
            cycle,
            streak: 0,
        }
    }

    pub fn cycle(&self) -> &Y {
        &self.cycle
    }

    pub fn into_cycle(self) -> Y {
        self.cycle
    }

    /// Refreshes right away and then on every interval boundary until `cancel`
    /// fires. Needs a multi threaded runtime, cycles run in place on a worker.
    pub async fn run(&mut self, cancel: CancellationToken) {
        let Self {
            clock,
            interval,
            calibration,
            cycle,
            streak,
        } = self;

        loop {
            let now = clock.now();
            let calibrate = calibration.due(now);

            info!("Refresh cycle started at {}", now.format("%Y-%m-%d %H:%M:%S"));
            match tokio::task::block_in_place(|| cycle.run(now, calibrate)) {
                Ok(()) => {
                    *streak += 1;
                    info!("No errors since {} updates", streak);
                }
                Err(e) => {
                    *streak = 0;
                    error!("Refresh cycle failed: {e:#}");
                }
            }

            let tick = RefreshTick::after(clock.now(), *interval);
            info!(
                "Next refresh at {} ({} minute interval)",
                tick.scheduled_time.format("%H:%M"),
                tick.interval_minutes
            );

            select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("Scheduler cancelled");
                    break;
                }
                _ = clock.sleep_until(tick.scheduled_time) => {}
            }
        }
    }
}
