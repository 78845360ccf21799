use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Regular look-back for daytime runs.
pub const DEFAULT_WINDOW_HOURS: i64 = 4;

/// Look-back for runs before [`OVERNIGHT_END_HOUR`], covering the night.
pub const OVERNIGHT_WINDOW_HOURS: i64 = 12;

/// Local hour at which the overnight window stops applying.
pub const OVERNIGHT_END_HOUR: u32 = 10;

/// Upper bound on how far back a supplied last-run timestamp may reach.
pub const MAX_LOOKBACK_HOURS: i64 = 48;

/// The span of time a run summarizes. Messages older than `start` are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub tz: Tz,
}

impl TimeWindow {
    /// Compute the window for a run happening at `now`.
    ///
    /// A usable `last_run` wins over the default window. It is ignored when it
    /// lies in the future and clamped to [`MAX_LOOKBACK_HOURS`].
    #[must_use]
    pub fn resolve(now: DateTime<Utc>, last_run: Option<DateTime<Utc>>, tz: Tz) -> Self {
        let earliest = now - Duration::hours(MAX_LOOKBACK_HOURS);
        let start = match last_run {
            Some(last) if last >= now => {
                warn!("Ignoring last run time {} because it is not in the past", last);
                now - Duration::hours(default_window_hours(now, tz))
            }
            Some(last) if last < earliest => {
                warn!(
                    "Last run time {} is older than {} hours; summarizing from {} instead",
                    last, MAX_LOOKBACK_HOURS, earliest
                );
                earliest
            }
            Some(last) => last,
            None => now - Duration::hours(default_window_hours(now, tz)),
        };
        Self { start, end: now, tz }
    }

    #[must_use]
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.start
    }

    /// Window length in whole hours, rounded up.
    #[must_use]
    pub fn hours(&self) -> i64 {
        let minutes = (self.end - self.start).num_minutes().max(0);
        (minutes + 59) / 60
    }

    /// Human-readable range such as `03/14 08:00 - 03/14 12:00 (Asia/Hong_Kong)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{} - {} ({})",
            self.start.with_timezone(&self.tz).format("%m/%d %H:%M"),
            self.end.with_timezone(&self.tz).format("%m/%d %H:%M"),
            self.tz.name()
        )
    }
}

/// Default look-back in hours, which depends on the local time of day.
#[must_use]
pub fn default_window_hours(now: DateTime<Utc>, tz: Tz) -> i64 {
    if now.with_timezone(&tz).hour() < OVERNIGHT_END_HOUR {
        OVERNIGHT_WINDOW_HOURS
    } else {
        DEFAULT_WINDOW_HOURS
    }
}
