// Window phase classification
use crate::clock::Clock;
use crate::error::Result;
use crate::models::{Phase, TimeWindow, WindowState};
use chrono::{DateTime, Duration, Utc};

/// Classify `window` at `now`
///
/// `start_time` belongs to Active and `end_time` belongs to Ended, so a
/// zero-length window goes straight from Upcoming to Ended. Fails with
/// `InvalidWindow` for a negative or non-finite duration.
pub fn compute_state(window: &TimeWindow, now: DateTime<Utc>) -> Result<WindowState> {
    let start = window.start_time;
    let end = window.end_time()?;

    if now < start {
        return Ok(WindowState::upcoming(millis_until(now, start)));
    }

    if now >= end {
        return Ok(WindowState::ended());
    }

    Ok(WindowState::active(
        millis_until(now, end),
        millis_between(start, now),
    ))
}

pub fn phase_at(window: &TimeWindow, now: DateTime<Utc>) -> Result<Phase> {
    compute_state(window, now).map(|state| state.phase)
}

/// Classify `window` at the clock's current time
pub fn current_state(window: &TimeWindow, clock: &dyn Clock) -> Result<WindowState> {
    compute_state(window, clock.now())
}

/// Whole milliseconds from `from` to `to`, truncated
fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}

/// Milliseconds left until `to`, rounded up so pending time never reads 0
fn millis_until(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    let delta = to - from;
    let whole = delta.num_milliseconds();
    let partial = delta > Duration::milliseconds(whole);
    (whole + i64::from(partial)).max(0) as u64
}
