use crate::error::{Result, WindowError};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_MINUTE: f64 = 60_000.0;

/// Scheduled interval of a timed activity (contest, assignment)
///
/// Fields are public because windows are usually built straight from backend
/// data; every consumer re-validates through [`TimeWindow::end_time`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start_time: DateTime<Utc>,
    pub duration_minutes: f64,
}

impl TimeWindow {
    pub fn new(start_time: DateTime<Utc>, duration_minutes: f64) -> Result<Self> {
        let window = Self {
            start_time,
            duration_minutes,
        };
        window.end_time()?;
        Ok(window)
    }

    /// Build a window from an ISO-8601 start string
    pub fn parse(start_time: &str, duration_minutes: f64) -> Result<Self> {
        Self::new(parse_start_time(start_time)?, duration_minutes)
    }

    /// Length of the window, rounded to the nearest millisecond
    pub fn duration(&self) -> Result<Duration> {
        validate_duration(self.duration_minutes)?;

        let ms = (self.duration_minutes * MS_PER_MINUTE).round() as i64;
        Duration::try_milliseconds(ms).ok_or_else(|| {
            WindowError::InvalidWindow(format!(
                "duration of {} minutes is out of range",
                self.duration_minutes
            ))
        })
    }

    pub fn end_time(&self) -> Result<DateTime<Utc>> {
        let duration = self.duration()?;
        self.start_time.checked_add_signed(duration).ok_or_else(|| {
            WindowError::InvalidWindow(format!(
                "window starting at {} with {} minutes overflows",
                self.start_time, self.duration_minutes
            ))
        })
    }
}

fn validate_duration(duration_minutes: f64) -> Result<()> {
    if !duration_minutes.is_finite() {
        return Err(WindowError::InvalidWindow(format!(
            "duration must be a finite number of minutes, got {}",
            duration_minutes
        )));
    }

    if duration_minutes < 0.0 {
        return Err(WindowError::InvalidWindow(format!(
            "duration must not be negative, got {} minutes",
            duration_minutes
        )));
    }

    Ok(())
}

/// Parse a start time as sent by the backend
///
/// Accepts RFC 3339 timestamps. Timestamps without an offset are taken as UTC.
pub fn parse_start_time(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return Err(WindowError::InvalidWindow(
            "start time is empty".to_string(),
        ));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(WindowError::InvalidWindow(format!(
        "start time '{}' is not a valid ISO-8601 instant",
        value
    )))
}

/// Timed activity as returned by the backend
///
/// Unknown fields (title, id, ...) are ignored. A missing duration is kept as
/// `None` so conversion can reject it instead of guessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRecord {
    pub start_time: String,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
}

impl TryFrom<&WindowRecord> for TimeWindow {
    type Error = WindowError;

    fn try_from(record: &WindowRecord) -> Result<Self> {
        let duration_minutes = record.duration_minutes.ok_or_else(|| {
            WindowError::InvalidWindow("record has no durationMinutes".to_string())
        })?;
        TimeWindow::parse(&record.start_time, duration_minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Upcoming,
    Active,
    Ended,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Upcoming => "UPCOMING",
            Phase::Active => "ACTIVE",
            Phase::Ended => "ENDED",
        }
    }
}

/// Classification of a window at one instant; recomputed on every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowState {
    pub phase: Phase,
    pub remaining_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub elapsed_ms: Option<u64>,
}

impl WindowState {
    pub fn upcoming(remaining_ms: u64) -> Self {
        Self {
            phase: Phase::Upcoming,
            remaining_ms,
            elapsed_ms: None,
        }
    }

    pub fn active(remaining_ms: u64, elapsed_ms: u64) -> Self {
        Self {
            phase: Phase::Active,
            remaining_ms,
            elapsed_ms: Some(elapsed_ms),
        }
    }

    pub fn ended() -> Self {
        Self {
            phase: Phase::Ended,
            remaining_ms: 0,
            elapsed_ms: None,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    /// Fraction of the window already elapsed, for progress bars
    pub fn progress(&self) -> f64 {
        match self.phase {
            Phase::Upcoming => 0.0,
            Phase::Ended => 1.0,
            Phase::Active => {
                let elapsed = self.elapsed_ms.unwrap_or(0) as f64;
                let total = elapsed + self.remaining_ms as f64;
                if total <= 0.0 {
                    1.0
                } else {
                    elapsed / total
                }
            }
        }
    }
}
