//! Sources of "now"
//!
//! Window math never reads the wall clock directly; it goes through a
//! [`Clock`] so callers and tests can pin or drive time.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall time captured once, advanced by Tokio's monotonic clock
///
/// Immune to wall-clock jumps while a view is open. Under a paused Tokio
/// runtime it follows virtual time, which is what the ticker tests rely on.
#[derive(Debug, Clone, Copy)]
pub struct AnchoredClock {
    base: DateTime<Utc>,
    anchor: tokio::time::Instant,
}

impl AnchoredClock {
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            anchor: tokio::time::Instant::now(),
        }
    }

    pub fn from_system() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for AnchoredClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Duration::from_std(self.anchor.elapsed()).unwrap_or(Duration::MAX);
        self.base
            .checked_add_signed(elapsed)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
