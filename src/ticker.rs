// Live re-evaluation of a time window
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, WindowError};
use crate::models::{TimeWindow, WindowState};
use crate::window::compute_state;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::{self, MissedTickBehavior};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Default)]
struct TickerShared {
    stopped: AtomicBool,
    task: Mutex<Option<AbortHandle>>,
    /// Held for the whole duration of a delivery
    in_flight: Mutex<()>,
    /// Thread currently running the update callback, if any
    deliverer: Mutex<Option<ThreadId>>,
}

/// Caller-owned handle to a running ticker
///
/// Clones refer to the same ticker. Dropping a handle does not stop it; use
/// [`LiveTicker`] for stop-on-drop.
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<TickerShared>,
}

impl StopHandle {
    /// Stop the ticker. Idempotent, and safe to call from inside the update
    /// callback. Once this returns no further update is delivered.
    ///
    /// When a callback is running on another thread this blocks until it
    /// returns, so keep callbacks short. Two tickers whose callbacks stop
    /// each other at the same moment on different threads will deadlock.
    pub fn stop(&self) {
        let already_stopped = self.shared.stopped.swap(true, Ordering::SeqCst);

        if let Some(task) = lock(&self.shared.task).take() {
            task.abort();
        }

        if !already_stopped {
            tracing::debug!("Ticker stopped");
        }

        // Called from the callback itself: the delivery in progress is ours
        if *lock(&self.shared.deliverer) == Some(thread::current().id()) {
            return;
        }

        // Wait out a delivery running on another thread
        drop(lock(&self.shared.in_flight));
    }

    /// True once stopped explicitly or after the final Ended update
    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopHandle")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Start ticking `window` on the current Tokio runtime
///
/// The first state is delivered right away, then one per `interval`. The
/// ticker stops by itself after delivering `Ended`. Fails with
/// `InvalidWindow` before anything is scheduled, or with `Schedule` when no
/// runtime is available or `interval` is zero.
pub fn start_ticker<F>(
    window: TimeWindow,
    clock: Arc<dyn Clock>,
    interval: Duration,
    on_update: F,
) -> Result<StopHandle>
where
    F: FnMut(WindowState) + Send + 'static,
{
    if let Err(e) = window.end_time() {
        tracing::warn!("Refusing to tick invalid window: {}", e);
        return Err(e);
    }

    if interval.is_zero() {
        return Err(WindowError::Schedule(
            "tick interval must be greater than zero".to_string(),
        ));
    }

    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|e| WindowError::Schedule(format!("no async runtime available: {}", e)))?;

    let shared = Arc::new(TickerShared::default());
    let task = runtime.spawn(run_ticker(
        window,
        clock,
        interval,
        on_update,
        shared.clone(),
    ));
    *lock(&shared.task) = Some(task.abort_handle());

    tracing::debug!(
        "Ticker started for window at {} ({} min, every {:?})",
        window.start_time,
        window.duration_minutes,
        interval
    );

    Ok(StopHandle { shared })
}

async fn run_ticker<F>(
    window: TimeWindow,
    clock: Arc<dyn Clock>,
    period: Duration,
    mut on_update: F,
    shared: Arc<TickerShared>,
) where
    F: FnMut(WindowState) + Send + 'static,
{
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let state = match compute_state(&window, clock.now()) {
            Ok(state) => state,
            Err(e) => {
                tracing::error!("Ticker stopping on invalid window: {}", e);
                shared.stopped.store(true, Ordering::SeqCst);
                break;
            }
        };

        {
            let _in_flight = lock(&shared.in_flight);
            if shared.stopped.load(Ordering::SeqCst) {
                break;
            }

            *lock(&shared.deliverer) = Some(thread::current().id());
            on_update(state);
            *lock(&shared.deliverer) = None;
        }

        if state.is_ended() {
            shared.stopped.store(true, Ordering::SeqCst);
            lock(&shared.task).take();
            tracing::debug!("Window ended, ticker finished");
            break;
        }
    }
}

/// One logical subscription: at most one ticker at a time
///
/// Activating again stops the previous ticker first. Dropping the
/// subscription stops whatever is running.
pub struct LiveTicker {
    clock: Arc<dyn Clock>,
    interval: Duration,
    current: Option<StopHandle>,
}

impl LiveTicker {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            interval: DEFAULT_TICK_INTERVAL,
            current: None,
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn activate<F>(&mut self, window: TimeWindow, on_update: F) -> Result<StopHandle>
    where
        F: FnMut(WindowState) + Send + 'static,
    {
        self.deactivate();
        let handle = start_ticker(window, self.clock.clone(), self.interval, on_update)?;
        self.current = Some(handle.clone());
        Ok(handle)
    }

    pub fn deactivate(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .map(|handle| !handle.is_stopped())
            .unwrap_or(false)
    }
}

impl Default for LiveTicker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LiveTicker {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::AnchoredClock;
    use crate::models::Phase;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::AtomicUsize;
    use std::sync::OnceLock;
    use tokio::sync::mpsc;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn window_in(seconds: i64, minutes: f64) -> TimeWindow {
        TimeWindow::new(base() + chrono::Duration::seconds(seconds), minutes).unwrap()
    }

    fn counting_callback(count: Arc<AtomicUsize>) -> impl FnMut(WindowState) + Send + 'static {
        move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_update_is_immediate() {
        let clock = Arc::new(AnchoredClock::new(base()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let started = tokio::time::Instant::now();

        let handle = start_ticker(window_in(5, 1.0), clock, DEFAULT_TICK_INTERVAL, move |s| {
            let _ = tx.send(s);
        })
        .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(first.phase, Phase::Upcoming);
        assert_eq!(first.remaining_ms, 5_000);

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_contest_lifecycle_end_to_end() {
        let clock = Arc::new(AnchoredClock::new(base()));
        let window = window_in(5, 1.0);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sampler = clock.clone();
        let handle = start_ticker(window, clock, DEFAULT_TICK_INTERVAL, move |s| {
            let _ = tx.send((sampler.now(), s));
        })
        .unwrap();

        // Sender lives in the callback; the channel closes when the ticker finishes
        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }

        for pair in updates.windows(2) {
            assert!(pair[0].0 < pair[1].0, "updates out of order");
        }
        for (now, state) in &updates {
            assert_eq!(*state, compute_state(&window, *now).unwrap());
        }

        let phases: Vec<Phase> = updates.iter().map(|(_, s)| s.phase).collect();
        let mut sequence = phases.clone();
        sequence.dedup();
        assert_eq!(sequence, vec![Phase::Upcoming, Phase::Active, Phase::Ended]);

        assert_eq!(phases.iter().filter(|p| **p == Phase::Upcoming).count(), 5);
        assert_eq!(phases.iter().filter(|p| **p == Phase::Active).count(), 60);
        assert_eq!(phases.iter().filter(|p| **p == Phase::Ended).count(), 1);
        assert_eq!(phases.last(), Some(&Phase::Ended));

        let (ended_at, _) = updates.last().unwrap();
        assert_eq!(*ended_at, base() + chrono::Duration::seconds(65));
        assert!(handle.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_updates_after_stop() {
        let clock = Arc::new(AnchoredClock::new(base()));
        let count = Arc::new(AtomicUsize::new(0));

        let handle = start_ticker(
            window_in(60, 10.0),
            clock,
            DEFAULT_TICK_INTERVAL,
            counting_callback(count.clone()),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        let delivered = count.load(Ordering::SeqCst);
        assert_eq!(delivered, 3);

        handle.stop();
        assert!(handle.is_stopped());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), delivered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let clock = Arc::new(AnchoredClock::new(base()));
        let handle = start_ticker(window_in(60, 10.0), clock, DEFAULT_TICK_INTERVAL, |_| {}).unwrap();

        handle.stop();
        handle.stop();
        handle.clone().stop();
        assert!(handle.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_from_inside_callback() {
        let clock = Arc::new(AnchoredClock::new(base()));
        let count = Arc::new(AtomicUsize::new(0));
        let slot: Arc<OnceLock<StopHandle>> = Arc::new(OnceLock::new());

        let callback_count = count.clone();
        let callback_slot = slot.clone();
        let handle = start_ticker(window_in(60, 10.0), clock, DEFAULT_TICK_INTERVAL, move |_| {
            let seen = callback_count.fetch_add(1, Ordering::SeqCst) + 1;
            if seen == 2 {
                if let Some(handle) = callback_slot.get() {
                    handle.stop();
                    handle.stop();
                }
            }
        })
        .unwrap();
        slot.set(handle.clone()).unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(handle.is_stopped());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stop_waits_for_callback_on_other_thread() {
        for _ in 0..10 {
            let clock = Arc::new(AnchoredClock::new(base()));
            let in_callback = Arc::new(AtomicBool::new(false));
            let count = Arc::new(AtomicUsize::new(0));

            let (flag, counter) = (in_callback.clone(), count.clone());
            let handle = start_ticker(window_in(600, 10.0), clock, Duration::from_millis(2), move |_| {
                flag.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                counter.fetch_add(1, Ordering::SeqCst);
                flag.store(false, Ordering::SeqCst);
            })
            .unwrap();

            while !in_callback.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }

            let stopper = handle.clone();
            let (flag, counter) = (in_callback.clone(), count.clone());
            let (running_after_stop, delivered) = tokio::task::spawn_blocking(move || {
                stopper.stop();
                (flag.load(Ordering::SeqCst), counter.load(Ordering::SeqCst))
            })
            .await
            .unwrap();

            assert!(!running_after_stop, "callback still running after stop returned");
            assert!(delivered >= 1);
            assert!(handle.is_stopped());

            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(count.load(Ordering::SeqCst), delivered);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ended_window_self_cancels() {
        let clock = Arc::new(AnchoredClock::new(base()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = start_ticker(window_in(-3_600, 30.0), clock, DEFAULT_TICK_INTERVAL, move |s| {
            let _ = tx.send(s);
        })
        .unwrap();

        assert_eq!(rx.recv().await, Some(WindowState::ended()));
        assert_eq!(rx.recv().await, None);
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn test_invalid_window_is_not_scheduled() {
        let count = Arc::new(AtomicUsize::new(0));
        let window = TimeWindow {
            start_time: base(),
            duration_minutes: -1.0,
        };

        let err = start_ticker(
            window,
            Arc::new(SystemClock),
            DEFAULT_TICK_INTERVAL,
            counting_callback(count.clone()),
        )
        .unwrap_err();

        assert!(matches!(err, WindowError::InvalidWindow(_)));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let err = start_ticker(
            window_in(0, 1.0),
            Arc::new(SystemClock),
            Duration::ZERO,
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, WindowError::Schedule(_)));
    }

    #[test]
    fn test_start_without_runtime_fails() {
        let err = start_ticker(
            window_in(0, 1.0),
            Arc::new(SystemClock),
            DEFAULT_TICK_INTERVAL,
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, WindowError::Schedule(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reactivation_replaces_previous_ticker() {
        let clock: Arc<dyn Clock> = Arc::new(AnchoredClock::new(base()));
        let mut ticker = LiveTicker::with_clock(clock);
        let first_count = Arc::new(AtomicUsize::new(0));
        let second_count = Arc::new(AtomicUsize::new(0));

        let first = ticker
            .activate(window_in(600, 10.0), counting_callback(first_count.clone()))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(first_count.load(Ordering::SeqCst), 2);

        let second = ticker
            .activate(window_in(600, 20.0), counting_callback(second_count.clone()))
            .unwrap();
        assert!(first.is_stopped());
        assert!(!second.is_stopped());
        assert!(ticker.is_running());

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(first_count.load(Ordering::SeqCst), 2);
        assert_eq!(second_count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_live_ticker_stops_it() {
        let clock: Arc<dyn Clock> = Arc::new(AnchoredClock::new(base()));
        let count = Arc::new(AtomicUsize::new(0));

        let handle = {
            let mut ticker = LiveTicker::with_clock(clock).interval(Duration::from_millis(250));
            let handle = ticker
                .activate(window_in(600, 10.0), counting_callback(count.clone()))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(600)).await;
            handle
        };

        assert!(handle.is_stopped());
        let delivered = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), delivered);
    }

    #[test]
    fn test_deactivate_without_ticker_is_noop() {
        let mut ticker = LiveTicker::new();
        ticker.deactivate();
        ticker.deactivate();
        assert!(!ticker.is_running());
    }
}
