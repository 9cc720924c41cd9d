// Periodic countdown engine
use super::{annotate, Clock, SystemClock};
use crate::models::{AnnotatedLease, LeaseRecord};
use chrono::{DateTime, Utc};
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_TICK: Duration = Duration::from_millis(1000);

/// Annotated leases together with the instant their countdowns were taken at
#[derive(Debug, Clone, PartialEq)]
pub struct TickSnapshot {
    pub at: DateTime<Utc>,
    pub leases: Vec<AnnotatedLease>,
}

impl TickSnapshot {
    fn compute(leases: &[LeaseRecord], at: DateTime<Utc>) -> Self {
        Self {
            at,
            leases: annotate(leases, at),
        }
    }
}

impl Deref for TickSnapshot {
    type Target = [AnnotatedLease];

    fn deref(&self) -> &Self::Target {
        &self.leases
    }
}

/// One tick's worth of annotated leases, shared by every observer
pub type Snapshot = Arc<TickSnapshot>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    Stopped,
}

#[derive(Default)]
struct Timer {
    observers: usize,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    leases: Mutex<Vec<LeaseRecord>>,
    clock: Arc<dyn Clock>,
    period: Duration,
    tx: watch::Sender<Snapshot>,
    timer: Mutex<Timer>,
    ticks: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn publish(&self) {
        let now = self.clock.now();
        let snapshot = {
            let leases = lock(&self.leases);
            Arc::new(TickSnapshot::compute(&leases, now))
        };
        self.tx.send_replace(snapshot);
    }
}

/// Recomputes lease countdowns on a fixed period while anyone is watching.
///
/// The timer starts with the first [`CountdownObserver`] and is aborted when
/// the last one is dropped. Cloning the engine shares the same timer.
#[derive(Clone)]
pub struct CountdownEngine {
    inner: Arc<Inner>,
}

impl CountdownEngine {
    pub fn new(leases: Vec<LeaseRecord>, clock: Arc<dyn Clock>, period: Duration) -> Self {
        let initial = Arc::new(TickSnapshot::compute(&leases, clock.now()));
        let (tx, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                leases: Mutex::new(leases),
                clock,
                period: period.max(Duration::from_millis(1)),
                tx,
                timer: Mutex::new(Timer::default()),
                ticks: AtomicU64::new(0),
            }),
        }
    }

    pub fn with_system_clock(leases: Vec<LeaseRecord>, period: Duration) -> Self {
        Self::new(leases, Arc::new(SystemClock), period)
    }

    pub fn period(&self) -> Duration {
        self.inner.period
    }

    pub fn state(&self) -> EngineState {
        match &lock(&self.inner.timer).task {
            Some(task) if !task.is_finished() => EngineState::Running,
            _ => EngineState::Stopped,
        }
    }

    /// Number of timer ticks published since the engine was created
    pub fn ticks(&self) -> u64 {
        self.inner.ticks.load(Ordering::Relaxed)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.inner.tx.borrow().clone()
    }

    pub fn leases(&self) -> Vec<LeaseRecord> {
        lock(&self.inner.leases).clone()
    }

    /// Replace the lease input and publish a fresh snapshot right away
    pub fn set_leases(&self, leases: Vec<LeaseRecord>) {
        self.update_leases(|current| *current = leases);
    }

    /// Edit the lease input in place, then publish
    pub fn update_leases<F>(&self, f: F)
    where
        F: FnOnce(&mut Vec<LeaseRecord>),
    {
        {
            let mut leases = lock(&self.inner.leases);
            f(&mut leases);
            tracing::debug!("Lease input updated ({} leases)", leases.len());
        }
        self.inner.publish();
    }

    /// Start observing. Must be called from within a tokio runtime.
    pub fn observe(&self) -> CountdownObserver {
        let mut rx = self.inner.tx.subscribe();
        rx.mark_changed();

        let mut timer = lock(&self.inner.timer);
        timer.observers += 1;
        if timer.task.is_none() {
            tracing::info!(
                "Starting countdown timer ({} ms period)",
                self.inner.period.as_millis()
            );
            timer.task = Some(tokio::spawn(run_timer(
                Arc::downgrade(&self.inner),
                self.inner.period,
            )));
        }
        drop(timer);

        CountdownObserver {
            rx,
            inner: Arc::clone(&self.inner),
        }
    }
}

async fn run_timer(inner: Weak<Inner>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.publish();
        let tick = inner.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!("Countdown tick {}", tick);
    }
}

/// A live view of the engine's output.
///
/// Holding one keeps the timer running; dropping it releases the timer if it
/// was the last observer.
pub struct CountdownObserver {
    rx: watch::Receiver<Snapshot>,
    inner: Arc<Inner>,
}

impl CountdownObserver {
    /// Wait for the next snapshot. The first call returns immediately with
    /// the current one.
    pub async fn next(&mut self) -> Snapshot {
        // The sender lives in `inner`, which this observer keeps alive
        let _ = self.rx.changed().await;
        self.rx.borrow_and_update().clone()
    }

    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

impl Drop for CountdownObserver {
    fn drop(&mut self) {
        let mut timer = lock(&self.inner.timer);
        timer.observers = timer.observers.saturating_sub(1);
        if timer.observers == 0 {
            if let Some(task) = timer.task.take() {
                task.abort();
                tracing::info!("Countdown timer stopped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countdown::clock::MockClock;
    use chrono::{DateTime, TimeZone, Utc};

    /// Wall clock that follows tokio's (pausable) time
    struct TokioClock {
        base: DateTime<Utc>,
        started: tokio::time::Instant,
    }

    impl TokioClock {
        fn new(base: DateTime<Utc>) -> Self {
            Self {
                base,
                started: tokio::time::Instant::now(),
            }
        }
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Utc> {
            let elapsed = tokio::time::Instant::now() - self.started;
            self.base + chrono::Duration::from_std(elapsed).unwrap()
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn lease(id: &str, ends_in_secs: i64) -> LeaseRecord {
        LeaseRecord::new((base() + chrono::Duration::seconds(ends_in_secs)).to_rfc3339())
            .with_field("_id", id)
    }

    fn engine(leases: Vec<LeaseRecord>) -> CountdownEngine {
        CountdownEngine::new(leases, Arc::new(TokioClock::new(base())), DEFAULT_TICK)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_running_until_observed() {
        let engine = engine(vec![lease("a", 10)]);
        assert_eq!(engine.state(), EngineState::Stopped);

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(engine.ticks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_once_per_period() {
        let engine = engine(vec![lease("a", 10)]);
        let mut observer = engine.observe();
        assert_eq!(engine.state(), EngineState::Running);

        let first = observer.next().await;
        assert_eq!(first[0].countdown.seconds, "10");
        assert_eq!(first.at, base());

        tokio::time::advance(Duration::from_secs(1)).await;
        let second = observer.next().await;
        assert_eq!(second[0].countdown.seconds, "09");
        assert_eq!(second.at, base() + chrono::Duration::seconds(1));

        // Missed ticks are skipped, so one snapshot covers the jump
        tokio::time::advance(Duration::from_secs(3)).await;
        let latest = observer.next().await;
        assert_eq!(latest[0].countdown.seconds, "06");
        assert!(!observer.has_changed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_to_zero_and_stays_there() {
        let engine = engine(vec![lease("a", 2)]);
        let mut observer = engine.observe();
        observer.next().await;

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(observer.next().await[0].countdown.is_zero());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(observer.next().await[0].countdown.is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_emissions_after_last_observer_drops() {
        let engine = engine(vec![lease("a", 60)]);
        let mut observer = engine.observe();
        observer.next().await;

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(1)).await;
            observer.next().await;
        }
        let ticks_before = engine.ticks();
        assert!(ticks_before >= 3);

        drop(observer);
        assert_eq!(engine.state(), EngineState::Stopped);

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(engine.ticks(), ticks_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_shared_between_observers() {
        let engine = engine(vec![lease("a", 60)]);
        let first = engine.observe();
        let mut second = engine.observe();

        // Late observers still see the current snapshot immediately
        assert_eq!(second.next().await.len(), 1);

        drop(first);
        assert_eq!(engine.state(), EngineState::Running);

        drop(second);
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarts_after_teardown() {
        let engine = engine(vec![lease("a", 60)]);
        drop(engine.observe());
        assert_eq!(engine.state(), EngineState::Stopped);

        let mut observer = engine.observe();
        assert_eq!(engine.state(), EngineState::Running);
        assert_eq!(observer.next().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_input_keeps_ticking() {
        let engine = engine(Vec::new());
        let mut observer = engine.observe();
        assert!(observer.next().await.is_empty());

        for _ in 0..2 {
            tokio::time::advance(Duration::from_secs(1)).await;
            assert!(observer.next().await.is_empty());
        }
        assert!(engine.ticks() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_leases_publishes_immediately() {
        let engine = engine(vec![lease("a", 60)]);
        let mut observer = engine.observe();
        observer.next().await;

        engine.set_leases(vec![lease("b", 30), lease("c", 90)]);
        let snapshot = observer.next().await;
        let ids: Vec<_> = snapshot.iter().map(|a| a.lease.id().unwrap()).collect();
        assert_eq!(ids, ["b", "c"]);
        assert_eq!(engine.leases().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_is_never_mutated_by_ticks() {
        let input = vec![lease("a", 60), lease("b", 5)];
        let engine = engine(input.clone());
        let mut observer = engine.observe();
        observer.next().await;

        tokio::time::advance(Duration::from_secs(3)).await;
        observer.next().await;
        assert_eq!(engine.leases(), input);
        assert!(input.iter().all(|l| l.get("countdown").is_none()));
    }

    #[test]
    fn test_snapshot_with_frozen_clock_is_stable() {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(base());
        let engine = CountdownEngine::new(
            vec![lease("a", 90_061)],
            Arc::new(clock),
            DEFAULT_TICK,
        );

        let first = engine.snapshot();
        engine.set_leases(engine.leases());
        let second = engine.snapshot();
        assert_eq!(first, second);
        assert_eq!(first[0].countdown.days, "01");
        assert_eq!(first[0].countdown.seconds, "01");
    }

    #[test]
    fn test_zero_period_is_clamped() {
        let engine = CountdownEngine::with_system_clock(Vec::new(), Duration::ZERO);
        assert_eq!(engine.period(), Duration::from_millis(1));
    }
}
