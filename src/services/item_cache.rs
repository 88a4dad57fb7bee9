//! Time-based cache of the collected item set.
//!
//! The cache always serves a complete snapshot. When the snapshot is older
//! than the configured timeout the caller still gets it immediately and a
//! single background worker rebuilds it; the new snapshot replaces the old
//! one only if collection succeeded. The very first read has nothing to
//! serve, so it waits (bounded by the startup timeout) for the first
//! collection instead.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};

use super::disk_cache::DiskCache;
use super::sources::Sources;
use crate::core::item::Snapshot;
use crate::error::{CollectionError, ErrorReporter, RefreshFailure, TracingReporter};

/// Default staleness threshold.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(300);

/// Default bound on the first, synchronous collection.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Whether the current snapshot may be served without a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

#[derive(Debug, Default)]
struct Outcome {
    /// Number of collection runs that have completed (successfully or not)
    finished: u64,
    last_error: Option<CollectionError>,
    failed_at: Option<SystemTime>,
}

struct Shared {
    sources: Sources,
    reporter: Arc<dyn ErrorReporter>,
    clock: Arc<dyn Clock>,
    disk: Option<DiskCache>,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    refreshing: AtomicBool,
    started: AtomicU64,
    outcome: Mutex<Outcome>,
    finished: Condvar,
}

/// Marks a collection run as finished even if the sources panic.
struct RunGuard<'a> {
    shared: &'a Shared,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut outcome = self.shared.outcome.lock();
        if thread::panicking() {
            outcome.last_error = Some(CollectionError::WorkerUnavailable(
                "collection worker panicked".to_string(),
            ));
            outcome.failed_at = Some(self.shared.clock.now());
        }
        outcome.finished += 1;
        self.shared.refreshing.store(false, Ordering::Release);
        drop(outcome);
        self.shared.finished.notify_all();
    }
}

impl Shared {
    /// Collect from every source and, on success, swap in the result.
    ///
    /// The caller must hold the `refreshing` flag.
    fn run_collection(&self) -> Result<Arc<Snapshot>, CollectionError> {
        let _guard = RunGuard { shared: self };
        let started = Instant::now();

        match self.sources.collect(self.reporter.as_ref()) {
            Ok(items) => {
                let snapshot = Arc::new(Snapshot::new(items, self.clock.now()));
                if let Some(disk) = &self.disk {
                    if let Err(error) = disk.store(&snapshot) {
                        warn!(%error, path = %disk.path().display(), "failed to write item cache");
                    }
                }

                *self.snapshot.write() = Some(Arc::clone(&snapshot));
                {
                    let mut outcome = self.outcome.lock();
                    outcome.last_error = None;
                    outcome.failed_at = None;
                }

                info!(
                    count = snapshot.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "item snapshot replaced"
                );
                Ok(snapshot)
            }
            Err(error) => {
                let now = self.clock.now();
                let previous = self.snapshot.read().clone();
                match previous {
                    Some(previous) => self.reporter.refresh_failed(&RefreshFailure {
                        error: error.clone(),
                        stale_age: previous.age(now),
                    }),
                    None => debug!(%error, "initial collection failed"),
                }

                let mut outcome = self.outcome.lock();
                outcome.last_error = Some(error.clone());
                outcome.failed_at = Some(now);
                Err(error)
            }
        }
    }
}

/// Configures an [`ItemCache`].
pub struct ItemCacheBuilder {
    sources: Sources,
    timeout: Duration,
    startup_timeout: Duration,
    reporter: Arc<dyn ErrorReporter>,
    clock: Arc<dyn Clock>,
    disk: Option<DiskCache>,
}

impl ItemCacheBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Persist snapshots to `disk` and seed the cache from it.
    pub fn disk_cache(mut self, disk: DiskCache) -> Self {
        self.disk = Some(disk);
        self
    }

    pub fn build(self) -> ItemCache {
        let seeded = self.disk.as_ref().and_then(|disk| match disk.load() {
            Ok(Some(snapshot)) => {
                debug!(
                    path = %disk.path().display(),
                    count = snapshot.len(),
                    "seeded items from disk cache"
                );
                Some(Arc::new(snapshot))
            }
            Ok(None) => None,
            Err(error) => {
                debug!(%error, path = %disk.path().display(), "ignoring unreadable item cache");
                None
            }
        });

        ItemCache {
            shared: Arc::new(Shared {
                sources: self.sources,
                reporter: self.reporter,
                clock: self.clock,
                disk: self.disk,
                snapshot: RwLock::new(seeded),
                refreshing: AtomicBool::new(false),
                started: AtomicU64::new(0),
                outcome: Mutex::new(Outcome::default()),
                finished: Condvar::new(),
            }),
            timeout: self.timeout,
            startup_timeout: self.startup_timeout,
        }
    }
}

/// Serves item snapshots, refreshing them in the background when stale.
pub struct ItemCache {
    shared: Arc<Shared>,
    timeout: Duration,
    startup_timeout: Duration,
}

impl ItemCache {
    pub fn builder(sources: Sources) -> ItemCacheBuilder {
        ItemCacheBuilder {
            sources,
            timeout: DEFAULT_CACHE_TIMEOUT,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            reporter: Arc::new(TracingReporter),
            clock: Arc::new(SystemClock),
            disk: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Where collection problems are reported.
    pub fn reporter(&self) -> &Arc<dyn ErrorReporter> {
        &self.shared.reporter
    }

    /// The snapshot to search.
    ///
    /// Never touches the disk when a snapshot exists. A stale snapshot is
    /// returned as is and triggers at most one background refresh. Without any
    /// snapshot, waits for the first collection up to the startup timeout.
    pub fn get_snapshot(&self) -> Result<Arc<Snapshot>, CollectionError> {
        if let Some(snapshot) = self.current() {
            if self.freshness_of(&snapshot) == Freshness::Stale && self.retry_allowed() {
                self.spawn_refresh();
            }
            return Ok(snapshot);
        }

        self.bootstrap()
    }

    /// The current snapshot, without any refresh side effects.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.shared.snapshot.read().clone()
    }

    /// Freshness of the current snapshot, if there is one.
    pub fn freshness(&self) -> Option<Freshness> {
        self.current().map(|snapshot| self.freshness_of(&snapshot))
    }

    pub fn is_refreshing(&self) -> bool {
        self.shared.refreshing.load(Ordering::Acquire)
    }

    /// Number of collection runs started so far.
    pub fn collections_started(&self) -> u64 {
        self.shared.started.load(Ordering::Relaxed)
    }

    /// Start a background refresh unless one is already running.
    ///
    /// Returns whether a new worker was started.
    pub fn spawn_refresh(&self) -> bool {
        match self.try_spawn() {
            Ok(started) => started,
            Err(error) => {
                warn!(%error, "could not start background refresh");
                false
            }
        }
    }

    /// Collect on the calling thread and return the new snapshot.
    ///
    /// When another worker is already collecting, waits for it instead of
    /// starting a second run.
    pub fn refresh_now(&self) -> Result<Arc<Snapshot>, CollectionError> {
        if self.claim() {
            return self.shared.run_collection();
        }

        let outcome = self.shared.outcome.lock();
        let seen = outcome.finished;
        self.wait_for_run(outcome, seen, self.startup_timeout, false)
    }

    /// Block until no refresh is running, up to `timeout`.
    ///
    /// Returns `false` if a refresh was still running when the time ran out.
    pub fn wait_for_refresh(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut outcome = self.shared.outcome.lock();
        while self.is_refreshing() {
            if self
                .shared
                .finished
                .wait_until(&mut outcome, deadline)
                .timed_out()
            {
                return !self.is_refreshing();
            }
        }
        true
    }

    /// A snapshot stamped in the future (clock moved back, or a bad disk
    /// copy) has no trustworthy age and counts as stale.
    fn freshness_of(&self, snapshot: &Snapshot) -> Freshness {
        match self.shared.clock.now().duration_since(snapshot.collected_at()) {
            Ok(age) if age < self.timeout => Freshness::Fresh,
            _ => Freshness::Stale,
        }
    }

    /// A failed run counts as an attempt; the next one waits a full timeout.
    fn retry_allowed(&self) -> bool {
        let outcome = self.shared.outcome.lock();
        match outcome.failed_at {
            Some(at) => match self.shared.clock.now().duration_since(at) {
                Ok(since) => since >= self.timeout,
                // Clock moved back past the failure
                Err(_) => true,
            },
            None => true,
        }
    }

    fn claim(&self) -> bool {
        let claimed = self
            .shared
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if claimed {
            self.shared.started.fetch_add(1, Ordering::Relaxed);
        }
        claimed
    }

    fn try_spawn(&self) -> Result<bool, CollectionError> {
        if !self.claim() {
            return Ok(false);
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("rufi-refresh".to_string())
            .spawn(move || {
                // Errors are recorded in the outcome and reported there
                let _ = shared.run_collection();
            });

        match spawned {
            Ok(_) => {
                debug!("background refresh started");
                Ok(true)
            }
            Err(error) => {
                self.shared.refreshing.store(false, Ordering::Release);
                Err(CollectionError::WorkerUnavailable(error.to_string()))
            }
        }
    }

    fn bootstrap(&self) -> Result<Arc<Snapshot>, CollectionError> {
        let outcome = self.shared.outcome.lock();

        // Another caller may have finished the first collection meanwhile
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }

        if let (Some(error), Some(at)) = (&outcome.last_error, outcome.failed_at) {
            let since = self.shared.clock.now().duration_since(at).unwrap_or_default();
            if since < self.timeout && !self.is_refreshing() {
                return Err(error.clone());
            }
        }

        let seen = outcome.finished;
        self.try_spawn()?;
        self.wait_for_run(outcome, seen, self.startup_timeout, true)
    }

    /// Wait for a run newer than `seen` to finish.
    ///
    /// With `accept_existing`, any snapshot appearing ends the wait early.
    fn wait_for_run(
        &self,
        mut outcome: MutexGuard<'_, Outcome>,
        seen: u64,
        timeout: Duration,
        accept_existing: bool,
    ) -> Result<Arc<Snapshot>, CollectionError> {
        let deadline = Instant::now() + timeout;

        loop {
            if accept_existing {
                if let Some(snapshot) = self.current() {
                    return Ok(snapshot);
                }
            }

            // The flag is cleared under this lock, so seeing it down means the run is over
            if outcome.finished > seen || !self.is_refreshing() {
                if let Some(error) = outcome.last_error.clone() {
                    return Err(error);
                }
                return self
                    .current()
                    .ok_or(CollectionError::NoItems { failures: vec![] });
            }

            if self
                .shared
                .finished
                .wait_until(&mut outcome, deadline)
                .timed_out()
            {
                if accept_existing {
                    if let Some(snapshot) = self.current() {
                        return Ok(snapshot);
                    }
                }
                return Err(CollectionError::Timeout(timeout));
            }
        }
    }
}
