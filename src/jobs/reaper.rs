//! Deferred cleanup of finished jobs.
//!
//! A single background thread sleeps until the earliest retention deadline, then runs the
//! cleanup action for every due job. Deadlines are read from the injected [`Clock`], so tests
//! can drive expiry with a fake clock and [`CleanupScheduler::run_due`] instead.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::foundation::clock::Clock;
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::jobs::registry::JobId;

/// Cleanup action run once per due job; returns `true` if anything was removed.
pub(crate) type CleanupFn = Arc<dyn Fn(JobId) -> bool + Send + Sync>;

/// Upper bound on a single sleep, so clock skew never parks the thread for long.
const MAX_SLEEP: Duration = Duration::from_secs(60);

#[derive(Default)]
struct State {
    deadlines: BinaryHeap<Reverse<(Instant, JobId)>>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
    clock: Arc<dyn Clock>,
    action: CleanupFn,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pop_due(&self, now: Instant) -> Vec<JobId> {
        let mut state = self.lock();
        let mut due = Vec::new();
        while let Some(Reverse((at, id))) = state.deadlines.peek().copied() {
            if at > now {
                break;
            }
            state.deadlines.pop();
            due.push(id);
        }
        due
    }
}

/// Cloneable handle used to schedule cleanups from render threads.
#[derive(Clone)]
pub(crate) struct CleanupHandle {
    shared: Arc<Shared>,
}

impl CleanupHandle {
    /// Run the cleanup action for `id` at or after `deadline`.
    pub(crate) fn schedule(&self, id: JobId, deadline: Instant) {
        let mut state = self.shared.lock();
        state.deadlines.push(Reverse((deadline, id)));
        drop(state);
        self.shared.wake.notify_one();
    }
}

/// Owner of the reaper thread. Dropping it stops the thread; pending cleanups are abandoned.
pub(crate) struct CleanupScheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl CleanupScheduler {
    /// Start the reaper thread.
    pub(crate) fn start(clock: Arc<dyn Clock>, action: CleanupFn) -> KenBurnsResult<Self> {
        let mut sched = Self::manual(clock, action);
        let worker_shared = sched.shared.clone();
        let worker = std::thread::Builder::new()
            .name("kenburns-reaper".to_owned())
            .spawn(move || reaper_loop(&worker_shared))
            .map_err(|e| {
                KenBurnsError::Other(anyhow::anyhow!("failed to spawn cleanup thread: {e}"))
            })?;
        sched.worker = Some(worker);
        Ok(sched)
    }

    /// Scheduler without a background thread; cleanups run only through [`Self::run_due`].
    pub(crate) fn manual(clock: Arc<dyn Clock>, action: CleanupFn) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                wake: Condvar::new(),
                clock,
                action,
            }),
            worker: None,
        }
    }

    pub(crate) fn handle(&self) -> CleanupHandle {
        CleanupHandle {
            shared: self.shared.clone(),
        }
    }

    /// Run every cleanup whose deadline has passed, on the calling thread.
    ///
    /// Returns how many of them actually removed something.
    pub(crate) fn run_due(&self) -> usize {
        self.shared
            .pop_due(self.shared.clock.now())
            .into_iter()
            .filter(|id| (self.shared.action)(*id))
            .count()
    }

    /// Number of scheduled cleanups not yet run.
    pub(crate) fn pending(&self) -> usize {
        self.shared.lock().deadlines.len()
    }
}

impl Drop for CleanupScheduler {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::warn!("cleanup thread panicked");
        }
    }
}

fn reaper_loop(shared: &Shared) {
    loop {
        let now = shared.clock.now();
        for id in shared.pop_due(now) {
            let _ = (shared.action)(id);
        }

        let state = shared.lock();
        if state.shutdown {
            return;
        }
        let sleep = match state.deadlines.peek() {
            Some(Reverse((at, _))) => at.saturating_duration_since(shared.clock.now()),
            None => MAX_SLEEP,
        };
        if sleep.is_zero() {
            continue;
        }
        let (state, _) = shared
            .wake
            .wait_timeout(state, sleep.min(MAX_SLEEP))
            .unwrap_or_else(PoisonError::into_inner);
        if state.shutdown {
            return;
        }
    }
}
