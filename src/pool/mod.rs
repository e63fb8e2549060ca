use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, trace, warn};

use crate::{
    metrics,
    primes::RangeWorker,
    types::{PrimeSet, Range},
};

pub mod error;

pub use error::{PoolError, TaskError};

pub type TaskId = u64;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How `wait_any` discovers a finished task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Every task signals a completion channel when it exits, including on panic.
    #[default]
    Notify,
    /// Round-robin over the pending tasks, waiting at most `interval` on each.
    Poll { interval: Duration },
}

impl WaitStrategy {
    pub fn poll() -> Self {
        Self::Poll {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

pub struct InFlightTask {
    id: TaskId,
    range: Range,
    handle: JoinHandle<PrimeSet>,
}

#[derive(Debug)]
pub struct Completed {
    pub id: TaskId,
    pub range: Range,
    pub primes: PrimeSet,
}

/// Bounded set of range computations running on the blocking thread pool.
///
/// The pool is owned by a single task. Workers never touch it: they only
/// produce their own `PrimeSet` and, with [`WaitStrategy::Notify`], send their
/// id over the completion channel.
///
/// Must be used from within a tokio runtime.
pub struct TaskPool<W: RangeWorker> {
    worker: Arc<W>,
    capacity: usize,
    strategy: WaitStrategy,
    pending: Vec<InFlightTask>,
    next_id: TaskId,
    peak: usize,
    poll_timeouts: u64,
    // Signalled task whose output hasn't been picked up yet
    notified: Option<TaskId>,
    done_tx: mpsc::UnboundedSender<TaskId>,
    done_rx: mpsc::UnboundedReceiver<TaskId>,
}

impl<W: RangeWorker> TaskPool<W> {
    pub fn new(worker: W, capacity: NonZeroUsize, strategy: WaitStrategy) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            worker: Arc::new(worker),
            capacity: capacity.get(),
            strategy,
            pending: Vec::with_capacity(capacity.get()),
            next_id: 0,
            peak: 0,
            poll_timeouts: 0,
            notified: None,
            done_tx,
            done_rx,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest number of tasks that were in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak
    }

    /// Number of polls that gave up on a task still running.
    pub fn poll_timeouts(&self) -> u64 {
        self.poll_timeouts
    }

    /// Starts computing `range` right away.
    pub fn submit(&mut self, range: Range) -> Result<TaskId, PoolError> {
        if self.is_full() {
            return Err(PoolError::Full {
                capacity: self.capacity,
            });
        }

        let id = self.next_id;
        self.next_id += 1;

        let worker = self.worker.clone();
        let done_tx = match self.strategy {
            WaitStrategy::Notify => Some(self.done_tx.clone()),
            WaitStrategy::Poll { .. } => None,
        };
        let handle = tokio::task::spawn_blocking(move || {
            // Fires on unwind too, so a panicked worker still wakes `wait_any`
            let _signal = scopeguard::guard(done_tx, move |done_tx| {
                if let Some(done_tx) = done_tx {
                    done_tx.send(id).ok();
                }
            });
            worker.test_range(range)
        });

        self.pending.push(InFlightTask { id, range, handle });
        self.peak = self.peak.max(self.pending.len());
        metrics::CHUNKS_SUBMITTED.inc();
        metrics::TASKS_IN_FLIGHT.inc();
        trace!("Submitted task {id} for range {range}, {} in flight", self.len());
        Ok(id)
    }

    /// Waits until any pending task finishes and takes its result.
    ///
    /// If several tasks are ready, any one of them may be returned. Returns
    /// `None` when nothing is in flight.
    ///
    /// Cancel safe: if the future is dropped, no finished task is lost.
    pub async fn wait_any(&mut self) -> Option<Result<Completed, TaskError>> {
        if self.pending.is_empty() {
            return None;
        }
        let (index, result) = match self.strategy {
            WaitStrategy::Notify => self.next_notified().await,
            WaitStrategy::Poll { interval } => self.next_polled(interval).await,
        };
        let task = self.pending.swap_remove(index);
        Some(Self::complete(task, result))
    }

    /// Collects every remaining task, concatenated in completion order.
    pub async fn drain(&mut self) -> Result<PrimeSet, TaskError> {
        let mut primes = PrimeSet::new();
        while let Some(completed) = self.wait_any().await {
            primes.extend(completed?.primes);
        }
        Ok(primes)
    }

    async fn next_notified(&mut self) -> (usize, Result<PrimeSet, JoinError>) {
        loop {
            let id = match self.notified {
                Some(id) => id,
                None => {
                    let id = self
                        .done_rx
                        .recv()
                        .await
                        .expect("Completion channel closed while the pool holds a sender");
                    self.notified = Some(id);
                    id
                }
            };
            let Some(index) = self.pending.iter().position(|task| task.id == id) else {
                warn!("Got completion of unknown task {id}");
                self.notified = None;
                continue;
            };
            // The worker has already returned, this only picks up its output
            let result = (&mut self.pending[index].handle).await;
            self.notified = None;
            return (index, result);
        }
    }

    async fn next_polled(&mut self, interval: Duration) -> (usize, Result<PrimeSet, JoinError>) {
        loop {
            for (index, task) in self.pending.iter_mut().enumerate() {
                match tokio::time::timeout(interval, &mut task.handle).await {
                    Ok(result) => return (index, result),
                    Err(_) => {
                        self.poll_timeouts += 1;
                        metrics::POLL_TIMEOUTS.inc();
                    }
                }
            }
        }
    }

    fn complete(
        task: InFlightTask,
        result: Result<PrimeSet, JoinError>,
    ) -> Result<Completed, TaskError> {
        metrics::TASKS_IN_FLIGHT.dec();
        match result {
            Ok(primes) => {
                metrics::CHUNKS_COMPLETED.inc();
                metrics::PRIMES_FOUND.inc_by(primes.len() as u64);
                debug!(
                    "Task {} finished range {}: {} primes",
                    task.id,
                    task.range,
                    primes.len()
                );
                Ok(Completed {
                    id: task.id,
                    range: task.range,
                    primes,
                })
            }
            Err(e) => {
                metrics::TASKS_FAILED.inc();
                Err(TaskError::from_join(task.range, e))
            }
        }
    }
}

impl<W: RangeWorker> Drop for TaskPool<W> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                "Dropping task pool with {} tasks in flight, their results are lost",
                self.pending.len()
            );
        }
    }
}
