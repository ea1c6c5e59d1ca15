//! A prioritised pool of worker threads running one processing step.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use hashbrown::HashSet;
use parking_lot::{Condvar, Mutex};
use strata_core::ChunkPos;
use tracing::{debug, error, warn};

use crate::error::{Result, WorldError};

/// The work a phase performs on one chunk.
pub trait ChunkProcessor: Send + Sync + 'static {
    fn process(&self, pos: ChunkPos) -> Result<()>;
}

/// Scores chunk positions; lower scores are processed sooner.
pub trait Relevance: Send + Sync {
    fn score(&self, pos: ChunkPos) -> i64;
}

impl<F> Relevance for F
where
    F: Fn(ChunkPos) -> i64 + Send + Sync,
{
    fn score(&self, pos: ChunkPos) -> i64 {
        self(pos)
    }
}

/// Timing knobs shared by every phase.
#[derive(Debug, Clone, Copy)]
pub struct PhaseConfig {
    /// How long an idle worker sleeps before checking for shutdown.
    pub poll_interval: Duration,
    /// How long `dispose` waits for workers before leaving them behind.
    pub join_timeout: Duration,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            join_timeout: Duration::from_secs(1),
        }
    }
}

/// Priority entry for the phase queue.
#[derive(Debug, Clone, Copy)]
struct QueuedChunk {
    pos: ChunkPos,
    /// Relevance at queue time (lower = higher priority).
    score: i64,
    /// Insertion counter, keeps equal scores first-in first-out.
    seq: u64,
}

impl PartialEq for QueuedChunk {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.seq == other.seq
    }
}

impl Eq for QueuedChunk {}

impl PartialOrd for QueuedChunk {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedChunk {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .score
            .cmp(&self.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct PhaseQueue {
    heap: BinaryHeap<QueuedChunk>,
    next_seq: u64,
}

struct PhaseShared {
    name: &'static str,
    processor: Arc<dyn ChunkProcessor>,
    relevance: Arc<dyn Relevance>,
    queue: Mutex<PhaseQueue>,
    available: Condvar,
    /// Queued or running positions. A position stays here until the
    /// coordinator polls its completion, or its step fails.
    processing: Mutex<HashSet<ChunkPos>>,
    completed_tx: Sender<ChunkPos>,
    stop: AtomicBool,
    failures: AtomicUsize,
    poll_interval: Duration,
}

impl PhaseShared {
    fn next_job(&self) -> Option<ChunkPos> {
        let mut queue = self.queue.lock();
        loop {
            if self.stop.load(AtomicOrdering::Acquire) {
                return None;
            }
            if let Some(entry) = queue.heap.pop() {
                return Some(entry.pos);
            }
            self.available.wait_for(&mut queue, self.poll_interval);
        }
    }

    fn fail(&self, pos: ChunkPos) {
        self.processing.lock().remove(&pos);
        self.failures.fetch_add(1, AtomicOrdering::AcqRel);
    }

    fn worker_loop(&self) {
        while let Some(pos) = self.next_job() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| self.processor.process(pos)));
            match result {
                Ok(Ok(())) => {
                    if self.completed_tx.send(pos).is_err() {
                        return;
                    }
                }
                Ok(Err(WorldError::ShuttingDown)) => {
                    debug!(phase = self.name, ?pos, "Step abandoned during shutdown");
                    self.fail(pos);
                }
                Ok(Err(err)) => {
                    warn!(phase = self.name, ?pos, error = %err, "Chunk step failed");
                    self.fail(pos);
                }
                Err(payload) => {
                    error!(
                        phase = self.name,
                        ?pos,
                        panic = panic_message(payload.as_ref()),
                        "Chunk step panicked"
                    );
                    self.fail(pos);
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic>"
    }
}

/// One stage of the chunk pipeline: a deduplicating priority queue drained
/// by a pool of named worker threads.
pub struct ChunkPhase {
    shared: Arc<PhaseShared>,
    completed_rx: Receiver<ChunkPos>,
    workers: Vec<JoinHandle<()>>,
    /// Disconnects once every worker has exited.
    workers_done: Receiver<()>,
    join_timeout: Duration,
    disposed: bool,
}

impl ChunkPhase {
    /// Spawn `threads` workers running `processor`.
    pub fn new(
        name: &'static str,
        processor: Arc<dyn ChunkProcessor>,
        threads: usize,
        relevance: Arc<dyn Relevance>,
        config: PhaseConfig,
    ) -> Result<Self> {
        let (completed_tx, completed_rx) = channel::unbounded();
        let (done_tx, workers_done) = channel::bounded::<()>(0);
        let shared = Arc::new(PhaseShared {
            name,
            processor,
            relevance,
            queue: Mutex::new(PhaseQueue::default()),
            available: Condvar::new(),
            processing: Mutex::new(HashSet::new()),
            completed_tx,
            stop: AtomicBool::new(false),
            failures: AtomicUsize::new(0),
            poll_interval: config.poll_interval,
        });

        let mut phase = Self {
            shared,
            completed_rx,
            workers: Vec::with_capacity(threads),
            workers_done,
            join_timeout: config.join_timeout,
            disposed: false,
        };

        for i in 0..threads.max(1) {
            let shared = Arc::clone(&phase.shared);
            let done = done_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("{name}-{i}"))
                .spawn(move || {
                    let _done = done;
                    shared.worker_loop();
                });
            match spawned {
                Ok(handle) => phase.workers.push(handle),
                Err(err) => {
                    // Let the workers already running see the disconnect on dispose.
                    drop(done_tx);
                    return Err(err.into());
                }
            }
        }

        debug!(phase = name, threads = phase.workers.len(), "Phase started");
        Ok(phase)
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    /// Queue `pos` unless it is already queued or running.
    ///
    /// Returns true if the position was newly queued.
    pub fn queue(&self, pos: ChunkPos) -> bool {
        if self.shared.stop.load(AtomicOrdering::Acquire) {
            return false;
        }
        if !self.shared.processing.lock().insert(pos) {
            return false;
        }

        let score = self.shared.relevance.score(pos);
        let mut queue = self.shared.queue.lock();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.heap.push(QueuedChunk { pos, score, seq });
        self.shared.available.notify_one();
        true
    }

    /// Take one completed position, releasing it from the processing set.
    pub fn poll(&self) -> Option<ChunkPos> {
        let pos = self.completed_rx.try_recv().ok()?;
        self.shared.processing.lock().remove(&pos);
        Some(pos)
    }

    /// Whether `pos` is queued, running, or completed but not yet polled.
    pub fn is_processing(&self, pos: ChunkPos) -> bool {
        self.shared.processing.lock().contains(&pos)
    }

    /// Number of positions waiting for a worker.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().heap.len()
    }

    /// Size of the processing set.
    pub fn in_flight(&self) -> usize {
        self.shared.processing.lock().len()
    }

    /// Failed or panicked steps since the last call.
    pub fn take_failures(&self) -> usize {
        self.shared.failures.swap(0, AtomicOrdering::AcqRel)
    }

    /// Stop the workers and drop all queued work. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.shared.stop.store(true, AtomicOrdering::Release);
        {
            let _queue = self.shared.queue.lock();
            self.shared.available.notify_all();
        }

        let deadline = Instant::now() + self.join_timeout;
        let joined = loop {
            match self.workers_done.recv_deadline(deadline) {
                Err(RecvTimeoutError::Disconnected) => break true,
                Err(RecvTimeoutError::Timeout) => break false,
                Ok(()) => {}
            }
        };

        if joined {
            for handle in self.workers.drain(..) {
                if handle.join().is_err() {
                    error!(phase = self.shared.name, "Worker thread panicked");
                }
            }
        } else {
            warn!(
                phase = self.shared.name,
                stuck = self.workers.len(),
                "Workers did not stop in time, detaching"
            );
            self.workers.clear();
        }

        self.shared.queue.lock().heap.clear();
        self.shared.processing.lock().clear();
        while self.completed_rx.try_recv().is_ok() {}
        debug!(phase = self.shared.name, "Phase disposed");
    }
}

impl Drop for ChunkPhase {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorldError;

    struct Recorder {
        seen: Mutex<Vec<ChunkPos>>,
        gate: Option<Receiver<()>>,
    }

    impl Recorder {
        fn new(gate: Option<Receiver<()>>) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                gate,
            })
        }
    }

    impl ChunkProcessor for Recorder {
        fn process(&self, pos: ChunkPos) -> Result<()> {
            if let Some(gate) = &self.gate {
                gate.recv().map_err(|_| WorldError::ShuttingDown)?;
            }
            self.seen.lock().push(pos);
            if pos.y < 0 {
                return Err(WorldError::MissingChunk(pos));
            }
            assert!(pos.y < 100, "refusing {pos:?}");
            Ok(())
        }
    }

    fn by_x() -> Arc<dyn Relevance> {
        Arc::new(|pos: ChunkPos| i64::from(pos.x))
    }

    fn config() -> PhaseConfig {
        PhaseConfig {
            poll_interval: Duration::from_millis(5),
            join_timeout: Duration::from_millis(500),
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn poll_one(phase: &ChunkPhase) -> ChunkPos {
        let mut result = None;
        wait_until(|| {
            result = phase.poll();
            result.is_some()
        });
        result.unwrap()
    }

    #[test]
    fn completes_queued_positions() {
        let recorder = Recorder::new(None);
        let phase = ChunkPhase::new("test", recorder.clone(), 2, by_x(), config()).unwrap();

        assert!(phase.queue(ChunkPos::new(1, 0, 0)));
        assert!(phase.queue(ChunkPos::new(2, 0, 0)));

        let mut done = vec![poll_one(&phase), poll_one(&phase)];
        done.sort();
        assert_eq!(done, vec![ChunkPos::new(1, 0, 0), ChunkPos::new(2, 0, 0)]);
        assert_eq!(phase.in_flight(), 0);
    }

    #[test]
    fn duplicate_queue_is_noop() {
        let (gate_tx, gate_rx) = channel::unbounded();
        let recorder = Recorder::new(Some(gate_rx));
        let phase = ChunkPhase::new("test", recorder.clone(), 1, by_x(), config()).unwrap();
        let pos = ChunkPos::new(0, 0, 0);

        assert!(phase.queue(pos));
        assert!(!phase.queue(pos));
        assert!(phase.is_processing(pos));
        assert_eq!(phase.in_flight(), 1);

        gate_tx.send(()).unwrap();
        assert_eq!(poll_one(&phase), pos);
        assert!(!phase.is_processing(pos));
        assert_eq!(recorder.seen.lock().len(), 1);

        // Once polled, the position may be queued again.
        assert!(phase.queue(pos));
        gate_tx.send(()).unwrap();
        assert_eq!(poll_one(&phase), pos);
    }

    #[test]
    fn lower_scores_run_first() {
        let (gate_tx, gate_rx) = channel::unbounded();
        let recorder = Recorder::new(Some(gate_rx));
        let phase = ChunkPhase::new("test", recorder.clone(), 1, by_x(), config()).unwrap();

        // Occupy the only worker so the rest pile up in the queue.
        phase.queue(ChunkPos::new(5, 0, 0));
        wait_until(|| phase.pending() == 0);
        for x in [3, 1, 2] {
            phase.queue(ChunkPos::new(x, 0, 0));
        }
        assert_eq!(phase.pending(), 3);

        for _ in 0..4 {
            gate_tx.send(()).unwrap();
            poll_one(&phase);
        }
        let order: Vec<i32> = recorder.seen.lock().iter().map(|pos| pos.x).collect();
        assert_eq!(order, vec![5, 1, 2, 3]);
    }

    #[test]
    fn failed_steps_can_be_requeued() {
        let recorder = Recorder::new(None);
        let phase = ChunkPhase::new("test", recorder.clone(), 1, by_x(), config()).unwrap();
        let bad = ChunkPos::new(0, -1, 0);

        assert!(phase.queue(bad));
        wait_until(|| phase.take_failures() == 1);
        assert!(!phase.is_processing(bad));
        assert!(phase.poll().is_none());

        assert!(phase.queue(bad));
        wait_until(|| !phase.is_processing(bad));
    }

    #[test]
    fn panics_do_not_kill_workers() {
        let recorder = Recorder::new(None);
        let phase = ChunkPhase::new("test", recorder.clone(), 1, by_x(), config()).unwrap();

        phase.queue(ChunkPos::new(0, 100, 0));
        wait_until(|| phase.take_failures() == 1);

        phase.queue(ChunkPos::new(0, 1, 0));
        assert_eq!(poll_one(&phase), ChunkPos::new(0, 1, 0));
    }

    #[test]
    fn dispose_is_idempotent() {
        let recorder = Recorder::new(None);
        let mut phase = ChunkPhase::new("test", recorder, 3, by_x(), config()).unwrap();

        phase.dispose();
        phase.dispose();

        assert!(!phase.queue(ChunkPos::new(0, 0, 0)));
        assert_eq!(phase.in_flight(), 0);
        assert_eq!(phase.pending(), 0);
    }

    #[test]
    fn dispose_gives_up_on_stuck_workers() {
        let (gate_tx, gate_rx) = channel::unbounded();
        let recorder = Recorder::new(Some(gate_rx));
        let mut phase = ChunkPhase::new(
            "test",
            recorder,
            1,
            by_x(),
            PhaseConfig {
                poll_interval: Duration::from_millis(5),
                join_timeout: Duration::from_millis(50),
            },
        )
        .unwrap();

        phase.queue(ChunkPos::new(0, 0, 0));
        wait_until(|| phase.pending() == 0);

        let start = Instant::now();
        phase.dispose();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(phase.in_flight(), 0);

        // Release the stuck worker so it can exit.
        drop(gate_tx);
    }
}
