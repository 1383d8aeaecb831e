//! Background task queues
//!
//! Bitmap compression, decompression and delayed eviction sweeps are posted
//! to a [`TaskQueue`]. Two implementations are provided:
//!
//! - [`SequencedTaskQueue`] runs tasks on one dedicated worker thread. Tasks
//!   run one at a time in the order they were posted, so work posted for the
//!   same bitmap observes the results of earlier work.
//! - [`ManualTaskQueue`] holds tasks until the owner drains it, with a virtual
//!   clock for delayed tasks. Used by hosts that run everything on one thread
//!   and by tests.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Unit of background work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Queue that runs posted tasks off the caller's stack
pub trait TaskQueue: Send + Sync {
    /// Run `task` as soon as the tasks posted before it have run
    fn post_task(&self, task: Task);

    /// Run `task` no earlier than `delay` from now
    fn post_delayed_task(&self, task: Task, delay: Duration);
}

/// Task waiting for its due time.
///
/// Ordered so that a `BinaryHeap` pops the earliest due time first, and
/// among equal due times the earliest posted.
struct ScheduledTask<D> {
    due: D,
    seq: u64,
    task: Task,
}

impl<D: Ord> PartialEq for ScheduledTask<D> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<D: Ord> Eq for ScheduledTask<D> {}

impl<D: Ord> PartialOrd for ScheduledTask<D> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<D: Ord> Ord for ScheduledTask<D> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reversed: BinaryHeap is a max heap
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

fn run_guarded(task: Task) {
    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
        tracing::warn!("background task panicked");
    }
}

enum Message {
    Run(Task),
    RunAt(ScheduledTask<Instant>),
    Shutdown,
}

/// Task queue backed by a single worker thread
///
/// # Example
///
/// ```
/// use paint_preview_scheduler::{SequencedTaskQueue, TaskQueue};
/// use std::sync::mpsc;
///
/// let queue = SequencedTaskQueue::new("compress").unwrap();
/// let (tx, rx) = mpsc::channel();
/// queue.post_task(Box::new(move || tx.send(42).unwrap()));
/// assert_eq!(rx.recv().unwrap(), 42);
/// queue.shutdown();
/// ```
pub struct SequencedTaskQueue {
    sender: Sender<Message>,
    thread: Mutex<Option<JoinHandle<()>>>,
    next_seq: AtomicU64,
}

impl SequencedTaskQueue {
    /// Spawn the worker thread. The thread is named `paint-preview-{name}`.
    pub fn new(name: &str) -> io::Result<Self> {
        let (sender, receiver) = unbounded();
        let thread = thread::Builder::new()
            .name(format!("paint-preview-{}", name))
            .spawn(move || Self::run(receiver))?;

        Ok(Self {
            sender,
            thread: Mutex::new(Some(thread)),
            next_seq: AtomicU64::new(0),
        })
    }

    /// Worker loop.
    ///
    /// Immediate tasks run in arrival order. Delayed tasks wait in a heap and
    /// run once their deadline passes, checked before every receive.
    fn run(receiver: Receiver<Message>) {
        let mut delayed: BinaryHeap<ScheduledTask<Instant>> = BinaryHeap::new();

        loop {
            let now = Instant::now();
            while delayed.peek().is_some_and(|next| next.due <= now) {
                if let Some(next) = delayed.pop() {
                    run_guarded(next.task);
                }
            }

            let message = match delayed.peek() {
                Some(next) => {
                    let wait = next.due.saturating_duration_since(Instant::now());
                    match receiver.recv_timeout(wait) {
                        Ok(message) => message,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match receiver.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };

            match message {
                Message::Run(task) => run_guarded(task),
                Message::RunAt(scheduled) => delayed.push(scheduled),
                Message::Shutdown => break,
            }
        }

        if !delayed.is_empty() {
            tracing::debug!(dropped = delayed.len(), "task queue stopped with delayed tasks pending");
        }
    }

    fn join_handle(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.thread.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop the worker after the tasks already posted and wait for it.
    ///
    /// Delayed tasks that are not yet due are dropped. Tasks posted after
    /// shutdown are dropped.
    pub fn shutdown(&self) {
        let _ = self.sender.send(Message::Shutdown);
        let handle = self.join_handle().take();
        if let Some(handle) = handle {
            // A task that drops the last reference to the queue runs on the
            // worker itself; joining there would deadlock.
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::warn!("task queue worker panicked");
            }
        }
    }
}

impl TaskQueue for SequencedTaskQueue {
    fn post_task(&self, task: Task) {
        if self.sender.send(Message::Run(task)).is_err() {
            tracing::trace!("task posted after shutdown dropped");
        }
    }

    fn post_delayed_task(&self, task: Task, delay: Duration) {
        let scheduled = ScheduledTask {
            due: Instant::now() + delay,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            task,
        };
        if self.sender.send(Message::RunAt(scheduled)).is_err() {
            tracing::trace!("delayed task posted after shutdown dropped");
        }
    }
}

impl Drop for SequencedTaskQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct ManualState {
    now: Duration,
    next_seq: u64,
    tasks: BinaryHeap<ScheduledTask<Duration>>,
}

/// Task queue drained explicitly by its owner
///
/// Time only moves through [`ManualTaskQueue::advance`], which makes delayed
/// tasks fully deterministic.
pub struct ManualTaskQueue {
    state: Mutex<ManualState>,
}

impl ManualTaskQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: Duration::ZERO,
                next_seq: 0,
                tasks: BinaryHeap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, task: Task, delay: Duration) {
        let mut state = self.state();
        let scheduled = ScheduledTask {
            due: state.now + delay,
            seq: state.next_seq,
            task,
        };
        state.next_seq += 1;
        state.tasks.push(scheduled);
    }

    /// Run every due task, including tasks that due tasks post.
    ///
    /// Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = {
                let mut state = self.state();
                let now = state.now;
                if state.tasks.peek().is_some_and(|next| next.due <= now) {
                    state.tasks.pop()
                } else {
                    None
                }
            };
            // The lock is released so the task may post more work.
            match next {
                Some(scheduled) => {
                    run_guarded(scheduled.task);
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Move the virtual clock forward. Tasks are not run.
    pub fn advance(&self, duration: Duration) {
        self.state().now += duration;
    }

    /// Virtual time elapsed since creation
    pub fn now(&self) -> Duration {
        self.state().now
    }

    /// Number of tasks waiting, due or not
    pub fn pending(&self) -> usize {
        self.state().tasks.len()
    }
}

impl Default for ManualTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue for ManualTaskQueue {
    fn post_task(&self, task: Task) {
        self.push(task, Duration::ZERO);
    }

    fn post_delayed_task(&self, task: Task, delay: Duration) {
        self.push(task, delay);
    }
}
