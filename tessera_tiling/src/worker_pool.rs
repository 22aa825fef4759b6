// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A fixed-size thread pool for background tile work.
//!
//! Commands are closures producing an optional result. Results are handed back
//! to the render thread through a channel and collected in
//! [`QueuedRenderer::draw_frame`]. Cancellation is generational: every command
//! carries a [`CancelToken`] and canceling bumps the pool generation, so
//! in-flight commands can poll it and late results are discarded.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::collab::{QueuedRenderer, TileRenderer};
use crate::config::PolicyConfig;
use crate::error::PoolError;

/// Lets a running command notice it was canceled.
#[derive(Clone, Debug)]
pub struct CancelToken {
    generation: u64,
    token: Arc<AtomicU64>,
}

impl CancelToken {
    /// Whether the command holding this token has been canceled.
    pub fn is_cancelled(&self) -> bool {
        self.token.load(Ordering::Acquire) != self.generation
    }
}

type Command<T> = Box<dyn FnOnce(&CancelToken) -> Option<T> + Send>;

struct Job<T> {
    command: Command<T>,
    cancel: CancelToken,
}

struct Completed<T> {
    generation: u64,
    value: T,
}

struct PoolState<T> {
    queue: VecDeque<Job<T>>,
    paused: bool,
    active_limit: usize,
    running: usize,
    shutdown: bool,
}

impl<T> PoolState<T> {
    // Nothing is running and nothing queued can start.
    fn is_settled(&self) -> bool {
        self.shutdown
            || (self.running == 0
                && (self.queue.is_empty() || self.paused || self.active_limit == 0))
    }
}

struct Shared<T> {
    state: Mutex<PoolState<T>>,
    work: Condvar,
    idle: Condvar,
    generation: Arc<AtomicU64>,
    capacity: usize,
    worker_count: usize,
    results: Sender<Completed<T>>,
}

impl<T> Shared<T> {
    fn token(&self) -> CancelToken {
        CancelToken {
            generation: self.generation.load(Ordering::Acquire),
            token: Arc::clone(&self.generation),
        }
    }

    fn notify_all(&self) {
        self.work.notify_all();
        self.idle.notify_all();
    }
}

/// Cloneable handle to a [`WorkerPool`]: submits commands and acts as its
/// [`TileRenderer`] (pause and cancel).
pub struct PoolHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for PoolHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for PoolHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("PoolHandle")
            .field("pending", &state.queue.len())
            .field("running", &state.running)
            .field("paused", &state.paused)
            .field("active_limit", &state.active_limit)
            .finish_non_exhaustive()
    }
}

impl<T> PoolHandle<T> {
    /// Queue a command.
    ///
    /// Fails when the queue is at capacity or the pool has shut down.
    pub fn submit<F>(&self, command: F) -> Result<(), PoolError>
    where
        F: FnOnce(&CancelToken) -> Option<T> + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            return Err(PoolError::ShutDown);
        }
        if state.queue.len() >= self.shared.capacity {
            return Err(PoolError::QueueFull {
                capacity: self.shared.capacity,
            });
        }
        let cancel = self.shared.token();
        state.queue.push_back(Job {
            command: Box::new(command),
            cancel,
        });
        drop(state);
        self.shared.work.notify_all();
        Ok(())
    }

    /// Commands waiting for a worker.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Workers currently allowed to take commands.
    pub fn active_workers(&self) -> usize {
        self.shared.state.lock().active_limit
    }

    /// Block until no command is running and none queued can start.
    pub fn wait_idle(&self) {
        let mut state = self.shared.state.lock();
        while !state.is_settled() {
            self.shared.idle.wait(&mut state);
        }
    }
}

impl<T> TileRenderer for PoolHandle<T> {
    fn set_is_paused(&mut self, paused: bool) {
        let mut state = self.shared.state.lock();
        if state.paused == paused {
            return;
        }
        state.paused = paused;
        drop(state);
        self.shared.notify_all();
    }

    fn is_paused(&self) -> bool {
        self.shared.state.lock().paused
    }

    fn cancel_commands(&mut self) {
        let mut state = self.shared.state.lock();
        let dropped = state.queue.len();
        state.queue.clear();
        // Bumped under the lock so a concurrent submit never mints a stale token.
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        drop(state);
        self.shared.idle.notify_all();
        trace!(dropped, "worker pool commands canceled");
    }
}

/// A pool of worker threads with a bounded command queue.
///
/// Worker `i` only takes commands while the pool is not paused and `i` is below
/// the active limit, which [`set_partial_execution`](QueuedRenderer::set_partial_execution)
/// lowers during navigation. Dropping the pool discards queued commands and
/// joins every thread.
pub struct WorkerPool<T> {
    handle: PoolHandle<T>,
    results: Receiver<Completed<T>>,
    ready: Vec<T>,
    threads: Vec<JoinHandle<()>>,
    in_frame: bool,
    frames: u64,
}

impl<T> fmt::Debug for WorkerPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.threads.len())
            .field("ready", &self.ready.len())
            .field("frames", &self.frames)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Start `worker_count` threads sharing a queue of at most `capacity` commands.
    pub fn new(worker_count: usize, capacity: usize) -> Result<Self, PoolError> {
        let (results_tx, results_rx) = unbounded();
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                queue: VecDeque::with_capacity(capacity),
                paused: false,
                active_limit: worker_count,
                running: 0,
                shutdown: false,
            }),
            work: Condvar::new(),
            idle: Condvar::new(),
            generation: Arc::new(AtomicU64::new(0)),
            capacity,
            worker_count,
            results: results_tx,
        });
        let mut pool = Self {
            handle: PoolHandle { shared },
            results: results_rx,
            ready: Vec::new(),
            threads: Vec::with_capacity(worker_count),
            in_frame: false,
            frames: 0,
        };
        for index in 0..worker_count {
            let shared = Arc::clone(&pool.handle.shared);
            let thread = thread::Builder::new()
                .name(format!("tessera-worker-{index}"))
                .spawn(move || worker_loop(index, &shared))?;
            pool.threads.push(thread);
        }
        debug!(worker_count, capacity, "worker pool started");
        Ok(pool)
    }

    /// A pool sized for `config`: one worker per core plus one.
    pub fn from_config(config: &PolicyConfig) -> Result<Self, PoolError> {
        Self::new(config.worker_count(), config.max_pending_commands)
    }
}

impl<T> WorkerPool<T> {
    /// A handle sharing this pool.
    pub fn handle(&self) -> PoolHandle<T> {
        self.handle.clone()
    }

    /// Queue a command. See [`PoolHandle::submit`].
    pub fn submit<F>(&self, command: F) -> Result<(), PoolError>
    where
        F: FnOnce(&CancelToken) -> Option<T> + Send + 'static,
    {
        self.handle.submit(command)
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.handle.shared.worker_count
    }

    /// Workers currently allowed to take commands.
    pub fn active_workers(&self) -> usize {
        self.handle.active_workers()
    }

    /// Block until no command is running and none queued can start.
    pub fn wait_idle(&self) {
        self.handle.wait_idle();
    }

    /// Take the results collected by the last [`draw_frame`](QueuedRenderer::draw_frame) calls.
    pub fn take_ready(&mut self) -> Vec<T> {
        std::mem::take(&mut self.ready)
    }

    /// Frames completed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl<T> QueuedRenderer for WorkerPool<T> {
    fn begin_frame(&mut self) {
        debug_assert!(!self.in_frame, "worker pool frame already open");
        self.in_frame = true;
    }

    fn draw_frame(&mut self) {
        let current = self.handle.shared.generation.load(Ordering::Acquire);
        let mut discarded = 0_usize;
        for done in self.results.try_iter() {
            if done.generation == current {
                self.ready.push(done.value);
            } else {
                discarded += 1;
            }
        }
        trace!(ready = self.ready.len(), discarded, "worker pool results flushed");
    }

    fn end_frame(&mut self) {
        self.in_frame = false;
        self.frames += 1;
    }

    fn set_partial_execution(&mut self, worker_count: usize, partial: bool) {
        let total = self.handle.shared.worker_count;
        let target = if partial {
            total.saturating_sub(worker_count)
        } else {
            total
        };
        let mut state = self.handle.shared.state.lock();
        if state.active_limit == target {
            return;
        }
        state.active_limit = target;
        drop(state);
        self.handle.shared.notify_all();
        debug!(active = target, total, "worker pool parallelism changed");
    }

    fn need_redraw(&self) -> bool {
        !self.ready.is_empty() || !self.results.is_empty()
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        {
            let mut state = self.handle.shared.state.lock();
            state.shutdown = true;
            state.queue.clear();
        }
        self.handle.shared.notify_all();
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                warn!("worker thread panicked");
            }
        }
    }
}

fn worker_loop<T>(index: usize, shared: &Shared<T>) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if state.shutdown {
                    return;
                }
                if !state.paused
                    && index < state.active_limit
                    && let Some(job) = state.queue.pop_front()
                {
                    state.running += 1;
                    break job;
                }
                shared.work.wait(&mut state);
            }
        };

        let Job { command, cancel } = job;
        if !cancel.is_cancelled() {
            // A panicking command must not take the worker or the running count with it.
            match panic::catch_unwind(AssertUnwindSafe(|| command(&cancel))) {
                Ok(Some(value)) if !cancel.is_cancelled() => {
                    let _ = shared.results.send(Completed {
                        generation: cancel.generation,
                        value,
                    });
                }
                Ok(_) => {}
                Err(_) => warn!(worker = index, "worker command panicked"),
            }
        }

        let mut state = shared.state.lock();
        state.running -= 1;
        if state.is_settled() {
            shared.idle.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn drain(pool: &mut WorkerPool<u32>) -> Vec<u32> {
        pool.wait_idle();
        pool.draw_frame();
        let mut out = pool.take_ready();
        out.sort_unstable();
        out
    }

    #[test]
    fn results_reach_the_render_thread() {
        let mut pool = WorkerPool::new(3, 16).expect("spawn");
        for i in 0..10 {
            pool.submit(move |_| Some(i)).expect("queue has room");
        }
        pool.submit(|_| None).expect("queue has room");
        assert_eq!(drain(&mut pool), (0..10).collect::<Vec<_>>());
        assert!(!pool.need_redraw());
    }

    #[test]
    fn queue_is_bounded() {
        let pool: WorkerPool<u32> = WorkerPool::new(1, 2).expect("spawn");
        let mut handle = pool.handle();
        handle.set_is_paused(true);
        pool.submit(|_| Some(1)).expect("room");
        pool.submit(|_| Some(2)).expect("room");
        assert!(matches!(
            pool.submit(|_| Some(3)),
            Err(PoolError::QueueFull { capacity: 2 })
        ));
        assert_eq!(handle.pending(), 2);
    }

    #[test]
    fn canceled_work_is_dropped() {
        let mut pool = WorkerPool::new(1, 8).expect("spawn");
        let mut handle = pool.handle();
        handle.set_is_paused(true);
        pool.submit(|_| Some(1)).expect("room");
        handle.cancel_commands();
        assert_eq!(handle.pending(), 0);
        handle.set_is_paused(false);
        pool.submit(|_| Some(2)).expect("room");
        assert_eq!(drain(&mut pool), vec![2]);
    }

    #[test]
    fn in_flight_command_observes_cancel() {
        let mut pool = WorkerPool::new(1, 8).expect("spawn");
        let mut handle = pool.handle();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        pool.submit(move |cancel| {
            started_tx.send(()).expect("test alive");
            release_rx.recv().expect("test alive");
            (!cancel.is_cancelled()).then_some(7)
        })
        .expect("room");
        started_rx.recv().expect("command started");
        handle.cancel_commands();
        release_tx.send(()).expect("command waiting");
        assert!(drain(&mut pool).is_empty());
    }

    #[test]
    fn partial_execution_is_absolute() {
        let mut pool: WorkerPool<u32> = WorkerPool::new(5, 8).expect("spawn");
        pool.set_partial_execution(4, true);
        pool.set_partial_execution(4, true);
        assert_eq!(pool.active_workers(), 1);
        pool.set_partial_execution(4, false);
        assert_eq!(pool.active_workers(), 5);
    }

    #[test]
    fn partial_pool_still_drains_queue() {
        let mut pool = WorkerPool::new(4, 32).expect("spawn");
        pool.set_partial_execution(3, true);
        for i in 0..20 {
            pool.submit(move |_| Some(i)).expect("room");
        }
        assert_eq!(drain(&mut pool), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn panicking_command_keeps_worker_alive() {
        let mut pool: WorkerPool<u32> = WorkerPool::new(1, 8).expect("spawn");
        pool.submit(|_| panic!("tile decode failed")).expect("room");
        pool.submit(|_| Some(5)).expect("room");
        assert_eq!(drain(&mut pool), vec![5]);
        assert_eq!(pool.handle().pending(), 0);

        pool.submit(|_| Some(6)).expect("room");
        assert_eq!(drain(&mut pool), vec![6]);
    }

    #[test]
    fn handle_outliving_pool_reports_shutdown() {
        let pool: WorkerPool<u32> = WorkerPool::new(2, 4).expect("spawn");
        let handle = pool.handle();
        drop(pool);
        assert!(matches!(handle.submit(|_| Some(1)), Err(PoolError::ShutDown)));
        handle.wait_idle();
    }
}
