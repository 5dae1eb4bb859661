//! Splitting work over the worker pool
//!
//! Every parallel operation in the crate goes through the partitioning rule
//! in [`Context::partition`]: the range `[0, len)` is cut into one contiguous
//! chunk per worker, with the last chunk absorbing the remainder. Short ranges,
//! or a context with a single worker, run on the calling thread.
//!
//! If a chunk panics, the scoped primitives do not retry the failing chunk.
//! They run the whole range again on the calling thread instead. Callers
//! must therefore pass closures that can safely be re-run over a range they
//! already partially wrote.

use std::mem::{self, MaybeUninit};
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};

use crossbeam_channel::Receiver;
use thiserror::Error;

use crate::Context;

/// Error returned when waiting on a submitted task whose closure panicked.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
#[error("worker task failed")]
pub struct TaskError;

/// Handle to a task submitted with [`Context::submit`].
#[derive(Debug)]
pub struct TaskHandle<R> {
    reply: Receiver<R>,
}

impl<R> TaskHandle<R> {
    /// Blocks until the task has finished and returns its result.
    pub fn wait(self) -> Result<R, TaskError> {
        self.reply.recv().map_err(|_| TaskError)
    }
}

impl Context {
    /// Splits `[0, len)` into the chunks a parallel operation would use.
    /// A single range means the operation runs on the calling thread.
    #[must_use]
    pub fn partition(&self, len: usize) -> Vec<Range<usize>> {
        let nthreads = len.min(self.thread_count());
        if nthreads < 2 || len < self.concurrency_threshold() {
            return vec![0..len];
        }
        let chunk = len / nthreads;
        (0..nthreads)
            .map(|t| {
                let start = t * chunk;
                let end = if t == nthreads - 1 { len } else { start + chunk };
                start..end
            })
            .collect()
    }

    /// Runs `task` on the worker pool.
    pub fn submit<R, F>(&self, task: F) -> TaskHandle<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let job = move || {
            // A panicking task drops `tx`, which `wait` reports as a failure.
            if let Ok(value) = panic::catch_unwind(AssertUnwindSafe(task)) {
                let _ = tx.send(value);
            }
        };
        match self.thread_pool() {
            Some(pool) => pool.spawn(job),
            None => job(),
        }
        TaskHandle { reply: rx }
    }

    /// Waits for every handle, returning the results in order. All handles
    /// are waited on even if one of them failed.
    pub fn await_all<R>(
        &self,
        handles: impl IntoIterator<Item = TaskHandle<R>>,
    ) -> Result<Vec<R>, TaskError> {
        let results: Vec<_> = handles.into_iter().map(TaskHandle::wait).collect();
        results.into_iter().collect()
    }

    /// Calls `f(offset, chunk)` for disjoint chunks of `out` covering the
    /// whole slice, in parallel when the slice is long enough.
    pub fn fill_chunks<T, F>(&self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync,
    {
        let ranges = self.partition(out.len());
        if ranges.len() > 1 {
            if let Some(pool) = self.thread_pool() {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    pool.scope(|s| {
                        let f = &f;
                        let mut rest: &mut [T] = &mut *out;
                        for range in &ranges {
                            let (head, tail) = mem::take(&mut rest).split_at_mut(range.len());
                            rest = tail;
                            let start = range.start;
                            s.spawn(move |_| f(start, head));
                        }
                    })
                }));
                if outcome.is_ok() {
                    return;
                }
                tracing::warn!(len = out.len(), "parallel dispatch failed, re-running sequentially");
            }
        }
        f(0, out);
    }

    /// Like [`Context::fill_chunks`] over two slices of equal length, split
    /// at the same offsets.
    pub fn fill_chunks2<A, B, F>(&self, a: &mut [A], b: &mut [B], f: F)
    where
        A: Send,
        B: Send,
        F: Fn(usize, &mut [A], &mut [B]) + Sync,
    {
        debug_assert_eq!(a.len(), b.len());
        let ranges = self.partition(a.len());
        if ranges.len() > 1 {
            if let Some(pool) = self.thread_pool() {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    pool.scope(|s| {
                        let f = &f;
                        let mut rest_a: &mut [A] = &mut *a;
                        let mut rest_b: &mut [B] = &mut *b;
                        for range in &ranges {
                            let (head_a, tail_a) = mem::take(&mut rest_a).split_at_mut(range.len());
                            let (head_b, tail_b) = mem::take(&mut rest_b).split_at_mut(range.len());
                            rest_a = tail_a;
                            rest_b = tail_b;
                            let start = range.start;
                            s.spawn(move |_| f(start, head_a, head_b));
                        }
                    })
                }));
                if outcome.is_ok() {
                    return;
                }
                tracing::warn!(len = a.len(), "parallel dispatch failed, re-running sequentially");
            }
        }
        f(0, a, b);
    }

    /// Evaluates `f` once per chunk of `[0, len)` and returns the partial
    /// results in chunk order.
    pub fn map_ranges<R, F>(&self, len: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(Range<usize>) -> R + Sync,
    {
        let ranges = self.partition(len);
        if ranges.len() > 1 {
            if let Some(pool) = self.thread_pool() {
                let mut slots: Vec<Option<R>> = ranges.iter().map(|_| None).collect();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    pool.scope(|s| {
                        let f = &f;
                        for (slot, range) in slots.iter_mut().zip(ranges.iter().cloned()) {
                            s.spawn(move |_| *slot = Some(f(range)));
                        }
                    })
                }));
                if outcome.is_ok() {
                    return slots.into_iter().flatten().collect();
                }
                tracing::warn!(len, "parallel dispatch failed, re-running sequentially");
            }
        }
        vec![f(0..len)]
    }

    /// Zeroes `bytes`, splitting the work like any other operation.
    pub(crate) fn zero_bytes(&self, bytes: &mut [MaybeUninit<u8>]) {
        self.fill_chunks(bytes, |_, chunk| chunk.fill(MaybeUninit::new(0)));
    }
}
