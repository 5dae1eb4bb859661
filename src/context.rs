//! Process-wide and explicit configuration for storage selection and
//! parallel dispatch

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use lazy_static::lazy_static;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Default number of elements below which operations stay on the calling thread.
pub const DEFAULT_CONCURRENCY_THRESHOLD: usize = 100_000;

/// Default largest length that is still backed by a managed buffer.
pub const DEFAULT_MAX_MANAGED_LEN: usize = 1 << 30;

/// Configuration consumed by the storage selector and the arithmetic engine.
///
/// All settings can be changed through `&self`, so a `Context` can be shared
/// between threads. Changes only affect operations started afterwards.
///
/// The process-wide default is available through [`Context::global`] and the
/// free functions of this module. Explicit contexts are mostly useful for
/// tests and for code that wants different thresholds side by side.
pub struct Context {
    threads: AtomicUsize,
    concurrency_threshold: AtomicUsize,
    max_managed_len: AtomicUsize,
    pool: RwLock<Option<Pool>>,
}

/// A worker pool and whether it was handed in by the caller.
struct Pool {
    pool: Arc<ThreadPool>,
    installed: bool,
}

lazy_static! {
    static ref GLOBAL: Context = Context::new();
}

fn default_threads() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

impl Context {
    /// Constructs a context with the default settings. Does not start any
    /// worker threads.
    #[must_use]
    pub fn new() -> Self {
        Self {
            threads: AtomicUsize::new(default_threads()),
            concurrency_threshold: AtomicUsize::new(DEFAULT_CONCURRENCY_THRESHOLD),
            max_managed_len: AtomicUsize::new(DEFAULT_MAX_MANAGED_LEN),
            pool: RwLock::new(None),
        }
    }

    /// The process-wide default context.
    #[must_use]
    pub fn global() -> &'static Context {
        &GLOBAL
    }

    /// Sets the worker count, see [`Context::set_thread_count`].
    #[must_use]
    pub fn with_threads(self, n: usize) -> Self {
        self.set_thread_count(n);
        self
    }

    /// Sets the concurrency threshold, see [`Context::set_concurrency_threshold`].
    #[must_use]
    pub fn with_concurrency_threshold(self, n: usize) -> Self {
        self.set_concurrency_threshold(n);
        self
    }

    /// Sets the managed storage limit, see [`Context::set_max_managed_len`].
    #[must_use]
    pub fn with_max_managed_len(self, n: usize) -> Self {
        self.set_max_managed_len(n);
        self
    }

    /// Uses the given pool for parallel work.
    #[must_use]
    pub fn with_thread_pool(self, pool: Arc<ThreadPool>) -> Self {
        self.set_thread_pool(pool);
        self
    }

    /// Number of chunks large operations are split into.
    pub fn thread_count(&self) -> usize {
        self.threads.load(Ordering::Relaxed)
    }

    /// Changes the number of chunks large operations are split into. Values
    /// below one are clamped to one. A pool built by the context with a
    /// different worker count is discarded and rebuilt on next use; a pool
    /// installed with [`Context::set_thread_pool`] is kept.
    pub fn set_thread_count(&self, n: usize) {
        let n = n.max(1);
        let previous = self.threads.swap(n, Ordering::Relaxed);
        if previous != n {
            let mut slot = self.pool.write().unwrap_or_else(|e| e.into_inner());
            if slot
                .as_ref()
                .map_or(false, |p| !p.installed && p.pool.current_num_threads() != n)
            {
                *slot = None;
            }
        }
    }

    /// Minimum number of elements before an operation is split across workers.
    pub fn concurrency_threshold(&self) -> usize {
        self.concurrency_threshold.load(Ordering::Relaxed)
    }

    /// Changes the concurrency threshold. Clamped to at least one.
    pub fn set_concurrency_threshold(&self, n: usize) {
        self.concurrency_threshold.store(n.max(1), Ordering::Relaxed);
    }

    /// Largest length for which new arrays use managed storage.
    pub fn max_managed_len(&self) -> usize {
        self.max_managed_len.load(Ordering::Relaxed)
    }

    /// Changes the largest length for which new arrays use managed storage.
    /// Existing arrays keep the storage they were created with.
    pub fn set_max_managed_len(&self, n: usize) {
        self.max_managed_len.store(n, Ordering::Relaxed);
    }

    /// Replaces the worker pool. The pool stays in use until
    /// [`Context::shutdown_thread_pool`] or another call to this method.
    pub fn set_thread_pool(&self, pool: Arc<ThreadPool>) {
        *self.pool.write().unwrap_or_else(|e| e.into_inner()) = Some(Pool { pool, installed: true });
    }

    /// Drops this context's reference to its worker pool. The pool is rebuilt
    /// the next time parallel work is dispatched.
    pub fn shutdown_thread_pool(&self) {
        *self.pool.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Returns the worker pool, building it if necessary. `None` means the
    /// pool could not be built and work should run on the calling thread.
    pub fn thread_pool(&self) -> Option<Arc<ThreadPool>> {
        if let Some(p) = self.pool.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            return Some(p.pool.clone());
        }
        let mut slot = self.pool.write().unwrap_or_else(|e| e.into_inner());
        if let Some(p) = slot.as_ref() {
            return Some(p.pool.clone());
        }
        let threads = self.thread_count();
        match ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("larray-worker-{}", i))
            .build()
        {
            Ok(pool) => {
                tracing::debug!(threads, "built worker pool");
                let pool = Arc::new(pool);
                *slot = Some(Pool {
                    pool: pool.clone(),
                    installed: false,
                });
                Some(pool)
            }
            Err(err) => {
                tracing::warn!(%err, "failed to build worker pool, running sequentially");
                None
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("threads", &self.thread_count())
            .field("concurrency_threshold", &self.concurrency_threshold())
            .field("max_managed_len", &self.max_managed_len())
            .finish()
    }
}

/// Worker count of the global context.
pub fn thread_count() -> usize {
    Context::global().thread_count()
}

/// Sets the worker count of the global context.
pub fn set_thread_count(n: usize) {
    Context::global().set_thread_count(n);
}

/// Concurrency threshold of the global context.
pub fn concurrency_threshold() -> usize {
    Context::global().concurrency_threshold()
}

/// Sets the concurrency threshold of the global context.
pub fn set_concurrency_threshold(n: usize) {
    Context::global().set_concurrency_threshold(n);
}

/// Managed storage limit of the global context.
pub fn max_managed_len() -> usize {
    Context::global().max_managed_len()
}

/// Sets the managed storage limit of the global context.
pub fn set_max_managed_len(n: usize) {
    Context::global().set_max_managed_len(n);
}

/// Worker pool of the global context.
pub fn thread_pool() -> Option<Arc<ThreadPool>> {
    Context::global().thread_pool()
}

/// Replaces the worker pool of the global context.
pub fn set_thread_pool(pool: Arc<ThreadPool>) {
    Context::global().set_thread_pool(pool);
}

/// Releases the worker pool of the global context.
pub fn shutdown_thread_pool() {
    Context::global().shutdown_thread_pool();
}
