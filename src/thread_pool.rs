//! Shared thread pool for parallel Monte Carlo scoring.
//!
//! All parallel work in the crate runs inside one pool so that concurrent
//! estimates from several callers do not each spin up their own workers.

#[cfg(feature = "parallel")]
use rayon::ThreadPool;

#[cfg(feature = "parallel")]
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
static THREAD_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

/// Get or initialize the shared thread pool.
///
/// The pool uses one worker per logical CPU. Returns `None` if the pool
/// could not be built, in which case work runs on rayon's global pool.
#[cfg(feature = "parallel")]
pub fn get_thread_pool() -> Option<&'static ThreadPool> {
    THREAD_POOL
        .get_or_init(|| {
            rayon::ThreadPoolBuilder::new()
                .thread_name(|i| format!("spike-info-{i}"))
                .build()
                .map_err(|e| tracing::warn!(error = %e, "Falling back to the global rayon pool"))
                .ok()
        })
        .as_ref()
}

/// Execute a parallel operation in the shared thread pool.
#[cfg(feature = "parallel")]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    match get_thread_pool() {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

/// Execute `op` directly; the `parallel` feature is disabled.
#[cfg(not(feature = "parallel"))]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R,
{
    op()
}
