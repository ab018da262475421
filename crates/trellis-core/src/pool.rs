//! Request context pooling.
//!
//! Contexts are recycled rather than rebuilt per request: [`ContextPool`]
//! keeps a free list of instances and [`PooledContext`] is an RAII guard
//! that returns its slot on drop. Because release rides on `Drop`, it runs
//! exactly once on every exit path, including error and panic unwind.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::RequestContext;

/// A pool of reusable [`RequestContext`] instances.
///
/// `acquire` pops a free slot (allocating when the list is empty) and
/// resets it to the neutral baseline, so no state from a previous request
/// is ever observable. The free list retains at most `max_idle` instances;
/// slots beyond that are dropped on release.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use trellis_core::ContextPool;
///
/// let pool = Arc::new(ContextPool::new(64));
/// {
///     let mut ctx = pool.acquire();
///     ctx.set(7u32);
/// } // slot returned here
/// assert_eq!(pool.idle(), 1);
/// ```
#[derive(Debug)]
pub struct ContextPool {
    /// Free list. The lock is held only for a push or pop.
    free: Mutex<Vec<Box<RequestContext>>>,
    /// Maximum number of idle instances retained.
    max_idle: usize,
}

impl ContextPool {
    /// Default bound on retained idle contexts.
    pub const DEFAULT_MAX_IDLE: usize = 256;

    /// Creates a pool retaining at most `max_idle` idle contexts.
    #[must_use]
    pub fn new(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Acquires a context, reset to the neutral baseline.
    #[must_use]
    pub fn acquire(self: &Arc<Self>) -> PooledContext {
        let mut ctx = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| Box::new(RequestContext::new()));
        ctx.reset();
        PooledContext {
            ctx: Some(ctx),
            pool: Arc::clone(self),
        }
    }

    /// Returns the number of idle contexts currently retained.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn release(&self, ctx: Box<RequestContext>) {
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(ctx);
        }
    }
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_IDLE)
    }
}

/// RAII guard around a pooled [`RequestContext`].
///
/// Dereferences to the context; the slot goes back to the pool when the
/// guard is dropped.
#[derive(Debug)]
pub struct PooledContext {
    /// The held slot. `Some` for the guard's whole life; taken only in Drop.
    ctx: Option<Box<RequestContext>>,
    /// Owning pool.
    pool: Arc<ContextPool>,
}

impl Deref for PooledContext {
    type Target = RequestContext;

    fn deref(&self) -> &RequestContext {
        match &self.ctx {
            Some(ctx) => ctx,
            None => unreachable!(),
        }
    }
}

impl DerefMut for PooledContext {
    fn deref_mut(&mut self) -> &mut RequestContext {
        match &mut self.ctx {
            Some(ctx) => ctx,
            None => unreachable!(),
        }
    }
}

impl Drop for PooledContext {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_release_on_drop() {
        let pool = Arc::new(ContextPool::new(8));
        assert_eq!(pool.idle(), 0);

        {
            let _ctx = pool.acquire();
            assert_eq!(pool.idle(), 0);
        }
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_acquire_reuses_released_slot() {
        let pool = Arc::new(ContextPool::new(8));
        drop(pool.acquire());
        assert_eq!(pool.idle(), 1);

        let _ctx = pool.acquire();
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_no_state_leaks_across_requests() {
        let pool = Arc::new(ContextPool::new(8));

        {
            let mut ctx = pool.acquire();
            ctx.set(42u32);
            ctx.set_cookie("session=abc");
            let _ = ctx.text(StatusCode::OK, "done");
        }

        let ctx = pool.acquire();
        assert!(!ctx.has::<u32>());
        assert!(ctx.response_cookies().is_empty());
        assert!(!ctx.responded());
    }

    #[test]
    fn test_fresh_request_id_per_acquire() {
        let pool = Arc::new(ContextPool::new(8));

        let first = pool.acquire().request_id();
        let second = pool.acquire().request_id();
        assert_ne!(first, second);
    }

    #[test]
    fn test_max_idle_caps_retention() {
        let pool = Arc::new(ContextPool::new(2));

        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        drop(a);
        drop(b);
        drop(c);

        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_release_on_panic_unwind() {
        let pool = Arc::new(ContextPool::new(8));
        let pool_in_panic = Arc::clone(&pool);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _ctx = pool_in_panic.acquire();
            panic!("handler blew up");
        }));

        assert!(result.is_err());
        assert_eq!(pool.idle(), 1);
    }
}
