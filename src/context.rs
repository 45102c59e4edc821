//! Cooperative cancellation for running invocations
//!
//! A [`Context`] is cheap to clone; clones share state. A child context is
//! done when it or any of its ancestors is done, so cancelling a child never
//! affects the parent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Cancellation;

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Context>,
}

/// Cancellation and deadline token passed to an invocation
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// A context that is never done unless cancelled explicitly
    pub fn background() -> Self {
        Self::build(None, None)
    }

    /// A context whose deadline is `timeout` from now. A timeout too large
    /// to represent means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(deadline_after(timeout), None)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(Some(deadline), None)
    }

    /// Derive a context that is also done when `self` is done
    pub fn child(&self) -> Self {
        Self::build(None, Some(self.clone()))
    }

    /// Derive a context with its own, possibly earlier, deadline
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        Self::build(deadline_after(timeout), Some(self.clone()))
    }

    fn build(deadline: Option<Instant>, parent: Option<Context>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline,
                parent,
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Why the context is done, or `None` while it is still live
    pub fn err(&self) -> Option<Cancellation> {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return Some(Cancellation::Cancelled);
        }
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                return Some(Cancellation::DeadlineExceeded);
            }
        }
        self.inner.parent.as_ref().and_then(Context::err)
    }
}

fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
