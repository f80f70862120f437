// src/cancel.rs

//! Cancellation of blocked synchronous operations.
//!
//! A [`CancelToken`] lets an external task abort a `put_with_token` or
//! `take_with_token` call that is blocked on a full or empty queue. The token
//! is one-shot: once cancelled it stays cancelled, and every operation
//! observing it (current or future) fails with a `Cancelled` error.
//!
//! Asynchronous operations do not use tokens; dropping a
//! [`PutFuture`](crate::PutFuture) or [`TakeFuture`](crate::TakeFuture)
//! cancels it.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Thread};

#[derive(Debug)]
struct TokenInner {
  cancelled: AtomicBool,
  /// Threads currently parked inside an operation observing this token.
  /// `cancel` unparks all of them; each deregisters itself on the way out.
  parked: Mutex<Vec<Thread>>,
}

/// A cloneable, one-shot cancellation token for blocking queue operations.
///
/// Clones share the same state: cancelling any clone cancels them all. A
/// single token may be observed by any number of concurrent operations.
#[derive(Debug, Clone)]
pub struct CancelToken {
  inner: Arc<TokenInner>,
}

impl CancelToken {
  /// Creates a new, un-cancelled token.
  pub fn new() -> Self {
    CancelToken {
      inner: Arc::new(TokenInner {
        cancelled: AtomicBool::new(false),
        parked: Mutex::new(Vec::new()),
      }),
    }
  }

  /// Cancels the token, promptly waking every operation blocked on it.
  ///
  /// Idempotent: cancelling an already-cancelled token has no further effect.
  pub fn cancel(&self) {
    self.inner.cancelled.store(true, Ordering::Release);
    // Wake outside the registration lock.
    let threads = std::mem::take(&mut *self.inner.parked.lock());
    for t in threads {
      t.unpark();
    }
  }

  /// Returns `true` if `cancel` has been called on this token or any clone.
  #[inline]
  pub fn is_cancelled(&self) -> bool {
    self.inner.cancelled.load(Ordering::Acquire)
  }

  /// Registers the current thread for wake-up on cancellation, for the
  /// duration of the returned guard.
  pub(crate) fn register_current_thread(&self) -> ParkRegistration<'_> {
    let current = thread::current();
    self.inner.parked.lock().push(current.clone());
    ParkRegistration {
      token: self,
      thread: current,
    }
  }
}

impl Default for CancelToken {
  fn default() -> Self {
    Self::new()
  }
}

/// RAII guard removing the owning thread from the token's parked list.
pub(crate) struct ParkRegistration<'a> {
  token: &'a CancelToken,
  thread: Thread,
}

impl Drop for ParkRegistration<'_> {
  fn drop(&mut self) {
    let mut parked = self.token.inner.parked.lock();
    if let Some(pos) = parked.iter().position(|t| t.id() == self.thread.id()) {
      parked.swap_remove(pos);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cancel_is_sticky_and_shared() {
    let token = CancelToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());
    token.cancel();
    assert!(clone.is_cancelled());
    // Idempotent.
    clone.cancel();
    assert!(token.is_cancelled());
  }

  #[test]
  fn registration_is_removed_on_drop() {
    let token = CancelToken::new();
    {
      let _reg = token.register_current_thread();
      assert_eq!(token.inner.parked.lock().len(), 1);
    }
    assert_eq!(token.inner.parked.lock().len(), 0);
  }
}
