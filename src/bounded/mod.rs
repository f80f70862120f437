// src/bounded/mod.rs

//! A fixed-capacity FIFO queue with blocking `put` and `take`.
//!
//! The queue is a single synchronization point shared by any number of
//! producer and consumer tasks: `put` blocks while the queue is full and
//! `take` blocks while it is empty, so a slow consumer exerts backpressure
//! on its producers instead of letting memory grow without bound.
//!
//! Data ordering is strict FIFO regardless of how many tasks contend. No
//! fairness is guaranteed between blocked tasks themselves; whichever waiter
//! wins the race after a wake-up proceeds first, but items always leave in
//! the order they were inserted.
//!
//! Both a synchronous handle ([`BoundedQueue`]) and an asynchronous one
//! ([`AsyncBoundedQueue`]) exist over the same underlying queue, and may be
//! mixed: a thread can block in `put` while an async task awaits `take` on
//! the same instance. Handles are cheap clones of a shared core.

use crate::cancel::CancelToken;
use crate::error::{
  CapacityError, CloseError, PutError, PutTimeoutError, TakeError, TakeTimeoutError, TryPutError,
  TryTakeError,
};

pub use async_impl::{PutFuture, TakeFuture};

mod async_impl;
mod backoff;
mod core;
mod sync_impl;

use self::core::QueueCore;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

// --- Public Handles ---

/// A synchronous handle to a bounded blocking queue.
///
/// Clones share the same queue. The queue lives as long as its longest-lived
/// handle; dropping the last handle drops any buffered items.
#[derive(Debug)]
pub struct BoundedQueue<T: Send> {
  core: Arc<QueueCore<T>>,
}

/// An asynchronous handle to a bounded blocking queue.
///
/// Clones share the same queue. Also a [`futures_core::Stream`] of the
/// queue's items, ending when the queue is closed and drained.
#[derive(Debug)]
pub struct AsyncBoundedQueue<T: Send> {
  core: Arc<QueueCore<T>>,
  /// Waiter registered by a pending `Stream::poll_next`, if any.
  stream_waiter: Option<u64>,
}

// --- Constructors ---

impl<T: Send> BoundedQueue<T> {
  /// Creates a queue holding at most `capacity` items.
  ///
  /// # Errors
  ///
  /// Returns [`CapacityError`] if `capacity` is zero.
  pub fn new(capacity: usize) -> Result<Self, CapacityError> {
    if capacity == 0 {
      return Err(CapacityError);
    }
    Ok(BoundedQueue {
      core: Arc::new(QueueCore::new(capacity)),
    })
  }
}

impl<T: Send> AsyncBoundedQueue<T> {
  /// Creates a queue holding at most `capacity` items, with an async handle.
  ///
  /// # Errors
  ///
  /// Returns [`CapacityError`] if `capacity` is zero.
  pub fn new(capacity: usize) -> Result<Self, CapacityError> {
    BoundedQueue::new(capacity).map(BoundedQueue::to_async)
  }
}

// --- Clone ---

impl<T: Send> Clone for BoundedQueue<T> {
  fn clone(&self) -> Self {
    BoundedQueue {
      core: Arc::clone(&self.core),
    }
  }
}

impl<T: Send> Clone for AsyncBoundedQueue<T> {
  fn clone(&self) -> Self {
    AsyncBoundedQueue {
      core: Arc::clone(&self.core),
      stream_waiter: None,
    }
  }
}

// --- Synchronous API ---

impl<T: Send> BoundedQueue<T> {
  /// Inserts `item` at the tail, blocking the calling thread while the
  /// queue is full.
  ///
  /// # Errors
  ///
  /// Returns [`PutError::Closed`] (with the item) if the queue is closed.
  pub fn put(&self, item: T) -> Result<(), PutError<T>> {
    sync_impl::put_sync(&self.core, item, None)
  }

  /// Like [`put`](Self::put), but the wait can be aborted through `token`.
  ///
  /// # Errors
  ///
  /// Returns [`PutError::Cancelled`] (with the item) if `token` is cancelled
  /// before a slot frees, or [`PutError::Closed`] if the queue is closed.
  pub fn put_with_token(&self, item: T, token: &CancelToken) -> Result<(), PutError<T>> {
    sync_impl::put_sync(&self.core, item, Some(token))
  }

  /// Attempts to insert `item` without blocking.
  pub fn try_put(&self, item: T) -> Result<(), TryPutError<T>> {
    self.core.try_put_core(item)
  }

  /// Inserts `item`, blocking for at most `timeout`.
  ///
  /// # Errors
  ///
  /// Returns [`PutTimeoutError::Timeout`] (with the item) if no slot frees
  /// in time.
  pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PutTimeoutError<T>> {
    sync_impl::put_timeout_sync(&self.core, item, timeout)
  }

  /// Removes and returns the head element, blocking the calling thread
  /// while the queue is empty.
  ///
  /// # Errors
  ///
  /// Returns [`TakeError::Closed`] once the queue is closed and drained.
  pub fn take(&self) -> Result<T, TakeError> {
    sync_impl::take_sync(&self.core, None)
  }

  /// Like [`take`](Self::take), but the wait can be aborted through `token`.
  pub fn take_with_token(&self, token: &CancelToken) -> Result<T, TakeError> {
    sync_impl::take_sync(&self.core, Some(token))
  }

  /// Attempts to remove the head element without blocking.
  pub fn try_take(&self) -> Result<T, TryTakeError> {
    self.core.try_take_core()
  }

  /// Removes the head element, blocking for at most `timeout`.
  pub fn take_timeout(&self, timeout: Duration) -> Result<T, TakeTimeoutError> {
    sync_impl::take_timeout_sync(&self.core, timeout)
  }

  /// Closes the queue. Blocked and future `put`s fail; `take` drains any
  /// buffered items before failing. All parked waiters are woken.
  ///
  /// # Errors
  ///
  /// Returns [`CloseError`] if the queue was already closed.
  pub fn close(&self) -> Result<(), CloseError> {
    self.core.close_core()
  }

  /// Returns `true` if the queue has been closed.
  pub fn is_closed(&self) -> bool {
    self.core.state.lock().closed
  }

  /// Returns the number of items currently buffered.
  #[inline]
  pub fn len(&self) -> usize {
    self.core.state.lock().items.len()
  }

  /// Returns `true` if no items are buffered.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns `true` if the queue is at capacity.
  #[inline]
  pub fn is_full(&self) -> bool {
    self.len() == self.core.capacity
  }

  /// Returns the fixed capacity chosen at construction.
  #[inline]
  pub fn capacity(&self) -> usize {
    self.core.capacity
  }

  /// Converts this handle into an asynchronous one. The queue itself is
  /// unaffected; other handles keep working.
  pub fn to_async(self) -> AsyncBoundedQueue<T> {
    AsyncBoundedQueue {
      core: self.core,
      stream_waiter: None,
    }
  }
}

// --- Asynchronous API ---

impl<T: Send> AsyncBoundedQueue<T> {
  pub(crate) fn core(&self) -> &QueueCore<T> {
    &self.core
  }

  /// Inserts `item` at the tail, waiting while the queue is full.
  ///
  /// Dropping the returned future before completion cancels the operation;
  /// the item is dropped with the future.
  pub fn put(&self, item: T) -> PutFuture<'_, T> {
    PutFuture::new(self, item)
  }

  /// Attempts to insert `item` without waiting.
  pub fn try_put(&self, item: T) -> Result<(), TryPutError<T>> {
    self.core.try_put_core(item)
  }

  /// Removes and returns the head element, waiting while the queue is
  /// empty.
  ///
  /// Dropping the returned future before completion cancels the operation.
  pub fn take(&self) -> TakeFuture<'_, T> {
    TakeFuture::new(self)
  }

  /// Attempts to remove the head element without waiting.
  pub fn try_take(&self) -> Result<T, TryTakeError> {
    self.core.try_take_core()
  }

  /// Closes the queue. See [`BoundedQueue::close`].
  pub fn close(&self) -> Result<(), CloseError> {
    self.core.close_core()
  }

  /// Returns `true` if the queue has been closed.
  pub fn is_closed(&self) -> bool {
    self.core.state.lock().closed
  }

  /// Returns the number of items currently buffered.
  #[inline]
  pub fn len(&self) -> usize {
    self.core.state.lock().items.len()
  }

  /// Returns `true` if no items are buffered.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns `true` if the queue is at capacity.
  #[inline]
  pub fn is_full(&self) -> bool {
    self.len() == self.core.capacity
  }

  /// Returns the fixed capacity chosen at construction.
  #[inline]
  pub fn capacity(&self) -> usize {
    self.core.capacity
  }

  /// Converts this handle into a synchronous one.
  ///
  /// The `Drop` implementation of the original handle is not run; any
  /// pending stream registration is released first.
  pub fn to_sync(mut self) -> BoundedQueue<T> {
    self.release_stream_waiter();
    let core = unsafe { std::ptr::read(&self.core) };
    mem::forget(self);
    BoundedQueue { core }
  }

  fn release_stream_waiter(&mut self) {
    if let Some(id) = self.stream_waiter.take() {
      self.core.abandon_consumer(id);
    }
  }
}

impl<T: Send> Drop for AsyncBoundedQueue<T> {
  fn drop(&mut self) {
    // A waiter registered by a pending poll_next must not outlive the
    // handle; forward its wake-up if one was already claimed.
    self.release_stream_waiter();
  }
}
