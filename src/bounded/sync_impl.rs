// src/bounded/sync_impl.rs

//! The blocking, thread-based `put` and `take` paths.
//!
//! All four operations share the same phase structure: a non-blocking fast
//! path, then a locked re-check of the predicate before committing to park
//! (this is what prevents lost wake-ups), then the actual wait outside the
//! lock, then back to the top to retry. A woken thread never assumes its
//! predicate holds; it always re-runs the fast path.

use super::backoff;
use super::core::{QueueCore, SyncWaiter};
use crate::cancel::CancelToken;
use crate::error::{
  PutError, PutTimeoutError, TakeError, TakeTimeoutError, TryPutError, TryTakeError,
};
use crate::telemetry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Blocking insert. Parks the calling thread while the queue is full.
///
/// With a token, cancellation wakes the thread promptly; the abandoned
/// waiter's wake-up (if one was already claimed) is forwarded so another
/// producer is not left sleeping on a free slot.
pub(crate) fn put_sync<T: Send>(
  core: &QueueCore<T>,
  item: T,
  token: Option<&CancelToken>,
) -> Result<(), PutError<T>> {
  let mut item = Some(item);

  loop {
    if let Some(token) = token {
      if token.is_cancelled() {
        return Err(PutError::Cancelled(item.take().unwrap()));
      }
    }

    // --- Phase 1: fast path ---
    match core.try_put_core(item.take().unwrap()) {
      Ok(()) => return Ok(()),
      Err(TryPutError::Closed(v)) => return Err(PutError::Closed(v)),
      Err(TryPutError::Full(v)) => {
        item = Some(v); // Keep ownership across the slow path.
      }
    }

    // --- Phase 2: lock, re-check, commit to parking ---
    let done = Arc::new(AtomicBool::new(false));
    let id;
    {
      let mut guard = core.state.lock();
      if guard.closed {
        return Err(PutError::Closed(item.take().unwrap()));
      }
      // A slot may have freed between the fast path and taking the lock.
      if guard.items.len() < core.capacity {
        continue;
      }
      id = core.next_waiter_id();
      guard.waiting_sync_producers.push_back(SyncWaiter {
        id,
        thread: thread::current(),
        done: done.clone(),
      });
    }
    telemetry::increment_counter("bounded::put_sync", "producer_parked");

    // --- Phase 3: wait outside the lock ---
    match token {
      Some(token) => {
        let _reg = token.register_current_thread();
        backoff::adaptive_wait(|| done.load(Ordering::Acquire) || token.is_cancelled());
        if token.is_cancelled() {
          core.abandon_producer(id);
          return Err(PutError::Cancelled(item.take().unwrap()));
        }
      }
      None => backoff::adaptive_wait(|| done.load(Ordering::Acquire)),
    }

    // --- Phase 4: woken; loop to retry ---
  }
}

/// Blocking removal. Parks the calling thread while the queue is empty.
pub(crate) fn take_sync<T: Send>(
  core: &QueueCore<T>,
  token: Option<&CancelToken>,
) -> Result<T, TakeError> {
  loop {
    if let Some(token) = token {
      if token.is_cancelled() {
        return Err(TakeError::Cancelled);
      }
    }

    // --- Phase 1: fast path ---
    match core.try_take_core() {
      Ok(item) => return Ok(item),
      Err(TryTakeError::Closed) => return Err(TakeError::Closed),
      Err(TryTakeError::Empty) => {}
    }

    // --- Phase 2: lock, re-check, commit to parking ---
    let done = Arc::new(AtomicBool::new(false));
    let id;
    {
      let mut guard = core.state.lock();
      // Items are drained even after close, so check the buffer first.
      if !guard.items.is_empty() {
        continue;
      }
      if guard.closed {
        return Err(TakeError::Closed);
      }
      id = core.next_waiter_id();
      guard.waiting_sync_consumers.push_back(SyncWaiter {
        id,
        thread: thread::current(),
        done: done.clone(),
      });
    }
    telemetry::increment_counter("bounded::take_sync", "consumer_parked");

    // --- Phase 3: wait outside the lock ---
    match token {
      Some(token) => {
        let _reg = token.register_current_thread();
        backoff::adaptive_wait(|| done.load(Ordering::Acquire) || token.is_cancelled());
        if token.is_cancelled() {
          core.abandon_consumer(id);
          return Err(TakeError::Cancelled);
        }
      }
      None => backoff::adaptive_wait(|| done.load(Ordering::Acquire)),
    }

    // --- Phase 4: woken; loop to retry ---
  }
}

/// Blocking insert with a deadline.
pub(crate) fn put_timeout_sync<T: Send>(
  core: &QueueCore<T>,
  item: T,
  timeout: Duration,
) -> Result<(), PutTimeoutError<T>> {
  let start = Instant::now();
  let mut item = Some(item);

  loop {
    match core.try_put_core(item.take().unwrap()) {
      Ok(()) => return Ok(()),
      Err(TryPutError::Closed(v)) => return Err(PutTimeoutError::Closed(v)),
      Err(TryPutError::Full(v)) => {
        item = Some(v);
      }
    }

    let elapsed = start.elapsed();
    if elapsed >= timeout {
      return Err(PutTimeoutError::Timeout(item.take().unwrap()));
    }
    let remaining = timeout - elapsed;

    let done = Arc::new(AtomicBool::new(false));
    let id;
    {
      let mut guard = core.state.lock();
      if guard.closed {
        return Err(PutTimeoutError::Closed(item.take().unwrap()));
      }
      if guard.items.len() < core.capacity {
        continue;
      }
      id = core.next_waiter_id();
      guard.waiting_sync_producers.push_back(SyncWaiter {
        id,
        thread: thread::current(),
        done: done.clone(),
      });
    }

    thread::park_timeout(remaining);

    // Timed out or woken spuriously: take our entry back out before the
    // retry. If the entry is already gone we were chosen for a wake-up, and
    // the retry at the top of the loop consumes it.
    if !done.load(Ordering::Acquire) {
      core.remove_producer(id);
    }
  }
}

/// Blocking removal with a deadline.
pub(crate) fn take_timeout_sync<T: Send>(
  core: &QueueCore<T>,
  timeout: Duration,
) -> Result<T, TakeTimeoutError> {
  let start = Instant::now();

  loop {
    match core.try_take_core() {
      Ok(item) => return Ok(item),
      Err(TryTakeError::Closed) => return Err(TakeTimeoutError::Closed),
      Err(TryTakeError::Empty) => {}
    }

    let elapsed = start.elapsed();
    if elapsed >= timeout {
      return Err(TakeTimeoutError::Timeout);
    }
    let remaining = timeout - elapsed;

    let done = Arc::new(AtomicBool::new(false));
    let id;
    {
      let mut guard = core.state.lock();
      if !guard.items.is_empty() {
        continue;
      }
      if guard.closed {
        return Err(TakeTimeoutError::Closed);
      }
      id = core.next_waiter_id();
      guard.waiting_sync_consumers.push_back(SyncWaiter {
        id,
        thread: thread::current(),
        done: done.clone(),
      });
    }

    thread::park_timeout(remaining);

    if !done.load(Ordering::Acquire) {
      core.remove_consumer(id);
    }
  }
}
