// src/bounded/core.rs

//! The shared state and non-blocking logic of the bounded queue.
//!
//! A single `parking_lot::Mutex` guards the item buffer and the waiter
//! queues. To let synchronous threads and asynchronous tasks block on the
//! same queue, parked producers and parked consumers are each held in two
//! queues, one for threads (`thread::unpark` wake-up) and one for tasks
//! (`Waker` wake-up).
//!
//! Wake-ups are advisory: a parked waiter never receives an item directly.
//! Whoever is woken re-acquires the lock and re-runs its predicate, so
//! spurious wake-ups and racing rivals are tolerated by construction.
//! Waking always happens after the lock has been released.
//!
//! Every parked waiter carries a queue-assigned id. A waiter that leaves
//! without completing its operation (cancellation, timeout, dropped future)
//! removes itself by id; if its entry is already gone, it was chosen for a
//! wake-up, and the wake-up is passed on to the next waiter of the same
//! class so the signal is not lost.

use crate::error::{CloseError, TryPutError, TryTakeError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::Waker;
use std::thread::Thread;

/// A parked synchronous thread.
#[derive(Debug)]
pub(crate) struct SyncWaiter {
  pub(crate) id: u64,
  /// Handle used for `unpark()`.
  pub(crate) thread: Thread,
  /// Set before unparking so the adaptive wait can stop re-parking.
  pub(crate) done: Arc<AtomicBool>,
}

impl SyncWaiter {
  pub(crate) fn wake(self) {
    self.done.store(true, Ordering::Release);
    self.thread.unpark();
  }
}

/// A parked asynchronous task.
#[derive(Debug)]
pub(crate) struct AsyncWaiter {
  pub(crate) id: u64,
  pub(crate) waker: Waker,
}

/// A waiter popped for wake-up, to be woken once the lock is released.
#[derive(Debug)]
pub(crate) enum Waiting {
  Sync(SyncWaiter),
  Async(AsyncWaiter),
}

impl Waiting {
  pub(crate) fn wake(self) {
    match self {
      Waiting::Sync(w) => w.wake(),
      Waiting::Async(w) => w.waker.wake(),
    }
  }
}

/// The queue state, protected by `QueueCore::state`.
#[derive(Debug)]
pub(crate) struct QueueState<T> {
  /// The item buffer. Insertion at the tail, removal from the head.
  pub(crate) items: VecDeque<T>,
  /// Set once by `close`; never cleared.
  pub(crate) closed: bool,
  pub(crate) waiting_sync_producers: VecDeque<SyncWaiter>,
  pub(crate) waiting_async_producers: VecDeque<AsyncWaiter>,
  pub(crate) waiting_sync_consumers: VecDeque<SyncWaiter>,
  pub(crate) waiting_async_consumers: VecDeque<AsyncWaiter>,
}

impl<T> QueueState<T> {
  /// Pops the next parked producer, async waiters first (they are cheaper
  /// to wake).
  pub(crate) fn pop_producer(&mut self) -> Option<Waiting> {
    if let Some(w) = self.waiting_async_producers.pop_front() {
      return Some(Waiting::Async(w));
    }
    self.waiting_sync_producers.pop_front().map(Waiting::Sync)
  }

  /// Pops the next parked consumer, async waiters first.
  pub(crate) fn pop_consumer(&mut self) -> Option<Waiting> {
    if let Some(w) = self.waiting_async_consumers.pop_front() {
      return Some(Waiting::Async(w));
    }
    self.waiting_sync_consumers.pop_front().map(Waiting::Sync)
  }

  /// Removes a parked producer by id. Returns `false` if the entry is gone,
  /// i.e. the waiter was already chosen for a wake-up.
  pub(crate) fn remove_producer(&mut self, id: u64) -> bool {
    if let Some(pos) = self.waiting_sync_producers.iter().position(|w| w.id == id) {
      self.waiting_sync_producers.remove(pos);
      return true;
    }
    if let Some(pos) = self.waiting_async_producers.iter().position(|w| w.id == id) {
      self.waiting_async_producers.remove(pos);
      return true;
    }
    false
  }

  /// Removes a parked consumer by id. Returns `false` if the entry is gone.
  pub(crate) fn remove_consumer(&mut self, id: u64) -> bool {
    if let Some(pos) = self.waiting_sync_consumers.iter().position(|w| w.id == id) {
      self.waiting_sync_consumers.remove(pos);
      return true;
    }
    if let Some(pos) = self.waiting_async_consumers.iter().position(|w| w.id == id) {
      self.waiting_async_consumers.remove(pos);
      return true;
    }
    false
  }
}

/// The shared owner of the queue's state, wrapped in an `Arc` by the public
/// handles.
#[derive(Debug)]
pub(crate) struct QueueCore<T> {
  pub(crate) state: Mutex<QueueState<T>>,
  /// Fixed at construction; always at least 1.
  pub(crate) capacity: usize,
  next_waiter_id: AtomicU64,
}

impl<T: Send> QueueCore<T> {
  pub(crate) fn new(capacity: usize) -> Self {
    debug_assert!(capacity > 0, "capacity validated by the public constructor");
    QueueCore {
      state: Mutex::new(QueueState {
        items: VecDeque::with_capacity(capacity),
        closed: false,
        waiting_sync_producers: VecDeque::new(),
        waiting_async_producers: VecDeque::new(),
        waiting_sync_consumers: VecDeque::new(),
        waiting_async_consumers: VecDeque::new(),
      }),
      capacity,
      next_waiter_id: AtomicU64::new(0),
    }
  }

  pub(crate) fn next_waiter_id(&self) -> u64 {
    self.next_waiter_id.fetch_add(1, Ordering::Relaxed)
  }

  /// Non-blocking insert. Appends at the tail if there is room, then wakes
  /// one parked consumer.
  pub(crate) fn try_put_core(&self, item: T) -> Result<(), TryPutError<T>> {
    let mut guard = self.state.lock();

    if guard.closed {
      return Err(TryPutError::Closed(item));
    }
    if guard.items.len() == self.capacity {
      return Err(TryPutError::Full(item));
    }

    guard.items.push_back(item);
    let waiter = guard.pop_consumer();
    drop(guard);
    if let Some(w) = waiter {
      w.wake();
    }
    Ok(())
  }

  /// Non-blocking removal. Takes the head element if there is one, then
  /// wakes one parked producer. Buffered items remain takeable after close.
  pub(crate) fn try_take_core(&self) -> Result<T, TryTakeError> {
    let mut guard = self.state.lock();

    match guard.items.pop_front() {
      Some(item) => {
        let waiter = guard.pop_producer();
        drop(guard);
        if let Some(w) = waiter {
          w.wake();
        }
        Ok(item)
      }
      None => {
        if guard.closed {
          Err(TryTakeError::Closed)
        } else {
          Err(TryTakeError::Empty)
        }
      }
    }
  }

  /// Closes the queue and wakes every parked waiter. Woken producers observe
  /// `closed` and fail; woken consumers drain any buffered items first.
  pub(crate) fn close_core(&self) -> Result<(), CloseError> {
    let sync_producers;
    let async_producers;
    let sync_consumers;
    let async_consumers;
    {
      let mut guard = self.state.lock();
      if guard.closed {
        return Err(CloseError);
      }
      guard.closed = true;
      sync_producers = std::mem::take(&mut guard.waiting_sync_producers);
      async_producers = std::mem::take(&mut guard.waiting_async_producers);
      sync_consumers = std::mem::take(&mut guard.waiting_sync_consumers);
      async_consumers = std::mem::take(&mut guard.waiting_async_consumers);
    }
    for w in sync_producers {
      w.wake();
    }
    for w in sync_consumers {
      w.wake();
    }
    for w in async_producers {
      w.waker.wake();
    }
    for w in async_consumers {
      w.waker.wake();
    }
    Ok(())
  }

  /// Removes a parked producer that will retry on its own (timeout loops).
  /// No wake-up forwarding: the caller is still live and consumes any wake
  /// already claimed for it.
  pub(crate) fn remove_producer(&self, id: u64) {
    self.state.lock().remove_producer(id);
  }

  /// Removes a parked consumer that will retry on its own.
  pub(crate) fn remove_consumer(&self, id: u64) {
    self.state.lock().remove_consumer(id);
  }

  /// Removes a parked producer that is leaving for good (cancellation or a
  /// dropped future). If the entry was already popped for wake-up, the wake
  /// is forwarded to the next parked producer.
  pub(crate) fn abandon_producer(&self, id: u64) {
    let forwarded = {
      let mut guard = self.state.lock();
      if guard.remove_producer(id) {
        None
      } else {
        guard.pop_producer()
      }
    };
    if let Some(w) = forwarded {
      w.wake();
    }
  }

  /// Removes a parked consumer that is leaving for good, forwarding a
  /// claimed wake-up to the next parked consumer.
  pub(crate) fn abandon_consumer(&self, id: u64) {
    let forwarded = {
      let mut guard = self.state.lock();
      if guard.remove_consumer(id) {
        None
      } else {
        guard.pop_consumer()
      }
    };
    if let Some(w) = forwarded {
      w.wake();
    }
  }
}
