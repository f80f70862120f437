// src/bounded/async_impl.rs

//! The future-based `put` and `take` paths.
//!
//! Each pending future registers an id-addressed waiter holding its task's
//! `Waker`. Re-polls refresh the waker in place; a poll that finds its entry
//! gone was chosen for a wake-up and either completes or re-registers.
//! Dropping a pending future is cancellation: its `Drop` deregisters the
//! waiter under the lock, forwarding any wake-up the waiter had already
//! claimed.

use futures_core::Stream;

use super::core::AsyncWaiter;
use super::AsyncBoundedQueue;
use crate::error::{PutError, TakeError};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future that completes when its item has been inserted into the queue.
#[must_use = "futures do nothing unless you .await or poll them"]
#[derive(Debug)]
pub struct PutFuture<'a, T: Send> {
  queue: &'a AsyncBoundedQueue<T>,
  // Wrapped in an Option so it can be taken on completion.
  item: Option<T>,
  waiter: Option<u64>,
}

impl<'a, T: Send> PutFuture<'a, T> {
  pub(super) fn new(queue: &'a AsyncBoundedQueue<T>, item: T) -> Self {
    Self {
      queue,
      item: Some(item),
      waiter: None,
    }
  }
}

impl<'a, T: Send> Future for PutFuture<'a, T> {
  type Output = Result<(), PutError<T>>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    // Sound: no field is structurally pinned; the future holds no
    // self-references.
    let this = unsafe { self.as_mut().get_unchecked_mut() };
    let core = this.queue.core();
    let mut guard = core.state.lock();

    if guard.closed {
      // Close already drained the waiter queues; nothing to deregister.
      this.waiter = None;
      let item = this.item.take().expect("PutFuture polled after completion");
      return Poll::Ready(Err(PutError::Closed(item)));
    }

    if guard.items.len() < core.capacity {
      let item = this.item.take().expect("PutFuture polled after completion");
      guard.items.push_back(item);
      if let Some(id) = this.waiter.take() {
        guard.remove_producer(id);
      }
      let waiter = guard.pop_consumer();
      drop(guard);
      if let Some(w) = waiter {
        w.wake();
      }
      return Poll::Ready(Ok(()));
    }

    // Queue is full: register, or refresh the waker on a re-poll.
    match this.waiter {
      Some(id) => {
        if let Some(w) = guard.waiting_async_producers.iter_mut().find(|w| w.id == id) {
          if !w.waker.will_wake(cx.waker()) {
            w.waker = cx.waker().clone();
          }
        } else {
          // Woken, but a rival filled the slot before this poll ran.
          guard.waiting_async_producers.push_back(AsyncWaiter {
            id,
            waker: cx.waker().clone(),
          });
        }
      }
      None => {
        let id = core.next_waiter_id();
        guard.waiting_async_producers.push_back(AsyncWaiter {
          id,
          waker: cx.waker().clone(),
        });
        this.waiter = Some(id);
      }
    }
    Poll::Pending
  }
}

impl<'a, T: Send> Drop for PutFuture<'a, T> {
  fn drop(&mut self) {
    if let Some(id) = self.waiter.take() {
      self.queue.core().abandon_producer(id);
    }
  }
}

/// A future that completes when an item has been removed from the queue.
#[must_use = "futures do nothing unless you .await or poll them"]
#[derive(Debug)]
pub struct TakeFuture<'a, T: Send> {
  queue: &'a AsyncBoundedQueue<T>,
  waiter: Option<u64>,
}

impl<'a, T: Send> TakeFuture<'a, T> {
  pub(super) fn new(queue: &'a AsyncBoundedQueue<T>) -> Self {
    Self {
      queue,
      waiter: None,
    }
  }
}

impl<'a, T: Send> Future for TakeFuture<'a, T> {
  type Output = Result<T, TakeError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    let core = this.queue.core();
    let mut guard = core.state.lock();

    if let Some(item) = guard.items.pop_front() {
      if let Some(id) = this.waiter.take() {
        guard.remove_consumer(id);
      }
      let waiter = guard.pop_producer();
      drop(guard);
      if let Some(w) = waiter {
        w.wake();
      }
      return Poll::Ready(Ok(item));
    }

    if guard.closed {
      this.waiter = None;
      return Poll::Ready(Err(TakeError::Closed));
    }

    match this.waiter {
      Some(id) => {
        if let Some(w) = guard.waiting_async_consumers.iter_mut().find(|w| w.id == id) {
          if !w.waker.will_wake(cx.waker()) {
            w.waker = cx.waker().clone();
          }
        } else {
          guard.waiting_async_consumers.push_back(AsyncWaiter {
            id,
            waker: cx.waker().clone(),
          });
        }
      }
      None => {
        let id = core.next_waiter_id();
        guard.waiting_async_consumers.push_back(AsyncWaiter {
          id,
          waker: cx.waker().clone(),
        });
        this.waiter = Some(id);
      }
    }
    Poll::Pending
  }
}

impl<'a, T: Send> Drop for TakeFuture<'a, T> {
  fn drop(&mut self) {
    if let Some(id) = self.waiter.take() {
      self.queue.core().abandon_consumer(id);
    }
  }
}

impl<T: Send> Stream for AsyncBoundedQueue<T> {
  type Item = T;

  /// Yields items in queue order; ends once the queue is closed and drained.
  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.get_mut();
    // Field access keeps the core borrow disjoint from `stream_waiter`.
    let core = &*this.core;
    let mut guard = core.state.lock();

    if let Some(item) = guard.items.pop_front() {
      if let Some(id) = this.stream_waiter.take() {
        guard.remove_consumer(id);
      }
      let waiter = guard.pop_producer();
      drop(guard);
      if let Some(w) = waiter {
        w.wake();
      }
      return Poll::Ready(Some(item));
    }

    if guard.closed {
      this.stream_waiter = None;
      return Poll::Ready(None);
    }

    match this.stream_waiter {
      Some(id) => {
        if let Some(w) = guard.waiting_async_consumers.iter_mut().find(|w| w.id == id) {
          if !w.waker.will_wake(cx.waker()) {
            w.waker = cx.waker().clone();
          }
        } else {
          guard.waiting_async_consumers.push_back(AsyncWaiter {
            id,
            waker: cx.waker().clone(),
          });
        }
      }
      None => {
        let id = core.next_waiter_id();
        guard.waiting_async_consumers.push_back(AsyncWaiter {
          id,
          waker: cx.waker().clone(),
        });
        this.stream_waiter = Some(id);
      }
    }
    Poll::Pending
  }
}
