mod common;
use common::*;

use std::thread;
use std::time::Duration;

use tether::{BoundedQueue, CancelToken, PutError, TakeError};

// A consumer blocked on an empty queue observes the cancellation, and the
// queue keeps working for everyone else.
#[test]
fn cancel_blocked_take() {
  let queue = BoundedQueue::<u32>::new(2).unwrap();
  let token = CancelToken::new();

  let take_handle = {
    let queue = queue.clone();
    let token = token.clone();
    thread::spawn(move || queue.take_with_token(&token))
  };

  thread::sleep(Duration::from_millis(100));
  assert!(!take_handle.is_finished(), "take should have blocked");

  token.cancel();
  assert_eq!(take_handle.join().unwrap(), Err(TakeError::Cancelled));

  // Fresh tasks are unaffected by the cancelled waiter.
  let producer = {
    let queue = queue.clone();
    thread::spawn(move || queue.put(42).unwrap())
  };
  let consumer = {
    let queue = queue.clone();
    thread::spawn(move || queue.take().unwrap())
  };
  producer.join().unwrap();
  assert_eq!(consumer.join().unwrap(), 42);
}

#[test]
fn cancel_blocked_put_returns_item() {
  let queue = BoundedQueue::new(1).unwrap();
  queue.put(1).unwrap();
  let token = CancelToken::new();

  let put_handle = {
    let queue = queue.clone();
    let token = token.clone();
    thread::spawn(move || queue.put_with_token(2, &token))
  };

  thread::sleep(Duration::from_millis(100));
  assert!(!put_handle.is_finished(), "put should have blocked");

  token.cancel();
  assert_eq!(put_handle.join().unwrap(), Err(PutError::Cancelled(2)));

  // Queue state is exactly as if the cancelled put never happened.
  assert_eq!(queue.len(), 1);
  assert_eq!(queue.take().unwrap(), 1);
}

#[test]
fn pre_cancelled_token_fails_immediately() {
  let queue = BoundedQueue::<u32>::new(1).unwrap();
  let token = CancelToken::new();
  token.cancel();

  assert_eq!(queue.take_with_token(&token), Err(TakeError::Cancelled));
  assert_eq!(
    queue.put_with_token(9, &token),
    Err(PutError::Cancelled(9))
  );
  assert!(queue.is_empty());
}

#[test]
fn one_token_cancels_multiple_waiters() {
  let queue = BoundedQueue::<u32>::new(1).unwrap();
  let token = CancelToken::new();

  let mut handles = Vec::new();
  for _ in 0..3 {
    let queue = queue.clone();
    let token = token.clone();
    handles.push(thread::spawn(move || queue.take_with_token(&token)));
  }

  thread::sleep(Duration::from_millis(100));
  token.cancel();
  for h in handles {
    assert_eq!(h.join().unwrap(), Err(TakeError::Cancelled));
  }
}

// A wake-up claimed by a waiter that then cancels must be passed on, or the
// remaining waiter would sleep forever next to an available item.
#[test]
fn cancelled_waiter_forwards_its_wakeup() {
  let queue = BoundedQueue::<u32>::new(1).unwrap();
  let token = CancelToken::new();

  let cancellable = {
    let queue = queue.clone();
    let token = token.clone();
    thread::spawn(move || queue.take_with_token(&token))
  };
  let plain = {
    let queue = queue.clone();
    thread::spawn(move || queue.take())
  };

  // Let both consumers park, then race a put against the cancellation.
  thread::sleep(Duration::from_millis(100));
  queue.put(5).unwrap();
  token.cancel();

  let cancelled_result = cancellable.join().unwrap();
  match cancelled_result {
    // The cancellable taker may have won the item before seeing the cancel.
    Ok(5) => {
      queue.put(6).unwrap();
      assert_eq!(plain.join().unwrap(), Ok(6));
    }
    Err(TakeError::Cancelled) => {
      // Then the plain taker must still get the item within LONG_TIMEOUT.
      assert_eq!(plain.join().unwrap(), Ok(5));
    }
    other => panic!("unexpected result: {other:?}"),
  }
}

#[test]
fn token_is_reusable_across_operations_until_cancelled() {
  let queue = BoundedQueue::new(2).unwrap();
  let token = CancelToken::new();

  queue.put_with_token(1, &token).unwrap();
  queue.put_with_token(2, &token).unwrap();
  assert_eq!(queue.take_with_token(&token), Ok(1));
  assert_eq!(queue.take_with_token(&token), Ok(2));
  assert!(!token.is_cancelled());

  token.cancel();
  assert_eq!(queue.take_with_token(&token), Err(TakeError::Cancelled));
}
