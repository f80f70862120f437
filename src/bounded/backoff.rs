// src/bounded/backoff.rs

use std::thread;

const SPIN_LIMIT: u32 = 10;
const YIELD_LIMIT: u32 = 20;

/// An adaptive wait strategy that spins briefly, then yields, then parks.
///
/// `cond` is polled between steps; once it returns `true` the wait ends.
/// In the parking phase the thread is only woken by `unpark()`, after which
/// the condition is re-checked before parking again.
pub(crate) fn adaptive_wait<F>(cond: F)
where
  F: Fn() -> bool,
{
  for _ in 0..SPIN_LIMIT {
    if cond() {
      return;
    }
    std::hint::spin_loop();
  }

  for _ in 0..YIELD_LIMIT {
    if cond() {
      return;
    }
    thread::yield_now();
  }

  while !cond() {
    thread::park();
  }
}
