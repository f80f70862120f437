//! A bounded, blocking FIFO queue for producer-consumer hand-off.
//!
//! Tether provides a single concurrency primitive: a fixed-capacity queue
//! whose `put` blocks while the queue is full and whose `take` blocks while
//! it is empty, giving natural backpressure between any number of producer
//! and consumer tasks. Both synchronous (thread-blocking) and asynchronous
//! (future-based) APIs are available over the same queue, and may be mixed
//! freely on one instance.

pub mod cancel;
pub mod error;

pub mod bounded;

pub mod telemetry;

// Public re-exports for convenience.
pub use bounded::{AsyncBoundedQueue, BoundedQueue, PutFuture, TakeFuture};
pub use cancel::CancelToken;
pub use error::{
  CapacityError, CloseError, PutError, PutTimeoutError, TakeError, TakeTimeoutError, TryPutError,
  TryTakeError,
};
