use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::thread;

use tether::BoundedQueue;

const ITEMS: usize = 10_000;

/// One producer thread and one consumer thread pushing a fixed volume
/// through the queue at several capacities.
fn sync_pipelined(c: &mut Criterion) {
  let mut group = c.benchmark_group("sync_pipelined");
  group.throughput(Throughput::Elements(ITEMS as u64));

  for capacity in [1usize, 16, 256] {
    group.bench_with_input(
      BenchmarkId::from_parameter(capacity),
      &capacity,
      |b, &capacity| {
        b.iter(|| {
          let queue = BoundedQueue::new(capacity).unwrap();
          let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
              for i in 0..ITEMS {
                queue.put(i as u64).unwrap();
              }
            })
          };
          let mut sum = 0u64;
          for _ in 0..ITEMS {
            sum += queue.take().unwrap();
          }
          producer.join().unwrap();
          sum
        })
      },
    );
  }
  group.finish();
}

/// Single-threaded put/take round trips; no parking involved.
fn sync_ping_pong(c: &mut Criterion) {
  let queue = BoundedQueue::new(1).unwrap();
  c.bench_function("sync_ping_pong", |b| {
    b.iter(|| {
      queue.put(42u64).unwrap();
      queue.take().unwrap()
    })
  });
}

criterion_group!(benches, sync_pipelined, sync_ping_pong);
criterion_main!(benches);
