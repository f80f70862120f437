//! Two producer threads and one consumer thread sharing a small queue.
//!
//! Run with: cargo run --example producer_consumer

use std::thread;
use std::time::Duration;
use tether::BoundedQueue;

fn main() {
  let queue = BoundedQueue::new(3).expect("capacity is non-zero");

  let mut producers = Vec::new();
  for id in 0..2u32 {
    let queue = queue.clone();
    producers.push(thread::spawn(move || {
      for n in 1..=10u32 {
        let item = (id, n);
        queue.put(item).expect("queue stays open while producing");
        println!("producer {id} put {n:>2}  (len {})", queue.len());
        thread::sleep(Duration::from_millis(50));
      }
    }));
  }

  let consumer = {
    let queue = queue.clone();
    thread::spawn(move || {
      for _ in 0..20 {
        let (id, n) = queue.take().expect("queue stays open while consuming");
        println!("consumer    got {n:>2} from producer {id}");
        thread::sleep(Duration::from_millis(80));
      }
    })
  };

  for p in producers {
    p.join().unwrap();
  }
  consumer.join().unwrap();

  println!("done; queue is empty: {}", queue.is_empty());
}
