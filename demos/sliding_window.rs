use ringlimit::Limiter;
use rand::Rng;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

fn main() {
    // Set up the limiter to admit 100 requests per second (10 buckets of 100ms)
    let limiter = Arc::new(ringlimit::sliding_window(100));
    let pass = Arc::new(AtomicU64::new(0));
    let start = Instant::now();

    println!("Trying 4 x 2 500 requests with varying intervals");
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            let pass = Arc::clone(&pass);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for _ in 0..2_500 {
                    if limiter.allow().is_ok() {
                        pass.fetch_add(1, Ordering::Relaxed);
                    }
                    thread::sleep(Duration::from_micros(rng.gen_range(0..2000)));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker panicked");
    }

    let elapsed = start.elapsed().as_secs_f64();
    let rate_per_s = pass.load(Ordering::Relaxed) as f64 / elapsed;
    println!("Average pass rate {rate_per_s}");
    println!("Currently counted {}", limiter.count());
}
