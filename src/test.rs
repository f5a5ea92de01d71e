use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;
use std::sync::{Arc, Barrier};
use std::thread;

use rand::Rng;

use crate::mock_assets::MockClock;
use crate::{Limiter, SlidingWindow, SlidingWindowConfig};

const INTERVAL: Duration = Duration::from_millis(100);

/// Fire `tasks` concurrent admissions and return how many were rejected
fn concurrent_rejections<L: Limiter + Sync>(limiter: &L, tasks: usize) -> u64 {
    let rejected = AtomicU64::new(0);
    let barrier = Barrier::new(tasks);

    thread::scope(|s| {
        for _ in 0..tasks {
            s.spawn(|| {
                barrier.wait();
                if limiter.allow().is_err() {
                    rejected.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    });

    rejected.load(Ordering::Relaxed)
}

#[test]
fn test_burst_bound() {
    // 10 per second, 12 concurrent requests: two get turned away
    let limiter = crate::sliding_window(10);
    assert_eq!(concurrent_rejections(&limiter, 12), 2);
}

#[test]
fn test_burst_bound_random() {
    let mut rng = rand::thread_rng();
    let clock = MockClock::new();

    for _ in 0..25 {
        let capacity = rng.gen_range(1..=16);
        let tasks = rng.gen_range(capacity + 1..=capacity + 24) as usize;

        // Frozen clock, every request arrives at the same instant
        let w = SlidingWindow::<_, 10>::new_with_time_provider(
            SlidingWindowConfig::new(capacity, INTERVAL),
            || clock.now(),
        );

        let rejected = concurrent_rejections(&w, tasks);
        assert_eq!(rejected, tasks as u64 - capacity, "capacity = {capacity}, tasks = {tasks}");
        assert_eq!(w.count(), capacity);
    }
}

#[test]
fn test_decay_frees_capacity() {
    let clock = MockClock::new();
    let w = SlidingWindow::<_, 10>::new_with_time_provider(
        SlidingWindowConfig::new(3, INTERVAL),
        || clock.now(),
    );

    assert_eq!(concurrent_rejections(&w, 3), 0);

    clock.advance(INTERVAL);
    assert_eq!(concurrent_rejections(&w, 4), 1);
}

#[test]
fn test_decay_frees_capacity_system_clock() {
    let limiter = crate::sliding_window(3);

    assert_eq!(concurrent_rejections(&limiter, 3), 0);

    thread::sleep(INTERVAL);
    assert_eq!(concurrent_rejections(&limiter, 4), 1);
}

#[test]
fn test_steady_state_system_clock() {
    // One request every 100ms for 2 seconds never hits the limit
    let limiter = crate::sliding_window(10);

    for i in 0..20 {
        assert!(limiter.allow().is_ok(), "unexpected rejection in loop {i}");
        thread::sleep(INTERVAL);
    }
}

#[test]
fn test_shared_behind_arc() {
    let limiter = Arc::new(crate::sliding_window_with_interval::<5>(
        50,
        Duration::from_secs(60),
    ));
    let admitted = Arc::new(AtomicU64::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            let admitted = Arc::clone(&admitted);
            thread::spawn(move || {
                for _ in 0..20 {
                    if limiter.allow().is_ok() {
                        admitted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(admitted.load(Ordering::Relaxed), 50);
    assert_eq!(limiter.remaining(), 0);
}

#[test]
fn test_independent_limiters() {
    let a = crate::sliding_window(1);
    let b = crate::sliding_window(2);

    assert!(a.allow().is_ok());
    assert!(a.allow().is_err());

    assert!(b.allow().is_ok());
    assert!(b.allow().is_ok());
    assert!(b.allow().is_err());
}

#[test]
fn test_dyn_limiter() {
    let clock = MockClock::new();
    let w = SlidingWindow::<_, 4>::new_with_time_provider(
        SlidingWindowConfig::new(2, INTERVAL),
        || clock.now(),
    );
    let limiter: &dyn Limiter = &w;

    assert!(limiter.try_consume(2).is_ok());
    assert!(limiter.allow().is_err());
}

#[test]
fn test_try_consume_one() {
    let clock = MockClock::new();
    let w = SlidingWindow::<_, 10>::new_with_time_provider(
        SlidingWindowConfig::new(2, INTERVAL),
        || clock.now(),
    );

    assert!(w.try_consume_one().is_ok());
    assert!(w.allow().is_ok());
    assert!(w.try_consume_one().is_err());
    assert_eq!(w.count(), 2);

    clock.advance(INTERVAL);
    assert!(w.try_consume_one().is_ok());
}
