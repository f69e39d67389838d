//! Integration tests for the priority-donating lock and condition variable.
//!
//! These run real OS threads through the parking runtime and observe the
//! scheduler from the test thread.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use donor_sched::{
    Condition, Lock, ParkingRuntime, Priority, Scheduler, ThreadId, ThreadQueue, ThreadRuntime,
};

const TIMEOUT: Duration = Duration::from_secs(10);

fn p(v: u8) -> Priority {
    Priority::from_raw(v)
}

/// Poll `cond` until it holds, failing after `TIMEOUT`.
fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + TIMEOUT;
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for condition");
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn setup() -> (Arc<Scheduler>, Arc<ParkingRuntime>, Arc<Lock>) {
    let scheduler = Arc::new(Scheduler::new());
    let runtime = ParkingRuntime::with_scheduler(Arc::clone(&scheduler));
    let lock = Arc::new(Lock::new(Arc::clone(&scheduler), runtime.clone()));
    (scheduler, runtime, lock)
}

fn blocked_on_lock(scheduler: &Scheduler, lock: &Lock, thread: ThreadId) -> bool {
    scheduler.section().waiting_on(thread) == Some(lock.queue_id())
}

#[test]
fn waiter_donates_to_lock_holder() {
    let (scheduler, runtime, lock) = setup();
    let main = runtime.current_thread();
    lock.acquire();
    assert!(lock.is_held_by_current_thread());

    let done = Arc::new(AtomicBool::new(false));
    let high = {
        let lock = Arc::clone(&lock);
        let done = Arc::clone(&done);
        runtime
            .spawn("high", move |_| {
                lock.acquire();
                done.store(true, Ordering::SeqCst);
                lock.release();
            })
            .unwrap()
    };
    scheduler.section().set_priority(high, p(6));
    wait_until(|| blocked_on_lock(&scheduler, &lock, high));

    assert_eq!(scheduler.section().effective_priority(main), p(6));
    assert!(!done.load(Ordering::SeqCst));

    lock.release();
    runtime.join_all();

    assert!(done.load(Ordering::SeqCst));
    assert_eq!(scheduler.section().effective_priority(main), Priority::DEFAULT);
    assert_eq!(lock.holder(), None);
    scheduler.section().check_invariants();
}

#[test]
fn release_hands_off_by_priority_then_arrival() {
    let (scheduler, runtime, lock) = setup();
    lock.acquire();

    let order = Arc::new(Mutex::new(Vec::new()));
    for (name, priority) in [("a", 2), ("b", 5), ("c", 2)] {
        let lock_in_thread = Arc::clone(&lock);
        let order = Arc::clone(&order);
        let id = runtime
            .spawn(name, move |_| {
                lock_in_thread.acquire();
                order.lock().unwrap().push(name);
                lock_in_thread.release();
            })
            .unwrap();
        scheduler.section().set_priority(id, p(priority));
        wait_until(|| blocked_on_lock(&scheduler, &lock, id));
    }

    assert_eq!(scheduler.section().waiters(lock.queue_id()).len(), 3);
    lock.release();
    runtime.join_all();

    assert_eq!(*order.lock().unwrap(), vec!["b", "a", "c"]);
}

#[test]
fn guard_provides_mutual_exclusion() {
    let (scheduler, runtime, lock) = setup();
    let counter = Arc::new(AtomicUsize::new(0));

    for i in 0..4 {
        let lock = Arc::clone(&lock);
        let counter = Arc::clone(&counter);
        let rt = Arc::clone(&runtime);
        runtime
            .spawn(&format!("worker-{i}"), move |_| {
                for _ in 0..50 {
                    let _guard = lock.lock();
                    let seen = counter.load(Ordering::SeqCst);
                    rt.yield_now();
                    counter.store(seen + 1, Ordering::SeqCst);
                }
            })
            .unwrap();
    }
    runtime.join_all();

    assert_eq!(counter.load(Ordering::SeqCst), 200);
    assert_eq!(lock.holder(), None);
    scheduler.section().check_invariants();
}

#[test]
fn condition_wakes_sleeper() {
    let (scheduler, runtime, lock) = setup();
    let cond = Arc::new(Condition::new(Arc::clone(&lock)));
    let ready = Arc::new(AtomicBool::new(false));
    let seen = Arc::new(AtomicBool::new(false));

    let consumer = {
        let cond = Arc::clone(&cond);
        let ready = Arc::clone(&ready);
        let seen = Arc::clone(&seen);
        runtime
            .spawn("consumer", move |_| {
                let lock = Arc::clone(cond.lock());
                lock.acquire();
                while !ready.load(Ordering::SeqCst) {
                    cond.sleep();
                }
                seen.store(true, Ordering::SeqCst);
                lock.release();
            })
            .unwrap()
    };
    wait_until(|| scheduler.section().waiting_on(consumer) == Some(cond.queue_id()));

    lock.acquire();
    ready.store(true, Ordering::SeqCst);
    assert!(cond.wake());
    lock.release();
    runtime.join_all();

    assert!(seen.load(Ordering::SeqCst));
    assert!(!cond.wake());
}

#[test]
fn wake_all_releases_every_sleeper() {
    let (scheduler, runtime, lock) = setup();
    let cond = Arc::new(Condition::new(Arc::clone(&lock)));
    let go = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicUsize::new(0));

    let mut sleepers = Vec::new();
    for i in 0..3 {
        let cond = Arc::clone(&cond);
        let go = Arc::clone(&go);
        let finished = Arc::clone(&finished);
        let id = runtime
            .spawn(&format!("sleeper-{i}"), move |_| {
                let lock = Arc::clone(cond.lock());
                lock.acquire();
                while !go.load(Ordering::SeqCst) {
                    cond.sleep();
                }
                finished.fetch_add(1, Ordering::SeqCst);
                lock.release();
            })
            .unwrap();
        sleepers.push(id);
    }
    wait_until(|| {
        let section = scheduler.section();
        sleepers
            .iter()
            .all(|&t| section.waiting_on(t) == Some(cond.queue_id()))
    });

    lock.acquire();
    go.store(true, Ordering::SeqCst);
    assert_eq!(cond.wake_all(), 3);
    lock.release();
    runtime.join_all();

    assert_eq!(finished.load(Ordering::SeqCst), 3);
}

#[test]
fn condition_queue_does_not_donate() {
    let (scheduler, runtime, lock) = setup();
    let cond = Arc::new(Condition::new(Arc::clone(&lock)));
    let main = runtime.current_thread();

    let sleeper = {
        let cond = Arc::clone(&cond);
        runtime
            .spawn("sleeper", move |_| {
                let lock = Arc::clone(cond.lock());
                lock.acquire();
                cond.sleep();
                lock.release();
            })
            .unwrap()
    };
    scheduler.section().set_priority(sleeper, p(7));
    wait_until(|| scheduler.section().waiting_on(sleeper) == Some(cond.queue_id()));

    lock.acquire();
    assert_eq!(scheduler.section().effective_priority(main), Priority::DEFAULT);
    cond.wake();
    lock.release();
    runtime.join_all();
}

#[test]
fn finished_threads_leave_no_scheduler_state() {
    let (scheduler, runtime, lock) = setup();
    let baseline = scheduler.section().thread_count();

    for i in 0..5 {
        let lock = Arc::clone(&lock);
        runtime
            .spawn(&format!("worker-{i}"), move |_| {
                let _guard = lock.lock();
            })
            .unwrap();
    }
    runtime.join_all();

    assert_eq!(scheduler.section().thread_count(), baseline);
    assert_eq!(lock.holder(), None);
}

#[test]
fn dropping_primitives_discards_only_empty_queues() {
    let (scheduler, _runtime, lock) = setup();
    let cond = Condition::new(Arc::clone(&lock));
    let cond_queue = cond.queue_id();
    let stranded = ThreadId(100);
    scheduler.section().queue(cond_queue).wait_for_access(stranded);
    assert_eq!(scheduler.section().queue_count(), 2);

    // A condition with a sleeper keeps its queue.
    drop(cond);
    assert_eq!(scheduler.section().queue_count(), 2);
    assert_eq!(scheduler.section().waiters(cond_queue), vec![stranded]);

    assert_eq!(scheduler.section().queue(cond_queue).next_thread(), Some(stranded));
    drop(lock);
    assert_eq!(scheduler.section().queue_count(), 1);
}
