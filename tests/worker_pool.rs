use chexport::WorkerPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// `join` is the wait barrier: it must not return before every submitted
/// job has finished.
#[test]
fn runs_every_submitted_job() {
    let pool = WorkerPool::new(4).unwrap();
    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..32 {
        let done = Arc::clone(&done);
        pool.submit(move || {
            thread::sleep(Duration::from_millis(2));
            done.fetch_add(1, Ordering::SeqCst);
        });
    }
    pool.join();
    assert_eq!(done.load(Ordering::SeqCst), 32);
}

#[test]
fn never_runs_more_jobs_than_slots() {
    let pool = WorkerPool::new(3).unwrap();
    let active = Arc::new(AtomicUsize::new(0));
    let high_water = Arc::new(AtomicUsize::new(0));
    for _ in 0..24 {
        let active = Arc::clone(&active);
        let high_water = Arc::clone(&high_water);
        pool.submit(move || {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            high_water.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            active.fetch_sub(1, Ordering::SeqCst);
        });
    }
    pool.join();
    assert!(high_water.load(Ordering::SeqCst) <= 3);
}

/// With one slot occupied by a parked job, a second submission must not
/// return until that slot frees up. This blocking is what throttles the
/// producers.
#[test]
fn submit_blocks_while_every_slot_is_busy() {
    let pool = WorkerPool::new(1).unwrap();
    let (release, gate) = mpsc::sync_channel::<()>(0);
    pool.submit(move || {
        let _ = gate.recv();
    });

    let submitted = Arc::new(AtomicUsize::new(0));
    let blocked_after_wait = thread::scope(|s| {
        s.spawn(|| {
            pool.submit(|| {});
            submitted.store(1, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(100));
        let still_blocked = submitted.load(Ordering::SeqCst) == 0;
        release.send(()).unwrap();
        still_blocked
    });

    assert!(blocked_after_wait, "submit returned with no free slot");
    assert_eq!(submitted.load(Ordering::SeqCst), 1);
    pool.join();
}

#[test]
fn a_zero_slot_request_still_gets_one_worker() {
    let pool = WorkerPool::new(0).unwrap();
    let done = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&done);
    pool.submit(move || {
        flag.fetch_add(1, Ordering::SeqCst);
    });
    pool.join();
    assert_eq!(done.load(Ordering::SeqCst), 1);
}
