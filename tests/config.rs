//! Configuration and resize tests: eager construction, runtime-settable
//! options, and shrink-driven eviction.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam::channel::bounded;
use tarn::{CollectionPolicy, Pool, PoolConfig};

fn counting_pool(config: PoolConfig<usize>) -> Pool<usize> {
    let counter = AtomicUsize::new(0);
    Pool::from_fn(config, move || counter.fetch_add(1, Ordering::SeqCst) + 1).unwrap()
}

fn idle_values(pool: &Pool<usize>) -> Vec<usize> {
    pool.available_snapshot().iter().map(|r| **r).collect()
}

#[test]
fn eager_pools_construct_everything_up_front() {
    let pool = counting_pool(PoolConfig::new().with_eager(true));
    assert_eq!(pool.size(), 10);
    assert_eq!(idle_values(&pool), (1..=10).collect::<Vec<_>>());
    assert_eq!(pool.stats().constructed, 10);
}

#[test]
fn eager_construction_failure_aborts_creation() {
    let result = Pool::<usize>::new(PoolConfig::new().with_eager(true), || {
        Err("refused".into())
    });
    assert!(result.is_err());
}

#[test]
fn collection_policy_is_gettable_and_settable() {
    let pool = counting_pool(PoolConfig::new());
    assert_eq!(pool.collection_policy(), CollectionPolicy::Fifo);
    pool.set_collection_policy(CollectionPolicy::Lifo);
    assert_eq!(pool.collection_policy(), CollectionPolicy::Lifo);

    let pool = counting_pool(PoolConfig::new().with_collection_policy(CollectionPolicy::Lifo));
    assert_eq!(pool.collection_policy(), CollectionPolicy::Lifo);
    pool.set_collection_policy(CollectionPolicy::Fifo);
    assert_eq!(pool.collection_policy(), CollectionPolicy::Fifo);
}

#[test]
fn policy_changes_take_effect_immediately() {
    let pool = counting_pool(PoolConfig::new().with_maximum_size(4).with_eager(true));
    pool.checkout(|n| assert_eq!(*n, 1)).unwrap();
    pool.set_collection_policy(CollectionPolicy::Lifo);
    // 1 was just returned to the back of the store.
    pool.checkout(|n| assert_eq!(*n, 1)).unwrap();
}

#[test]
fn timeout_is_gettable_and_settable() {
    let pool = counting_pool(PoolConfig::new());
    assert_eq!(pool.timeout(), Duration::from_secs(1));
    pool.set_timeout(Duration::from_secs(4));
    assert_eq!(pool.timeout(), Duration::from_secs(4));

    let pool = counting_pool(PoolConfig::new().with_timeout(Duration::from_millis(3700)));
    assert_eq!(pool.timeout(), Duration::from_millis(3700));
}

#[test]
fn maximum_size_is_gettable_and_settable() {
    let pool = counting_pool(PoolConfig::new());
    assert_eq!(pool.maximum_size(), 10);
    pool.set_maximum_size(7);
    assert_eq!(pool.maximum_size(), 7);
    pool.set_maximum_size(0);
    assert_eq!(pool.maximum_size(), 0);
    pool.set_maximum_size(2);
    assert_eq!(pool.maximum_size(), 2);
}

#[test]
fn shrinking_frees_idle_resources_immediately() {
    let pool = counting_pool(PoolConfig::new().with_eager(true));
    assert_eq!(idle_values(&pool), (1..=10).collect::<Vec<_>>());

    pool.set_maximum_size(8);
    assert_eq!(idle_values(&pool), (3..=10).collect::<Vec<_>>());
    assert_eq!(pool.stats().detached, 2);

    // Raising the bound never resurrects anything.
    pool.set_maximum_size(10);
    assert_eq!(idle_values(&pool), (3..=10).collect::<Vec<_>>());
    pool.set_maximum_size(9);
    assert_eq!(idle_values(&pool), (3..=10).collect::<Vec<_>>());
}

#[test]
fn shrinking_drains_checked_out_resources_lazily() {
    let pool = Arc::new(counting_pool(
        PoolConfig::new().with_maximum_size(2).with_eager(true),
    ));
    assert_eq!(idle_values(&pool), vec![1, 2]);

    let (ready_tx, ready_rx) = bounded(0);
    let (release_tx, release_rx) = bounded::<()>(0);
    let holder = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            pool.checkout(|n| {
                assert_eq!(*n, 1);
                ready_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            })
            .unwrap();
        })
    };
    ready_rx.recv().unwrap();

    pool.set_maximum_size(0);
    assert_eq!(pool.maximum_size(), 0);

    // The idle resource went immediately; the held one cannot be reclaimed.
    assert_eq!(pool.size(), 1);
    assert_eq!(pool.available_count(), 0);
    assert_eq!(pool.allocated_count(), 1);

    release_tx.send(()).unwrap();
    holder.join().unwrap();

    // Its checkin discarded it instead of returning it.
    assert_eq!(pool.size(), 0);
    assert_eq!(pool.available_count(), 0);
    assert_eq!(pool.allocated_count(), 0);
}

#[test]
fn raising_maximum_size_wakes_blocked_acquirers() {
    let pool = Arc::new(counting_pool(
        PoolConfig::new()
            .with_maximum_size(0)
            .with_timeout(Duration::from_secs(10)),
    ));

    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.checkout(|n| *n).unwrap())
    };

    // Let the waiter reach the condvar, then open up capacity.
    thread::sleep(Duration::from_millis(50));
    pool.set_maximum_size(1);

    assert_eq!(waiter.join().unwrap(), 1);
    assert_eq!(pool.size(), 1);
}

#[test]
fn detach_predicate_is_settable_at_runtime() {
    let pool = counting_pool(PoolConfig::new());
    pool.checkout(|_| ()).unwrap();
    assert_eq!(pool.available_count(), 1);

    pool.set_detach_predicate(|_| true);
    pool.checkout(|_| ()).unwrap();
    assert_eq!(pool.available_count(), 0);
}
