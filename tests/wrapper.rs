//! Delegating wrapper tests: per-call checkout and pipelined re-entrancy.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crossbeam::channel::bounded;
use tarn::{PoolConfig, PoolWrapper};

fn counting_wrapper() -> PoolWrapper<usize> {
    let counter = AtomicUsize::new(0);
    PoolWrapper::from_fn(PoolConfig::new(), move || {
        counter.fetch_add(1, Ordering::SeqCst) + 1
    })
    .unwrap()
}

#[test]
fn each_call_runs_against_a_checked_out_resource() {
    let wrapper = counting_wrapper();
    assert_eq!(wrapper.pool().size(), 0);

    let value = wrapper.call(|n| *n).unwrap();
    assert_eq!(value, 1);

    assert_eq!(wrapper.pool().size(), 1);
    assert_eq!(wrapper.pool().available_count(), 1);
    assert_eq!(wrapper.pool().allocated_count(), 0);
}

#[test]
fn nested_calls_pipeline_against_the_same_resource() {
    let wrapper = counting_wrapper();

    wrapper
        .call(|outer| {
            let outer_ptr = outer as *const usize;
            let inner_ptr = wrapper.call(|inner| inner as *const usize).unwrap();
            assert_eq!(outer_ptr, inner_ptr);
            assert_eq!(wrapper.pool().size(), 1);
        })
        .unwrap();

    assert_eq!(wrapper.pool().allocated_count(), 0);
}

#[test]
fn concurrent_calls_use_distinct_resources() {
    let wrapper = Arc::new(counting_wrapper());
    let (ready_tx, ready_rx) = bounded(0);
    let (release_tx, release_rx) = bounded::<()>(0);

    wrapper
        .call(|mine| {
            let mine = *mine;
            let worker = {
                let wrapper = Arc::clone(&wrapper);
                let ready_tx = ready_tx.clone();
                thread::spawn(move || {
                    wrapper
                        .call(|theirs| {
                            ready_tx.send(*theirs).unwrap();
                            release_rx.recv().unwrap();
                        })
                        .unwrap();
                })
            };

            let theirs = ready_rx.recv().unwrap();
            assert_ne!(mine, theirs);
            assert_eq!(wrapper.pool().allocated_count(), 2);

            release_tx.send(()).unwrap();
            worker.join().unwrap();
        })
        .unwrap();

    assert_eq!(wrapper.pool().allocated_count(), 0);
    assert_eq!(wrapper.pool().available_count(), 2);
}
