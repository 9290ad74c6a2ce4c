//! Integration tests for generation ordering under concurrent use

mod common;

use common::*;
use ocm_context::config::ConfigObject;
use std::thread;

const THREADS: usize = 8;
const APPLIES_PER_THREAD: usize = 25;

#[test]
fn test_concurrent_applies_yield_contiguous_generations() {
    let ctx = demo_context();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let ctx = ctx.clone();
            scope.spawn(move || {
                for i in 0..APPLIES_PER_THREAD {
                    let value = format!("{}-{}", t, i);
                    ctx.apply_config(ConfigObject::new(DemoConfig::new(&value)), &value)
                        .unwrap();
                }
            });
        }
    });

    let total = (THREADS * APPLIES_PER_THREAD) as u64;
    assert_eq!(ctx.generation(), total);

    let entries = ctx.entries();
    let generations: Vec<u64> = entries.iter().map(|entry| entry.generation()).collect();
    assert_eq!(generations, (1..=total).collect::<Vec<_>>());

    for t in 0..THREADS {
        let prefix = format!("{}-", t);
        let sequence: Vec<usize> = entries
            .iter()
            .filter_map(|entry| entry.description().strip_prefix(&prefix))
            .map(|i| i.parse().unwrap())
            .collect();
        assert_eq!(sequence, (0..APPLIES_PER_THREAD).collect::<Vec<_>>());
    }
}

#[test]
fn test_readers_converge_while_writers_apply() {
    let ctx = demo_context();
    let target = DemoTarget::new(&ctx);

    thread::scope(|scope| {
        for t in 0..THREADS / 2 {
            let ctx = ctx.clone();
            scope.spawn(move || {
                for i in 0..APPLIES_PER_THREAD {
                    let value = format!("{}-{}", t, i);
                    ctx.apply_config(ConfigObject::new(DemoConfig::new(&value)), &value)
                        .unwrap();
                }
            });
        }
        for _ in 0..THREADS / 2 {
            let target = &target;
            scope.spawn(move || {
                for _ in 0..APPLIES_PER_THREAD {
                    let _ = target.value();
                }
            });
        }
    });

    let last = ctx
        .entries()
        .last()
        .map(|entry| entry.description().to_string())
        .unwrap();
    assert_eq!(target.value(), last);
    assert_eq!(target.updater().state(), (ctx.generation(), false));
    assert_eq!(ctx.updater().state(), (ctx.generation(), false));
}
