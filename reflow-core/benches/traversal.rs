//! Benchmarks for traversal overhead.
//!
//! A UI pays the fully-cached refresh on every frame where nothing changed,
//! so that path has to stay cheap; the one-change refresh shows what an
//! actual edit costs on top of it.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use reflow_core::context::Context;
use reflow_core::error::Result;
use reflow_core::flow::for_each;
use reflow_core::signals::{apply, SignalGet};
use reflow_core::system::System;

const ITEMS: usize = 100;

fn describe(ctx: &mut Context, items: &mut [u64]) -> Result<()> {
    for_each(ctx, items.iter_mut(), |ctx, item| {
        let mixed = apply(ctx, |n: u64| n.wrapping_mul(31) ^ 17, (&item,))?;
        black_box(mixed.get());
        Ok(())
    })
}

fn fully_cached_refresh(c: &mut Criterion) {
    let mut system = System::new();
    let mut items: Vec<u64> = (0..ITEMS as u64).collect();

    // Warm pass builds the graph; the measured passes only revisit it.
    system.refresh(|ctx| describe(ctx, &mut items)).unwrap();

    c.bench_function("refresh_100_cached_items", |b| {
        b.iter(|| {
            system.refresh(|ctx| describe(ctx, &mut items)).unwrap();
        })
    });
}

fn refresh_with_one_change(c: &mut Criterion) {
    let mut system = System::new();
    let mut items: Vec<u64> = (0..ITEMS as u64).collect();

    system.refresh(|ctx| describe(ctx, &mut items)).unwrap();

    c.bench_function("refresh_100_items_one_changed", |b| {
        let mut tick = 0u64;
        b.iter(|| {
            tick += 1;
            items[ITEMS / 2] = tick;
            system.refresh(|ctx| describe(ctx, &mut items)).unwrap();
        })
    });
}

fn first_build(c: &mut Criterion) {
    c.bench_function("first_refresh_100_items", |b| {
        b.iter(|| {
            let mut system = System::new();
            let mut items: Vec<u64> = (0..ITEMS as u64).collect();
            system.refresh(|ctx| describe(ctx, &mut items)).unwrap();
            black_box(system.node_count())
        })
    });
}

criterion_group!(
    benches,
    fully_cached_refresh,
    refresh_with_one_change,
    first_build
);
criterion_main!(benches);
