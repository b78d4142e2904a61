use std::collections::LinkedList;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand_xoshiro::Xoroshiro128PlusPlus;

use pooled_lists::{ForwardListPool, List, NodePool, OrderedList};

const LENGTHS: &[usize] = &[16, 256, 4096];

/// Fill a list from the back and drain it from the front.  The pool outlives the iterations, so after the first one
/// every node comes off the arena's free list.
pub fn push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_pop");

    for len in LENGTHS.iter().copied() {
        group.throughput(Throughput::Elements(len as u64));

        group.bench_with_input(BenchmarkId::new("pooled", len), &len, |b, &len| {
            let pool = NodePool::<u64>::new();
            let mut list = List::new(&pool);
            b.iter(|| {
                for i in 0..len as u64 {
                    list.push_back(i).unwrap();
                }
                while let Some(v) = list.pop_front() {
                    black_box(v);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("std", len), &len, |b, &len| {
            let mut list = LinkedList::new();
            b.iter(|| {
                for i in 0..len as u64 {
                    list.push_back(i);
                }
                while let Some(v) = list.pop_front() {
                    black_box(v);
                }
            });
        });
    }
}

pub fn ordered_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("ordered_insert");

    // Sorted inserts are quadratic, so stay small.
    for len in [16usize, 128, 512] {
        let mut values = (0..len as u32).collect::<Vec<_>>();
        values.shuffle(&mut Xoroshiro128PlusPlus::seed_from_u64(5));
        group.throughput(Throughput::Elements(len as u64));

        group.bench_with_input(BenchmarkId::new("ordered_list", len), &values, |b, values| {
            let pool = NodePool::<u32>::new();
            b.iter(|| {
                let mut list = OrderedList::new(&pool);
                for v in values.iter().copied() {
                    list.insert(v).unwrap();
                }
                black_box(list.front().copied());
            });
        });

        group.bench_with_input(BenchmarkId::new("forward_list", len), &values, |b, values| {
            let pool = ForwardListPool::<u32>::new();
            b.iter(|| {
                let mut list = pool.create_list();
                for v in values.iter().copied() {
                    pool.insert(&mut list, v).unwrap();
                }
                black_box(list.front().copied());
            });
        });
    }
}

criterion_group!(benches, push_pop, ordered_insert);
criterion_main!(benches);
