use std::ptr::NonNull;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use pyramid::Pyramid;

const CASES: &[usize] = &[16, 256, 4096];

/// Allocate `count` items then free them all, over and over.  After the first iteration the arena serves everything
/// from its free list.
pub fn churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");

    for &count in CASES.iter() {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("pyramid", count), &count, |b, &count| {
            let mut arena = Pyramid::<[u64; 4]>::new();
            let mut ptrs: Vec<NonNull<[u64; 4]>> = Vec::with_capacity(count);

            b.iter(|| {
                for i in 0..count {
                    let p = arena.allocate().unwrap();
                    unsafe { p.as_ptr().write([i as u64; 4]) };
                    ptrs.push(p);
                }
                for p in ptrs.drain(..) {
                    unsafe { arena.deallocate(p) };
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("box", count), &count, |b, &count| {
            let mut boxes: Vec<Box<[u64; 4]>> = Vec::with_capacity(count);

            b.iter(|| {
                for i in 0..count {
                    boxes.push(Box::new([i as u64; 4]));
                }
                boxes.clear();
            });
        });
    }
}

criterion_group!(benches, churn);
criterion_main!(benches);
