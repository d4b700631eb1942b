use amq_filters::cuckoo::CuckooFilter;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

fn bench_insert(c: &mut Criterion) {
    let mut initial_items = 0;
    while initial_items < 1024 - 32 {
        c.bench_function(&format!("cuckoo insert {}", initial_items), |b| {
            b.iter_batched_ref(
                || {
                    let mut filter = CuckooFilter::<u32>::new(1024, 12).unwrap();
                    for i in 0..initial_items {
                        let _ = filter.insert(&i);
                    }
                    filter
                },
                |filter| filter.insert(&0xDEADBEEF),
                BatchSize::PerIteration,
            )
        });
        initial_items += 32;
    }
}

fn bench_contains(c: &mut Criterion) {
    let mut filter = CuckooFilter::<u32>::new(100_000, 12).unwrap();
    for i in 0..95_000 {
        let _ = filter.insert(&i);
    }
    let mut key = 0u32;
    c.bench_function("cuckoo contains", |b| {
        b.iter(|| {
            key = key.wrapping_add(1);
            filter.contains(&key)
        })
    });
}

criterion_group!(benches, bench_insert, bench_contains);
criterion_main!(benches);
