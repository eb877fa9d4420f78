//! Performance benchmarks for tote-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tote_engine::{
    local::decode_list, reconcile::plan_merge, CartItem, LocalStore, MemoryDocuments, MemoryKv,
    Session, Slot, SyncEngine,
};

fn cart(size: usize, offset: usize) -> Vec<CartItem> {
    (0..size)
        .map(|i| CartItem::new(format!("p{}", i + offset), format!("Plant {}", i)).quantity(2))
        .collect()
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for size in [10, 100, 500].iter() {
        // Half of the guest list collides with the remote list.
        let remote = cart(*size, 0);
        let guest = cart(*size, size / 2);

        group.bench_with_input(BenchmarkId::new("plan_merge", size), size, |b, _| {
            b.iter(|| plan_merge(black_box(&remote), black_box(&guest)))
        });
    }

    group.finish();
}

fn bench_local_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_store");

    for size in [10, 100, 1000].iter() {
        let items = cart(*size, 0);
        let store = LocalStore::new(MemoryKv::new());
        store.save(Slot::Guest, &items).unwrap();

        group.bench_with_input(BenchmarkId::new("save", size), size, |b, _| {
            b.iter(|| store.save(Slot::Guest, black_box(&items)))
        });

        group.bench_with_input(BenchmarkId::new("load", size), size, |b, _| {
            b.iter(|| {
                let loaded: Vec<CartItem> = store.load(Slot::Guest);
                loaded
            })
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let raw = serde_json::to_string(&cart(100, 0)).unwrap();
    // No entry has a name, so every one is skipped.
    let noisy = raw.replace("\"name\"", "\"nom\"");

    group.bench_function("decode_clean", |b| {
        b.iter(|| decode_list::<CartItem>(black_box(&raw)))
    });

    group.bench_function("decode_noisy", |b| {
        b.iter(|| decode_list::<CartItem>(black_box(&noisy)))
    });

    group.finish();
}

fn bench_login(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let mut group = c.benchmark_group("login");

    for size in [10, 50].iter() {
        group.bench_with_input(BenchmarkId::new("merge_on_login", size), size, |b, &size| {
            b.iter(|| {
                runtime.block_on(async {
                    let engine = SyncEngine::new(MemoryKv::new(), MemoryDocuments::new());
                    for item in cart(size, 0) {
                        engine.add(item).await.unwrap();
                    }
                    engine
                        .observe(black_box(Session::Authenticated("u1".into())))
                        .await
                })
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_merge,
    bench_local_store,
    bench_decode,
    bench_login,
);
criterion_main!(benches);
