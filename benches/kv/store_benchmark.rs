use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kvx::kv::store::{
    MapStore, ObservableStore, SetOptions, SliceMapStore, Store, SyncMapStore, TieredStore,
    WritePolicy,
};
use std::sync::Arc;
use tokio::runtime::Runtime;

const NUM_ITEMS: usize = 100_000;
const STORE_TYPES: [&str; 4] = ["MapStore", "SyncMapStore", "SliceMapStore", "TieredStore"];

// ========== 辅助函数 ==========

fn generate_key(i: usize) -> String {
    format!("key_{:010}", i)
}

fn generate_value(i: usize) -> String {
    format!("value_{:010}", i)
}

fn new_store(store_type: &str) -> Arc<dyn Store<String, String>> {
    match store_type {
        "SyncMapStore" => Arc::new(SyncMapStore::<String, String>::default()),
        "SliceMapStore" => Arc::new(SliceMapStore::<String, String>::default()),
        "TieredStore" => Arc::new(
            TieredStore::<String, String>::from_parts(
                vec![
                    Arc::new(MapStore::<String, String>::default()),
                    Arc::new(SyncMapStore::<String, String>::default()),
                ],
                WritePolicy::WriteThrough,
                true,
            )
            .unwrap(),
        ),
        "ObservableStore" => Arc::new(ObservableStore::<String, String>::from_parts(
            "bench",
            Arc::new(MapStore::<String, String>::default()),
            vec![Arc::new(kvx::kv::store::MetricsObserver)],
            false,
        )),
        _ => Arc::new(MapStore::<String, String>::default()),
    }
}

async fn fill(store: &Arc<dyn Store<String, String>>) {
    for i in 0..NUM_ITEMS {
        store
            .set(&generate_key(i), &generate_value(i), &SetOptions::new())
            .await
            .unwrap();
    }
}

// ========== 1. 顺序写入 ==========

fn benchmark_sequential_write(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("sequential_write");
    group.sample_size(10);

    for store_type in STORE_TYPES {
        group.bench_with_input(BenchmarkId::from_parameter(store_type), &store_type, |b, store_type| {
            b.to_async(&rt).iter(|| async {
                let store = new_store(store_type);
                fill(&store).await;
                black_box(store);
            })
        });
    }

    group.finish();
}

// ========== 2. 顺序读取 ==========

fn benchmark_sequential_read(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("sequential_read");
    group.sample_size(10);

    for store_type in STORE_TYPES {
        let store = new_store(store_type);
        rt.block_on(fill(&store));

        group.bench_with_input(BenchmarkId::from_parameter(store_type), &store_type, |b, _| {
            b.to_async(&rt).iter(|| async {
                for i in 0..NUM_ITEMS {
                    black_box(store.get(&generate_key(i)).await.unwrap());
                }
            })
        });
    }

    group.finish();
}

// ========== 3. 多任务并发读 ==========

fn benchmark_concurrent_read(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let num_tasks = num_cpus::get();
    let mut group = c.benchmark_group("concurrent_read");
    group.sample_size(10);

    for store_type in STORE_TYPES {
        let store = new_store(store_type);
        rt.block_on(fill(&store));

        group.bench_with_input(BenchmarkId::new(store_type, num_tasks), &num_tasks, |b, &num_tasks| {
            b.to_async(&rt).iter(|| {
                let store = Arc::clone(&store);
                async move {
                    let reads_per_task = NUM_ITEMS / num_tasks;
                    let handles: Vec<_> = (0..num_tasks)
                        .map(|task_id| {
                            let store = Arc::clone(&store);
                            tokio::spawn(async move {
                                let start = task_id * reads_per_task;
                                for i in start..start + reads_per_task {
                                    black_box(store.get(&generate_key(i)).await.unwrap());
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.await.unwrap();
                    }
                }
            })
        });
    }

    group.finish();
}

// ========== 4. 批量读取 ==========

fn benchmark_batch_read(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let batch_size = 1000;
    let mut group = c.benchmark_group("batch_read");
    group.sample_size(10);

    for store_type in STORE_TYPES {
        let store = new_store(store_type);
        rt.block_on(fill(&store));

        group.bench_with_input(BenchmarkId::new(store_type, batch_size), &store_type, |b, _| {
            b.to_async(&rt).iter(|| async {
                for batch in 0..NUM_ITEMS / batch_size {
                    let start = batch * batch_size;
                    let keys: Vec<String> = (start..start + batch_size).map(generate_key).collect();
                    black_box(store.batch_get(&keys).await.unwrap());
                }
            })
        });
    }

    group.finish();
}

// ========== 5. 装饰器开销 ==========

fn benchmark_observable_overhead(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("observable_overhead");

    for store_type in ["MapStore", "ObservableStore"] {
        let store = new_store(store_type);
        rt.block_on(store.set(&generate_key(0), &generate_value(0), &SetOptions::new()))
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(store_type), &store_type, |b, _| {
            b.to_async(&rt)
                .iter(|| async { black_box(store.get(&generate_key(0)).await.unwrap()) })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_sequential_write,
    benchmark_sequential_read,
    benchmark_concurrent_read,
    benchmark_batch_read,
    benchmark_observable_overhead
);
criterion_main!(benches);
