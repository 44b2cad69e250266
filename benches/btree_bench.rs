//! Benchmarks for pagedb table operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pagedb::{Config, Record, StorageTable};
use tempfile::tempdir;

fn record(id: i32) -> Record {
    Record::new(id, format!("user{}", id), format!("user{}@example.com", id))
}

fn config(order: usize) -> Config {
    Config::builder().order(order).max_pages(4000).build()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_insert");

    for order in [4usize, 8, 14] {
        let count = 500;
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("sequential", order), &order, |b, &order| {
            b.iter_with_setup(
                || {
                    let dir = tempdir().unwrap();
                    let table = StorageTable::open_with(dir.path().join("bench.db"), config(order)).unwrap();
                    (dir, table)
                },
                |(dir, mut table)| {
                    for id in 0..count {
                        table.insert(record(id)).unwrap();
                    }
                    (dir, table)
                },
            );
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_search");

    for order in [4usize, 14] {
        let dir = tempdir().unwrap();
        let mut table = StorageTable::open_with(dir.path().join("bench.db"), config(order)).unwrap();
        for id in 0..1000 {
            table.insert(record(id)).unwrap();
        }

        group.bench_with_input(BenchmarkId::new("point", order), &order, |b, _| {
            let mut id = 0;
            b.iter(|| {
                id = (id + 7919) % 1000;
                black_box(table.search(id).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let mut table = StorageTable::open_with(dir.path().join("bench.db"), config(8)).unwrap();
    for id in 0..1000 {
        table.insert(record(id)).unwrap();
    }

    let mut group = c.benchmark_group("table_scan");
    group.throughput(Throughput::Elements(1000));
    group.bench_function("cursor", |b| {
        b.iter(|| {
            let count = table.rows().unwrap().count();
            black_box(count)
        });
    });
    group.finish();
}

fn bench_delete(c: &mut Criterion) {
    c.bench_function("table_delete_all", |b| {
        b.iter_with_setup(
            || {
                let dir = tempdir().unwrap();
                let mut table = StorageTable::open_with(dir.path().join("bench.db"), config(4)).unwrap();
                for id in 0..300 {
                    table.insert(record(id)).unwrap();
                }
                (dir, table)
            },
            |(dir, mut table)| {
                for id in (0..300).rev() {
                    table.delete(id).unwrap();
                }
                (dir, table)
            },
        );
    });
}

criterion_group!(benches, bench_insert, bench_search, bench_scan, bench_delete);
criterion_main!(benches);
