//! Throughput Benchmark for respkv
//!
//! Measures the store adapter on its own and the full command path
//! (parse → dispatch → handler → store → encoded reply) without sockets.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use respkv::protocol::parse_message;
use respkv::{CommandHandler, Conn, KvStore, Server, SledStore};
use std::sync::Arc;
use std::time::Duration;

/// Benchmark SET operations against the store
fn bench_set(c: &mut Criterion) {
    let store = SledStore::temporary().unwrap();

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i);
            store.set(key.as_bytes(), b"small_value").unwrap();
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = "x".repeat(1024); // 1KB value
        b.iter(|| {
            let key = format!("key:{}", i);
            store.set(key.as_bytes(), value.as_bytes()).unwrap();
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations against the store
fn bench_get(c: &mut Criterion) {
    let store = SledStore::temporary().unwrap();

    for i in 0..100_000 {
        let key = format!("key:{}", i);
        let value = format!("value:{}", i);
        store.set(key.as_bytes(), value.as_bytes()).unwrap();
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(store.get(key.as_bytes()).unwrap());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(store.get(key.as_bytes()).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark the full request path for an 80/20 read/write mix
fn bench_command_path(c: &mut Criterion) {
    let store = Arc::new(SledStore::temporary().unwrap());
    let mut server = Server::new();
    CommandHandler::new(Arc::clone(&store)).register(&mut server);
    let registry = server.registry();

    for i in 0..10_000 {
        let key = format!("key:{}", i);
        store.set(key.as_bytes(), b"value").unwrap();
    }

    let mut group = c.benchmark_group("command_path");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        let mut conn = Conn::detached();
        b.iter(|| {
            let key = format!("key:{}", i % 10_000);
            let request = if i % 5 == 0 {
                format!("*3\r\n$3\r\nSET\r\n${}\r\n{}\r\n$5\r\nvalue\r\n", key.len(), key)
            } else {
                format!("*2\r\n$3\r\nGET\r\n${}\r\n{}\r\n", key.len(), key)
            };
            let (command, _) = parse_message(request.as_bytes()).unwrap().unwrap();
            registry.dispatch(&mut conn, command);
            black_box(conn.take_output());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent writers sharing one store
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_set_get", |b| {
        b.iter(|| {
            let store = Arc::new(SledStore::temporary().unwrap());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..2_000 {
                            let key = Bytes::from(format!("key:{}:{}", t, i));
                            store.set(&key, b"value").unwrap();
                            black_box(store.get(&key).unwrap());
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_command_path,
    bench_concurrent
);
criterion_main!(benches);
