//! # websocket-notify Relay Benchmarks
//!
//! | Area | Operation | Expectation |
//! |------|-----------|-------------|
//! | Signature | token derivation | dominated by PBKDF2 (10 rounds) |
//! | Tag Index | join + leave | O(1) amortized, flat in subscriber count |
//! | Distribution | fan-out | linear in matching subscribers |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use wn_01_subscriptions::{
    derive_token, Connection, ConnectionKey, Event, SubscriptionApi, SubscriptionManager,
    TagIndex,
};

const SECRET: &[u8] = b"secret";

fn bench_token_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("signature");

    for tag_count in [1usize, 8, 64] {
        let tags: Vec<String> = (0..tag_count).map(|i| format!("tag-{i}")).collect();
        group.bench_with_input(BenchmarkId::new("derive_token", tag_count), &tags, |b, tags| {
            b.iter(|| black_box(derive_token(tags, SECRET)))
        });
    }

    group.finish();
}

fn bench_join_leave(c: &mut Criterion) {
    let mut group = c.benchmark_group("tag-index");

    for population in [10usize, 1_000, 10_000] {
        let index = TagIndex::new();
        // Keep the queues alive so the connections stay open.
        let mut queues = Vec::with_capacity(population);
        for i in 0..population {
            let (connection, queue) = Connection::open(ConnectionKey(i as u64), 1);
            index.join("hot", &connection).unwrap();
            queues.push((connection, queue));
        }

        let (visitor, _visitor_queue) = Connection::open(ConnectionKey(u64::MAX), 1);
        group.bench_with_input(
            BenchmarkId::new("join_leave", population),
            &population,
            |b, _| {
                b.iter(|| {
                    index.join("hot", &visitor).unwrap();
                    black_box(index.leave("hot", &visitor))
                })
            },
        );
    }

    group.finish();
}

fn bench_distribute(c: &mut Criterion) {
    let mut group = c.benchmark_group("distribution");
    group.measurement_time(Duration::from_secs(5));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    for subscribers in [1usize, 100, 1_000] {
        let manager = Arc::new(SubscriptionManager::with_queue_capacity(SECRET.to_vec(), 64));
        let tags = ["room1".to_string()];
        let token = derive_token(&tags, SECRET);

        runtime.block_on(async {
            for _ in 0..subscribers {
                let (connection, mut queue) = manager.open_connection();
                manager.subscribe(&connection, &tags, &token).unwrap();
                // Drain like a delivery pump with an instant transport.
                tokio::spawn(async move {
                    while let Some(payload) = queue.recv().await {
                        black_box(payload);
                    }
                });
            }
        });

        let event = Event::new("ping", tags.to_vec(), "hi");
        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::new("fan_out", subscribers),
            &event,
            |b, event| {
                b.iter(|| runtime.block_on(manager.distribute(event)).unwrap())
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_token_derivation, bench_join_leave, bench_distribute);
criterion_main!(benches);
