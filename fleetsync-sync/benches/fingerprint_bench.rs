use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fleetsync_model::{CollectionSchema, ConsolidatedSnapshot, Entity, TombstoneLedger};
use fleetsync_sync::{ChangeDetector, FingerprintAlgorithm, MergeEngine};
use serde_json::{json, Value};

fn records(n: usize, day: u32) -> Vec<Value> {
    (0..n)
        .map(|i| {
            json!({
                "id": i,
                "plate": format!("ABC-{i:04}"),
                "model": "Volvo FH",
                "odometer": i * 1_000,
                "createdAt": "2024-01-01T00:00:00.000Z",
                "updatedAt": format!("2024-02-{day:02}T00:00:00.000Z"),
            })
        })
        .collect()
}

fn snapshot(n: usize) -> ConsolidatedSnapshot {
    let mut snapshot = ConsolidatedSnapshot::empty();
    snapshot.collections.insert("vehicles".to_string(), records(n, 1));
    snapshot
}

fn bench_fingerprint(c: &mut Criterion) {
    let snapshot = snapshot(5_000);
    let rolling = ChangeDetector::new(FingerprintAlgorithm::Rolling32);
    let sha = ChangeDetector::new(FingerprintAlgorithm::Sha256);

    c.bench_function("fingerprint_rolling32_5000", |b| {
        b.iter(|| rolling.fingerprint(black_box(&snapshot)))
    });
    c.bench_function("fingerprint_sha256_5000", |b| {
        b.iter(|| sha.fingerprint(black_box(&snapshot)))
    });
}

fn bench_merge(c: &mut Criterion) {
    let schema = CollectionSchema::newest_wins("vehicles");
    let local: Vec<Entity> = records(5_000, 1)
        .into_iter()
        .filter_map(|v| Entity::from_json(v).ok())
        .collect();
    let remote = records(5_000, 2);
    let ledger = TombstoneLedger::new();
    let engine = MergeEngine::new();

    c.bench_function("merge_collection_5000", |b| {
        b.iter(|| engine.merge_collection(&schema, black_box(&local), Some(remote.as_slice()), &ledger))
    });
}

criterion_group!(benches, bench_fingerprint, bench_merge);
criterion_main!(benches);
