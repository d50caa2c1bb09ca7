use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hub_test_utils::{vehicle_activity, RUT};
use siri_hub::{
    split_into_chunks, ChangeTracker, EntityFilter, EntityStore, FilterDimension,
    InMemoryStoreProvider, ReadRequest, VehicleActivity, VehicleActivityProfile,
};
use std::sync::Arc;
use std::time::Duration;

const BATCH_ROWS: usize = 1024;
const LINES: usize = 16;
const CHUNK_LIMIT: usize = 100;

fn batch() -> Vec<VehicleActivity> {
    (0..BATCH_ROWS)
        .map(|n| vehicle_activity(&n.to_string(), &format!("RUT:Line:{}", n % LINES)))
        .collect()
}

fn primed_store() -> (InMemoryStoreProvider, Arc<EntityStore<VehicleActivityProfile>>) {
    let provider = InMemoryStoreProvider::new();
    let store = Arc::new(EntityStore::new(
        Arc::new(VehicleActivityProfile::default()),
        &provider,
    ));
    let summary = store.upsert_all(RUT, batch()).summary;
    assert_eq!(summary.added_or_updated, BATCH_ROWS, "store should be primed");
    (provider, store)
}

fn entity_store_criterion(c: &mut Criterion) {
    let mut upsert_group = c.benchmark_group("upsert");
    upsert_group.bench_function("fresh_batch", |b| {
        b.iter_batched(
            || {
                let provider = InMemoryStoreProvider::new();
                let store =
                    EntityStore::new(Arc::new(VehicleActivityProfile::default()), &provider);
                (provider, store, batch())
            },
            |(_provider, store, items)| {
                let result = store.upsert_all(RUT, items);
                black_box(result.summary.added_or_updated);
            },
            BatchSize::SmallInput,
        );
    });

    let (_provider, store) = primed_store();
    let resent = batch();
    upsert_group.bench_function("unchanged_batch", |b| {
        b.iter_batched(
            || resent.clone(),
            |items| {
                let result = store.upsert_all(RUT, items);
                assert!(result.changed.is_empty(), "resent batch should not change");
                black_box(result.summary.total);
            },
            BatchSize::SmallInput,
        );
    });
    upsert_group.finish();

    let filter = EntityFilter::new().with(FilterDimension::LineRef, ["RUT:Line:3"]);
    let mut query_group = c.benchmark_group("query");
    query_group.bench_function("line_filter", |b| {
        b.iter(|| black_box(store.query(&filter).len()));
    });
    query_group.finish();

    let (tracker_provider, tracker_store) = primed_store();
    let tracker = ChangeTracker::new(
        tracker_store.clone(),
        &tracker_provider,
        Duration::from_secs(600),
    );
    let request = ReadRequest::for_dataset(RUT);
    tracker.read_and_reset("bench", &request);
    let keys = tracker_store.query_keys(&|_| true);

    let mut tracker_group = c.benchmark_group("change_tracker");
    tracker_group.bench_function("commit_and_read", |b| {
        b.iter(|| {
            tracker.record_change(keys.iter().cloned());
            tracker.commit();
            let read = tracker.read_and_reset("bench", &request);
            black_box(read.items.len());
        });
    });
    tracker_group.bench_function("paged_read", |b| {
        b.iter(|| {
            tracker.record_change(keys.iter().cloned());
            tracker.commit();
            let paged = request.clone().with_max_size(CHUNK_LIMIT);
            while tracker.read_and_reset("bench", &paged).more_data {}
        });
    });
    tracker_group.finish();

    let mut chunk_group = c.benchmark_group("delivery_chunks");
    chunk_group.bench_function("split", |b| {
        b.iter_batched(
            || store.get_all(None),
            |items| black_box(split_into_chunks(items, Some(CHUNK_LIMIT)).len()),
            BatchSize::SmallInput,
        );
    });
    chunk_group.finish();
}

criterion_group!(benches, entity_store_criterion);
criterion_main!(benches);
