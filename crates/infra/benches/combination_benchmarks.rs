use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::Utc;
use std::sync::Arc;

use vitrine_catalog::{Combination, NewVariant};
use vitrine_core::{OptionValueId, ProductId, VariantId};
use vitrine_infra::services::CombinationValidator;
use vitrine_infra::store::{CatalogStore, InMemoryCatalogStore};

/// `count` combinations of `width` values each, all distinct.
fn combinations(count: usize, width: usize) -> Vec<(VariantId, Combination)> {
    (0..count)
        .map(|_| {
            let ids = (0..width).map(|_| OptionValueId::new());
            (VariantId::new(), Combination::from_ids(ids))
        })
        .collect()
}

fn bench_find_duplicate(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_duplicate");

    for variant_count in [10, 100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*variant_count as u64));
        group.bench_with_input(
            BenchmarkId::new("miss", variant_count),
            variant_count,
            |b, &count| {
                let existing = combinations(count, 3);
                let proposed = Combination::from_ids((0..3).map(|_| OptionValueId::new()));

                b.iter(|| {
                    let found = proposed.find_duplicate(
                        existing.iter().map(|(id, c)| (*id, c)),
                        None,
                    );
                    black_box(found)
                });
            },
        );
    }

    group.finish();
}

fn bench_canonical_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonical_key");

    for width in [1, 3, 8].iter() {
        group.bench_with_input(BenchmarkId::new("width", width), width, |b, &width| {
            let combination = Combination::from_ids((0..width).map(|_| OptionValueId::new()));
            b.iter(|| black_box(combination.canonical_key()));
        });
    }

    group.finish();
}

fn bench_validator_over_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("validator_over_store");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    for variant_count in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("is_duplicate", variant_count),
            variant_count,
            |b, &count| {
                let store = Arc::new(InMemoryCatalogStore::new());
                let product_id = ProductId::new();
                runtime.block_on(async {
                    for i in 0..count {
                        let variant = NewVariant {
                            sku: format!("SKU-{i}"),
                            option_value_ids: vec![OptionValueId::new(), OptionValueId::new()],
                            ..NewVariant::default()
                        }
                        .into_variant(VariantId::new(), product_id, Utc::now())
                        .unwrap();
                        store.insert_variant(&variant).await.unwrap();
                    }
                });
                let validator = CombinationValidator::new(store);
                let proposed = Combination::from_ids([OptionValueId::new(), OptionValueId::new()]);

                b.iter(|| {
                    let duplicate = runtime
                        .block_on(validator.is_duplicate(product_id, &proposed))
                        .unwrap();
                    black_box(duplicate)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_find_duplicate,
    bench_canonical_key,
    bench_validator_over_store
);
criterion_main!(benches);
